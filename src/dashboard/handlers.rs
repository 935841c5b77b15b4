//! Dashboard HTTP handlers and view rendering.
//!
//! This module contains:
//! - The route handler for displaying the transactions of a selected day
//! - HTML view functions for the date picker and the empty states
//! - The state shared by the dashboard endpoints

use axum::{
    Extension,
    extract::{FromRef, Query, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use serde::{Deserialize, Serialize};
use time::{Date, UtcOffset, format_description::well_known::Iso8601};

use crate::{
    AppState, Error,
    auth::Session,
    dashboard::{
        charts::{DashboardChart, build_dashboard_charts, charts_view},
        export::export_panel,
        table::{empty_day_view, transaction_table},
    },
    deadletter::{
        DayData, ExportProfile, SEARCHABLE_COLUMNS, SortColumn, SortOrder, TableSort,
        filter_and_sort, load_day,
    },
    endpoints,
    html::{
        FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE, HeadElement, PAGE_CONTAINER_STYLE, base,
        loading_spinner,
    },
    navigation::NavBar,
    pagination::{
        PaginationConfig, create_pagination_indicators, page_count, page_slice, pagination_view,
    },
    timezone::local_offset_or_error,
    watchdog::WatchdogClient,
};

/// The state needed by the dashboard page and its endpoints.
#[derive(Debug, Clone)]
pub struct DashboardState {
    /// The client for fetching transactions and recording actions.
    pub watchdog: WatchdogClient,
    /// The local timezone as a canonical timezone name, e.g. "Europe/Rome".
    pub local_timezone: String,
    /// The config that controls how the transaction table is paged.
    pub pagination_config: PaginationConfig,
    /// The most action history requests to have in flight at once.
    pub max_concurrent_requests: usize,
}

impl FromRef<AppState> for DashboardState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            watchdog: state.watchdog.clone(),
            local_timezone: state.local_timezone.clone(),
            pagination_config: state.pagination_config.clone(),
            max_concurrent_requests: state.max_concurrent_requests,
        }
    }
}

/// The query string of the dashboard, e.g.
/// `?date=2025-03-01&q=MYBANK&sort=paymentToken&order=desc&page=2&page_size=20`.
#[derive(Debug, Default, Deserialize)]
pub struct DashboardQuery {
    /// The selected day as `YYYY-MM-DD`.
    pub date: Option<String>,
    /// Text to search for in the searchable columns of the table.
    pub q: Option<String>,
    pub sort: Option<SortColumn>,
    pub order: Option<SortOrder>,
    pub page: Option<u64>,
    pub page_size: Option<u64>,
}

impl DashboardQuery {
    fn search(&self) -> &str {
        self.q.as_deref().map(str::trim).unwrap_or_default()
    }

    fn table_sort(&self) -> Option<TableSort> {
        self.sort.map(|column| TableSort {
            column,
            order: self.order.unwrap_or_default(),
        })
    }
}

/// The query string of a link back to the dashboard.
///
/// Empty fields are left out so links stay short.
#[derive(Debug, Serialize)]
struct DashboardLink<'a> {
    date: String,
    #[serde(skip_serializing_if = "str::is_empty")]
    q: &'a str,
    sort: Option<SortColumn>,
    order: Option<SortOrder>,
    page: Option<u64>,
    page_size: Option<u64>,
}

impl DashboardLink<'_> {
    fn into_url(self) -> String {
        match serde_urlencoded::to_string(&self) {
            Ok(query) => format!("{}?{query}", endpoints::DASHBOARD_VIEW),
            Err(error) => {
                tracing::error!("Could not encode dashboard link {self:?}: {error}");
                endpoints::DASHBOARD_VIEW.to_owned()
            }
        }
    }
}

/// Parse a `YYYY-MM-DD` query parameter. Blank and invalid values give `None`.
pub(super) fn parse_date(value: &str) -> Option<Date> {
    let value = value.trim();

    if value.is_empty() {
        return None;
    }

    Date::parse(value, &Iso8601::DATE)
        .inspect_err(|error| tracing::warn!("Invalid date {value:?} in query: {error}"))
        .ok()
}

/// Display the dead-letter transactions of the selected day.
pub async fn get_dashboard_page(
    State(state): State<DashboardState>,
    Extension(session): Extension<Session>,
    Query(query): Query<DashboardQuery>,
) -> Result<Response, Error> {
    let local_offset = local_offset_or_error(&state.local_timezone)?;
    let user_name = session.user.display_name();
    let nav_bar = NavBar::new(endpoints::DASHBOARD_VIEW, user_name.as_deref());

    let Some(date) = query.date.as_deref().and_then(parse_date) else {
        let content = html! {
            (date_picker(None))
            (no_date_view())
        };

        return Ok(dashboard_view(nav_bar, &content).into_response());
    };

    let day = load_day(
        &state.watchdog,
        &session.token,
        date,
        state.max_concurrent_requests,
    )
    .await;

    if day.transactions.is_empty() {
        let content = html! {
            (date_picker(Some(date)))
            (empty_day_view(&date.to_string()))
        };

        return Ok(dashboard_view(nav_bar, &content).into_response());
    }

    let charts = build_dashboard_charts(&day.transactions, &day.action_map);
    let content = day_view(&day, date, &query, &state.pagination_config, local_offset, &charts);

    Ok(dashboard_view(nav_bar, &content).into_response())
}

fn day_view(
    day: &DayData,
    date: Date,
    query: &DashboardQuery,
    pagination_config: &PaginationConfig,
    local_offset: UtcOffset,
    charts: &[DashboardChart],
) -> Markup {
    let search = query.search();
    let sort = query.table_sort();
    let matching = filter_and_sort(&day.transactions, search, sort);

    let page_size = query
        .page_size
        .unwrap_or(pagination_config.default_page_size)
        .max(1);
    let page_count = page_count(matching.len() as u64, page_size).max(1);
    let page = query
        .page
        .unwrap_or(pagination_config.default_page)
        .clamp(1, page_count);

    let rows = page_slice(&matching, page, page_size);
    let indicators = create_pagination_indicators(page, page_count, pagination_config.max_pages);
    let link = |sort: Option<TableSort>, page: Option<u64>| {
        DashboardLink {
            date: date.to_string(),
            q: search,
            sort: sort.map(|sort| sort.column),
            order: sort.map(|sort| sort.order),
            page,
            page_size: Some(page_size),
        }
        .into_url()
    };
    let page_url = |page: u64| link(sort, Some(page));
    // Changing the sort goes back to the first page.
    let sort_url = |sort: TableSort| link(Some(sort), None);

    let profile_counts: Vec<(ExportProfile, usize)> = ExportProfile::ALL
        .iter()
        .map(|profile| (*profile, profile.count_matching(&day.transactions)))
        .collect();

    html! {
        (date_picker(Some(date)))

        p class="w-full mb-4 text-sm text-gray-500 dark:text-gray-400"
        {
            (day.transactions.len()) " transazioni in dead letter"
        }

        (charts_view(charts))
        (export_panel(&profile_counts, date, day.transactions.len(), day.page.total))
        (search_form(date, search, sort))

        section id="transactions-section" class="w-full"
        {
            @if !search.is_empty() {
                p id="search-summary" class="w-full mb-2 text-sm text-gray-500 dark:text-gray-400"
                {
                    (matching.len()) " di " (day.transactions.len())
                    " transazioni corrispondono a \"" (search) "\""
                }
            }

            @if matching.is_empty() {
                p class="py-8 text-center" { "Nessuna transazione corrisponde alla ricerca." }
            } @else {
                (transaction_table(rows, &day.action_map, &day.action_types, local_offset, sort, sort_url))
                (pagination_view(&indicators, page_url))
            }
        }
    }
}

/// Searching swaps only the table section so the search box keeps its focus.
fn search_form(date: Date, search: &str, sort: Option<TableSort>) -> Markup {
    let placeholder = SEARCHABLE_COLUMNS
        .iter()
        .map(|column| column.key())
        .collect::<Vec<_>>()
        .join(", ");

    html! {
        form
            id="search-form"
            method="get"
            action=(endpoints::DASHBOARD_VIEW)
            hx-get=(endpoints::DASHBOARD_VIEW)
            hx-trigger="input changed delay:300ms from:#q, search from:#q, submit"
            hx-target="#transactions-section"
            hx-select="#transactions-section"
            hx-swap="outerHTML"
            hx-push-url="true"
            hx-sync="this:replace"
            class="w-full mb-4"
        {
            input type="hidden" name="date" value=(date);

            @if let Some(sort) = sort {
                input type="hidden" name="sort" value=(sort.column.key());
                input type="hidden" name="order" value=(sort.order.key());
            }

            label for="q" class=(FORM_LABEL_STYLE) { "Cerca" }
            input
                type="search"
                name="q"
                id="q"
                value=(search)
                placeholder=(placeholder)
                class=(FORM_TEXT_INPUT_STYLE);
        }
    }
}

/// The date picker reloads the content when the date changes.
///
/// A newer selection aborts the request for the previous one, so the content
/// always matches the date shown in the picker.
fn date_picker(date: Option<Date>) -> Markup {
    let date = date.map(|date| date.to_string()).unwrap_or_default();

    html! {
        form
            id="date-form"
            method="get"
            action=(endpoints::DASHBOARD_VIEW)
            hx-get=(endpoints::DASHBOARD_VIEW)
            hx-trigger="change"
            hx-target="#dashboard-content"
            hx-select="#dashboard-content"
            hx-swap="outerHTML"
            hx-push-url="true"
            hx-sync="this:replace"
            hx-indicator="#indicator"
            class="w-full max-w-sm mb-6"
        {
            label for="date" class=(FORM_LABEL_STYLE) { "Data" }

            div class="flex items-center gap-2"
            {
                input
                    type="date"
                    name="date"
                    id="date"
                    value=(date)
                    class=(FORM_TEXT_INPUT_STYLE);

                span id="indicator" class="text-blue-600"
                {
                    span class="htmx-indicator" { (loading_spinner()) }
                }
            }
        }
    }
}

fn no_date_view() -> Markup {
    html! {
        div class="flex flex-col items-center py-8"
        {
            h2 class="text-xl font-bold" { "Seleziona una data" }
            p { "Scegli il giorno di cui vuoi vedere le transazioni in dead letter." }
        }
    }
}

fn dashboard_view(nav_bar: NavBar, content: &Markup) -> Markup {
    let nav_bar = nav_bar.into_html();

    let page = html! {
        (nav_bar)

        div id="dashboard-content" class=(PAGE_CONTAINER_STYLE)
        {
            (content)
        }
    };

    // Loaded on every page since picking a date swaps in content with charts.
    let scripts = [HeadElement::ScriptLink("/static/echarts.6.0.0.min.js".to_owned())];

    base("Dashboard", &scripts, &page)
}
