//! The CSV export panel and the download endpoint behind it.

use axum::{
    Extension,
    extract::{Query, State},
    http::header::{CONTENT_DISPOSITION, CONTENT_TYPE},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use serde::Deserialize;
use time::{Date, OffsetDateTime};

use crate::{
    Error,
    auth::Session,
    dashboard::handlers::{DashboardState, parse_date},
    deadletter::{ExportProfile, build_csv},
    endpoints,
    html::{BUTTON_SECONDARY_STYLE, CHIP_STYLE, CHIP_SUCCESS_STYLE},
    timezone::local_offset_or_error,
};

/// The query string of the export endpoint, e.g. `?profile=bancomat_pay&date=2025-03-01`.
#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    pub profile: ExportProfile,
    /// The day to export as `YYYY-MM-DD`. Defaults to today.
    #[serde(default)]
    pub date: Option<String>,
}

/// Download the transactions of a day that match an export profile as CSV.
///
/// Responds with an alert instead of a file when no transaction matches.
pub async fn get_export(
    State(state): State<DashboardState>,
    Extension(session): Extension<Session>,
    Query(query): Query<ExportQuery>,
) -> Response {
    let date = match export_date(&state, query.date.as_deref()) {
        Ok(date) => date,
        Err(error) => return error.into_alert_response(),
    };

    let transactions = match state.watchdog.fetch_transactions(&session.token, date).await {
        Some(response) => {
            if (response.deadletter_transactions.len() as u64) < response.page.total {
                tracing::warn!(
                    "Exporting from {} of {} transactions for {date}",
                    response.deadletter_transactions.len(),
                    response.page.total
                );
            }

            response.deadletter_transactions
        }
        None => Vec::new(),
    };

    match build_csv(query.profile, &transactions) {
        Ok(csv) => {
            let file_name = query.profile.file_name(date);
            tracing::info!(
                "Exporting {} transactions as {file_name}",
                query.profile.count_matching(&transactions)
            );

            (
                [
                    (CONTENT_TYPE, "text/csv; charset=utf-8".to_owned()),
                    (
                        CONTENT_DISPOSITION,
                        format!("attachment; filename=\"{file_name}\""),
                    ),
                ],
                csv,
            )
                .into_response()
        }
        Err(error) => error.into_alert_response(),
    }
}

fn export_date(state: &DashboardState, date: Option<&str>) -> Result<Date, Error> {
    if let Some(date) = date.and_then(parse_date) {
        return Ok(date);
    }

    let local_offset = local_offset_or_error(&state.local_timezone)?;

    Ok(OffsetDateTime::now_utc().to_offset(local_offset).date())
}

fn export_url(profile: ExportProfile, date: Date) -> String {
    let query = serde_urlencoded::to_string([
        ("profile", profile.key()),
        ("date", date.to_string().as_str()),
    ])
    .unwrap_or_else(|_| format!("profile={}", profile.key()));

    format!("{}?{query}", endpoints::EXPORT)
}

/// Renders one download button per export profile with the number of
/// transactions of `date` that it would export.
///
/// Profiles without matches request the export through htmx so that the
/// "no match" alert is shown in place instead of replacing the page.
/// A warning is shown when only `loaded` of the `total` transactions of the
/// day could be fetched, since the counts and files then miss some rows.
pub(super) fn export_panel(
    profile_counts: &[(ExportProfile, usize)],
    date: Date,
    loaded: usize,
    total: u64,
) -> Markup {
    html! {
        section id="export-panel" class="w-full mb-4"
        {
            h3 class="text-xl font-semibold mb-2" { "Esporta CSV" }

            @if (loaded as u64) < total {
                p
                    id="partial-data-warning"
                    role="alert"
                    data-loaded=(loaded)
                    data-total=(total)
                    class="p-3 mb-3 text-sm text-yellow-800 rounded-lg bg-yellow-50 dark:bg-gray-800 dark:text-yellow-300"
                {
                    "Caricate solo " (loaded) " di " (total)
                    " transazioni: conteggi ed export potrebbero essere incompleti."
                }
            }

            div class="grid grid-cols-1 md:grid-cols-3 gap-4"
            {
                @for (profile, count) in profile_counts {
                    @let url = export_url(*profile, date);

                    div
                        class="p-4 rounded-lg shadow bg-white dark:bg-gray-800"
                        data-export-profile=(profile.key())
                    {
                        div class="flex justify-between items-center mb-2"
                        {
                            span class="font-semibold" { (profile.label()) }
                            span
                                class=(if *count > 0 { CHIP_SUCCESS_STYLE } else { CHIP_STYLE })
                                data-count=(count)
                            {
                                (count)
                            }
                        }

                        p class="text-sm text-gray-500 dark:text-gray-400 mb-3" { (profile.description()) }

                        @if *count > 0 {
                            a href=(url) download class=(BUTTON_SECONDARY_STYLE) { "Scarica" }
                        } @else {
                            button
                                type="button"
                                class=(BUTTON_SECONDARY_STYLE)
                                hx-get=(url)
                                hx-swap="none"
                                hx-target-error="#alert-container"
                            {
                                "Scarica"
                            }
                        }
                    }
                }
            }
        }
    }
}
