//! The table of dead-letter transactions with their details and actions.

use maud::{Markup, html};
use serde_json::json;
use time::UtcOffset;

use crate::{
    deadletter::{ActionMap, SortColumn, SortOrder, TableSort, TransactionActions, format_action},
    endpoints::{self, format_endpoint},
    html::{
        BUTTON_SECONDARY_STYLE, CHIP_STYLE, CHIP_SUCCESS_STYLE, FORM_TEXT_INPUT_STYLE, LINK_STYLE,
        TABLE_CELL_STYLE, TABLE_HEADER_STYLE, TABLE_ROW_STYLE,
    },
    timezone::format_local_timestamp,
    watchdog::{ActionType, Transaction},
};

const NOT_AVAILABLE: &str = "N/A";

/// Renders one page of the transaction table.
///
/// `rows` should hold only the rows of the current page. Every data column
/// header links to `sort_url` for sorting by that column, ascending first and
/// flipping the order when the column is already sorted.
pub(super) fn transaction_table(
    rows: &[&Transaction],
    action_map: &ActionMap,
    action_types: &[ActionType],
    local_offset: UtcOffset,
    sort: Option<TableSort>,
    sort_url: impl Fn(TableSort) -> String,
) -> Markup {
    let no_actions = TransactionActions::default();

    html! {
        div class="overflow-x-auto rounded-lg shadow w-full"
        {
            table
                id="transactions-table"
                class="w-full text-sm text-left rtl:text-right text-gray-500 dark:text-gray-400"
            {
                thead class=(TABLE_HEADER_STYLE)
                {
                    tr
                    {
                        @for column in SortColumn::ALL {
                            (sortable_header(column, sort, &sort_url))
                        }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Details" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Azioni" }
                    }
                }

                tbody
                {
                    @for (index, transaction) in rows.iter().enumerate() {
                        @let actions = action_map
                            .get(&transaction.transaction_id)
                            .unwrap_or(&no_actions);

                        tr class=(TABLE_ROW_STYLE) data-transaction-id=(transaction.transaction_id)
                        {
                            td class={(TABLE_CELL_STYLE) " font-mono"} { (transaction.transaction_id) }
                            td class={(TABLE_CELL_STYLE) " whitespace-nowrap"}
                            {
                                (insertion_date_cell(transaction, local_offset))
                            }
                            (optional_cell(transaction.payment_token.as_deref()))
                            (optional_cell(transaction.payment_end_to_end_id.as_deref()))
                            (optional_cell(transaction.operation_id.as_deref()))
                            (optional_cell(transaction.payment_method_name.as_deref()))
                            (optional_cell(transaction.psp_id.as_deref()))
                            (optional_cell(transaction.e_commerce_status.as_deref()))
                            (optional_cell(transaction.gateway_authorization_status.as_deref()))
                            td class=(TABLE_CELL_STYLE) { (details_view(index, transaction)) }
                            (action_cell(
                                &transaction.transaction_id,
                                actions,
                                action_types,
                                local_offset
                            ))
                        }
                    }
                }
            }
        }
    }
}

fn sortable_header(
    column: SortColumn,
    sort: Option<TableSort>,
    sort_url: &impl Fn(TableSort) -> String,
) -> Markup {
    let current_order = sort
        .filter(|sort| sort.column == column)
        .map(|sort| sort.order);
    let next = TableSort {
        column,
        order: current_order.map_or(SortOrder::Asc, SortOrder::reversed),
    };
    let (aria_sort, arrow) = match current_order {
        Some(SortOrder::Asc) => (Some("ascending"), " ▲"),
        Some(SortOrder::Desc) => (Some("descending"), " ▼"),
        None => (None, ""),
    };

    html! {
        th scope="col" class=(TABLE_CELL_STYLE) aria-sort=[aria_sort]
        {
            a href=(sort_url(next)) class=(LINK_STYLE) data-sort-column=(column.key())
            {
                (column.key()) (arrow)
            }
        }
    }
}

fn insertion_date_cell(transaction: &Transaction, local_offset: UtcOffset) -> String {
    transaction
        .insertion_date
        .as_deref()
        .and_then(|date| format_local_timestamp(date, local_offset))
        .unwrap_or_default()
}

fn optional_cell(value: Option<&str>) -> Markup {
    html! {
        td class=(TABLE_CELL_STYLE) { (value.unwrap_or_default()) }
    }
}

/// The node, gateway and e-commerce details of `transaction` as pretty printed
/// JSON, or `None` if the backend sent none of them.
pub(super) fn details_json(transaction: &Transaction) -> Option<String> {
    if transaction.nodo_details.is_none()
        && transaction.npg_details.is_none()
        && transaction.e_commerce_details.is_none()
    {
        return None;
    }

    let details = json!({
        "nodoDetails": transaction.nodo_details,
        "npgDetails": transaction.npg_details,
        "eCommerceDetails": transaction.e_commerce_details,
    });

    serde_json::to_string_pretty(&details)
        .inspect_err(|error| {
            tracing::error!(
                "Could not format details of transaction {}: {error}",
                transaction.transaction_id
            )
        })
        .ok()
}

fn details_view(index: usize, transaction: &Transaction) -> Markup {
    let Some(details) = details_json(transaction) else {
        return html! { (NOT_AVAILABLE) };
    };

    let dialog_id = format!("details-dialog-{index}");
    let open_dialog = format!("document.getElementById('{dialog_id}').showModal()");
    let close_dialog = format!("document.getElementById('{dialog_id}').close()");

    html! {
        button type="button" class=(BUTTON_SECONDARY_STYLE) onclick=(open_dialog) { "View" }

        dialog
            id=(dialog_id)
            class="w-full max-w-3xl p-6 rounded-lg shadow bg-white dark:bg-gray-800 \
                text-gray-900 dark:text-white backdrop:bg-gray-900/50"
        {
            div class="flex justify-between items-center mb-4"
            {
                h3 class="text-lg font-semibold" { "Dettagli " (transaction.transaction_id) }
                button type="button" class=(BUTTON_SECONDARY_STYLE) onclick=(close_dialog) { "Chiudi" }
            }

            pre class="text-xs overflow-auto max-h-[70vh] p-2 rounded bg-gray-50 dark:bg-gray-900"
            {
                (details)
            }
        }
    }
}

/// Renders the cell with the actions recorded against a transaction and a
/// picker for the catalog actions that have not been applied yet.
///
/// Picking an action posts it and replaces this cell with the response.
pub(super) fn action_cell(
    transaction_id: &str,
    actions: &TransactionActions,
    action_types: &[ActionType],
    local_offset: UtcOffset,
) -> Markup {
    let remaining: Vec<&ActionType> = action_types
        .iter()
        .filter(|action_type| !actions.contains(&action_type.value))
        .collect();
    let endpoint = format_endpoint(endpoints::TRANSACTION_ACTIONS, transaction_id);

    html! {
        td class={(TABLE_CELL_STYLE) " min-w-[16rem]"} data-actions-for=(transaction_id)
        {
            div class="flex flex-col gap-1 mb-2"
            {
                @for action in actions.iter() {
                    @let style = if action.action.kind.is_final() { CHIP_SUCCESS_STYLE } else { CHIP_STYLE };

                    span class=(style) { (format_action(action, local_offset)) }
                }
            }

            @if !remaining.is_empty() {
                select
                    name="value"
                    aria-label="Aggiungi azione"
                    class=(FORM_TEXT_INPUT_STYLE)
                    hx-post=(endpoint)
                    hx-trigger="change"
                    hx-target="closest td"
                    hx-swap="outerHTML"
                    hx-target-error="#alert-container"
                {
                    option value="" disabled selected { "Aggiungi azione..." }

                    @for action_type in remaining {
                        option value=(action_type.value) { (action_type.value) }
                    }
                }
            }
        }
    }
}

/// Shown in place of the table when the selected day has no transactions.
pub(super) fn empty_day_view(date: &str) -> Markup {
    html! {
        div class="flex flex-col items-center py-8"
        {
            h2 class="text-xl font-bold" { "Nessuna transazione" }
            p { "Non ci sono transazioni in dead letter per il " (date) "." }
        }
    }
}
