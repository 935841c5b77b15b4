//! Loads everything the dashboard shows for one day.

use futures::{StreamExt, stream};
use time::Date;

use crate::{
    deadletter::actions::{ActionMap, TransactionActions},
    watchdog::{ActionType, Page, Transaction, WatchdogClient},
};

/// The default number of action requests allowed in flight at once.
pub const DEFAULT_MAX_CONCURRENT_REQUESTS: usize = 16;

/// The transactions of one day with their actions and the action catalog.
#[derive(Debug, Clone, Default)]
pub struct DayData {
    pub transactions: Vec<Transaction>,
    pub page: Page,
    /// Has an entry, possibly empty, for every transaction in `transactions`.
    pub action_map: ActionMap,
    pub action_types: Vec<ActionType>,
}

/// Fetch the transactions inserted on `date`, then the action history of each
/// transaction and the action catalog.
///
/// At most `max_concurrent_requests` action histories are fetched at once.
/// Failed requests are logged by the client and show up as empty data.
pub async fn load_day(
    client: &WatchdogClient,
    token: &str,
    date: Date,
    max_concurrent_requests: usize,
) -> DayData {
    let Some(response) = client.fetch_transactions(token, date).await else {
        return DayData::default();
    };

    let transactions = response.deadletter_transactions;

    if transactions.is_empty() {
        return DayData {
            page: response.page,
            ..Default::default()
        };
    }

    let (action_map, action_types) = tokio::join!(
        fetch_action_map(client, token, &transactions, max_concurrent_requests),
        client.fetch_action_types(token),
    );

    tracing::debug!(
        "Loaded {} transactions for {date} ({} total on the backend)",
        transactions.len(),
        response.page.total
    );

    DayData {
        transactions,
        page: response.page,
        action_map,
        action_types,
    }
}

async fn fetch_action_map(
    client: &WatchdogClient,
    token: &str,
    transactions: &[Transaction],
    max_concurrent_requests: usize,
) -> ActionMap {
    let transaction_ids: Vec<String> = transactions
        .iter()
        .map(|transaction| transaction.transaction_id.clone())
        .collect();

    stream::iter(transaction_ids)
        .map(move |transaction_id| async move {
            let actions: TransactionActions = client
                .fetch_actions(token, &transaction_id)
                .await
                .into_iter()
                .collect();

            (transaction_id, actions)
        })
        .buffer_unordered(max_concurrent_requests.max(1))
        .collect()
        .await
}
