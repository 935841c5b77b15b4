//! The endpoint for recording a remediation action against a transaction.

use axum::{
    Extension, Form,
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use crate::{
    Error,
    auth::Session,
    dashboard::{handlers::DashboardState, table::action_cell},
    deadletter::TransactionActions,
    timezone::local_offset_or_error,
};

/// The action picked in the action cell of a transaction.
#[derive(Debug, Deserialize)]
pub struct NewActionForm {
    /// The label of the catalog action, e.g. "Stornata".
    pub value: String,
}

/// Record an action against a transaction and respond with its refreshed action cell.
pub async fn post_transaction_action(
    State(state): State<DashboardState>,
    Extension(session): Extension<Session>,
    Path(transaction_id): Path<String>,
    Form(form): Form<NewActionForm>,
) -> Response {
    let local_offset = match local_offset_or_error(&state.local_timezone) {
        Ok(offset) => offset,
        Err(error) => return error.into_alert_response(),
    };

    let value = form.value.trim();

    if value.is_empty() {
        tracing::warn!("Rejected blank action label for transaction {transaction_id}");
        return Error::EmptyActionLabel.into_alert_response();
    }

    if let Err(error) = state
        .watchdog
        .add_action(&session.token, &transaction_id, value)
        .await
    {
        return error.into_alert_response();
    }

    tracing::info!(
        "{} added action {value:?} to transaction {transaction_id}",
        session.user.id.as_deref().unwrap_or("unknown user")
    );

    let (actions, action_types) = tokio::join!(
        state.watchdog.fetch_actions(&session.token, &transaction_id),
        state.watchdog.fetch_action_types(&session.token),
    );
    let actions: TransactionActions = actions.into_iter().collect();

    action_cell(&transaction_id, &actions, &action_types, local_offset).into_response()
}
