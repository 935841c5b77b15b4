//! Wire types exchanged with the watchdog backend.
//!
//! Field names follow the backend's camelCase JSON. Fields the backend may
//! omit or send as `null` are optional so that one malformed record does not
//! discard the whole page of transactions.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A dead-lettered payment transaction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// The e-commerce transaction ID, used as the key for actions.
    #[serde(default)]
    pub transaction_id: String,
    /// ISO-8601 timestamp of when the transaction entered the dead-letter queue.
    #[serde(default)]
    pub insertion_date: Option<String>,
    #[serde(default)]
    pub payment_token: Option<String>,
    #[serde(default)]
    pub payment_method_name: Option<String>,
    #[serde(default)]
    pub psp_id: Option<String>,
    #[serde(rename = "eCommerceStatus", default)]
    pub e_commerce_status: Option<String>,
    #[serde(default)]
    pub gateway_authorization_status: Option<String>,
    #[serde(default)]
    pub payment_end_to_end_id: Option<String>,
    #[serde(default)]
    pub operation_id: Option<String>,
    /// The raw dead-letter queue event.
    #[serde(default)]
    pub deadletter_transaction_details: Option<Value>,
    #[serde(rename = "eCommerceDetails", default)]
    pub e_commerce_details: Option<Value>,
    #[serde(default)]
    pub nodo_details: Option<Value>,
    #[serde(default)]
    pub npg_details: Option<Value>,
}

/// Pagination metadata returned alongside a page of transactions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub current: u64,
    pub results: u64,
    pub total: u64,
}

/// The response body of the dead-letter transaction listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeadletterResponse {
    #[serde(default)]
    pub deadletter_transactions: Vec<Transaction>,
    #[serde(default)]
    pub page: Page,
}

/// Whether an action closes the investigation of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionKind {
    Final,
    NotFinal,
    /// Any kind the backend adds later. Treated as not final.
    #[serde(other)]
    Unknown,
}

impl ActionKind {
    pub fn is_final(self) -> bool {
        matches!(self, ActionKind::Final)
    }
}

/// An entry of the remediation action catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionType {
    /// The label shown to operators, e.g. "Stornata".
    pub value: String,
    #[serde(rename = "type")]
    pub kind: ActionKind,
}

/// An audit record of an operator applying an action to a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeadletterAction {
    #[serde(default)]
    pub id: String,
    pub deadletter_transaction_id: String,
    #[serde(default)]
    pub user_id: String,
    pub action: ActionType,
    /// ISO-8601 timestamp of when the action was recorded.
    #[serde(default)]
    pub timestamp: String,
}

/// The request body for adding an action to a transaction.
#[derive(Debug, Clone, Serialize)]
pub struct NewAction<'a> {
    pub value: &'a str,
}

/// The credentials posted to the authentication endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthenticationCredential {
    pub username: String,
    pub password: String,
}

/// A successful authentication. The token is carried in the URL fragment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationOk {
    pub url_redirect: String,
}

/// The profile of the logged in operator as returned by `GET /users`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(default, alias = "userId", alias = "username")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub surname: Option<String>,
    #[serde(default, alias = "notificationEmail")]
    pub email: Option<String>,
}
