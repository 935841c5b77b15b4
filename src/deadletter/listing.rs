//! Searching and sorting the rows of the transaction table.
//!
//! Only the table is narrowed by a search. Charts and exports always cover
//! the whole day.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::watchdog::Transaction;

/// The table columns that rows can be sorted by, keyed by their header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortColumn {
    #[serde(rename = "transactionId")]
    TransactionId,
    #[serde(rename = "insertionDate")]
    InsertionDate,
    #[serde(rename = "paymentToken")]
    PaymentToken,
    #[serde(rename = "paymentEndToEndId")]
    PaymentEndToEndId,
    #[serde(rename = "operationId")]
    OperationId,
    #[serde(rename = "methodName")]
    MethodName,
    #[serde(rename = "pspId")]
    PspId,
    #[serde(rename = "statoEcommerce")]
    ECommerceStatus,
    #[serde(rename = "gatewayStatus")]
    GatewayStatus,
}

/// The columns a search is matched against.
pub const SEARCHABLE_COLUMNS: [SortColumn; 5] = [
    SortColumn::TransactionId,
    SortColumn::PaymentToken,
    SortColumn::PaymentEndToEndId,
    SortColumn::OperationId,
    SortColumn::MethodName,
];

impl SortColumn {
    /// Every data column in table order.
    pub const ALL: [SortColumn; 9] = [
        SortColumn::TransactionId,
        SortColumn::InsertionDate,
        SortColumn::PaymentToken,
        SortColumn::PaymentEndToEndId,
        SortColumn::OperationId,
        SortColumn::MethodName,
        SortColumn::PspId,
        SortColumn::ECommerceStatus,
        SortColumn::GatewayStatus,
    ];

    /// The column header, which is also the value used in query strings.
    pub fn key(self) -> &'static str {
        match self {
            SortColumn::TransactionId => "transactionId",
            SortColumn::InsertionDate => "insertionDate",
            SortColumn::PaymentToken => "paymentToken",
            SortColumn::PaymentEndToEndId => "paymentEndToEndId",
            SortColumn::OperationId => "operationId",
            SortColumn::MethodName => "methodName",
            SortColumn::PspId => "pspId",
            SortColumn::ECommerceStatus => "statoEcommerce",
            SortColumn::GatewayStatus => "gatewayStatus",
        }
    }

    pub fn value(self, transaction: &Transaction) -> Option<&str> {
        match self {
            SortColumn::TransactionId => Some(transaction.transaction_id.as_str()),
            SortColumn::InsertionDate => transaction.insertion_date.as_deref(),
            SortColumn::PaymentToken => transaction.payment_token.as_deref(),
            SortColumn::PaymentEndToEndId => transaction.payment_end_to_end_id.as_deref(),
            SortColumn::OperationId => transaction.operation_id.as_deref(),
            SortColumn::MethodName => transaction.payment_method_name.as_deref(),
            SortColumn::PspId => transaction.psp_id.as_deref(),
            SortColumn::ECommerceStatus => transaction.e_commerce_status.as_deref(),
            SortColumn::GatewayStatus => transaction.gateway_authorization_status.as_deref(),
        }
    }
}

/// The direction to sort a column in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Sort in order of increasing value.
    #[default]
    Asc,
    /// Sort in order of decreasing value.
    Desc,
}

impl SortOrder {
    /// The value used in query strings.
    pub fn key(self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }

    pub fn reversed(self) -> Self {
        match self {
            SortOrder::Asc => SortOrder::Desc,
            SortOrder::Desc => SortOrder::Asc,
        }
    }
}

/// How the table is currently sorted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableSort {
    pub column: SortColumn,
    pub order: SortOrder,
}

/// Whether `search` occurs, ignoring case, in any of [SEARCHABLE_COLUMNS].
///
/// A blank search matches every transaction.
pub fn matches_search(transaction: &Transaction, search: &str) -> bool {
    let search = search.trim().to_lowercase();

    if search.is_empty() {
        return true;
    }

    SEARCHABLE_COLUMNS.iter().any(|column| {
        column
            .value(transaction)
            .is_some_and(|value| value.to_lowercase().contains(&search))
    })
}

/// The rows of `transactions` that match `search`, ordered by `sort`.
///
/// Without a sort the backend's order is kept. Sorting is stable and compares
/// values as text. Missing values come last in either direction.
pub fn filter_and_sort<'a>(
    transactions: &'a [Transaction],
    search: &str,
    sort: Option<TableSort>,
) -> Vec<&'a Transaction> {
    let mut rows: Vec<&Transaction> = transactions
        .iter()
        .filter(|transaction| matches_search(transaction, search))
        .collect();

    if let Some(TableSort { column, order }) = sort {
        rows.sort_by(|a, b| compare_values(column.value(a), column.value(b), order));
    }

    rows
}

fn compare_values(a: Option<&str>, b: Option<&str>, order: SortOrder) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => match order {
            SortOrder::Asc => a.cmp(b),
            SortOrder::Desc => b.cmp(a),
        },
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
