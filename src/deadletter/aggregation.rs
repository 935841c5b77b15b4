//! Counting transactions and actions into buckets for the pie charts.

use crate::{deadletter::actions::ActionMap, watchdog::Transaction};

/// The key used for transactions that have no value for the aggregated field.
pub const MISSING_VALUE_LABEL: &str = "null";

/// Bucket labels for [group_actions_by_kind], in display order.
pub const FINAL_LABEL: &str = "FINALE";
pub const NOT_FINAL_LABEL: &str = "NON FINALE";
pub const UNANALYZED_LABEL: &str = "NON ANALIZZATO";

/// A named count, i.e. one slice of a pie chart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartDatum {
    pub name: String,
    pub value: u64,
}

impl ChartDatum {
    pub fn new(name: impl Into<String>, value: u64) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// The transaction fields that can be aggregated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionField {
    ECommerceStatus,
    GatewayAuthorizationStatus,
    PaymentMethodName,
}

impl TransactionField {
    fn value_of(self, transaction: &Transaction) -> Option<&str> {
        match self {
            TransactionField::ECommerceStatus => transaction.e_commerce_status.as_deref(),
            TransactionField::GatewayAuthorizationStatus => {
                transaction.gateway_authorization_status.as_deref()
            }
            TransactionField::PaymentMethodName => transaction.payment_method_name.as_deref(),
        }
    }
}

/// Count `transactions` by the value of `field`.
///
/// Buckets are returned in order of first occurrence. A missing value is its
/// own bucket labelled [MISSING_VALUE_LABEL]. The counts always sum to
/// `transactions.len()`.
pub fn aggregate_by(transactions: &[Transaction], field: TransactionField) -> Vec<ChartDatum> {
    let mut buckets: Vec<ChartDatum> = Vec::new();

    for transaction in transactions {
        let name = field.value_of(transaction).unwrap_or(MISSING_VALUE_LABEL);

        match buckets.iter_mut().find(|bucket| bucket.name == name) {
            Some(bucket) => bucket.value += 1,
            None => buckets.push(ChartDatum::new(name, 1)),
        }
    }

    buckets
}

/// Count the recorded actions by finality.
///
/// [FINAL_LABEL] and [NOT_FINAL_LABEL] count actions, so a transaction with
/// two actions contributes two. [UNANALYZED_LABEL] counts transactions with
/// no actions. All three buckets are always present.
pub fn group_actions_by_kind(action_map: &ActionMap) -> [ChartDatum; 3] {
    let mut final_count = 0;
    let mut not_final_count = 0;
    let mut unanalyzed_count = 0;

    for actions in action_map.values() {
        if actions.is_empty() {
            unanalyzed_count += 1;
            continue;
        }

        for action in actions.iter() {
            if action.action.kind.is_final() {
                final_count += 1;
            } else {
                not_final_count += 1;
            }
        }
    }

    [
        ChartDatum::new(FINAL_LABEL, final_count),
        ChartDatum::new(NOT_FINAL_LABEL, not_final_count),
        ChartDatum::new(UNANALYZED_LABEL, unanalyzed_count),
    ]
}
