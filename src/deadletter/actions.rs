//! Per-transaction remediation actions and their audit line rendering.

use std::collections::HashMap;

use time::UtcOffset;

use crate::{timezone::format_local_timestamp, watchdog::DeadletterAction};

/// The actions recorded against one transaction, keyed by action label.
///
/// Adding a label that is already present is a no-op, so the first record of
/// each label wins. Actions iterate in the order they were first added.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionActions {
    actions: Vec<DeadletterAction>,
}

impl TransactionActions {
    /// Add `action` unless an action with the same label exists.
    ///
    /// Returns whether the action was added.
    pub fn insert(&mut self, action: DeadletterAction) -> bool {
        if self.contains(&action.action.value) {
            return false;
        }

        self.actions.push(action);
        true
    }

    /// Whether an action labelled `label` has been applied.
    pub fn contains(&self, label: &str) -> bool {
        self.actions
            .iter()
            .any(|action| action.action.value == label)
    }

    pub fn iter(&self) -> impl Iterator<Item = &DeadletterAction> {
        self.actions.iter()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

impl FromIterator<DeadletterAction> for TransactionActions {
    fn from_iter<I: IntoIterator<Item = DeadletterAction>>(iter: I) -> Self {
        let mut actions = TransactionActions::default();

        for action in iter {
            actions.insert(action);
        }

        actions
    }
}

/// Maps a transaction ID to the actions recorded against it.
pub type ActionMap = HashMap<String, TransactionActions>;

/// Render `action` as an audit line: `[<user> - <local date time>] <label>`.
///
/// The date time segment is left empty when the timestamp cannot be parsed.
pub fn format_action(action: &DeadletterAction, local_offset: UtcOffset) -> String {
    let date_time = format_local_timestamp(&action.timestamp, local_offset).unwrap_or_default();

    format!(
        "[{} - {}] {}",
        action.user_id, date_time, action.action.value
    )
}
