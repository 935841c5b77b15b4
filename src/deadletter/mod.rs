//! The domain logic of the dashboard: action bookkeeping, chart aggregation,
//! table search and the CSV export rules.

mod actions;
mod aggregation;
mod export;
mod listing;
mod loader;

pub use actions::{ActionMap, TransactionActions, format_action};
pub use aggregation::{ChartDatum, TransactionField, aggregate_by, group_actions_by_kind};
pub use export::{ExportProfile, build_csv};
pub use listing::{SEARCHABLE_COLUMNS, SortColumn, SortOrder, TableSort, filter_and_sort};
pub use loader::{DEFAULT_MAX_CONCURRENT_REQUESTS, DayData, load_day};
