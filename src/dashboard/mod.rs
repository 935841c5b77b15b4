//! Dashboard module
//!
//! Provides the page for reviewing the dead-letter transactions of a day:
//! charts, CSV exports and the transaction table where operators record
//! remediation actions.

mod actions;
mod charts;
mod export;
mod handlers;
mod table;

pub use actions::post_transaction_action;
pub use export::get_export;
pub use handlers::get_dashboard_page;
