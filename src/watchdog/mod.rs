//! Client and wire types for the watchdog REST backend, which owns the
//! dead-letter data and operator authentication.

mod client;
mod models;

pub use client::{DEFAULT_LISTING_PAGE_SIZE, WatchdogClient, WatchdogConfig};
pub use models::{
    ActionType, AuthenticationCredential, DeadletterAction, Page, Transaction, UserProfile,
};

#[cfg(test)]
pub(crate) use models::{ActionKind, DeadletterResponse};
