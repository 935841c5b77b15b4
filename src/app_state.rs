//! Implements a struct that holds the state of the web server.

use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;
use sha2::{Digest, Sha512};

use crate::{pagination::PaginationConfig, watchdog::WatchdogClient};

/// The state of the web server.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,

    /// The local timezone as a canonical timezone name, e.g. "Europe/Rome".
    pub local_timezone: String,

    /// The config that controls how to display pages of data.
    pub pagination_config: PaginationConfig,

    /// The client for the watchdog backend, shared so that connections are pooled.
    pub watchdog: WatchdogClient,

    /// The most action history requests to have in flight at once when loading a day.
    pub max_concurrent_requests: usize,
}

impl AppState {
    /// Create a new [AppState].
    ///
    /// `local_timezone` should be a valid, canonical timezone name, e.g. "Europe/Rome".
    pub fn new(
        cookie_secret: &str,
        local_timezone: &str,
        pagination_config: PaginationConfig,
        watchdog: WatchdogClient,
        max_concurrent_requests: usize,
    ) -> Self {
        Self {
            cookie_key: create_cookie_key(cookie_secret),
            local_timezone: local_timezone.to_owned(),
            pagination_config,
            watchdog,
            max_concurrent_requests,
        }
    }
}

// this impl tells `PrivateCookieJar` how to access the key from our state
impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}

/// Create a signing key for cookies from a `secret`s string.
pub fn create_cookie_key(secret: &str) -> Key {
    let hash = Sha512::digest(secret);

    Key::from(&hash)
}
