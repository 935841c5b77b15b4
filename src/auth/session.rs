//! The session cookie holding the bearer token and the operator it belongs to.

use axum_extra::extract::{
    PrivateCookieJar,
    cookie::{Cookie, SameSite},
};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use crate::{Error, watchdog::UserProfile};

pub(crate) const COOKIE_SESSION: &str = "session";

/// The identity of the logged in operator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: Option<String>,
    pub name: Option<String>,
    pub surname: Option<String>,
    pub email: Option<String>,
}

impl SessionUser {
    /// The name to show in the header, falling back to the user ID or email.
    pub fn display_name(&self) -> Option<String> {
        let full_name = [self.name.as_deref(), self.surname.as_deref()]
            .into_iter()
            .flatten()
            .filter(|part| !part.trim().is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        if !full_name.is_empty() {
            return Some(full_name);
        }

        self.id.clone().or_else(|| self.email.clone())
    }

    /// Fill the gaps in `self` with the fields of `profile`.
    pub fn merge_profile(self, profile: UserProfile) -> Self {
        Self {
            id: profile.id.or(self.id),
            name: profile.name.or(self.name),
            surname: profile.surname.or(self.surname),
            email: profile.email.or(self.email),
        }
    }
}

/// A logged in session: the token to send to the watchdog backend and who it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub user: SessionUser,
    /// When the token stops being accepted, if it says so.
    #[serde(default, with = "time::serde::timestamp::option")]
    pub expires_at: Option<OffsetDateTime>,
}

impl Session {
    pub fn is_expired(&self, now: OffsetDateTime) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= now)
    }
}

/// Add the session cookie to the cookie jar.
///
/// The cookie expires with the token. Without an expiry in the token the
/// cookie lasts for the browser session.
///
/// # Errors
///
/// Returns [Error::JSONSerializationError] if the session cannot be serialized.
pub fn set_session_cookie(
    jar: PrivateCookieJar,
    session: &Session,
) -> Result<PrivateCookieJar, Error> {
    let value = serde_json::to_string(session)
        .map_err(|error| Error::JSONSerializationError(error.to_string()))?;

    let mut cookie = Cookie::build((COOKIE_SESSION, value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Strict)
        .secure(true)
        .build();

    if let Some(expires_at) = session.expires_at {
        cookie.set_expires(expires_at);
    }

    Ok(jar.add(cookie))
}

/// Get the session from the cookie jar.
///
/// # Errors
///
/// Returns [Error::SessionMissing] if there is no session cookie, it cannot be
/// decoded, or the token has expired.
pub fn get_session_from_cookies(jar: &PrivateCookieJar) -> Result<Session, Error> {
    let cookie = jar.get(COOKIE_SESSION).ok_or(Error::SessionMissing)?;
    let session: Session = serde_json::from_str(cookie.value_trimmed()).map_err(|error| {
        tracing::debug!("Could not decode session cookie: {error}");
        Error::SessionMissing
    })?;

    if session.is_expired(OffsetDateTime::now_utc()) {
        tracing::debug!("Session for {:?} has expired", session.user.id);
        return Err(Error::SessionMissing);
    }

    Ok(session)
}

/// Set the session cookie to an invalid value and set its max age to zero,
/// which should delete the cookie on the client side.
pub fn invalidate_session_cookie(jar: PrivateCookieJar) -> PrivateCookieJar {
    jar.add(
        Cookie::build((COOKIE_SESSION, "deleted"))
            .path("/")
            .expires(OffsetDateTime::UNIX_EPOCH)
            .max_age(Duration::ZERO)
            .http_only(true)
            .same_site(SameSite::Strict)
            .secure(true),
    )
}
