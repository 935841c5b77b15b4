//! Reading the bearer token issued by the watchdog authentication service.
//!
//! Tokens are decoded without checking their signature, the watchdog backend
//! verifies them on every request.

use jsonwebtoken::dangerous::insecure_decode;
use serde::Deserialize;
use time::OffsetDateTime;

use crate::{
    Error,
    auth::{Session, SessionUser},
};

const TOKEN_FRAGMENT: &str = "#token=";

/// Get the token from the fragment of a log-in redirect URL, e.g.
/// "https://example.com/auth/callback#token=abc".
///
/// `url` may also be just the fragment. Returns `None` if there is no token
/// or it is empty.
pub fn token_from_redirect_url(url: &str) -> Option<&str> {
    let (_, token) = url.split_once(TOKEN_FRAGMENT)?;
    let token = token.trim();

    (!token.is_empty()).then_some(token)
}

/// The claims the dashboard reads from a token. Everything else is ignored.
///
/// A token may carry several of the alternative names for a claim, so each
/// is read separately.
#[derive(Debug, Clone, Deserialize)]
struct Claims {
    #[serde(default)]
    uid: Option<String>,
    #[serde(default, rename = "userId")]
    user_id: Option<String>,
    #[serde(default)]
    sub: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    given_name: Option<String>,
    #[serde(default)]
    surname: Option<String>,
    #[serde(default)]
    family_name: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    exp: Option<i64>,
}

/// Decode `token` into a session for the operator it identifies.
///
/// # Errors
///
/// Returns [Error::InvalidToken] if `token` is not a JWT or its expiry is out of range.
pub fn decode_session(token: &str) -> Result<Session, Error> {
    // Any signing algorithm is accepted, the backend checks the signature.
    let claims = insecure_decode::<Claims>(token)
        .map_err(|error| Error::InvalidToken(error.to_string()))?
        .claims;

    let expires_at = claims
        .exp
        .map(OffsetDateTime::from_unix_timestamp)
        .transpose()
        .map_err(|error| Error::InvalidToken(error.to_string()))?;

    Ok(Session {
        token: token.to_owned(),
        user: SessionUser {
            id: claims.uid.or(claims.user_id).or(claims.sub),
            name: claims.name.or(claims.given_name),
            surname: claims.surname.or(claims.family_name),
            email: claims.email,
        },
        expires_at,
    })
}
