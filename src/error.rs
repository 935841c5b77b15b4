//! Defines the app level error type and conversions to rendered HTML pages and alerts.
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::{alert::Alert, internal_server_error::InternalServerError, not_found::NotFoundError};

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The authentication service rejected the request body (HTTP 400).
    #[error("Malformed request")]
    MalformedAuthenticationRequest,

    /// The authentication service rejected the username and password (HTTP 401).
    #[error("Unauthorized. The credential are invalid")]
    InvalidCredentials,

    /// The authentication service failed with any other status code.
    #[error("Failed to fetch user")]
    AuthenticationFailed(u16),

    /// The redirect URL returned after authenticating did not carry a token.
    #[error("no token in the redirect URL")]
    MissingToken,

    /// The token could not be decoded as a JWT.
    ///
    /// Signatures are not checked here, the backend verifies them on every call.
    #[error("could not decode the token: {0}")]
    InvalidToken(String),

    /// The session cookie is missing, could not be decrypted, or has expired.
    #[error("no valid session in the cookie jar")]
    SessionMissing,

    /// A request to the watchdog backend could not be completed.
    ///
    /// The error string should only be logged for debugging on the server.
    #[error("the watchdog backend could not be reached: {0}")]
    BackendUnavailable(String),

    /// The watchdog backend answered with an unsuccessful status code.
    #[error("the watchdog backend responded to {endpoint} with status {status}")]
    BackendStatus {
        /// The endpoint path that was called.
        endpoint: String,
        /// The HTTP status code of the response.
        status: u16,
    },

    /// The watchdog backend sent a body that could not be decoded.
    #[error("could not decode the response from the watchdog backend: {0}")]
    InvalidResponse(String),

    /// The backend refused to record an action against the transaction with this ID.
    #[error("could not add the action to transaction {0}")]
    AddActionFailed(String),

    /// The transaction ID is blank, is a relative path segment, or holds
    /// control characters, so no backend URL can name it.
    #[error("invalid transaction ID {0:?}")]
    InvalidTransactionId(String),

    /// The action label was blank after trimming.
    #[error("the action label is empty")]
    EmptyActionLabel,

    /// A configured backend base URL could not be parsed or cannot carry a path.
    #[error("invalid backend URL {0:?}")]
    InvalidBackendUrl(String),

    /// No transaction matched the export profile with this label.
    #[error("Nessuna transazione trovata per {0}")]
    NoMatchingTransactions(String),

    /// The CSV export could not be written.
    #[error("could not write the CSV export: {0}")]
    CsvError(String),

    /// An error occurred while serializing a struct as JSON
    #[error("could not serialize as JSON: {0}")]
    JSONSerializationError(String),

    /// An error occurred while getting the local timezone from a canonical timezone string.
    #[error("invalid timezone {0}")]
    InvalidTimezoneError(String),

    /// The requested resource was not found.
    #[error("the requested resource could not be found")]
    NotFound,
}

impl From<reqwest::Error> for Error {
    fn from(value: reqwest::Error) -> Self {
        if value.is_decode() {
            Error::InvalidResponse(value.to_string())
        } else {
            Error::BackendUnavailable(value.to_string())
        }
    }
}

impl From<csv::Error> for Error {
    fn from(value: csv::Error) -> Self {
        Error::CsvError(value.to_string())
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self {
            Error::NotFound => NotFoundError.into_response(),
            Error::InvalidTimezoneError(timezone) => InternalServerError {
                description: "Invalid Timezone Settings",
                fix: &format!(
                    "Could not get local timezone \"{timezone}\". Check your server settings and \
                    ensure the timezone has been set to valid, canonical timezone string"
                ),
            }
            .into_response(),
            Error::BackendUnavailable(_) | Error::BackendStatus { .. } => InternalServerError {
                description: "Watchdog Unavailable",
                fix: "The watchdog service could not be reached. Try again later.",
            }
            .into_response(),
            // Any errors that are not handled above are not intended to be shown to the client.
            error => {
                tracing::error!("An unexpected error occurred: {}", error);
                InternalServerError::default().into_response()
            }
        }
    }
}

impl Error {
    /// Convert the error into an HTTP response with an HTML alert.
    pub fn into_alert_response(self) -> Response {
        let (status_code, alert) = match self {
            Error::NoMatchingTransactions(label) => (
                StatusCode::NOT_FOUND,
                Alert::ErrorSimple {
                    message: format!("Nessuna transazione trovata per {label}"),
                },
            ),
            Error::MissingToken | Error::InvalidToken(_) => (
                StatusCode::UNAUTHORIZED,
                Alert::Error {
                    message: "Accesso non riuscito".to_owned(),
                    details: "Il link di accesso non contiene un token valido. Accedi di nuovo."
                        .to_owned(),
                },
            ),
            Error::EmptyActionLabel => (
                StatusCode::BAD_REQUEST,
                Alert::ErrorSimple {
                    message: "Scegli un'azione prima di salvare.".to_owned(),
                },
            ),
            Error::InvalidTransactionId(transaction_id) => (
                StatusCode::BAD_REQUEST,
                Alert::Error {
                    message: "Could not add action".to_owned(),
                    details: format!("{transaction_id:?} is not a valid transaction ID."),
                },
            ),
            Error::AddActionFailed(transaction_id) => (
                StatusCode::BAD_GATEWAY,
                Alert::Error {
                    message: "Could not add action".to_owned(),
                    details: format!(
                        "The watchdog service refused the action for transaction {transaction_id}. \
                        Refresh the page and try again."
                    ),
                },
            ),
            Error::BackendUnavailable(_) | Error::BackendStatus { .. } => (
                StatusCode::BAD_GATEWAY,
                Alert::Error {
                    message: "Watchdog unavailable".to_owned(),
                    details: "The watchdog service could not be reached. Try again later."
                        .to_owned(),
                },
            ),
            Error::InvalidTimezoneError(timezone) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Alert::Error {
                    message: "Invalid Timezone Settings".to_owned(),
                    details: format!(
                        "Could not get local timezone \"{timezone}\". Check your server settings and \
                    ensure the timezone has been set to valid, canonical timezone string"
                    ),
                },
            ),
            error => {
                tracing::error!("An unexpected error occurred: {}", error);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Alert::Error {
                        message: "Something went wrong".to_owned(),
                        details:
                            "An unexpected error occurred, check the server logs for more details."
                                .to_owned(),
                    },
                )
            }
        };

        (status_code, alert.into_html()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use super::Error;

    #[test]
    fn invalid_user_input_gives_bad_request_alerts() {
        for error in [
            Error::EmptyActionLabel,
            Error::InvalidTransactionId("..".to_owned()),
        ] {
            let description = format!("{error:?}");

            let response = error.into_alert_response();

            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{description}");
        }
    }

    #[test]
    fn backend_errors_give_bad_gateway_alerts() {
        let response = Error::AddActionFailed("tx-1".to_owned()).into_alert_response();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }
}
