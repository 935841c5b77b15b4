//! The API endpoints URIs.
//!
//! For endpoints that take a parameter, e.g., '/api/transactions/{transaction_id}/actions',
//! use [format_endpoint].

/// The root route which redirects to the dashboard.
pub const ROOT: &str = "/";
/// The dead-letter dashboard for a selected day.
pub const DASHBOARD_VIEW: &str = "/dashboard";
/// The route for getting the log in page.
pub const LOG_IN_VIEW: &str = "/log_in";
/// The landing page of the redirect-based log-in flow, which carries the token in its fragment.
pub const AUTH_CALLBACK_VIEW: &str = "/auth/callback";
/// The page to display when an internal server error occurs.
pub const INTERNAL_ERROR_VIEW: &str = "/error";
/// The route for static files.
pub const STATIC: &str = "/static";

/// The route for logging in a user with a username and password.
pub const LOG_IN_API: &str = "/api/log_in";
/// The route that stores a token obtained by the redirect-based log-in flow.
pub const SESSION_API: &str = "/api/session";
/// The route for the client to log out the current user.
pub const LOG_OUT: &str = "/api/log_out";
/// The route to record a remediation action against a transaction.
pub const TRANSACTION_ACTIONS: &str = "/api/transactions/{transaction_id}/actions";
/// The route to download a CSV export of the selected day.
pub const EXPORT: &str = "/api/export";

/// Replace the parameter in `endpoint_path` with `id`.
///
/// A parameter is a string that starts with a left brace, followed by
/// lowercase letters or underscores, and ends with a right brace.
/// For example, in the endpoint path '/users/{user_id}', '{user_id}' is the parameter.
///
/// This function assumes that an endpoint path contains a single parameter.
/// `id` is percent-encoded so that it forms a single path segment.
///
/// If no parameter is found in `endpoint_path`, the function returns the
/// the original `endpoint_path`.
pub fn format_endpoint(endpoint_path: &str, id: &str) -> String {
    let Some(param_start) = endpoint_path.find('{') else {
        return endpoint_path.to_owned();
    };
    let param_end = endpoint_path[param_start..]
        .find('}')
        .map(|offset| param_start + offset + 1)
        .unwrap_or(endpoint_path.len());

    format!(
        "{}{}{}",
        &endpoint_path[..param_start],
        encode_path_segment(id),
        &endpoint_path[param_end..]
    )
}

fn encode_path_segment(segment: &str) -> String {
    let mut encoded = String::with_capacity(segment.len());

    for byte in segment.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                encoded.push(byte as char)
            }
            _ => encoded.push_str(&format!("%{byte:02X}")),
        }
    }

    encoded
}
