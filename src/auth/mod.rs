//! Operator authentication, delegated to the watchdog backend.
//!
//! The bearer token issued by the backend is kept, together with the operator
//! it identifies, in an encrypted session cookie.

mod callback;
mod log_in;
mod log_out;
mod middleware;
mod redirect;
mod session;
mod token;

pub use callback::{get_auth_callback_page, post_session};
pub use log_in::{LogInState, get_log_in_page, post_log_in};
pub use log_out::get_log_out;
pub use middleware::{AuthState, auth_guard, auth_guard_hx};
pub use redirect::parse_redirect_url;
pub use session::{
    Session, SessionUser, get_session_from_cookies, invalidate_session_cookie, set_session_cookie,
};
pub use token::{decode_session, token_from_redirect_url};

#[cfg(test)]
pub(crate) use session::COOKIE_SESSION;
