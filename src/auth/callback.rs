//! The landing page of the redirect-based log-in flow.
//!
//! The watchdog log-in page sends the browser to `/auth/callback#token=...`.
//! The fragment never reaches the server, so the page posts it back to
//! [post_session] which stores the session cookie.

use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Response},
};
use axum_extra::extract::PrivateCookieJar;
use axum_htmx::HxRedirect;
use maud::{PreEscaped, html};
use serde::Deserialize;

use crate::{
    Error,
    auth::{
        LogInState, Session, decode_session, set_session_cookie, token_from_redirect_url,
    },
    endpoints,
    html::{auth_card, base, link, loading_spinner},
    watchdog::WatchdogClient,
};

/// Display the page that forwards the token in the URL fragment to the server.
pub async fn get_auth_callback_page() -> Response {
    let content = html! {
        form
            id="session-form"
            hx-post=(endpoints::SESSION_API)
            hx-trigger="load"
            hx-target-error="#alert-container"
            class="space-y-4"
        {
            input type="hidden" name="fragment" id="fragment";

            p class="text-gray-900 dark:text-white"
            {
                span class="text-blue-600" { (loading_spinner()) }
                "Accesso in corso..."
            }

            p class="text-sm font-light text-gray-500 dark:text-gray-400"
            {
                "Non succede nulla? "
                (link(endpoints::LOG_IN_VIEW, "Torna alla pagina di accesso"))
            }
        }

        // Runs before htmx processes the form, so the fragment is in place for the load trigger.
        script
        {
            (PreEscaped(
                "document.getElementById('fragment').value = window.location.hash;\
                history.replaceState(null, '', window.location.pathname);"
            ))
        }
    };

    base("Accesso", &[], &auth_card("Accesso", &content)).into_response()
}

/// The token forwarded by the callback page.
#[derive(Debug, Deserialize)]
pub struct SessionForm {
    /// The URL fragment of the callback page, e.g. "#token=abc".
    #[serde(default)]
    pub fragment: String,
}

/// Store the token from the callback page in the session cookie and go to the dashboard.
///
/// The operator's profile is fetched from the watchdog backend, which also checks the token.
pub async fn post_session(
    State(state): State<LogInState>,
    jar: PrivateCookieJar,
    Form(form): Form<SessionForm>,
) -> Response {
    let session = match create_session(&state.watchdog, &form.fragment).await {
        Ok(session) => session,
        Err(error) => {
            tracing::warn!("Could not create session from callback: {error}");
            return error.into_alert_response();
        }
    };

    match set_session_cookie(jar, &session) {
        Ok(jar) => (HxRedirect(endpoints::DASHBOARD_VIEW.to_owned()), jar).into_response(),
        Err(error) => error.into_alert_response(),
    }
}

async fn create_session(watchdog: &WatchdogClient, fragment: &str) -> Result<Session, Error> {
    let token = token_from_redirect_url(fragment).ok_or(Error::MissingToken)?;
    let session = decode_session(token)?;
    let profile = watchdog.fetch_user(token).await?;

    Ok(Session {
        user: session.user.merge_profile(profile),
        ..session
    })
}

#[cfg(test)]
mod tests {
    use axum::{Router, http::StatusCode, routing::post};
    use axum_test::TestServer;

    use crate::{
        app_state::create_cookie_key,
        auth::{COOKIE_SESSION, LogInState},
        endpoints,
        test_utils::{
            FakeWatchdog, TEST_TOKEN, assert_hx_endpoint, assert_valid_html, must_get_form,
            parse_html_document,
        },
    };

    use super::{get_auth_callback_page, post_session};

    async fn get_test_server(watchdog: FakeWatchdog) -> TestServer {
        let state = LogInState {
            cookie_key: create_cookie_key("foobar"),
            watchdog: watchdog.spawn().await,
        };
        let app = Router::new()
            .route(endpoints::SESSION_API, post(post_session))
            .with_state(state);

        TestServer::try_new(app).expect("Could not create test server.")
    }

    #[tokio::test]
    async fn callback_page_posts_fragment_on_load() {
        let response = get_auth_callback_page().await;

        assert_eq!(response.status(), StatusCode::OK);
        let document = parse_html_document(response).await;
        assert_valid_html(&document);
        let form = must_get_form(&document);
        assert_hx_endpoint(&form, endpoints::SESSION_API, "hx-post");
        assert_hx_endpoint(&form, "load", "hx-trigger");
    }

    #[tokio::test]
    async fn valid_fragment_sets_session_and_redirects() {
        let server = get_test_server(FakeWatchdog::default()).await;
        let fragment = format!("#token={TEST_TOKEN}");

        let response = server
            .post(endpoints::SESSION_API)
            .form(&[("fragment", fragment.as_str())])
            .await;

        response.assert_status_ok();
        assert_eq!(response.header("hx-redirect"), endpoints::DASHBOARD_VIEW);
        let cookie = response.cookie(COOKIE_SESSION);
        assert_eq!(cookie.http_only(), Some(true));
    }

    #[tokio::test]
    async fn missing_token_renders_alert() {
        let server = get_test_server(FakeWatchdog::default()).await;

        let response = server
            .post(endpoints::SESSION_API)
            .form(&[("fragment", "#token=")])
            .await;

        response.assert_status(StatusCode::UNAUTHORIZED);
        assert!(response.text().contains("role=\"alert\""));
    }

    #[tokio::test]
    async fn token_rejected_by_backend_renders_alert() {
        let server = get_test_server(FakeWatchdog::default()).await;

        let response = server
            .post(endpoints::SESSION_API)
            .form(&[("fragment", "#token=eyJhbGciOiJIUzI1NiJ9.e30.c2lnbmF0dXJl")])
            .await;

        response.assert_status(StatusCode::BAD_GATEWAY);
        assert!(response.cookies().get(COOKIE_SESSION).is_none());
    }
}
