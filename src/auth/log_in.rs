//! This file defines the routes for displaying the log-in page and handling log-in requests.
//! Credentials are checked by the watchdog authentication service, which answers with a
//! redirect URL carrying the bearer token.

use axum::{
    Form,
    extract::{FromRef, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::{PrivateCookieJar, cookie::Key};
use axum_htmx::HxRedirect;
use maud::{Markup, html};
use serde::{Deserialize, Serialize};

use crate::{
    AppState, Error,
    auth::{
        Session, decode_session, invalidate_session_cookie, parse_redirect_url,
        set_session_cookie, token_from_redirect_url,
    },
    endpoints,
    html::{
        BUTTON_PRIMARY_STYLE, auth_card, base, loading_spinner, password_input, username_input,
    },
    watchdog::{AuthenticationCredential, WatchdogClient},
};

pub const EMPTY_USERNAME_ERROR_MSG: &str = "Inserisci lo username.";
pub const EMPTY_PASSWORD_ERROR_MSG: &str = "Inserisci la password.";
const INTERNAL_ERROR_MSG: &str = "An internal error occurred. Please try again later.";
pub const INVALID_TOKEN_ERROR_MSG: &str =
    "Il servizio di autenticazione non ha restituito un token valido. Riprova o contatta l'assistenza.";

/// Errors to show in the log-in form.
#[derive(Debug, Default)]
struct LogInErrors<'a> {
    username: Option<&'a str>,
    password: Option<&'a str>,
    form: Option<&'a str>,
}

fn log_in_form(username: &str, errors: LogInErrors<'_>, redirect_url: Option<&str>) -> Markup {
    html! {
        form
            hx-post=(endpoints::LOG_IN_API)
            hx-indicator="#indicator"
            hx-disabled-elt="#username, #password, #submit-button"
            hx-swap="outerHTML"
            class="space-y-4 md:space-y-6"
        {
            @if let Some(error_message) = errors.form {
                p id="log-in-error" class="text-red-500 text-base" { (error_message) }
            }

            @if let Some(redirect_url) = redirect_url {
                input type="hidden" name="redirect_url" value=(redirect_url);
            }

            (username_input(username, errors.username))
            (password_input(errors.password))

            button
                type="submit" id="submit-button" tabindex="0"
                class=(BUTTON_PRIMARY_STYLE)
            {
                span class="inline htmx-indicator" id="indicator"
                {
                    (loading_spinner())
                }
                "Accedi"
            }
        }
    }
}

/// Display the log-in page.
pub async fn get_log_in_page(Query(query): Query<RedirectQuery>) -> Response {
    let redirect_url = parse_redirect_url(query.redirect_url.as_deref(), "log-in query");
    let log_in_form = log_in_form("", LogInErrors::default(), redirect_url.as_deref());
    let content = auth_card("Accedi al tuo account", &log_in_form);
    base("Log In", &[], &content).into_response()
}

/// The state needed to perform a login.
#[derive(Debug, Clone)]
pub struct LogInState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,
    /// The client for the watchdog authentication service.
    pub watchdog: WatchdogClient,
}

impl FromRef<AppState> for LogInState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cookie_key: state.cookie_key.clone(),
            watchdog: state.watchdog.clone(),
        }
    }
}

// this impl tells `PrivateCookieJar` how to access the key from our state
impl FromRef<LogInState> for Key {
    fn from_ref(state: &LogInState) -> Self {
        state.cookie_key.clone()
    }
}

/// Handler for log-in requests via the POST method.
///
/// On a successful log-in request, the session cookie is set and the client is redirected to
/// the requested page or the dashboard.
/// Otherwise, the form is returned with an error message explaining the problem.
pub async fn post_log_in(
    State(state): State<LogInState>,
    jar: PrivateCookieJar,
    Form(user_data): Form<LogInData>,
) -> Response {
    let redirect_url = parse_redirect_url(user_data.redirect_url.as_deref(), "log-in form");
    let redirect_url = redirect_url.as_deref();
    let username = user_data.username.trim();

    if username.is_empty() || user_data.password.is_empty() {
        let errors = LogInErrors {
            username: username.is_empty().then_some(EMPTY_USERNAME_ERROR_MSG),
            password: user_data
                .password
                .is_empty()
                .then_some(EMPTY_PASSWORD_ERROR_MSG),
            form: None,
        };
        return log_in_form(username, errors, redirect_url).into_response();
    }

    let credential = AuthenticationCredential {
        username: username.to_owned(),
        password: user_data.password,
    };
    let session = match authenticate(&state.watchdog, &credential).await {
        Ok(session) => session,
        Err(error) => {
            let message = match &error {
                Error::MalformedAuthenticationRequest
                | Error::InvalidCredentials
                | Error::AuthenticationFailed(_) => {
                    tracing::warn!("Log in for {username} rejected: {error:?}");
                    error.to_string()
                }
                Error::MissingToken | Error::InvalidToken(_) => {
                    tracing::error!("Log in for {username} returned an unusable token: {error}");
                    INVALID_TOKEN_ERROR_MSG.to_owned()
                }
                _ => {
                    tracing::error!("Unhandled error while logging in {username}: {error}");
                    INTERNAL_ERROR_MSG.to_owned()
                }
            };
            let errors = LogInErrors {
                form: Some(&message),
                ..Default::default()
            };
            return log_in_form(username, errors, redirect_url).into_response();
        }
    };

    let redirect_url = redirect_url.unwrap_or(endpoints::DASHBOARD_VIEW);

    set_session_cookie(jar.clone(), &session)
        .map(|updated_jar| {
            (
                StatusCode::SEE_OTHER,
                HxRedirect(redirect_url.to_owned()),
                updated_jar,
            )
        })
        .map_err(|err| {
            tracing::error!("Error setting session cookie: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                HxRedirect(endpoints::INTERNAL_ERROR_VIEW.to_owned()),
                invalidate_session_cookie(jar),
            )
        })
        .into_response()
}

async fn authenticate(
    watchdog: &WatchdogClient,
    credential: &AuthenticationCredential,
) -> Result<Session, Error> {
    let authentication = watchdog.authenticate(credential).await?;
    let token = token_from_redirect_url(&authentication.url_redirect).ok_or(Error::MissingToken)?;

    decode_session(token)
}

#[derive(Deserialize)]
pub struct RedirectQuery {
    pub redirect_url: Option<String>,
}

/// The raw data entered by the user in the log-in form.
#[derive(Clone, Serialize, Deserialize)]
pub struct LogInData {
    /// Username entered during log-in.
    #[serde(default)]
    pub username: String,

    /// Password entered during log-in.
    #[serde(default)]
    pub password: String,

    /// Optional URL to redirect to after logging in.
    /// Only accepted from the log-in form submission.
    pub redirect_url: Option<String>,
}


#[cfg(test)]
mod log_in_tests {
    use axum::{
        Form, Router,
        body::Body,
        extract::State,
        http::{HeaderMap, Response, StatusCode, header::COOKIE},
        routing::post,
    };
    use axum_extra::extract::PrivateCookieJar;
    use axum_test::TestServer;
    use scraper::Selector;

    use crate::{
        app_state::create_cookie_key,
        auth::{COOKIE_SESSION, Session},
        endpoints,
        test_utils::{
            FakeWatchdog, TEST_TOKEN, assert_form_error_message, assert_hx_redirect,
            must_get_form, parse_html_fragment,
        },
    };

    use super::{
        EMPTY_PASSWORD_ERROR_MSG, EMPTY_USERNAME_ERROR_MSG, INVALID_TOKEN_ERROR_MSG, LogInData,
        LogInState, post_log_in,
    };

    async fn get_test_state(watchdog: FakeWatchdog) -> LogInState {
        LogInState {
            cookie_key: create_cookie_key("foobar"),
            watchdog: watchdog.spawn().await,
        }
    }

    fn log_in_data(username: &str, password: &str, redirect_url: Option<&str>) -> LogInData {
        LogInData {
            username: username.to_owned(),
            password: password.to_owned(),
            redirect_url: redirect_url.map(str::to_owned),
        }
    }

    async fn new_log_in_request(state: LogInState, log_in_form: LogInData) -> Response<Body> {
        let jar = PrivateCookieJar::new(state.cookie_key.clone());

        post_log_in(State(state), jar, Form(log_in_form)).await
    }

    #[tokio::test]
    async fn log_in_succeeds_with_valid_credentials() {
        let state = get_test_state(FakeWatchdog::default()).await;

        let response = new_log_in_request(state, log_in_data("mrossi", "hunter2", None)).await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_hx_redirect(&response, endpoints::DASHBOARD_VIEW);
    }

    #[tokio::test]
    async fn log_in_redirects_to_requested_url() {
        let state = get_test_state(FakeWatchdog::default()).await;
        let redirect_url = "/dashboard?date=2025-03-01";

        let response =
            new_log_in_request(state, log_in_data("mrossi", "hunter2", Some(redirect_url))).await;

        assert_hx_redirect(&response, redirect_url);
    }

    #[tokio::test]
    async fn log_in_falls_back_on_invalid_redirect_url() {
        let state = get_test_state(FakeWatchdog::default()).await;

        let response = new_log_in_request(
            state,
            log_in_data("mrossi", "hunter2", Some("https://example.com")),
        )
        .await;

        assert_hx_redirect(&response, endpoints::DASHBOARD_VIEW);
    }

    #[tokio::test]
    async fn log_in_stores_session_in_cookie() {
        let state = get_test_state(FakeWatchdog::default()).await;
        let key = state.cookie_key.clone();
        let app = Router::new()
            .route(endpoints::LOG_IN_API, post(post_log_in))
            .with_state(state);
        let server = TestServer::try_new(app).expect("Could not create test server.");

        let response = server
            .post(endpoints::LOG_IN_API)
            .form(&[("username", "mrossi"), ("password", "hunter2")])
            .await;

        assert_eq!(response.status_code(), StatusCode::SEE_OTHER);
        let cookie = response.cookie(COOKIE_SESSION);
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            format!("{}={}", cookie.name(), cookie.value()).parse().unwrap(),
        );
        let jar = PrivateCookieJar::from_headers(&headers, key);
        let session: Session =
            serde_json::from_str(jar.get(COOKIE_SESSION).unwrap().value()).unwrap();
        assert_eq!(session.token, TEST_TOKEN);
        assert_eq!(session.user.name.as_deref(), Some("Mario"));
    }

    #[tokio::test]
    async fn empty_fields_are_rejected_before_calling_backend() {
        // A failing backend would produce a different error if it were called.
        let state = get_test_state(FakeWatchdog::default().failing()).await;

        let response = new_log_in_request(state, log_in_data("  ", "", None)).await;

        assert_eq!(response.status(), StatusCode::OK);
        let document = parse_html_fragment(response).await;
        let errors = document
            .select(&Selector::parse("p.text-red-500").unwrap())
            .map(|p| p.text().collect::<String>())
            .collect::<Vec<_>>();
        assert_eq!(errors, [EMPTY_USERNAME_ERROR_MSG, EMPTY_PASSWORD_ERROR_MSG]);
    }

    #[tokio::test]
    async fn backend_rejections_have_distinct_messages() {
        let cases = [
            ("malformed", "Malformed request"),
            ("wrong", "Unauthorized. The credential are invalid"),
            ("broken", "Failed to fetch user"),
        ];

        for (username, want) in cases {
            let state = get_test_state(FakeWatchdog::default()).await;

            let response = new_log_in_request(state, log_in_data(username, "hunter2", None)).await;

            assert_eq!(response.status(), StatusCode::OK);
            let document = parse_html_fragment(response).await;
            let form = must_get_form(&document);
            assert_form_error_message(&form, want);
        }
    }

    #[tokio::test]
    async fn unusable_token_has_its_own_message() {
        for username in ["notoken", "badtoken"] {
            let state = get_test_state(FakeWatchdog::default()).await;

            let response = new_log_in_request(state, log_in_data(username, "hunter2", None)).await;

            assert_eq!(response.status(), StatusCode::OK, "{username}");
            assert!(response.headers().get("hx-redirect").is_none(), "{username}");
            let document = parse_html_fragment(response).await;
            let form = must_get_form(&document);
            assert_form_error_message(&form, INVALID_TOKEN_ERROR_MSG);
        }
    }

    #[tokio::test]
    async fn form_deserialises_without_redirect_url() {
        let state = get_test_state(FakeWatchdog::default()).await;
        let app = Router::new()
            .route(endpoints::LOG_IN_API, post(post_log_in))
            .with_state(state);
        let server = TestServer::try_new(app).expect("Could not create test server.");

        let response = server
            .post(endpoints::LOG_IN_API)
            .form(&[("username", "mrossi"), ("password", "hunter2")])
            .await;

        assert_ne!(response.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
