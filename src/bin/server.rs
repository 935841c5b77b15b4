use std::{
    env, fs::OpenOptions, net::SocketAddr, path::PathBuf, process::ExitCode, sync::Arc,
    time::Duration,
};

use axum::{
    Router,
    extract::{MatchedPath, Request},
    middleware,
};
use axum_server::{Handle, tls_rustls::RustlsConfig};
use clap::Parser;
use tower_http::trace::TraceLayer;

#[cfg(debug_assertions)]
use tower_livereload::LiveReloadLayer;

use tracing_subscriber::{EnvFilter, Layer, filter, layer::SubscriberExt, util::SubscriberInitExt};

use deadletter_dashboard::{
    AppState, DEFAULT_LISTING_PAGE_SIZE, DEFAULT_MAX_CONCURRENT_REQUESTS, PaginationConfig,
    WatchdogClient, WatchdogConfig, build_router, graceful_shutdown, logging_middleware,
};

/// The web server for the dead-letter transaction dashboard.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to an SSL certificate `cert.pem` and key `key.pem`.
    #[arg(long)]
    cert_path: String,

    /// The port to serve the dashboard from.
    #[arg(short, long, default_value_t = 3000)]
    port: u16,

    /// Base URL of the watchdog dead-letter service.
    #[arg(long, env = "WATCHDOG_SERVICE_API_URL")]
    service_api_url: String,

    /// Base URL of the watchdog authentication service.
    #[arg(long, env = "WATCHDOG_AUTH_API_URL")]
    auth_api_url: String,

    /// The canonical name of the timezone to show dates in, e.g. "Europe/Rome".
    #[arg(long, env = "LOCAL_TIMEZONE", default_value = "Europe/Rome")]
    timezone: String,

    /// How many transactions to request from the backend per day.
    #[arg(long, default_value_t = DEFAULT_LISTING_PAGE_SIZE)]
    page_size: u32,

    /// How many action histories to fetch at once when loading a day.
    #[arg(long, default_value_t = DEFAULT_MAX_CONCURRENT_REQUESTS)]
    max_concurrent_requests: usize,

    /// How long to wait for the watchdog backend before giving up, in seconds.
    #[arg(long, default_value_t = 30)]
    request_timeout_secs: u64,
}

#[tokio::main]
async fn main() -> ExitCode {
    setup_logging();

    let args = Args::parse();

    let Ok(secret) = env::var("SECRET") else {
        tracing::error!("The environment variable 'SECRET' must be set");
        return ExitCode::FAILURE;
    };

    let tls_config = match RustlsConfig::from_pem_file(
        PathBuf::from(&args.cert_path).join("cert.pem"),
        PathBuf::from(&args.cert_path).join("key.pem"),
    )
    .await
    {
        Ok(config) => config,
        Err(error) => {
            tracing::error!("Could not open TLS certificates: {error}");
            return ExitCode::FAILURE;
        }
    };

    let watchdog = match WatchdogClient::new(WatchdogConfig {
        service_url: args.service_api_url,
        auth_url: args.auth_api_url,
        request_timeout: Duration::from_secs(args.request_timeout_secs),
        listing_page_size: args.page_size,
    }) {
        Ok(client) => client,
        Err(error) => {
            tracing::error!("Could not create the watchdog client: {error}");
            return ExitCode::FAILURE;
        }
    };

    let app_state = AppState::new(
        &secret,
        &args.timezone,
        PaginationConfig::default(),
        watchdog,
        args.max_concurrent_requests,
    );

    let handle = Handle::new();
    tokio::spawn(graceful_shutdown(handle.clone()));

    let router = build_router(app_state).layer(middleware::from_fn(logging_middleware));
    let router = add_tracing_layer(router);

    #[cfg(debug_assertions)]
    let router = router.layer(LiveReloadLayer::new());

    let addr = SocketAddr::from(([127, 0, 0, 1], args.port));
    tracing::info!("HTTPS server listening on {}", addr);

    if let Err(error) = axum_server::bind_rustls(addr, tls_config)
        .handle(handle)
        .serve(router.into_make_service())
        .await
    {
        tracing::error!("Server error: {error}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

fn setup_logging() {
    let stdout_log = tracing_subscriber::fmt::layer()
        .pretty()
        .with_filter(filter::LevelFilter::INFO);

    let debug_log = OpenOptions::new()
        .create(true)
        .append(true)
        .open("debug.log")
        .inspect_err(|error| {
            eprintln!("Could not create log file, logging to stdout only: {error}")
        })
        .ok()
        .map(|log_file| {
            tracing_subscriber::fmt::layer()
                .pretty()
                .with_ansi(false)
                .with_writer(Arc::new(log_file))
                .with_filter(filter::LevelFilter::DEBUG)
        });

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")))
        .with(stdout_log)
        .with(debug_log)
        .init();
}

fn add_tracing_layer(router: Router) -> Router {
    let tracing_layer = TraceLayer::new_for_http()
        .make_span_with(|req: &Request| {
            let method = req.method();
            let uri = req.uri();

            let matched_path = req
                .extensions()
                .get::<MatchedPath>()
                .map(|matched_path| matched_path.as_str());

            tracing::debug_span!("request", %method, %uri, matched_path)
        })
        // By default, `TraceLayer` will log 5xx responses but we're doing our specific
        // logging of errors so disable that
        .on_failure(());

    router.layer(tracing_layer)
}
