use std::sync::Arc;

use clap::Parser;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use keywell::config::Config;
use keywell::handlers;
use keywell::keygen::KeyGenerator;
use keywell::payments::RazorpayClient;
use keywell::service::{AppState, LicenseService};
use keywell::signature::SignatureVerifier;
use keywell::store::{LicenseStore, MemoryStore, SqliteStore};

#[derive(Parser, Debug)]
#[command(name = "keywell")]
#[command(about = "License issuance and verification backend for the Keywell desktop app")]
struct Cli {
    /// Keep license records in memory only (dev mode, lost on exit)
    #[arg(long)]
    ephemeral: bool,
}

/// Pick the license store once, at startup. SQLite when configured and
/// openable, in-memory otherwise - handlers never probe per call.
fn open_store(config: &Config, ephemeral: bool) -> Arc<dyn LicenseStore> {
    if ephemeral {
        tracing::info!("EPHEMERAL MODE: license records are kept in memory only");
        return Arc::new(MemoryStore::new());
    }

    match &config.database_path {
        Some(path) => match SqliteStore::open(path) {
            Ok(store) => {
                tracing::info!("License store: sqlite at {}", path);
                Arc::new(store)
            }
            Err(e) => {
                tracing::error!(
                    "Failed to open license database at {}: {} - falling back to in-memory store",
                    path,
                    e
                );
                Arc::new(MemoryStore::new())
            }
        },
        None => {
            tracing::warn!(
                "DATABASE_PATH not set - using in-memory license store (records are lost on restart)"
            );
            Arc::new(MemoryStore::new())
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "keywell=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env();

    if config.dev_mode {
        tracing::info!("Running in DEVELOPMENT mode");
    }

    let store = open_store(&config, cli.ephemeral);
    let service = Arc::new(LicenseService::new(
        store,
        KeyGenerator::new(&config.key_prefix),
    ));

    let verifier = Arc::new(SignatureVerifier::new(config.razorpay_key_secret.clone()));
    if !verifier.is_configured() {
        tracing::warn!(
            "RAZORPAY_KEY_SECRET not set - payment verification will reject all callbacks"
        );
    }

    let gateway = config.razorpay().map(|c| Arc::new(RazorpayClient::new(&c)));
    if gateway.is_none() {
        tracing::warn!("Razorpay credentials not set - order creation is disabled");
    }

    if config.admin_secret.is_none() {
        tracing::warn!("LICENSE_ADMIN_SECRET not set - admin license registration is disabled");
    }

    let state = AppState {
        service,
        verifier,
        gateway,
        product: config.product.clone(),
        admin_secret: config.admin_secret.clone(),
        capture_url: config.signup_webhook_url.clone(),
        http_client: reqwest::Client::new(),
    };

    // Build the application router
    let app = handlers::router(config.rate_limits)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start the server
    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Keywell server listening on {}", addr);

    // Run server with graceful shutdown
    // Use into_make_service_with_connect_info to enable IP-based rate limiting
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .expect("Failed to start server");
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    tracing::info!("Shutdown signal received, stopping server...");
}
