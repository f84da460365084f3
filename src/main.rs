use std::sync::Arc;

use clap::Parser;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use scamdex::config::Config;
use scamdex::crypto::hash_password;
use scamdex::db::{create_pool, init_db, queries, AppState};
use scamdex::gateway::HttpGateway;
use scamdex::handlers;

#[derive(Parser, Debug)]
#[command(name = "scamdex")]
#[command(about = "Scam registry backend with UPI Pro-entitlement reconciliation")]
struct Cli {
    /// Seed the database with dev data (a test account and registry entries)
    #[arg(long)]
    seed: bool,

    /// Delete the database on exit (dev mode only, useful for fresh starts)
    #[arg(long)]
    ephemeral: bool,
}

/// Seeds dev data for local testing. Only runs in dev mode and when the
/// database is empty.
fn seed_dev_data(state: &AppState) {
    let conn = state.db.get().expect("Failed to get db connection for seeding");

    if queries::get_user_by_email(&conn, "dev@scamdex.local")
        .expect("Failed to check for seed user")
        .is_some()
    {
        tracing::info!("Database already has data, skipping seed");
        return;
    }

    let user = queries::create_user(
        &conn,
        "Dev User",
        "dev@scamdex.local",
        &hash_password("devpassword"),
    )
    .expect("Failed to create dev user");

    let seeds = [
        ("upi", "quickrefund@okpaytm", "Fake refund desk collecting UPI pins", 92, "Mumbai"),
        ("phone", "+911400223388", "Courier fee scam calls", 74, "Delhi"),
        ("url", "kyc-update-verify.example", "Phishing page mimicking a bank KYC portal", 88, "Bengaluru"),
    ];
    for (kind, identifier, description, risk, city) in seeds {
        queries::insert_scam(&conn, kind, identifier, description, risk, city)
            .expect("Failed to seed scam registry");
    }

    tracing::info!("============================================");
    tracing::info!("DEV DATA SEEDED");
    tracing::info!("Account: {} / devpassword", user.email);
    tracing::info!("Registry entries: {}", seeds.len());
    tracing::info!("============================================");
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "scamdex=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();

    if config.dev_mode {
        tracing::info!("Running in DEVELOPMENT mode");
    }

    let db_pool = create_pool(&config.database_path).expect("Failed to create database pool");
    {
        let conn = db_pool.get().expect("Failed to get connection");
        init_db(&conn).expect("Failed to initialize database");
    }

    let state = AppState {
        db: db_pool,
        gateway: Arc::new(HttpGateway::new(
            &config.gateway_api_base,
            &config.gateway_key_id,
            &config.gateway_key_secret,
        )),
        webhook_secret: config.webhook_secret.clone(),
        otp_ttl_secs: config.otp_ttl_secs,
    };

    if cli.seed {
        if !config.dev_mode {
            tracing::warn!("--seed flag ignored: not in dev mode (set SCAMDEX_ENV=dev)");
        } else {
            seed_dev_data(&state);
        }
    }

    let app = handlers::router()
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    let cleanup_on_exit = cli.ephemeral && config.dev_mode;
    let db_path = config.database_path.clone();

    if cleanup_on_exit {
        tracing::info!("EPHEMERAL MODE: database will be deleted on exit");
    }

    tracing::info!("Scamdex server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Failed to start server");

    if cleanup_on_exit {
        tracing::info!("Cleaning up ephemeral database...");
        if let Err(e) = std::fs::remove_file(&db_path) {
            tracing::warn!("Failed to remove {}: {}", db_path, e);
        }
        let _ = std::fs::remove_file(format!("{}-wal", db_path));
        let _ = std::fs::remove_file(format!("{}-shm", db_path));
    }
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    tracing::info!("Shutdown signal received, stopping server...");
}
