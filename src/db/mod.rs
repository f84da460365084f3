mod schema;
pub mod queries;

pub use schema::init_db;

use std::sync::Arc;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::gateway::SubscriptionGateway;

pub type DbPool = Pool<SqliteConnectionManager>;

/// Application state shared by all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    /// Payment gateway for card/autopay subscriptions (HTTP in production,
    /// stub in tests).
    pub gateway: Arc<dyn SubscriptionGateway>,
    /// Shared secret the gateway signs webhook bodies with.
    pub webhook_secret: String,
    pub otp_ttl_secs: i64,
}

pub fn create_pool(database_path: &str) -> Result<DbPool, r2d2::Error> {
    let manager = SqliteConnectionManager::file(database_path);
    Pool::builder().max_size(10).build(manager)
}
