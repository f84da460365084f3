use std::env;

/// Default TTL for OTP verification sessions, in seconds.
pub const DEFAULT_OTP_TTL_SECS: i64 = 5 * 60;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_path: String,
    /// Shared secret the payment gateway signs webhook bodies with.
    pub webhook_secret: String,
    /// Gateway API credentials for creating card/autopay subscriptions.
    pub gateway_key_id: String,
    pub gateway_key_secret: String,
    pub gateway_api_base: String,
    pub otp_ttl_secs: i64,
    pub dev_mode: bool,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let dev_mode = env::var("SCAMDEX_ENV")
            .map(|v| v == "dev" || v == "development")
            .unwrap_or(false);

        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port: u16 = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3000);

        Self {
            host,
            port,
            database_path: env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "scamdex.db".to_string()),
            webhook_secret: env::var("GATEWAY_WEBHOOK_SECRET")
                .unwrap_or_else(|_| "dev_webhook_secret".to_string()),
            gateway_key_id: env::var("GATEWAY_KEY_ID").unwrap_or_default(),
            gateway_key_secret: env::var("GATEWAY_KEY_SECRET").unwrap_or_default(),
            gateway_api_base: env::var("GATEWAY_API_BASE")
                .unwrap_or_else(|_| "https://api.gateway.example".to_string()),
            otp_ttl_secs: env::var("OTP_TTL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_OTP_TTL_SECS),
            dev_mode,
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
