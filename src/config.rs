use std::{env, time::Duration};

/// Process configuration, read once at startup. Everything comes from the
/// environment (`.env` in development).
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: String,
    pub razorpay_key_id: String,
    pub razorpay_key_secret: String,
    pub razorpay_webhook_secret: String,
    pub stripe_secret_key: String,
    pub stripe_webhook_secret: String,
    pub notification_sink_url: Option<String>,
    pub pending_count_ttl: Duration,
    pub request_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, env::VarError> {
        Ok(Self {
            database_url: env::var("DATABASE_URL")?,
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into()),
            razorpay_key_id: env::var("RAZORPAY_KEY_ID")?,
            razorpay_key_secret: env::var("RAZORPAY_KEY_SECRET")?,
            razorpay_webhook_secret: env::var("RAZORPAY_WEBHOOK_SECRET")?,
            stripe_secret_key: env::var("STRIPE_SECRET_KEY")?,
            stripe_webhook_secret: env::var("STRIPE_WEBHOOK_SECRET")?,
            notification_sink_url: env::var("NOTIFICATION_SINK_URL").ok(),
            pending_count_ttl: Duration::from_secs(parse_secs("PENDING_COUNT_TTL_SECS", 60)),
            request_timeout: Duration::from_secs(parse_secs("REQUEST_TIMEOUT_SECS", 15)),
        })
    }
}

fn parse_secs(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
