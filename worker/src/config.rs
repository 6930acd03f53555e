use anyhow::{Context, Result, anyhow};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

#[derive(Clone)]
pub struct Config {
    pub bot_token: String,
    pub admin_user_id: i64,
    pub telegram_api_url: String,

    pub server_host: String,
    pub server_port: u16,
    pub data_dir: PathBuf,

    pub quiz_interval: Duration,
    pub send_delay: Duration,
    pub poll_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let parsed = |key: &str, default| parse_or(lookup(key), default);

        let bot_token = lookup("BOT_TOKEN")
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| anyhow!("BOT_TOKEN environment variable must be set"))?;

        let admin_user_id = lookup("ADMIN_USER_ID")
            .ok_or_else(|| anyhow!("ADMIN_USER_ID environment variable must be set"))?
            .trim()
            .parse()
            .context("ADMIN_USER_ID must be a numeric Telegram user id")?;

        let telegram_api_url = lookup("TELEGRAM_API_URL")
            .unwrap_or_else(|| "https://api.telegram.org".to_string());

        let server_host = lookup("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let server_port = parse_or(lookup("PORT"), 10000);
        let data_dir = PathBuf::from(lookup("DATA_DIR").unwrap_or_else(|| "data".to_string()));

        Ok(Self {
            bot_token,
            admin_user_id,
            telegram_api_url,
            server_host,
            server_port,
            data_dir,
            quiz_interval: Duration::from_secs(parse_nonzero_or(lookup("QUIZ_INTERVAL"), 3600)),
            send_delay: Duration::from_millis(parsed("SEND_DELAY_MS", 500)),
            poll_timeout: Duration::from_secs(parsed("POLL_TIMEOUT", 30)),
        })
    }
}

fn parse_or<T: FromStr>(value: Option<String>, default: T) -> T {
    value.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

/// A zero period would make `tokio::time::interval` panic.
fn parse_nonzero_or(value: Option<String>, default: u64) -> u64 {
    match parse_or(value, default) {
        0 => default,
        secs => secs,
    }
}
