use std::{collections::HashSet, net::SocketAddr, str::FromStr, time::Duration};

use anyhow::Context;
use matchsync_game_api::{RateLimitConfig, RiotApiConfig, WindowConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => anyhow::bail!("Unknown log format '{other}'"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub listen_addr: SocketAddr,
    pub cors_allow: Vec<String>,
    pub request_timeout: Duration,
    pub game_api: RiotApiConfig,
    pub rate_limit: RateLimitConfig,
    pub sync_interval: Duration,
    pub sync_initial_delay: Duration,
    /// Raw HS256 secret. `None` disables authentication.
    pub jwt_secret: Option<String>,
    pub admin_users: HashSet<String>,
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            cors_allow: vec!["*".to_string()],
            request_timeout: Duration::from_millis(30_000),
            game_api: RiotApiConfig::default(),
            rate_limit: RateLimitConfig::default(),
            sync_interval: Duration::from_secs(30 * 60),
            sync_initial_delay: Duration::from_secs(60),
            jwt_secret: None,
            admin_users: HashSet::new(),
            log_format: LogFormat::Pretty,
        }
    }
}

fn var(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_var<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match var(key) {
        Some(raw) => raw
            .parse()
            .map_err(|e| anyhow::anyhow!("{e}"))
            .with_context(|| format!("Invalid {key}: '{raw}'")),
        None => Ok(default),
    }
}

fn list_var(key: &str) -> Option<Vec<String>> {
    var(key).map(|raw| {
        raw.split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    })
}

impl Config {
    /// Read `MS_*` variables, after loading `.env` if present.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let defaults = Self::default();

        let timeout_ms = parse_var("MS_REQUEST_TIMEOUT_MS", 30_000u64)?;
        let rate_limit = RateLimitConfig {
            short: WindowConfig::new(
                parse_var("MS_RATE_SHORT", defaults.rate_limit.short.capacity)?,
                Duration::from_secs(parse_var(
                    "MS_RATE_SHORT_SECS",
                    defaults.rate_limit.short.period.as_secs(),
                )?),
            ),
            long: WindowConfig::new(
                parse_var("MS_RATE_LONG", defaults.rate_limit.long.capacity)?,
                Duration::from_secs(parse_var(
                    "MS_RATE_LONG_SECS",
                    defaults.rate_limit.long.period.as_secs(),
                )?),
            ),
        };

        Ok(Self {
            listen_addr: parse_var("MS_LISTEN_ADDR", defaults.listen_addr)?,
            cors_allow: list_var("MS_CORS_ALLOW_ORIGINS").unwrap_or(defaults.cors_allow),
            request_timeout: Duration::from_millis(timeout_ms),
            game_api: RiotApiConfig {
                base_url: var("MS_GAME_API_URL").unwrap_or(defaults.game_api.base_url),
                api_key: var("MS_GAME_API_KEY").unwrap_or_default(),
                ..defaults.game_api
            },
            rate_limit,
            sync_interval: Duration::from_secs(parse_var(
                "MS_SYNC_INTERVAL_SECS",
                defaults.sync_interval.as_secs(),
            )?),
            sync_initial_delay: Duration::from_secs(parse_var(
                "MS_SYNC_INITIAL_DELAY_SECS",
                defaults.sync_initial_delay.as_secs(),
            )?),
            jwt_secret: var("MS_JWT_SECRET"),
            admin_users: list_var("MS_ADMIN_USERS")
                .unwrap_or_default()
                .into_iter()
                .collect(),
            log_format: parse_var("MS_LOG_FORMAT", defaults.log_format)?,
        })
    }
}
