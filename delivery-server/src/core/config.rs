use chrono::NaiveTime;
use chrono_tz::Tz;

/// Default daily generation time (business timezone)
fn default_generation_time() -> NaiveTime {
    NaiveTime::from_hms_opt(5, 0, 0).unwrap_or(NaiveTime::MIN)
}

/// Server configuration
///
/// # Environment variables
///
/// | Variable | Default | Description |
/// |----------|---------|-------------|
/// | DATABASE_PATH | delivery.db | SQLite file |
/// | BUSINESS_TIMEZONE | Europe/Madrid | Timezone of the business calendar day |
/// | GENERATION_TIME | 05:00 | Daily generation time (HH:MM) |
/// | DB_ACQUIRE_TIMEOUT_MS | 5000 | Pool acquire timeout |
/// | DB_BUSY_TIMEOUT_MS | 5000 | SQLite busy timeout |
/// | DB_MAX_CONNECTIONS | 5 | Pool size |
/// | NOTIFY_BUFFER_SIZE | 256 | Notification queue capacity |
/// | ENABLE_SCHEDULER | true | Run the daily generation scheduler |
/// | ENVIRONMENT | development | Runtime environment |
///
/// # Example
///
/// ```ignore
/// DATABASE_PATH=/data/delivery.db GENERATION_TIME=04:30 cargo run
/// ```
///
/// Logging is configured separately by [`LogConfig`] so the logger is up
/// before this reports fallbacks.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_path: String,
    /// Timezone the business calendar day is evaluated in
    pub timezone: Tz,
    /// When the scheduler fires each day
    pub generation_time: NaiveTime,
    pub db_acquire_timeout_ms: u64,
    pub db_busy_timeout_ms: u64,
    pub db_max_connections: u32,
    pub notify_buffer_size: usize,
    pub enable_scheduler: bool,
    /// development | staging | production
    pub environment: String,
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Unset or unparsable values fall back to defaults.
    pub fn from_env() -> Self {
        let timezone = std::env::var("BUSINESS_TIMEZONE")
            .ok()
            .and_then(|tz| match tz.parse::<Tz>() {
                Ok(tz) => Some(tz),
                Err(e) => {
                    tracing::warn!("Invalid BUSINESS_TIMEZONE '{}': {}, using Europe/Madrid", tz, e);
                    None
                }
            })
            .unwrap_or(chrono_tz::Europe::Madrid);

        let generation_time = std::env::var("GENERATION_TIME")
            .ok()
            .map(|t| crate::utils::time::parse_hhmm(&t, default_generation_time()))
            .unwrap_or_else(default_generation_time);

        Self {
            database_path: std::env::var("DATABASE_PATH").unwrap_or_else(|_| "delivery.db".into()),
            timezone,
            generation_time,
            db_acquire_timeout_ms: std::env::var("DB_ACQUIRE_TIMEOUT_MS")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(5000),
            db_busy_timeout_ms: std::env::var("DB_BUSY_TIMEOUT_MS")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(5000),
            db_max_connections: std::env::var("DB_MAX_CONNECTIONS")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(5),
            notify_buffer_size: std::env::var("NOTIFY_BUFFER_SIZE")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(256),
            enable_scheduler: std::env::var("ENABLE_SCHEDULER")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(true),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
        }
    }

    /// Environment config pointed at another database file
    ///
    /// Commonly used in tests
    pub fn with_database_path(database_path: impl Into<String>) -> Self {
        let mut config = Self::from_env();
        config.database_path = database_path.into();
        config
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

/// Logger settings, read before anything else logs
///
/// | Variable | Default | Description |
/// |----------|---------|-------------|
/// | LOG_LEVEL | info | Log level |
/// | LOG_DIR | (unset) | Daily-rolling log directory |
/// | LOG_JSON | false | JSON log lines |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    pub level: String,
    pub dir: Option<String>,
    pub json: bool,
}

impl LogConfig {
    pub fn from_env() -> Self {
        Self::from_vars(
            std::env::var("LOG_LEVEL").ok(),
            std::env::var("LOG_DIR").ok(),
            std::env::var("LOG_JSON").ok(),
        )
    }

    fn from_vars(level: Option<String>, dir: Option<String>, json: Option<String>) -> Self {
        Self {
            level: level.filter(|l| !l.is_empty()).unwrap_or_else(|| "info".into()),
            dir: dir.filter(|d| !d.is_empty()),
            json: json.and_then(|v| v.parse().ok()).unwrap_or(false),
        }
    }
}
