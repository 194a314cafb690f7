use anyhow::{Context, Result, anyhow, bail};
use chrono::NaiveTime;
use chrono_tz::Tz;
use dotenvy::dotenv;
use std::{env, fmt::Display, str::FromStr, time::Duration};

/// Which business rule rejects a repeated check-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckinGuard {
    /// Reject only while the user still has an open (CheckedIn) session.
    OpenSession,
    /// Also reject when the user already has any record on the same calendar day.
    OncePerDay,
}

impl FromStr for CheckinGuard {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "open_session" => Ok(CheckinGuard::OpenSession),
            "once_per_day" => Ok(CheckinGuard::OncePerDay),
            other => Err(anyhow!(
                "unknown check-in guard '{other}', expected open_session or once_per_day"
            )),
        }
    }
}

/// Daily shift used by the absentee reconciliation.
#[derive(Debug, Clone)]
pub struct ShiftConfig {
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub timezone: Tz,
    /// Wall-clock time (in `timezone`) at which the nightly run fires.
    pub reconcile_at: NaiveTime,
    pub reconcile_enabled: bool,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub server_addr: String,
    pub api_prefix: String,

    // Rate limiting
    pub rate_write_per_min: u32,
    pub rate_read_per_min: u32,

    pub store_timeout: Duration,
    pub db_max_connections: u32,

    pub checkin_guard: CheckinGuard,
    pub shift: ShiftConfig,

    pub log_dir: String,
    pub log_level: tracing::Level,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        Ok(Self {
            server_addr: env::var("SERVER_ADDR").unwrap_or_else(|_| "0.0.0.0:5000".to_string()),
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/api".to_string()),

            rate_write_per_min: parse_or("RATE_WRITE_PER_MIN", "120")?,
            rate_read_per_min: parse_or("RATE_READ_PER_MIN", "1000")?,

            store_timeout: Duration::from_secs(parse_or("STORE_TIMEOUT_SECS", "5")?),
            db_max_connections: parse_or("DB_MAX_CONNECTIONS", "10")?,

            checkin_guard: parse_or("CHECKIN_GUARD", "open_session")?,
            shift: ShiftConfig {
                start: parse_time("SHIFT_START", "17:00")?,
                end: parse_time("SHIFT_END", "05:30")?,
                timezone: env::var("SHIFT_TIMEZONE")
                    .unwrap_or_else(|_| "UTC".to_string())
                    .parse::<Tz>()
                    .map_err(|e| anyhow!("invalid SHIFT_TIMEZONE: {e}"))?,
                reconcile_at: parse_time("RECONCILE_AT", "05:35")?,
                reconcile_enabled: parse_or("RECONCILE_ENABLED", "true")?,
            },

            log_dir: env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string()),
            log_level: parse_or("LOG_LEVEL", "DEBUG")?,
        })
    }
}

fn parse_or<T>(key: &str, default: &str) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    let raw = env::var(key).unwrap_or_else(|_| default.to_string());
    raw.trim()
        .parse()
        .map_err(|e| anyhow!("invalid {key} value '{raw}': {e}"))
}

fn parse_time(key: &str, default: &str) -> Result<NaiveTime> {
    let raw = env::var(key).unwrap_or_else(|_| default.to_string());
    match NaiveTime::parse_from_str(raw.trim(), "%H:%M") {
        Ok(t) => Ok(t),
        Err(e) => bail!("invalid {key} value '{raw}', expected HH:MM: {e}"),
    }
}
