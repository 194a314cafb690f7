
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::config::{CheckinGuard, Config, ShiftConfig};
use crate::service::session::{CheckinRequest, CheckoutRequest, SessionService};
use crate::store::memory::MemoryStore;

/// 2026-01-05T09:00:00Z
pub const T0: i64 = 1_767_603_600_000;
pub const HOUR_MS: i64 = 3_600_000;

pub fn at(ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ms).unwrap()
}

pub fn utc(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
}

pub fn shift(start: &str, end: &str) -> ShiftConfig {
    ShiftConfig {
        start: NaiveTime::parse_from_str(start, "%H:%M").unwrap(),
        end: NaiveTime::parse_from_str(end, "%H:%M").unwrap(),
        timezone: Tz::UTC,
        reconcile_at: NaiveTime::from_hms_opt(5, 35, 0).unwrap(),
        reconcile_enabled: false,
    }
}

pub fn test_config(guard: CheckinGuard) -> Config {
    Config {
        database_url: "mysql://unused".to_string(),
        server_addr: "127.0.0.1:0".to_string(),
        api_prefix: "/api".to_string(),
        rate_write_per_min: 60_000,
        rate_read_per_min: 60_000,
        store_timeout: Duration::from_secs(1),
        db_max_connections: 1,
        checkin_guard: guard,
        shift: shift("17:00", "05:30"),
        log_dir: "logs".to_string(),
        log_level: tracing::Level::DEBUG,
    }
}

pub fn sessions(guard: CheckinGuard) -> (Arc<MemoryStore>, SessionService) {
    let store = Arc::new(MemoryStore::new());
    let service = SessionService::new(store.clone(), guard, Tz::UTC);
    (store, service)
}

pub fn checkin(user_id: &str, checkin_id: &str, ms: i64) -> CheckinRequest {
    CheckinRequest {
        user_id: Some(user_id.to_string()),
        email: None,
        timestamp: Some(at(ms).into()),
        checkin_id: Some(checkin_id.to_string()),
        punctuality_status: Some("Late".to_string()),
        half_day_status: Some("FullDay".to_string()),
    }
}

pub fn checkout(user_id: &str, checkin_id: &str, ms: i64) -> CheckoutRequest {
    CheckoutRequest {
        user_id: Some(user_id.to_string()),
        checkin_id: Some(checkin_id.to_string()),
        timestamp: Some(at(ms).into()),
    }
}
