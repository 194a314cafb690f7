use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};
use utoipa::ToSchema;

use super::duration::session_duration;
use super::shift::local_day_bounds;
use crate::config::CheckinGuard;
use crate::error::{AttendanceError, AttendanceResult};
use crate::model::attendance::{
    AttendanceRecord, AttendanceStatus, DEFAULT_EMAIL, DEFAULT_PUNCTUALITY, HalfDayStatus, NewAttendance,
};
use crate::store::AttendanceStore;
use crate::utils::keyed_lock::KeyedLock;

pub const DEFAULT_HISTORY_LIMIT: u32 = 30;
pub const MAX_HISTORY_LIMIT: u32 = 200;

/// Instant sent by clients, either epoch milliseconds or RFC 3339 text.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Timestamp {
    Millis(i64),
    Text(String),
}

impl Timestamp {
    fn to_utc(&self) -> AttendanceResult<DateTime<Utc>> {
        let parsed = match self {
            Timestamp::Millis(ms) => Utc.timestamp_millis_opt(*ms).single(),
            Timestamp::Text(s) => DateTime::parse_from_rfc3339(s.trim())
                .ok()
                .map(|dt| dt.with_timezone(&Utc)),
        };
        parsed.ok_or_else(|| AttendanceError::InvalidInput(format!("Invalid timestamp: {self:?}")))
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Timestamp::Millis(dt.timestamp_millis())
    }
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckinRequest {
    #[schema(example = "u1")]
    pub user_id: Option<String>,
    #[schema(example = "john@email.com")]
    pub email: Option<String>,
    /// Epoch milliseconds or RFC 3339
    #[schema(value_type = Option<String>, example = "2026-01-05T09:00:00Z")]
    pub timestamp: Option<Timestamp>,
    #[schema(example = "c1")]
    pub checkin_id: Option<String>,
    #[schema(example = "Late")]
    pub punctuality_status: Option<String>,
    #[schema(example = "FullDay")]
    pub half_day_status: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    #[schema(example = "u1")]
    pub user_id: Option<String>,
    #[schema(example = "c1")]
    pub checkin_id: Option<String>,
    #[schema(value_type = Option<String>, example = "2026-01-05T17:00:00Z")]
    pub timestamp: Option<Timestamp>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
    pub is_checked_in: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>, format = "date-time")]
    pub checkin_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checkin_id: Option<String>,
}

fn required(value: Option<&str>, field: &str) -> AttendanceResult<String> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(AttendanceError::InvalidInput(format!("Missing required field: {field}"))),
    }
}

fn required_timestamp(value: Option<&Timestamp>) -> AttendanceResult<DateTime<Utc>> {
    value
        .ok_or_else(|| AttendanceError::InvalidInput("Missing required field: timestamp".to_string()))?
        .to_utc()
}

fn clamp_limit(limit: Option<u32>) -> u32 {
    limit.unwrap_or(DEFAULT_HISTORY_LIMIT).clamp(1, MAX_HISTORY_LIMIT)
}

/// Check-in / check-out state machine for a single user's sessions.
///
/// Operations on the same user are serialized through a keyed lock, so the
/// "no open session" precondition and the write that follows cannot
/// interleave with another request for that user in this process. The
/// store's unique constraints catch anything that slips past across processes.
pub struct SessionService {
    store: Arc<dyn AttendanceStore>,
    locks: KeyedLock,
    guard: CheckinGuard,
    timezone: Tz,
}

impl SessionService {
    pub fn new(store: Arc<dyn AttendanceStore>, guard: CheckinGuard, timezone: Tz) -> Self {
        Self {
            store,
            locks: KeyedLock::default(),
            guard,
            timezone,
        }
    }

    #[instrument(name = "check_in", skip(self, req), fields(user_id = ?req.user_id, checkin_id = ?req.checkin_id))]
    pub async fn check_in(&self, req: CheckinRequest) -> AttendanceResult<AttendanceRecord> {
        let user_id = required(req.user_id.as_deref(), "userId")?;
        let checkin_id = required(req.checkin_id.as_deref(), "checkinId")?;
        let checkin_time = required_timestamp(req.timestamp.as_ref())?;

        let half_day_status = match req.half_day_status.as_deref().map(str::trim) {
            None | Some("") => HalfDayStatus::FullDay,
            Some(raw) => HalfDayStatus::from_str(raw).map_err(|_| {
                AttendanceError::InvalidInput(format!(
                    "Invalid halfDayStatus '{raw}', expected FullDay, HalfDay or N/A"
                ))
            })?,
        };
        let punctuality_status = req
            .punctuality_status
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| DEFAULT_PUNCTUALITY.to_string());
        let email = req
            .email
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty())
            .unwrap_or_else(|| DEFAULT_EMAIL.to_string());

        let _user_guard = self.locks.lock(&user_id).await;

        if let Some(open) = self.store.find_open_session(&user_id).await? {
            info!(open_checkin_id = %open.checkin_id, "Rejected check-in: session already open");
            return Err(AttendanceError::Conflict(
                "User already has an active check-in session".to_string(),
            ));
        }

        if self.guard == CheckinGuard::OncePerDay {
            let (day_start, day_end) = local_day_bounds(self.timezone, checkin_time);
            if self.store.has_record_between(&user_id, day_start, day_end).await? {
                info!("Rejected check-in: already recorded today");
                return Err(AttendanceError::Conflict("User already checked in today".to_string()));
            }
        }

        let record = self
            .store
            .insert(NewAttendance {
                user_id,
                email,
                checkin_id,
                checkin_time,
                status: AttendanceStatus::CheckedIn,
                punctuality_status,
                half_day_status,
            })
            .await
            .inspect_err(|e| warn!(error = %e, "Check-in insert failed"))?;

        info!(id = record.id, "Check-in recorded");
        Ok(record)
    }

    #[instrument(name = "check_out", skip(self, req), fields(user_id = ?req.user_id, checkin_id = ?req.checkin_id))]
    pub async fn check_out(&self, req: CheckoutRequest) -> AttendanceResult<AttendanceRecord> {
        let user_id = required(req.user_id.as_deref(), "userId")?;
        let checkin_id = required(req.checkin_id.as_deref(), "checkinId")?;
        let checkout_time = required_timestamp(req.timestamp.as_ref())?;

        let _user_guard = self.locks.lock(&user_id).await;

        let not_found =
            || AttendanceError::NotFound("No active checkin session found for this user/checkinId.".to_string());

        let open = self
            .store
            .find_open_session_by_checkin(&user_id, &checkin_id)
            .await?
            .ok_or_else(not_found)?;

        let duration = session_duration(Some(open.checkin_time), Some(checkout_time));
        if checkout_time < open.checkin_time {
            warn!(
                checkin_time = %open.checkin_time,
                checkout_time = %checkout_time,
                "Checkout precedes check-in, duration clamped to zero"
            );
        }

        let record = self
            .store
            .complete_checkout(open.id, checkout_time, duration)
            .await?
            .ok_or_else(not_found)?;

        info!(id = record.id, duration = ?record.duration, "Checkout recorded");
        Ok(record)
    }

    #[instrument(name = "get_status", skip(self))]
    pub async fn get_status(&self, user_id: &str) -> AttendanceResult<SessionStatus> {
        let open = self.store.find_open_session(user_id).await?;
        debug!(is_checked_in = open.is_some(), "Status resolved");

        Ok(match open {
            Some(record) => SessionStatus {
                is_checked_in: true,
                checkin_time: Some(record.checkin_time),
                checkin_id: Some(record.checkin_id),
            },
            None => SessionStatus {
                is_checked_in: false,
                checkin_time: None,
                checkin_id: None,
            },
        })
    }

    /// Completed sessions, newest first.
    #[instrument(name = "get_history", skip(self))]
    pub async fn get_history(&self, user_id: &str, limit: Option<u32>) -> AttendanceResult<Vec<AttendanceRecord>> {
        let records = self
            .store
            .history(user_id, Some(AttendanceStatus::CheckedOut), clamp_limit(limit))
            .await?;
        Ok(records)
    }

    /// Every record of the user regardless of status, newest first.
    #[instrument(name = "get_full_history", skip(self))]
    pub async fn get_full_history(
        &self,
        user_id: &str,
        limit: Option<u32>,
    ) -> AttendanceResult<Vec<AttendanceRecord>> {
        let records = self.store.history(user_id, None, clamp_limit(limit)).await?;
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_accepts_millis_and_rfc3339() {
        let ms: Timestamp = serde_json::from_str("1767603600000").unwrap();
        let text: Timestamp = serde_json::from_str("\"2026-01-05T09:00:00Z\"").unwrap();
        assert_eq!(ms.to_utc().unwrap(), text.to_utc().unwrap());
    }

    #[test]
    fn garbage_timestamp_is_invalid_input() {
        let bad = Timestamp::Text("yesterday-ish".into());
        assert!(matches!(bad.to_utc(), Err(AttendanceError::InvalidInput(_))));
    }

    #[test]
    fn history_limit_is_clamped() {
        assert_eq!(clamp_limit(None), 30);
        assert_eq!(clamp_limit(Some(0)), 1);
        assert_eq!(clamp_limit(Some(10_000)), MAX_HISTORY_LIMIT);
    }

    #[test]
    fn blank_fields_count_as_missing() {
        assert!(required(Some("   "), "userId").is_err());
        assert_eq!(required(Some(" u1 "), "userId").unwrap(), "u1");
    }
}
