use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

/// Placeholder stored when a check-in arrives without an email.
pub const DEFAULT_EMAIL: &str = "no-email@provided.com";
pub const DEFAULT_PUNCTUALITY: &str = "N/A";

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, Display, EnumString, AsRefStr,
)]
pub enum AttendanceStatus {
    CheckedIn,
    CheckedOut,
    Absent,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Display, EnumString, AsRefStr,
)]
pub enum HalfDayStatus {
    FullDay,
    HalfDay,
    #[serde(rename = "N/A")]
    #[strum(serialize = "N/A")]
    NotApplicable,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
#[schema(example = json!({
    "id": 42,
    "userId": "u1",
    "email": "no-email@provided.com",
    "checkinId": "c1",
    "checkinTime": "2026-01-05T09:00:00Z",
    "checkoutTime": "2026-01-05T17:00:00Z",
    "status": "CheckedOut",
    "punctualityStatus": "Not Late",
    "halfDayStatus": "FullDay",
    "duration": 28800000
}))]
pub struct AttendanceRecord {
    /// Store-assigned record identity
    pub id: u64,
    pub user_id: String,
    pub email: String,
    pub checkin_id: String,
    #[schema(value_type = String, format = "date-time")]
    pub checkin_time: DateTime<Utc>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub checkout_time: Option<DateTime<Utc>>,
    pub status: AttendanceStatus,
    pub punctuality_status: String,
    pub half_day_status: HalfDayStatus,
    /// Milliseconds, present only once checked out
    pub duration: Option<i64>,
}

/// A record about to be inserted; the store assigns `id`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAttendance {
    pub user_id: String,
    pub email: String,
    pub checkin_id: String,
    pub checkin_time: DateTime<Utc>,
    pub status: AttendanceStatus,
    pub punctuality_status: String,
    pub half_day_status: HalfDayStatus,
}

impl NewAttendance {
    pub fn into_record(self, id: u64) -> AttendanceRecord {
        AttendanceRecord {
            id,
            user_id: self.user_id,
            email: self.email,
            checkin_id: self.checkin_id,
            checkin_time: self.checkin_time,
            checkout_time: None,
            status: self.status,
            punctuality_status: self.punctuality_status,
            half_day_status: self.half_day_status,
            duration: None,
        }
    }
}

/// Filters shared by the admin listing and summary.
#[derive(Debug, Clone, Default)]
pub struct AttendanceFilter {
    pub status: Option<AttendanceStatus>,
    pub user_id: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatusCount {
    pub status: AttendanceStatus,
    pub count: i64,
    /// Sum of recorded durations in milliseconds
    pub total_duration: i64,
}
