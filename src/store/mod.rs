pub mod mysql;

#[cfg(test)]
pub mod memory;

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::StoreError;
use crate::model::attendance::{AttendanceFilter, AttendanceRecord, AttendanceStatus, NewAttendance, StatusCount};
use crate::model::user::RosterUser;

/// Outcome of a bulk insert that tolerates per-item failures.
#[derive(Debug, Default)]
pub struct BulkInsertOutcome {
    pub inserted: Vec<AttendanceRecord>,
    pub failed: Vec<(String, StoreError)>,
}

/// Persistent collection of attendance records.
#[async_trait]
pub trait AttendanceStore: Send + Sync {
    /// Insert one record. Uniqueness violations come back as `StoreError::Duplicate`.
    async fn insert(&self, record: NewAttendance) -> Result<AttendanceRecord, StoreError>;

    /// Insert each record independently; one failure never aborts the rest.
    async fn insert_many(&self, records: Vec<NewAttendance>) -> BulkInsertOutcome;

    /// The user's CheckedIn record, if any.
    async fn find_open_session(&self, user_id: &str) -> Result<Option<AttendanceRecord>, StoreError>;

    /// The CheckedIn record matching both user and checkin id.
    async fn find_open_session_by_checkin(
        &self,
        user_id: &str,
        checkin_id: &str,
    ) -> Result<Option<AttendanceRecord>, StoreError>;

    /// Whether the user has any record with `checkin_time` in `[from, to)`.
    async fn has_record_between(
        &self,
        user_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<bool, StoreError>;

    /// Close the open session with the given record id.
    ///
    /// Returns `None` when the record is gone or no longer CheckedIn.
    async fn complete_checkout(
        &self,
        id: u64,
        checkout_time: DateTime<Utc>,
        duration: Option<i64>,
    ) -> Result<Option<AttendanceRecord>, StoreError>;

    /// Records of a user, newest `checkin_time` first.
    async fn history(
        &self,
        user_id: &str,
        status: Option<AttendanceStatus>,
        limit: u32,
    ) -> Result<Vec<AttendanceRecord>, StoreError>;

    /// Distinct user ids that actually checked in (any non-`Absent` record) with
    /// `checkin_time` in `[from, to]`.
    async fn users_with_checkin_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<HashSet<String>, StoreError>;

    /// The subset of `checkin_ids` already present in the store.
    async fn existing_checkin_ids(&self, checkin_ids: &[String]) -> Result<HashSet<String>, StoreError>;

    /// One page of records matching the filter, newest first, plus the total match count.
    async fn list(
        &self,
        filter: &AttendanceFilter,
        limit: u32,
        offset: u32,
    ) -> Result<(Vec<AttendanceRecord>, i64), StoreError>;

    async fn count_by_status(&self, filter: &AttendanceFilter) -> Result<Vec<StatusCount>, StoreError>;

    /// Point delete by record identity. Returns whether a record was removed.
    async fn delete(&self, id: u64) -> Result<bool, StoreError>;
}

/// Directory of participants expected to attend.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Roster: Send + Sync {
    async fn active_users(&self) -> Result<Vec<RosterUser>, StoreError>;
}
