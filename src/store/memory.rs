use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{AttendanceStore, BulkInsertOutcome};
use crate::error::StoreError;
use crate::model::attendance::{AttendanceFilter, AttendanceRecord, AttendanceStatus, NewAttendance, StatusCount};

fn matches(filter: &AttendanceFilter, record: &AttendanceRecord) -> bool {
    filter.status.is_none_or(|s| record.status == s)
        && filter.user_id.as_deref().is_none_or(|u| record.user_id == u)
        && filter.from.is_none_or(|f| record.checkin_time >= f)
        && filter.to.is_none_or(|t| record.checkin_time <= t)
}

#[derive(Default)]
struct Inner {
    records: Vec<AttendanceRecord>,
    next_id: u64,
}

/// In-process store with the same uniqueness rules as the MySQL schema.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
    rejected: Mutex<HashSet<String>>,
    offline: Mutex<bool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every insert of these checkin ids fail as if a concurrent writer won.
    pub fn reject_checkin_ids(&self, ids: &[&str]) {
        let mut rejected = self.rejected.lock().unwrap();
        rejected.extend(ids.iter().map(|s| s.to_string()));
    }

    /// Fail every operation with a timeout.
    pub fn set_offline(&self, offline: bool) {
        *self.offline.lock().unwrap() = offline;
    }

    pub fn records(&self) -> Vec<AttendanceRecord> {
        self.inner.lock().unwrap().records.clone()
    }

    fn check_online(&self) -> Result<(), StoreError> {
        if *self.offline.lock().unwrap() {
            return Err(StoreError::Timeout);
        }
        Ok(())
    }

    fn sorted_newest_first(mut records: Vec<AttendanceRecord>) -> Vec<AttendanceRecord> {
        records.sort_by(|a, b| b.checkin_time.cmp(&a.checkin_time).then(b.id.cmp(&a.id)));
        records
    }
}

#[async_trait]
impl AttendanceStore for MemoryStore {
    async fn insert(&self, record: NewAttendance) -> Result<AttendanceRecord, StoreError> {
        self.check_online()?;
        if self.rejected.lock().unwrap().contains(&record.checkin_id) {
            return Err(StoreError::Duplicate(format!("uq_checkin_id: {}", record.checkin_id)));
        }

        let mut inner = self.inner.lock().unwrap();
        if inner.records.iter().any(|r| r.checkin_id == record.checkin_id) {
            return Err(StoreError::Duplicate(format!("uq_checkin_id: {}", record.checkin_id)));
        }
        if record.status == AttendanceStatus::CheckedIn
            && inner
                .records
                .iter()
                .any(|r| r.user_id == record.user_id && r.status == AttendanceStatus::CheckedIn)
        {
            return Err(StoreError::Duplicate(format!("uq_active_user: {}", record.user_id)));
        }

        inner.next_id += 1;
        let stored = record.into_record(inner.next_id);
        inner.records.push(stored.clone());
        Ok(stored)
    }

    async fn insert_many(&self, records: Vec<NewAttendance>) -> BulkInsertOutcome {
        let mut outcome = BulkInsertOutcome::default();
        for record in records {
            let checkin_id = record.checkin_id.clone();
            match self.insert(record).await {
                Ok(r) => outcome.inserted.push(r),
                Err(e) => outcome.failed.push((checkin_id, e)),
            }
        }
        outcome
    }

    async fn find_open_session(&self, user_id: &str) -> Result<Option<AttendanceRecord>, StoreError> {
        self.check_online()?;
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .records
            .iter()
            .find(|r| r.user_id == user_id && r.status == AttendanceStatus::CheckedIn)
            .cloned())
    }

    async fn find_open_session_by_checkin(
        &self,
        user_id: &str,
        checkin_id: &str,
    ) -> Result<Option<AttendanceRecord>, StoreError> {
        self.check_online()?;
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .records
            .iter()
            .find(|r| {
                r.user_id == user_id && r.checkin_id == checkin_id && r.status == AttendanceStatus::CheckedIn
            })
            .cloned())
    }

    async fn has_record_between(
        &self,
        user_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        self.check_online()?;
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .records
            .iter()
            .any(|r| r.user_id == user_id && r.checkin_time >= from && r.checkin_time < to))
    }

    async fn complete_checkout(
        &self,
        id: u64,
        checkout_time: DateTime<Utc>,
        duration: Option<i64>,
    ) -> Result<Option<AttendanceRecord>, StoreError> {
        self.check_online()?;
        let mut inner = self.inner.lock().unwrap();
        let Some(record) = inner
            .records
            .iter_mut()
            .find(|r| r.id == id && r.status == AttendanceStatus::CheckedIn)
        else {
            return Ok(None);
        };

        record.checkout_time = Some(checkout_time);
        record.status = AttendanceStatus::CheckedOut;
        record.duration = duration;
        Ok(Some(record.clone()))
    }

    async fn history(
        &self,
        user_id: &str,
        status: Option<AttendanceStatus>,
        limit: u32,
    ) -> Result<Vec<AttendanceRecord>, StoreError> {
        self.check_online()?;
        let matching: Vec<_> = {
            let inner = self.inner.lock().unwrap();
            inner
                .records
                .iter()
                .filter(|r| r.user_id == user_id && status.is_none_or(|s| r.status == s))
                .cloned()
                .collect()
        };
        let mut sorted = Self::sorted_newest_first(matching);
        sorted.truncate(limit as usize);
        Ok(sorted)
    }

    async fn users_with_checkin_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<HashSet<String>, StoreError> {
        self.check_online()?;
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .records
            .iter()
            .filter(|r| r.status != AttendanceStatus::Absent)
            .filter(|r| r.checkin_time >= from && r.checkin_time <= to)
            .map(|r| r.user_id.clone())
            .collect())
    }

    async fn existing_checkin_ids(&self, checkin_ids: &[String]) -> Result<HashSet<String>, StoreError> {
        self.check_online()?;
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .records
            .iter()
            .filter(|r| checkin_ids.contains(&r.checkin_id))
            .map(|r| r.checkin_id.clone())
            .collect())
    }

    async fn list(
        &self,
        filter: &AttendanceFilter,
        limit: u32,
        offset: u32,
    ) -> Result<(Vec<AttendanceRecord>, i64), StoreError> {
        self.check_online()?;
        let matching: Vec<_> = {
            let inner = self.inner.lock().unwrap();
            inner.records.iter().filter(|r| matches(filter, r)).cloned().collect()
        };
        let total = matching.len() as i64;
        let page = Self::sorted_newest_first(matching)
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect();
        Ok((page, total))
    }

    async fn count_by_status(&self, filter: &AttendanceFilter) -> Result<Vec<StatusCount>, StoreError> {
        self.check_online()?;
        let inner = self.inner.lock().unwrap();
        let mut counts: Vec<StatusCount> = Vec::new();
        for record in inner.records.iter().filter(|r| matches(filter, r)) {
            match counts.iter_mut().find(|c| c.status == record.status) {
                Some(c) => {
                    c.count += 1;
                    c.total_duration += record.duration.unwrap_or(0);
                }
                None => counts.push(StatusCount {
                    status: record.status,
                    count: 1,
                    total_duration: record.duration.unwrap_or(0),
                }),
            }
        }
        counts.sort_by_key(|c| c.status.to_string());
        Ok(counts)
    }

    async fn delete(&self, id: u64) -> Result<bool, StoreError> {
        self.check_online()?;
        let mut inner = self.inner.lock().unwrap();
        let before = inner.records.len();
        inner.records.retain(|r| r.id != id);
        Ok(inner.records.len() < before)
    }
}
