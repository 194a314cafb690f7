use std::collections::HashSet;
use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use sqlx::MySqlPool;
use tracing::{debug, error, warn};

use super::{AttendanceStore, BulkInsertOutcome, Roster};
use crate::db::LazyPool;
use crate::error::StoreError;
use crate::model::attendance::{
    AttendanceFilter, AttendanceRecord, AttendanceStatus, HalfDayStatus, NewAttendance, StatusCount,
};
use crate::model::user::RosterUser;

const RECORD_COLUMNS: &str = "id, user_id, email, checkin_id, checkin_time, checkout_time, status, \
     punctuality_status, half_day_status, duration";

/// Parallel inserts issued by `insert_many`.
const BULK_CONCURRENCY: usize = 8;
const ID_LOOKUP_CHUNK: usize = 1_000;

/// One `IN (...)` lookup per chunk, keeping each statement well under the
/// prepared-statement placeholder limit.
fn id_lookup_batches(ids: &[String]) -> impl Iterator<Item = (String, &[String])> {
    ids.chunks(ID_LOOKUP_CHUNK).map(|chunk| {
        let placeholders = vec!["?"; chunk.len()].join(", ");
        let sql = format!("SELECT checkin_id FROM attendance WHERE checkin_id IN ({placeholders})");
        (sql, chunk)
    })
}

#[derive(sqlx::FromRow)]
struct AttendanceRow {
    id: u64,
    user_id: String,
    email: String,
    checkin_id: String,
    checkin_time: DateTime<Utc>,
    checkout_time: Option<DateTime<Utc>>,
    status: String,
    punctuality_status: String,
    half_day_status: String,
    duration: Option<i64>,
}

impl TryFrom<AttendanceRow> for AttendanceRecord {
    type Error = StoreError;

    fn try_from(row: AttendanceRow) -> Result<Self, Self::Error> {
        let status = AttendanceStatus::from_str(&row.status)
            .map_err(|_| StoreError::Corrupt(format!("record {} has status '{}'", row.id, row.status)))?;
        let half_day_status = HalfDayStatus::from_str(&row.half_day_status).map_err(|_| {
            StoreError::Corrupt(format!(
                "record {} has half day status '{}'",
                row.id, row.half_day_status
            ))
        })?;

        Ok(AttendanceRecord {
            id: row.id,
            user_id: row.user_id,
            email: row.email,
            checkin_id: row.checkin_id,
            checkin_time: row.checkin_time,
            checkout_time: row.checkout_time,
            status,
            punctuality_status: row.punctuality_status,
            half_day_status,
            duration: row.duration,
        })
    }
}

fn into_records(rows: Vec<AttendanceRow>) -> Result<Vec<AttendanceRecord>, StoreError> {
    rows.into_iter().map(AttendanceRecord::try_from).collect()
}

// Typed values for dynamically built WHERE clauses
enum FilterValue {
    Str(String),
    Time(DateTime<Utc>),
}

fn build_where(filter: &AttendanceFilter) -> (String, Vec<FilterValue>) {
    let mut conditions = Vec::new();
    let mut bindings = Vec::new();

    if let Some(status) = filter.status {
        conditions.push("status = ?");
        bindings.push(FilterValue::Str(status.to_string()));
    }
    if let Some(user_id) = &filter.user_id {
        conditions.push("user_id = ?");
        bindings.push(FilterValue::Str(user_id.clone()));
    }
    if let Some(from) = filter.from {
        conditions.push("checkin_time >= ?");
        bindings.push(FilterValue::Time(from));
    }
    if let Some(to) = filter.to {
        conditions.push("checkin_time <= ?");
        bindings.push(FilterValue::Time(to));
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };
    (where_clause, bindings)
}

macro_rules! bind_all {
    ($query:expr, $bindings:expr) => {{
        let mut q = $query;
        for b in $bindings {
            q = match b {
                FilterValue::Str(v) => q.bind(v.clone()),
                FilterValue::Time(v) => q.bind(*v),
            };
        }
        q
    }};
}

/// MySQL-backed attendance store and roster.
pub struct MySqlAttendanceStore {
    db: Arc<LazyPool>,
    op_timeout: Duration,
}

impl MySqlAttendanceStore {
    pub fn new(db: Arc<LazyPool>, op_timeout: Duration) -> Self {
        Self { db, op_timeout }
    }

    async fn pool(&self) -> Result<&MySqlPool, StoreError> {
        self.bounded(self.db.get()).await
    }

    /// Bound a store future by the configured operation timeout.
    async fn bounded<T, F>(&self, fut: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        match tokio::time::timeout(self.op_timeout, fut).await {
            Ok(res) => res,
            Err(_) => {
                warn!(timeout_ms = self.op_timeout.as_millis() as u64, "Store operation timed out");
                Err(StoreError::Timeout)
            }
        }
    }

    async fn fetch_by_id(&self, pool: &MySqlPool, id: u64) -> Result<Option<AttendanceRecord>, StoreError> {
        let sql = format!("SELECT {RECORD_COLUMNS} FROM attendance WHERE id = ?");
        let row = sqlx::query_as::<_, AttendanceRow>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await?;
        row.map(AttendanceRecord::try_from).transpose()
    }
}

#[async_trait]
impl AttendanceStore for MySqlAttendanceStore {
    async fn insert(&self, record: NewAttendance) -> Result<AttendanceRecord, StoreError> {
        let pool = self.pool().await?;
        self.bounded(async {
            let result = sqlx::query(
                r#"
                INSERT INTO attendance
                    (user_id, email, checkin_id, checkin_time, status, punctuality_status, half_day_status)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&record.user_id)
            .bind(&record.email)
            .bind(&record.checkin_id)
            .bind(record.checkin_time)
            .bind(record.status.as_ref())
            .bind(&record.punctuality_status)
            .bind(record.half_day_status.as_ref())
            .execute(pool)
            .await
            .map_err(StoreError::from_write)?;

            Ok(result.last_insert_id())
        })
        .await
        .map(|id| record.into_record(id))
    }

    async fn insert_many(&self, records: Vec<NewAttendance>) -> BulkInsertOutcome {
        let mut outcome = BulkInsertOutcome::default();

        let mut results = futures::stream::iter(records)
            .map(|record| async move {
                let checkin_id = record.checkin_id.clone();
                (checkin_id, self.insert(record).await)
            })
            .buffer_unordered(BULK_CONCURRENCY);

        while let Some((checkin_id, result)) = results.next().await {
            match result {
                Ok(record) => outcome.inserted.push(record),
                Err(e) => {
                    warn!(error = %e, checkin_id = %checkin_id, "Bulk insert item failed");
                    outcome.failed.push((checkin_id, e));
                }
            }
        }

        outcome
    }

    async fn find_open_session(&self, user_id: &str) -> Result<Option<AttendanceRecord>, StoreError> {
        let pool = self.pool().await?;
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM attendance WHERE user_id = ? AND status = ? LIMIT 1"
        );
        self.bounded(async {
            let row = sqlx::query_as::<_, AttendanceRow>(&sql)
                .bind(user_id)
                .bind(AttendanceStatus::CheckedIn.as_ref())
                .fetch_optional(pool)
                .await?;
            row.map(AttendanceRecord::try_from).transpose()
        })
        .await
    }

    async fn find_open_session_by_checkin(
        &self,
        user_id: &str,
        checkin_id: &str,
    ) -> Result<Option<AttendanceRecord>, StoreError> {
        let pool = self.pool().await?;
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM attendance WHERE user_id = ? AND checkin_id = ? AND status = ?"
        );
        self.bounded(async {
            let row = sqlx::query_as::<_, AttendanceRow>(&sql)
                .bind(user_id)
                .bind(checkin_id)
                .bind(AttendanceStatus::CheckedIn.as_ref())
                .fetch_optional(pool)
                .await?;
            row.map(AttendanceRecord::try_from).transpose()
        })
        .await
    }

    async fn has_record_between(
        &self,
        user_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let pool = self.pool().await?;
        self.bounded(async {
            let found = sqlx::query_scalar::<_, i64>(
                r#"
                SELECT COUNT(*) FROM attendance
                WHERE user_id = ? AND checkin_time >= ? AND checkin_time < ?
                "#,
            )
            .bind(user_id)
            .bind(from)
            .bind(to)
            .fetch_one(pool)
            .await?;
            Ok(found > 0)
        })
        .await
    }

    async fn complete_checkout(
        &self,
        id: u64,
        checkout_time: DateTime<Utc>,
        duration: Option<i64>,
    ) -> Result<Option<AttendanceRecord>, StoreError> {
        let pool = self.pool().await?;
        self.bounded(async {
            let result = sqlx::query(
                r#"
                UPDATE attendance
                SET checkout_time = ?, status = ?, duration = ?
                WHERE id = ? AND status = ?
                "#,
            )
            .bind(checkout_time)
            .bind(AttendanceStatus::CheckedOut.as_ref())
            .bind(duration)
            .bind(id)
            .bind(AttendanceStatus::CheckedIn.as_ref())
            .execute(pool)
            .await
            .map_err(StoreError::from_write)?;

            if result.rows_affected() == 0 {
                debug!(id, "Checkout matched no open session");
                return Ok(None);
            }
            self.fetch_by_id(pool, id).await
        })
        .await
    }

    async fn history(
        &self,
        user_id: &str,
        status: Option<AttendanceStatus>,
        limit: u32,
    ) -> Result<Vec<AttendanceRecord>, StoreError> {
        let pool = self.pool().await?;
        let filter = AttendanceFilter {
            status,
            user_id: Some(user_id.to_string()),
            ..Default::default()
        };
        let (where_clause, bindings) = build_where(&filter);
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM attendance {where_clause} ORDER BY checkin_time DESC LIMIT ?"
        );

        self.bounded(async {
            let query = bind_all!(sqlx::query_as::<_, AttendanceRow>(&sql), &bindings);
            let rows = query.bind(limit).fetch_all(pool).await?;
            into_records(rows)
        })
        .await
    }

    async fn users_with_checkin_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<HashSet<String>, StoreError> {
        let pool = self.pool().await?;
        self.bounded(async {
            let ids = sqlx::query_scalar::<_, String>(
                r#"
                SELECT DISTINCT user_id FROM attendance
                WHERE checkin_time >= ? AND checkin_time <= ? AND status <> ?
                "#,
            )
            .bind(from)
            .bind(to)
            .bind(AttendanceStatus::Absent.as_ref())
            .fetch_all(pool)
            .await?;
            Ok(ids.into_iter().collect())
        })
        .await
    }

    async fn existing_checkin_ids(&self, checkin_ids: &[String]) -> Result<HashSet<String>, StoreError> {
        if checkin_ids.is_empty() {
            return Ok(HashSet::new());
        }

        let pool = self.pool().await?;
        self.bounded(async {
            let mut found = HashSet::with_capacity(checkin_ids.len());
            for (sql, chunk) in id_lookup_batches(checkin_ids) {
                let mut query = sqlx::query_scalar::<_, String>(&sql);
                for id in chunk {
                    query = query.bind(id);
                }
                found.extend(query.fetch_all(pool).await?);
            }
            Ok(found)
        })
        .await
    }

    async fn list(
        &self,
        filter: &AttendanceFilter,
        limit: u32,
        offset: u32,
    ) -> Result<(Vec<AttendanceRecord>, i64), StoreError> {
        let pool = self.pool().await?;
        let (where_clause, bindings) = build_where(filter);

        // ---------- total count ----------
        let count_sql = format!("SELECT COUNT(*) FROM attendance {where_clause}");
        // ---------- data query ----------
        let data_sql = format!(
            "SELECT {RECORD_COLUMNS} FROM attendance {where_clause} \
             ORDER BY checkin_time DESC, id DESC LIMIT ? OFFSET ?"
        );
        debug!(sql = %data_sql, limit, offset, "Listing attendance");

        self.bounded(async {
            let total = bind_all!(sqlx::query_scalar::<_, i64>(&count_sql), &bindings)
                .fetch_one(pool)
                .await
                .map_err(|e| {
                    error!(error = %e, sql = %count_sql, "Failed to count attendance");
                    StoreError::Unavailable(e)
                })?;

            let rows = bind_all!(sqlx::query_as::<_, AttendanceRow>(&data_sql), &bindings)
                .bind(limit)
                .bind(offset)
                .fetch_all(pool)
                .await
                .map_err(|e| {
                    error!(error = %e, sql = %data_sql, "Failed to fetch attendance");
                    StoreError::Unavailable(e)
                })?;

            Ok((into_records(rows)?, total))
        })
        .await
    }

    async fn count_by_status(&self, filter: &AttendanceFilter) -> Result<Vec<StatusCount>, StoreError> {
        let pool = self.pool().await?;
        let (where_clause, bindings) = build_where(filter);
        let sql = format!(
            "SELECT status, COUNT(*), CAST(COALESCE(SUM(duration), 0) AS SIGNED) \
             FROM attendance {where_clause} GROUP BY status ORDER BY status"
        );

        self.bounded(async {
            let rows = bind_all!(sqlx::query_as::<_, (String, i64, i64)>(&sql), &bindings)
                .fetch_all(pool)
                .await?;

            rows.into_iter()
                .map(|(status, count, total_duration)| {
                    let status = AttendanceStatus::from_str(&status)
                        .map_err(|_| StoreError::Corrupt(format!("unknown status '{status}'")))?;
                    Ok(StatusCount {
                        status,
                        count,
                        total_duration,
                    })
                })
                .collect()
        })
        .await
    }

    async fn delete(&self, id: u64) -> Result<bool, StoreError> {
        let pool = self.pool().await?;
        self.bounded(async {
            let result = sqlx::query("DELETE FROM attendance WHERE id = ?")
                .bind(id)
                .execute(pool)
                .await?;
            Ok(result.rows_affected() > 0)
        })
        .await
    }
}

/// Active-user directory backed by the `users` table.
pub struct MySqlRoster {
    db: Arc<LazyPool>,
    op_timeout: Duration,
}

impl MySqlRoster {
    pub fn new(db: Arc<LazyPool>, op_timeout: Duration) -> Self {
        Self { db, op_timeout }
    }
}

#[async_trait]
impl Roster for MySqlRoster {
    async fn active_users(&self) -> Result<Vec<RosterUser>, StoreError> {
        let fetch = async {
            let pool = self.db.get().await?;
            let mut stream =
                sqlx::query_as::<_, RosterUser>("SELECT user_id, email FROM users WHERE is_active = 1")
                    .fetch(pool);

            let mut users = Vec::new();
            while let Some(row) = stream.next().await {
                users.push(row?);
            }
            Ok(users)
        };

        tokio::time::timeout(self.op_timeout, fetch)
            .await
            .unwrap_or(Err(StoreError::Timeout))
    }
}
