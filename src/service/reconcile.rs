use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;

use super::shift::{ShiftWindow, latest_completed_shift};
use crate::config::ShiftConfig;
use crate::error::AttendanceResult;
use crate::model::attendance::{AttendanceStatus, DEFAULT_EMAIL, DEFAULT_PUNCTUALITY, HalfDayStatus, NewAttendance};
use crate::store::{AttendanceStore, Roster};

/// Deterministic checkin id of a synthesized absence, so reruns for the same
/// shift collide instead of duplicating.
pub fn absence_checkin_id(user_id: &str, shift_date: NaiveDate) -> String {
    format!("{user_id}_ABSENT_{}", shift_date.format("%Y-%m-%d"))
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileSummary {
    #[schema(value_type = String, format = "date-time")]
    pub window_start: DateTime<Utc>,
    #[schema(value_type = String, format = "date-time")]
    pub window_end: DateTime<Utc>,
    pub users_considered: usize,
    pub absentees_found: usize,
    /// Absentees that already had a record from an earlier run
    pub already_marked: usize,
    pub inserted: usize,
    pub failed: usize,
}

impl ReconcileSummary {
    fn empty(window: &ShiftWindow) -> Self {
        Self {
            window_start: window.start,
            window_end: window.end,
            users_considered: 0,
            absentees_found: 0,
            already_marked: 0,
            inserted: 0,
            failed: 0,
        }
    }

    /// Some absence records could not be written.
    pub fn is_partial(&self) -> bool {
        self.failed > 0
    }
}

/// Marks every active user without a check-in in the last completed shift as Absent.
///
/// A user who checks in after being marked absent keeps both records; the
/// job does not reconcile that case.
pub struct ReconciliationJob {
    store: Arc<dyn AttendanceStore>,
    roster: Arc<dyn Roster>,
    shift: ShiftConfig,
}

impl ReconciliationJob {
    pub fn new(store: Arc<dyn AttendanceStore>, roster: Arc<dyn Roster>, shift: ShiftConfig) -> Self {
        Self { store, roster, shift }
    }

    pub fn shift(&self) -> &ShiftConfig {
        &self.shift
    }

    #[instrument(name = "reconcile_absentees", skip(self))]
    pub async fn run(&self, now: DateTime<Utc>) -> AttendanceResult<ReconcileSummary> {
        let window = latest_completed_shift(&self.shift, now);
        self.run_window(window).await
    }

    pub async fn run_window(&self, window: ShiftWindow) -> AttendanceResult<ReconcileSummary> {
        info!(start = %window.start, end = %window.end, "Starting absentee check");
        let mut summary = ReconcileSummary::empty(&window);

        let roster = self.roster.active_users().await.inspect_err(|e| {
            error!(error = %e, "Failed to load active users");
        })?;

        // Roster may list a user twice; keep the first entry.
        let mut seen = HashSet::new();
        let roster: Vec<_> = roster
            .into_iter()
            .filter(|u| seen.insert(u.user_id.clone()))
            .collect();
        summary.users_considered = roster.len();

        if roster.is_empty() {
            info!("No active users found");
            return Ok(summary);
        }

        let attended = self
            .store
            .users_with_checkin_between(window.start, window.end)
            .await?;

        let candidates: Vec<NewAttendance> = roster
            .into_iter()
            .filter(|u| !attended.contains(&u.user_id))
            .map(|u| NewAttendance {
                checkin_id: absence_checkin_id(&u.user_id, window.start_date),
                email: u.email.unwrap_or_else(|| DEFAULT_EMAIL.to_string()),
                user_id: u.user_id,
                checkin_time: window.start,
                status: AttendanceStatus::Absent,
                punctuality_status: DEFAULT_PUNCTUALITY.to_string(),
                half_day_status: HalfDayStatus::NotApplicable,
            })
            .collect();
        summary.absentees_found = candidates.len();

        if candidates.is_empty() {
            info!(users = summary.users_considered, "No absentees found for the checked shift cycle");
            return Ok(summary);
        }

        let ids: Vec<String> = candidates.iter().map(|c| c.checkin_id.clone()).collect();
        let existing = self.store.existing_checkin_ids(&ids).await?;

        let fresh: Vec<NewAttendance> = candidates
            .into_iter()
            .filter(|c| !existing.contains(&c.checkin_id))
            .collect();
        summary.already_marked = summary.absentees_found - fresh.len();

        if fresh.is_empty() {
            info!(absentees = summary.absentees_found, "All absentees already marked for this cycle");
            return Ok(summary);
        }

        let outcome = self.store.insert_many(fresh).await;
        summary.inserted = outcome.inserted.len();
        summary.failed = outcome.failed.len();

        if summary.is_partial() {
            warn!(
                inserted = summary.inserted,
                failed = summary.failed,
                "Absentee check finished with failed records"
            );
        } else {
            info!(
                users = summary.users_considered,
                absentees = summary.absentees_found,
                inserted = summary.inserted,
                "Absentee check complete"
            );
        }

        Ok(summary)
    }
}
