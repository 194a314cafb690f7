use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, warn};

use crate::service::reconcile::ReconciliationJob;
use crate::service::shift::next_run_after;

/// Runs the absentee reconciliation once a day at the configured wall-clock time.
///
/// Never returns; a failed run is logged and the next one is armed as usual.
pub async fn run_daily(job: Arc<ReconciliationJob>) {
    let shift = job.shift().clone();

    loop {
        let now = Utc::now();
        let target = next_run_after(shift.timezone, shift.reconcile_at, now);
        let wait = (target - now).to_std().unwrap_or_default();

        info!(
            target = %target,
            in_minutes = wait.as_secs() / 60,
            "Absentee check scheduled"
        );
        tokio::time::sleep(wait).await;

        info!("Running daily absentee check");
        match job.run(Utc::now()).await {
            Ok(summary) if summary.is_partial() => {
                warn!(failed = summary.failed, inserted = summary.inserted, "Daily absentee check partially failed")
            }
            Ok(summary) => info!(inserted = summary.inserted, "Daily absentee check finished"),
            Err(e) => error!(error = %e, "Daily absentee check failed"),
        }
    }
}
