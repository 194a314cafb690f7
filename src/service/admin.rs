use std::sync::Arc;

use serde::Serialize;
use tracing::{info, instrument};
use utoipa::ToSchema;

use crate::error::{AttendanceError, AttendanceResult};
use crate::model::attendance::{AttendanceFilter, AttendanceRecord, StatusCount};
use crate::store::AttendanceStore;

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AttendancePage {
    pub data: Vec<AttendanceRecord>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 20)]
    pub per_page: u32,
    #[schema(example = 57)]
    pub total: i64,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceSummary {
    pub total: i64,
    pub by_status: Vec<StatusCount>,
}

pub struct AdminService {
    store: Arc<dyn AttendanceStore>,
}

fn validate(filter: &AttendanceFilter) -> AttendanceResult<()> {
    if let (Some(from), Some(to)) = (filter.from, filter.to) {
        if from > to {
            return Err(AttendanceError::InvalidInput("'from' must not be after 'to'".to_string()));
        }
    }
    Ok(())
}

impl AdminService {
    pub fn new(store: Arc<dyn AttendanceStore>) -> Self {
        Self { store }
    }

    #[instrument(name = "admin_list", skip(self))]
    pub async fn list(
        &self,
        filter: AttendanceFilter,
        page: Option<u32>,
        per_page: Option<u32>,
    ) -> AttendanceResult<AttendancePage> {
        validate(&filter)?;

        let page = page.unwrap_or(1).max(1);
        let per_page = per_page.unwrap_or(20).clamp(1, 100);
        let offset = (page - 1).saturating_mul(per_page);

        let (data, total) = self.store.list(&filter, per_page, offset).await?;
        Ok(AttendancePage {
            data,
            page,
            per_page,
            total,
        })
    }

    #[instrument(name = "admin_summary", skip(self))]
    pub async fn summary(&self, filter: AttendanceFilter) -> AttendanceResult<AttendanceSummary> {
        validate(&filter)?;

        let by_status = self.store.count_by_status(&filter).await?;
        Ok(AttendanceSummary {
            total: by_status.iter().map(|c| c.count).sum(),
            by_status,
        })
    }

    #[instrument(name = "admin_delete", skip(self))]
    pub async fn delete(&self, id: u64) -> AttendanceResult<()> {
        if !self.store.delete(id).await? {
            return Err(AttendanceError::NotFound(format!("Attendance record {id} not found")));
        }
        info!(id, "Attendance record deleted");
        Ok(())
    }
}
