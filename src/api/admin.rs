use std::str::FromStr;

use actix_web::{HttpResponse, Responder, web};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use utoipa::IntoParams;

use super::attendance::HistoryQuery;
use crate::error::{AttendanceError, AttendanceResult};
use crate::model::attendance::{AttendanceFilter, AttendanceStatus};
use crate::state::AppState;

#[derive(Debug, Deserialize, IntoParams)]
pub struct AdminAttendanceQuery {
    /// CheckedIn, CheckedOut or Absent
    pub status: Option<String>,
    pub user_id: Option<String>,
    /// RFC 3339 lower bound on checkin time (inclusive)
    pub from: Option<String>,
    /// RFC 3339 upper bound on checkin time (inclusive)
    pub to: Option<String>,
    /// Pagination page number (start with 1)
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

fn parse_instant(raw: &str, field: &str) -> AttendanceResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| AttendanceError::InvalidInput(format!("Invalid '{field}' timestamp: {raw}")))
}

impl AdminAttendanceQuery {
    fn filter(&self) -> AttendanceResult<AttendanceFilter> {
        let status = self
            .status
            .as_deref()
            .map(|s| {
                AttendanceStatus::from_str(s.trim())
                    .map_err(|_| AttendanceError::InvalidInput(format!("Invalid status filter: {s}")))
            })
            .transpose()?;

        Ok(AttendanceFilter {
            status,
            user_id: self.user_id.clone().filter(|u| !u.trim().is_empty()),
            from: self.from.as_deref().map(|f| parse_instant(f, "from")).transpose()?,
            to: self.to.as_deref().map(|t| parse_instant(t, "to")).transpose()?,
        })
    }
}

#[utoipa::path(
    get,
    path = "/api/admin/attendance",
    params(AdminAttendanceQuery),
    responses(
        (status = 200, description = "Paginated attendance records", body = crate::service::admin::AttendancePage),
        (status = 400, description = "Malformed filter")
    ),
    tag = "Admin"
)]
pub async fn list_attendance(
    state: web::Data<AppState>,
    query: web::Query<AdminAttendanceQuery>,
) -> actix_web::Result<impl Responder> {
    let filter = query.filter()?;
    let page = state.admin.list(filter, query.page, query.per_page).await?;
    Ok(HttpResponse::Ok().json(page))
}

#[utoipa::path(
    get,
    path = "/api/admin/attendance/summary",
    params(AdminAttendanceQuery),
    responses(
        (status = 200, description = "Record counts per status", body = crate::service::admin::AttendanceSummary),
        (status = 400, description = "Malformed filter")
    ),
    tag = "Admin"
)]
pub async fn attendance_summary(
    state: web::Data<AppState>,
    query: web::Query<AdminAttendanceQuery>,
) -> actix_web::Result<impl Responder> {
    let filter = query.filter()?;
    let summary = state.admin.summary(filter).await?;
    Ok(HttpResponse::Ok().json(summary))
}

#[utoipa::path(
    get,
    path = "/api/admin/attendance/history/{user_id}",
    params(
        ("user_id" = String, Path, description = "User whose records to list"),
        HistoryQuery
    ),
    responses(
        (status = 200, description = "All records of the user, newest first", body = [crate::model::attendance::AttendanceRecord])
    ),
    tag = "Admin"
)]
pub async fn user_history(
    state: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<HistoryQuery>,
) -> actix_web::Result<impl Responder> {
    let user_id = path.into_inner();
    let records = state.sessions.get_full_history(&user_id, query.limit).await?;
    Ok(HttpResponse::Ok().json(records))
}

#[utoipa::path(
    delete,
    path = "/api/admin/attendance/{id}",
    params(
        ("id" = u64, Path, description = "Attendance record id")
    ),
    responses(
        (status = 200, description = "Successfully deleted", body = Object, example = json!({
            "message": "Successfully deleted"
        })),
        (status = 404, description = "Record not found", body = Object, example = json!({
            "message": "Attendance record 7 not found"
        }))
    ),
    tag = "Admin"
)]
pub async fn delete_attendance(
    state: web::Data<AppState>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    state.admin.delete(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(json!({
        "message": "Successfully deleted"
    })))
}
