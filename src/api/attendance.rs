use actix_web::{HttpResponse, Responder, web};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;
use utoipa::IntoParams;

use crate::service::session::{CheckinRequest, CheckoutRequest};
use crate::state::AppState;

#[derive(Debug, Deserialize, IntoParams)]
pub struct HistoryQuery {
    /// Maximum number of records (default 30, max 200)
    pub limit: Option<u32>,
}

/// Check-in endpoint
#[utoipa::path(
    post,
    path = "/api/checkin",
    request_body = CheckinRequest,
    responses(
        (status = 201, description = "Checkin recorded", body = Object, example = json!({
            "message": "Checkin recorded successfully.",
            "record": {"id": 1, "userId": "u1", "checkinId": "c1", "status": "CheckedIn"}
        })),
        (status = 400, description = "Missing or malformed fields", body = Object, example = json!({
            "message": "Missing required field: checkinId"
        })),
        (status = 409, description = "User already has an open session", body = Object, example = json!({
            "message": "User already has an active check-in session"
        })),
        (status = 503, description = "Store unavailable")
    ),
    tag = "Attendance"
)]
#[instrument(name = "api_check_in", skip_all)]
pub async fn check_in(
    state: web::Data<AppState>,
    payload: web::Json<CheckinRequest>,
) -> actix_web::Result<impl Responder> {
    let record = state.sessions.check_in(payload.into_inner()).await?;

    Ok(HttpResponse::Created().json(json!({
        "message": "Checkin recorded successfully.",
        "record": record
    })))
}

/// Check-out endpoint
#[utoipa::path(
    post,
    path = "/api/checkout",
    request_body = CheckoutRequest,
    responses(
        (status = 200, description = "Checkout recorded", body = Object, example = json!({
            "message": "Checkout recorded",
            "record": {"id": 1, "userId": "u1", "checkinId": "c1", "status": "CheckedOut", "duration": 3600000}
        })),
        (status = 400, description = "Missing or malformed fields"),
        (status = 404, description = "No open session for this user/checkinId", body = Object, example = json!({
            "message": "No active checkin session found for this user/checkinId."
        })),
        (status = 503, description = "Store unavailable")
    ),
    tag = "Attendance"
)]
#[instrument(name = "api_check_out", skip_all)]
pub async fn check_out(
    state: web::Data<AppState>,
    payload: web::Json<CheckoutRequest>,
) -> actix_web::Result<impl Responder> {
    let record = state.sessions.check_out(payload.into_inner()).await?;

    Ok(HttpResponse::Ok().json(json!({
        "message": "Checkout recorded",
        "record": record
    })))
}

#[utoipa::path(
    get,
    path = "/api/status/{user_id}",
    params(
        ("user_id" = String, Path, description = "User to inspect")
    ),
    responses(
        (status = 200, description = "Current session state", body = crate::service::session::SessionStatus),
        (status = 503, description = "Store unavailable")
    ),
    tag = "Attendance"
)]
pub async fn get_status(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> actix_web::Result<impl Responder> {
    let user_id = path.into_inner();
    let status = state.sessions.get_status(&user_id).await?;
    Ok(HttpResponse::Ok().json(status))
}

#[utoipa::path(
    get,
    path = "/api/history/{user_id}",
    params(
        ("user_id" = String, Path, description = "User whose sessions to list"),
        HistoryQuery
    ),
    responses(
        (status = 200, description = "Completed sessions, newest first", body = [crate::model::attendance::AttendanceRecord]),
        (status = 503, description = "Store unavailable")
    ),
    tag = "Attendance"
)]
pub async fn get_history(
    state: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<HistoryQuery>,
) -> actix_web::Result<impl Responder> {
    let user_id = path.into_inner();
    let records = state.sessions.get_history(&user_id, query.limit).await?;
    Ok(HttpResponse::Ok().json(records))
}

/// Trigger the absentee check for the most recently completed shift
#[utoipa::path(
    get,
    path = "/api/mark-absent",
    responses(
        (status = 200, description = "Absentee check finished", body = crate::service::reconcile::ReconcileSummary),
        (status = 207, description = "Some absence records failed to insert", body = crate::service::reconcile::ReconcileSummary),
        (status = 503, description = "Roster or store unavailable")
    ),
    tag = "Attendance"
)]
pub async fn mark_absent(state: web::Data<AppState>) -> actix_web::Result<impl Responder> {
    let summary = state.reconciler.run(Utc::now()).await?;

    if summary.is_partial() {
        return Ok(HttpResponse::MultiStatus().json(summary));
    }
    Ok(HttpResponse::Ok().json(summary))
}
