use crate::model::attendance::{AttendanceRecord, AttendanceStatus, HalfDayStatus, StatusCount};
use crate::service::admin::{AttendancePage, AttendanceSummary};
use crate::service::reconcile::ReconcileSummary;
use crate::service::session::{CheckinRequest, CheckoutRequest, SessionStatus};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Attendance API",
        version = "1.0.0",
        description = r#"
## Employee Attendance Tracking

Records check-in / check-out events, reports live status and per-user history,
and marks absentees after each shift.

### Key Features
- **Sessions**
  - One open session per user; checkout computes the session duration
- **Absentee reconciliation**
  - Runs daily after the configured shift ends, and on demand via `/mark-absent`
  - Reruns for the same shift never duplicate Absent records
- **Admin**
  - Filtered listing, per-status summary and point deletion of records

### Response Format
- JSON bodies; errors are `{"message": "..."}`
- 400 invalid input, 404 no matching session/record, 409 conflicting check-in,
  503 store temporarily unavailable
"#,
    ),
    paths(
        crate::api::attendance::check_in,
        crate::api::attendance::check_out,
        crate::api::attendance::get_status,
        crate::api::attendance::get_history,
        crate::api::attendance::mark_absent,

        crate::api::admin::list_attendance,
        crate::api::admin::attendance_summary,
        crate::api::admin::user_history,
        crate::api::admin::delete_attendance
    ),
    components(
        schemas(
            AttendanceRecord,
            AttendanceStatus,
            HalfDayStatus,
            StatusCount,
            CheckinRequest,
            CheckoutRequest,
            SessionStatus,
            ReconcileSummary,
            AttendancePage,
            AttendanceSummary
        )
    ),
    tags(
        (name = "Attendance", description = "Check-in, check-out, status and history"),
        (name = "Admin", description = "Attendance administration"),
    )
)]
pub struct ApiDoc;
