use crate::{
    api::{admin, attendance},
    config::Config,
    error::AttendanceError,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{Error, web};
use std::fmt::Display;
use std::sync::Arc;

// Helper to build per-route limiter
fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
    let requests_per_min = requests_per_min.max(1);
    let per_ms = (60_000 / requests_per_min as u64).max(1);
    let cfg = GovernorConfigBuilder::default()
        .per_millisecond(per_ms)
        .burst_size(requests_per_min)
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .expect("non-zero rate limiter period and burst");
    Governor::new(&cfg)
}

// Extractor failures answer with the same JSON body as service errors
fn invalid_input(err: impl Display) -> Error {
    AttendanceError::InvalidInput(err.to_string()).into()
}

pub fn configure(cfg: &mut web::ServiceConfig, config: &Config) {
    let write_limiter = Arc::new(build_limiter(config.rate_write_per_min));
    let read_limiter = Arc::new(build_limiter(config.rate_read_per_min));

    cfg.service(
        web::scope(&config.api_prefix)
            .app_data(web::JsonConfig::default().error_handler(|err, _| invalid_input(err)))
            .app_data(web::QueryConfig::default().error_handler(|err, _| invalid_input(err)))
            .app_data(web::PathConfig::default().error_handler(|err, _| invalid_input(err)))
            // /checkin, /checkout
            .service(
                web::resource("/checkin")
                    .wrap(write_limiter.clone())
                    .route(web::post().to(attendance::check_in)),
            )
            .service(
                web::resource("/checkout")
                    .wrap(write_limiter.clone())
                    .route(web::post().to(attendance::check_out)),
            )
            // /status/{user_id}
            .service(
                web::resource("/status/{user_id}")
                    .wrap(read_limiter.clone())
                    .route(web::get().to(attendance::get_status)),
            )
            // /history/{user_id}
            .service(
                web::resource("/history/{user_id}")
                    .wrap(read_limiter.clone())
                    .route(web::get().to(attendance::get_history)),
            )
            .service(
                web::resource("/mark-absent")
                    .wrap(write_limiter.clone())
                    .route(web::get().to(attendance::mark_absent)),
            )
            .service(
                web::scope("/admin/attendance")
                    .wrap(read_limiter)
                    // /admin/attendance
                    .service(web::resource("").route(web::get().to(admin::list_attendance)))
                    // /admin/attendance/summary
                    .service(web::resource("/summary").route(web::get().to(admin::attendance_summary)))
                    // /admin/attendance/history/{user_id}
                    .service(
                        web::resource("/history/{user_id}").route(web::get().to(admin::user_history)),
                    )
                    // /admin/attendance/{id}
                    .service(
                        web::resource("/{id}").route(web::delete().to(admin::delete_attendance)),
                    ),
            ),
    );
}
