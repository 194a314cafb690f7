use std::sync::Arc;

use crate::config::Config;
use crate::service::admin::AdminService;
use crate::service::reconcile::ReconciliationJob;
use crate::service::session::SessionService;
use crate::store::{AttendanceStore, Roster};

pub struct AppState {
    pub sessions: SessionService,
    pub reconciler: Arc<ReconciliationJob>,
    pub admin: AdminService,
}

impl AppState {
    pub fn new(config: &Config, store: Arc<dyn AttendanceStore>, roster: Arc<dyn Roster>) -> Self {
        Self {
            sessions: SessionService::new(store.clone(), config.checkin_guard, config.shift.timezone),
            reconciler: Arc::new(ReconciliationJob::new(store.clone(), roster, config.shift.clone())),
            admin: AdminService::new(store),
        }
    }
}
