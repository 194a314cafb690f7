use std::time::Duration;

use sqlx::MySqlPool;
use sqlx::mysql::MySqlPoolOptions;
use tokio::sync::OnceCell;
use tracing::{error, info};

use crate::error::StoreError;

const CREATE_ATTENDANCE: &str = r#"
CREATE TABLE IF NOT EXISTS attendance (
    id BIGINT UNSIGNED NOT NULL AUTO_INCREMENT PRIMARY KEY,
    user_id VARCHAR(128) NOT NULL,
    email VARCHAR(255) NOT NULL,
    checkin_id VARCHAR(191) NOT NULL,
    checkin_time DATETIME(3) NOT NULL,
    checkout_time DATETIME(3) NULL,
    status VARCHAR(16) NOT NULL,
    punctuality_status VARCHAR(64) NOT NULL,
    half_day_status VARCHAR(16) NOT NULL,
    duration BIGINT NULL,
    active_user_id VARCHAR(128)
        GENERATED ALWAYS AS (CASE WHEN status = 'CheckedIn' THEN user_id END) STORED,
    UNIQUE KEY uq_checkin_id (checkin_id),
    UNIQUE KEY uq_active_user (active_user_id),
    KEY idx_user_status (user_id, status),
    KEY idx_checkin_time (checkin_time)
)
"#;

const CREATE_USERS: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id BIGINT UNSIGNED NOT NULL AUTO_INCREMENT PRIMARY KEY,
    user_id VARCHAR(128) NOT NULL,
    email VARCHAR(255) NULL,
    is_active TINYINT(1) NOT NULL DEFAULT 1,
    UNIQUE KEY uq_user_id (user_id)
)
"#;

/// Process-wide MySQL pool, connected on first use.
///
/// A failed connect leaves the cell empty so the next caller retries.
pub struct LazyPool {
    database_url: String,
    max_connections: u32,
    acquire_timeout: Duration,
    cell: OnceCell<MySqlPool>,
}

impl LazyPool {
    pub fn new(database_url: impl Into<String>, max_connections: u32, acquire_timeout: Duration) -> Self {
        Self {
            database_url: database_url.into(),
            max_connections,
            acquire_timeout,
            cell: OnceCell::new(),
        }
    }

    pub async fn get(&self) -> Result<&MySqlPool, StoreError> {
        self.cell.get_or_try_init(|| self.connect()).await
    }

    async fn connect(&self) -> Result<MySqlPool, StoreError> {
        info!("Connecting to attendance database");

        let pool = MySqlPoolOptions::new()
            .max_connections(self.max_connections)
            .acquire_timeout(self.acquire_timeout)
            .connect(&self.database_url)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to connect to database");
                StoreError::Unavailable(e)
            })?;

        for ddl in [CREATE_ATTENDANCE, CREATE_USERS] {
            sqlx::query(ddl).execute(&pool).await.map_err(|e| {
                error!(error = %e, "Failed to prepare schema");
                StoreError::Unavailable(e)
            })?;
        }

        info!("Attendance database ready");
        Ok(pool)
    }

    pub fn is_ready(&self) -> bool {
        self.cell.initialized()
    }

    pub async fn close(&self) {
        if let Some(pool) = self.cell.get() {
            pool.close().await;
            info!("Attendance database pool closed");
        }
    }
}
