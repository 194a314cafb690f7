use serde::{Deserialize, Serialize};

/// An entry of the active-user directory consulted by the absentee run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct RosterUser {
    pub user_id: String,
    pub email: Option<String>,
}
