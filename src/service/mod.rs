pub mod admin;
pub mod duration;
pub mod reconcile;
pub mod session;
pub mod shift;
