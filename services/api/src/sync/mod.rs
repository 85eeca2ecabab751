pub mod handlers;
pub mod requests;
pub mod responses;
pub mod runs;

use axum::routing::{get, post};
use axum::Router;

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/trigger-sync", post(handlers::trigger_sync))
        .route("/sync-state/{sync_type}", get(handlers::get_sync_state))
}
