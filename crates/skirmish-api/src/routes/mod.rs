//! Route modules organized by concern.

use axum::Router;

use crate::state::AppState;

pub mod combat;
pub mod health;
pub mod settings;
pub mod table;

/// Returns every route, nested the way the server mounts them.
pub fn api_router() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .nest("/api/v1/combat", combat::router())
        .nest("/api/v1/table", table::router())
        .nest("/api/v1/settings", settings::router())
}
