use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{delete, get, post},
};

/// Admin Router Module
///
/// Every route here is wrapped by `auth_middleware` in `create_router`. Any valid token
/// grants access; there is no role check.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/api/menu", post(handlers::save_menu))
        // POST /api/footer
        // Replaces the whole link collection in one transaction.
        .route("/api/footer", post(handlers::save_footer))
        .route("/api/settings", post(handlers::save_settings))
        .route("/api/content/{page}", post(handlers::save_content))
        // POST /api/pages
        // Upsert by id. DELETE takes the numeric id in the shared `{key}` segment.
        .route("/api/pages", post(handlers::upsert_page))
        .route("/api/pages/{key}", delete(handlers::delete_page))
        .route("/api/cvs", get(handlers::list_cvs))
        .route("/api/cvs/{id}", delete(handlers::delete_cv))
        .route("/api/messages", get(handlers::list_messages))
        .route("/api/messages/{id}", delete(handlers::delete_message))
        // POST /api/upload
        // Arbitrary file upload for page-builder media; returns the public path.
        .route("/api/upload", post(handlers::upload_file))
}
