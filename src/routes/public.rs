use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints reachable without a token. Several paths are shared with the admin
/// router under other methods (e.g. GET here, POST there); `Router::merge` combines them.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for the reverse proxy / orchestrator.
        .route("/health", get(|| async { "ok" }))
        // --- Site structure ---
        .route("/api/menu", get(handlers::get_menu))
        .route("/api/footer", get(handlers::get_footer))
        .route("/api/settings", get(handlers::get_settings))
        .route("/api/content/{page}", get(handlers::get_content))
        // --- Page builder ---
        // GET /api/pages/{key}?pwd=...
        // Single-page lookup through the visibility policy. `key` is the slug.
        .route("/api/pages", get(handlers::list_pages))
        .route("/api/pages/{key}", get(handlers::get_page))
        // --- Visitor submissions ---
        // POST /api/cv
        // Multipart CV intake guarded by the submission gate.
        .route("/api/cv", post(handlers::submit_cv))
        .route("/api/contact", post(handlers::create_contact))
        // --- Renderer partials ---
        .route("/partials/header.html", get(handlers::header_partial))
        .route("/partials/footer.html", get(handlers::footer_partial))
        .route("/partials/theme.css", get(handlers::theme_css))
        .route("/partials/head.html", get(handlers::head_partial))
        .route("/partials/maintenance.html", get(handlers::maintenance_partial))
        .route("/partials/reveal.js", get(handlers::reveal_script))
}
