use axum::{
    Router,
    extract::{DefaultBodyLimit, FromRef, Request},
    http::HeaderName,
    middleware::{self, Next},
    response::Response,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    services::ServeDir,
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

pub mod auth;
pub mod config;
pub mod error;
pub mod extract;
pub mod gate;
pub mod handlers;
pub mod models;
pub mod policy;
pub mod renderer;
pub mod repository;
pub mod settings;
pub mod storage;

// Public and admin routers, merged in `create_router`.
pub mod routes;
use auth::AuthUser;
use routes::{admin, public};

// --- Public Re-exports ---

pub use auth::{JwksVerifier, TokenVerifier, VerifierState};
pub use config::AppConfig;
pub use error::AppError;
pub use repository::{PostgresRepository, RepositoryState};
pub use settings::{SettingsState, SettingsStore};
pub use storage::{DiskStorage, MockStorageService, StorageState, UPLOADS_PREFIX};

/// ApiDoc
///
/// OpenAPI document for every endpoint, served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::get_menu, handlers::save_menu, handlers::get_footer, handlers::save_footer,
        handlers::list_pages, handlers::get_page, handlers::upsert_page, handlers::delete_page,
        handlers::submit_cv, handlers::list_cvs, handlers::delete_cv,
        handlers::get_content, handlers::save_content,
        handlers::get_settings, handlers::save_settings,
        handlers::upload_file,
        handlers::create_contact, handlers::list_messages, handlers::delete_message,
        handlers::header_partial, handlers::footer_partial, handlers::theme_css,
        handlers::head_partial, handlers::maintenance_partial, handlers::reveal_script
    ),
    components(
        schemas(
            models::MenuItem, models::SaveMenuRequest, models::FooterLink, models::FooterLinkInput,
            models::CustomPage, models::PageSummary, models::ProtectedPage, models::UpsertPageRequest,
            models::CompetitionCv, models::CvUploadForm, models::FileUploadForm,
            models::SiteSetting, models::SettingsPayload, models::SaveContentRequest,
            models::ContactMessage, models::CreateContactRequest,
            models::SuccessResponse, models::UploadResponse,
        )
    ),
    tags(
        (name = "site-cms", description = "Institutional site CMS API")
    )
)]
pub struct ApiDoc;

/// AppState
///
/// Unified state shared by every request. Each service sits behind a trait object so
/// tests can swap in in-memory doubles.
#[derive(Clone)]
pub struct AppState {
    /// Menu, footer, pages, CVs, content blobs and contact messages.
    pub repo: RepositoryState,
    /// Key/value settings (usually the same Postgres repository).
    pub settings: SettingsState,
    /// Upload root on disk.
    pub storage: StorageState,
    /// Bearer-token verification against the identity provider's key set.
    pub verifier: VerifierState,
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for SettingsState {
    fn from_ref(app_state: &AppState) -> SettingsState {
        app_state.settings.clone()
    }
}

impl FromRef<AppState> for StorageState {
    fn from_ref(app_state: &AppState) -> StorageState {
        app_state.storage.clone()
    }
}

impl FromRef<AppState> for VerifierState {
    fn from_ref(app_state: &AppState) -> VerifierState {
        app_state.verifier.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// auth_middleware
///
/// Guards the admin router. Extracting `AuthUser` rejects the request with 401/403
/// before any handler runs; on success the identity is stored in the request extensions
/// so handlers that log the actor do not verify the token a second time.
async fn auth_middleware(auth_user: AuthUser, mut request: Request, next: Next) -> Response {
    request.extensions_mut().insert(auth_user);
    next.run(request).await
}

/// create_router
///
/// Assembles public and admin routes, the static `/uploads` mount, Swagger UI and the
/// observability layers.
pub fn create_router(state: AppState) -> Router {
    // 1. CORS: the admin client and the public site are served from other origins.
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");
    let body_limit = state.config.max_body_bytes;
    let uploads = ServeDir::new(&state.config.upload_dir);

    // 2. Base Router Assembly
    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(
            admin::admin_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth_middleware,
            )),
        )
        // Uploaded files, read straight from the upload root.
        .nest_service(UPLOADS_PREFIX, uploads)
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state);

    // 3. Observability and Correlation Layers
    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Span for every request, tagged with method, uri and the `x-request-id` set above.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
