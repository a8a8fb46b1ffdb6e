use crate::{
    AppState,
    auth::AuthUser,
    error::AppError,
    extract::{ClientIp, UploadForm},
    gate::{CvSubmission, SubmissionGate},
    models::{
        CompetitionCv, ContactMessage, CreateContactRequest, CustomPage, CvUploadForm,
        FileUploadForm, FooterLink, FooterLinkInput, MenuItem, PagePasswordQuery, PageSummary,
        SaveContentRequest, SaveMenuRequest, SettingsPayload, SiteSetting,
        SuccessResponse, UploadResponse, UpsertPageRequest,
    },
    policy::{PageLookupResult, VisibilityPolicy},
    renderer::{self, ThemeSettings},
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
};
use chrono::Utc;
use serde_json::{Value, json};

type JsonResult<T> = Result<Json<T>, AppError>;

fn success() -> JsonResult<SuccessResponse> {
    Ok(Json(SuccessResponse::ok()))
}

// --- Menu & Footer ---

/// get_menu
///
/// [Public Route] The navigation tree, or an empty array if it was never saved.
#[utoipa::path(
    get,
    path = "/api/menu",
    responses((status = 200, description = "Menu structure", body = [MenuItem]))
)]
pub async fn get_menu(State(state): State<AppState>) -> JsonResult<Vec<MenuItem>> {
    let menu = state.repo.get_menu().await?;
    Ok(Json(menu.unwrap_or_default()))
}

/// save_menu
///
/// [Admin Route] Replaces the whole navigation tree.
#[utoipa::path(
    post,
    path = "/api/menu",
    request_body = SaveMenuRequest,
    responses(
        (status = 200, description = "Saved", body = SuccessResponse),
        (status = 401, description = "No token"),
        (status = 403, description = "Invalid token")
    )
)]
pub async fn save_menu(
    user: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<SaveMenuRequest>,
) -> JsonResult<SuccessResponse> {
    state.repo.save_menu(payload.structure).await?;
    tracing::info!(user = %user.subject, "Menu replaced");
    success()
}

/// get_footer
///
/// [Public Route] Every footer link, ordered by position.
#[utoipa::path(
    get,
    path = "/api/footer",
    responses((status = 200, description = "Footer links", body = [FooterLink]))
)]
pub async fn get_footer(State(state): State<AppState>) -> JsonResult<Vec<FooterLink>> {
    Ok(Json(state.repo.get_footer_links().await?))
}

/// save_footer
///
/// [Admin Route] Replaces the whole footer link collection. Posting the same set twice
/// yields the same ordered listing.
#[utoipa::path(
    post,
    path = "/api/footer",
    request_body = [FooterLinkInput],
    responses((status = 200, description = "Saved", body = SuccessResponse))
)]
pub async fn save_footer(
    user: AuthUser,
    State(state): State<AppState>,
    Json(links): Json<Vec<FooterLinkInput>>,
) -> JsonResult<SuccessResponse> {
    let count = links.len();
    state.repo.replace_footer_links(links).await?;
    tracing::info!(user = %user.subject, "Footer replaced with {} links", count);
    success()
}

// --- Page Builder ---

/// list_pages
///
/// [Public Route] Restricted projection of every page (no blocks, no password),
/// ordered by id. Visibility and time windows are not applied here.
#[utoipa::path(
    get,
    path = "/api/pages",
    responses((status = 200, description = "Page summaries", body = [PageSummary]))
)]
pub async fn list_pages(State(state): State<AppState>) -> JsonResult<Vec<PageSummary>> {
    Ok(Json(state.repo.list_pages().await?))
}

/// get_page
///
/// [Public Route] Looks a page up by slug and runs it through the `VisibilityPolicy`.
/// A password-gated page answers 200 with `{title, is_protected: true}` only.
#[utoipa::path(
    get,
    path = "/api/pages/{key}",
    params(("key" = String, Path, description = "Page slug"), PagePasswordQuery),
    responses(
        (status = 200, description = "Full page, or only {title, is_protected} when a password is required", body = CustomPage),
        (status = 404, description = "Missing, not yet available or expired")
    )
)]
pub async fn get_page(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(query): Query<PagePasswordQuery>,
) -> Result<Response, AppError> {
    let page = state.repo.get_page_by_slug(&slug).await?;
    let policy = VisibilityPolicy::new(state.config.enforce_page_visibility);

    match policy.evaluate(page, Utc::now(), query.pwd.as_deref()) {
        PageLookupResult::Served(page) => Ok(Json(page).into_response()),
        PageLookupResult::Protected(protected) => Ok(Json(protected).into_response()),
        PageLookupResult::NotFound(reason) => {
            tracing::debug!("Page {} hidden: {:?}", slug, reason);
            Err(reason.into())
        }
    }
}

/// upsert_page
///
/// [Admin Route] Inserts a page, or updates the row named by a non-zero `id`.
/// Slug uniqueness is not checked.
#[utoipa::path(
    post,
    path = "/api/pages",
    request_body = UpsertPageRequest,
    responses((status = 200, description = "Saved", body = SuccessResponse))
)]
pub async fn upsert_page(
    user: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<UpsertPageRequest>,
) -> JsonResult<SuccessResponse> {
    let slug = payload.slug.clone();
    state.repo.upsert_page(payload).await?;
    tracing::info!(user = %user.subject, "Page {} saved", slug);
    success()
}

/// delete_page
///
/// [Admin Route] Deletes a page by numeric id. Deleting a missing id still succeeds.
#[utoipa::path(
    delete,
    path = "/api/pages/{key}",
    params(("key" = i32, Path, description = "Page id")),
    responses((status = 200, description = "Deleted", body = SuccessResponse))
)]
pub async fn delete_page(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> JsonResult<SuccessResponse> {
    let removed = state.repo.delete_page(id).await?;
    tracing::info!(user = %user.subject, "Page {} delete (removed: {})", id, removed);
    success()
}

// --- Job Applications ---

/// submit_cv
///
/// [Public Route] CV intake. The PDF is written first, then the `SubmissionGate`
/// decides; a rejected submission leaves no file behind.
#[utoipa::path(
    post,
    path = "/api/cv",
    request_body(content = CvUploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Accepted", body = SuccessResponse),
        (status = 400, description = "Missing fields, not a PDF, too large, duplicate or quota reached")
    )
)]
pub async fn submit_cv(
    State(state): State<AppState>,
    State(gate): State<SubmissionGate>,
    ClientIp(ip_address): ClientIp,
    mut form: UploadForm,
) -> JsonResult<SuccessResponse> {
    let part = form
        .file
        .take()
        .ok_or_else(|| AppError::InvalidInput("No file uploaded".to_string()))?;

    let file = state
        .storage
        .store(form.folder(), &part.file_name, &part.bytes)
        .await?;

    gate.submit(CvSubmission {
        application: form.application(),
        file,
        content_type: part.content_type,
        ip_address,
    })
    .await?;

    success()
}

/// list_cvs
///
/// [Admin Route] Every submission, newest first.
#[utoipa::path(
    get,
    path = "/api/cvs",
    responses((status = 200, description = "Submissions", body = [CompetitionCv]))
)]
pub async fn list_cvs(State(state): State<AppState>) -> JsonResult<Vec<CompetitionCv>> {
    Ok(Json(state.repo.list_cvs().await?))
}

/// delete_cv
///
/// [Admin Route] Removes the row only; the stored PDF stays on disk.
#[utoipa::path(
    delete,
    path = "/api/cvs/{id}",
    params(("id" = i32, Path, description = "Submission id")),
    responses((status = 200, description = "Deleted", body = SuccessResponse))
)]
pub async fn delete_cv(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> JsonResult<SuccessResponse> {
    let removed = state.repo.delete_cv(id).await?;
    tracing::info!(user = %user.subject, "CV {} delete (removed: {})", id, removed);
    success()
}

// --- Content Blobs ---

/// get_content
///
/// [Public Route] The JSON blob stored for `page`, or `{}`.
#[utoipa::path(
    get,
    path = "/api/content/{page}",
    params(("page" = String, Path, description = "Page name")),
    responses((status = 200, description = "Stored JSON document"))
)]
pub async fn get_content(
    State(state): State<AppState>,
    Path(page): Path<String>,
) -> JsonResult<Value> {
    let content = state.repo.get_content(&page).await?;
    Ok(Json(content.unwrap_or_else(|| json!({}))))
}

/// save_content
///
/// [Admin Route] Upserts the blob for `page`.
#[utoipa::path(
    post,
    path = "/api/content/{page}",
    params(("page" = String, Path, description = "Page name")),
    request_body = SaveContentRequest,
    responses((status = 200, description = "Saved", body = SuccessResponse))
)]
pub async fn save_content(
    State(state): State<AppState>,
    Path(page): Path<String>,
    Json(payload): Json<SaveContentRequest>,
) -> JsonResult<SuccessResponse> {
    state.repo.save_content(&page, payload.content).await?;
    success()
}

// --- Settings ---

/// get_settings
///
/// [Public Route] Every stored setting.
#[utoipa::path(
    get,
    path = "/api/settings",
    responses((status = 200, description = "Settings", body = [SiteSetting]))
)]
pub async fn get_settings(State(state): State<AppState>) -> JsonResult<Vec<SiteSetting>> {
    Ok(Json(state.settings.list_settings().await?))
}

/// save_settings
///
/// [Admin Route] Upserts one setting or an array of settings.
#[utoipa::path(
    post,
    path = "/api/settings",
    request_body = SettingsPayload,
    responses((status = 200, description = "Saved", body = SuccessResponse))
)]
pub async fn save_settings(
    user: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<SettingsPayload>,
) -> JsonResult<SuccessResponse> {
    let items = payload.into_vec();
    let keys: Vec<String> = items.iter().map(|item| item.key.clone()).collect();
    state.settings.upsert_settings(items).await?;
    tracing::info!(user = %user.subject, "Settings updated: {:?}", keys);
    success()
}

// --- Uploads ---

/// upload_file
///
/// [Admin Route] Stores any file under `/uploads/[<folder>/]` and returns its public path.
#[utoipa::path(
    post,
    path = "/api/upload",
    request_body(content = FileUploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Stored", body = UploadResponse),
        (status = 400, description = "No file part")
    )
)]
pub async fn upload_file(
    State(state): State<AppState>,
    mut form: UploadForm,
) -> JsonResult<UploadResponse> {
    let part = form
        .file
        .take()
        .ok_or_else(|| AppError::InvalidInput("No file uploaded".to_string()))?;

    let stored = state
        .storage
        .store(form.folder(), &part.file_name, &part.bytes)
        .await?;

    Ok(Json(UploadResponse {
        file_path: stored.public_path,
    }))
}

// --- Contact Messages ---

/// create_contact
///
/// [Public Route] Records a contact-form message.
#[utoipa::path(
    post,
    path = "/api/contact",
    request_body = CreateContactRequest,
    responses((status = 200, description = "Recorded", body = SuccessResponse))
)]
pub async fn create_contact(
    State(state): State<AppState>,
    Json(payload): Json<CreateContactRequest>,
) -> JsonResult<SuccessResponse> {
    state.repo.insert_contact(payload).await?;
    success()
}

/// list_messages
///
/// [Admin Route] Every contact message, newest first.
#[utoipa::path(
    get,
    path = "/api/messages",
    responses((status = 200, description = "Messages", body = [ContactMessage]))
)]
pub async fn list_messages(State(state): State<AppState>) -> JsonResult<Vec<ContactMessage>> {
    Ok(Json(state.repo.list_messages().await?))
}

/// delete_message
#[utoipa::path(
    delete,
    path = "/api/messages/{id}",
    params(("id" = i32, Path, description = "Message id")),
    responses((status = 200, description = "Deleted", body = SuccessResponse))
)]
pub async fn delete_message(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> JsonResult<SuccessResponse> {
    state.repo.delete_message(id).await?;
    success()
}

// --- Public Renderer Partials ---

async fn load_theme(state: &AppState) -> Result<ThemeSettings, AppError> {
    let settings = state.settings.list_settings().await?;
    Ok(ThemeSettings::from_settings(&settings))
}

/// header_partial
///
/// [Public Route] Navigation bar markup built from the saved menu.
#[utoipa::path(
    get,
    path = "/partials/header.html",
    responses((status = 200, description = "HTML fragment", body = String, content_type = "text/html"))
)]
pub async fn header_partial(State(state): State<AppState>) -> Result<Html<String>, AppError> {
    let menu = state.repo.get_menu().await?.unwrap_or_default();
    let theme = load_theme(&state).await?;
    Ok(Html(renderer::render_header(&menu, &theme)))
}

/// footer_partial
///
/// [Public Route] Footer markup built from the saved footer links.
#[utoipa::path(
    get,
    path = "/partials/footer.html",
    responses((status = 200, description = "HTML fragment", body = String, content_type = "text/html"))
)]
pub async fn footer_partial(State(state): State<AppState>) -> Result<Html<String>, AppError> {
    let links = state.repo.get_footer_links().await?;
    let theme = load_theme(&state).await?;
    Ok(Html(renderer::render_footer(&links, &theme)))
}

/// theme_css
#[utoipa::path(
    get,
    path = "/partials/theme.css",
    responses((status = 200, description = "Stylesheet", body = String, content_type = "text/css"))
)]
pub async fn theme_css(State(state): State<AppState>) -> Result<Response, AppError> {
    let theme = load_theme(&state).await?;
    Ok((
        [(header::CONTENT_TYPE, "text/css; charset=utf-8")],
        renderer::render_theme_css(&theme),
    )
        .into_response())
}

/// head_partial
///
/// [Public Route] Favicon link, theme stylesheet and the custom head script.
#[utoipa::path(
    get,
    path = "/partials/head.html",
    responses((status = 200, description = "HTML fragment", body = String, content_type = "text/html"))
)]
pub async fn head_partial(State(state): State<AppState>) -> Result<Html<String>, AppError> {
    let theme = load_theme(&state).await?;
    Ok(Html(renderer::render_head(&theme)))
}

/// maintenance_partial
///
/// [Public Route] The maintenance notice while `maintenance_mode` is `"true"`, otherwise 204.
#[utoipa::path(
    get,
    path = "/partials/maintenance.html",
    responses(
        (status = 200, description = "Maintenance page", body = String, content_type = "text/html"),
        (status = 204, description = "Site is live")
    )
)]
pub async fn maintenance_partial(State(state): State<AppState>) -> Result<Response, AppError> {
    let theme = load_theme(&state).await?;
    Ok(match renderer::render_maintenance(&theme) {
        Some(page) => Html(page).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    })
}

/// reveal_script
#[utoipa::path(
    get,
    path = "/partials/reveal.js",
    responses((status = 200, description = "Scroll-reveal script", body = String, content_type = "application/javascript"))
)]
pub async fn reveal_script() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/javascript; charset=utf-8")],
        renderer::REVEAL_SCRIPT,
    )
}
