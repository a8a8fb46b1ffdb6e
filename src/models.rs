use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;

// --- Site Structure ---

/// MenuItem
///
/// One entry of the navigation menu. The whole tree is persisted as a single JSON document
/// in `site_menu` (row id 1) and replaced wholesale on every save. Nesting depth is not checked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct MenuItem {
    pub label: String,
    pub url: String,
    #[serde(default)]
    #[schema(value_type = Vec<Object>)]
    pub children: Vec<MenuItem>,
}

/// SaveMenuRequest
///
/// Input payload for POST /api/menu.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct SaveMenuRequest {
    #[serde(default)]
    pub structure: Vec<MenuItem>,
}

/// FooterLink
///
/// A row of `footer_links`. `section` partitions the links into footer columns and
/// `position` orders them inside a section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct FooterLink {
    pub id: i32,
    pub label: String,
    pub url: String,
    pub section: String,
    pub position: i32,
}

/// FooterLinkInput
///
/// One element of the POST /api/footer body. The collection replaces every stored link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct FooterLinkInput {
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub section: String,
    #[serde(default)]
    pub position: i32,
}

// --- Page Builder ---

/// CustomPage
///
/// A page assembled in the admin page builder (`custom_pages` table).
/// `blocks` is owned by the builder client and stored as an untyped JSON document;
/// the backend never looks inside it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct CustomPage {
    pub id: i32,
    pub slug: String,
    pub title: String,
    pub is_visible: bool,
    #[ts(type = "unknown")]
    #[schema(value_type = Option<Object>)]
    pub blocks: Option<Value>,
    #[ts(type = "string | null")]
    pub start_time: Option<DateTime<Utc>>,
    #[ts(type = "string | null")]
    pub end_time: Option<DateTime<Utc>>,
    pub page_password: Option<String>,
    pub meta_desc: Option<String>,
    pub meta_keywords: Option<String>,
}

impl CustomPage {
    /// True when a non-empty shared password gates the page.
    pub fn is_password_protected(&self) -> bool {
        self.page_password
            .as_deref()
            .is_some_and(|password| !password.is_empty())
    }
}

/// PageSummary
///
/// Restricted projection returned by GET /api/pages. Never carries `blocks` or the password.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct PageSummary {
    pub id: i32,
    pub slug: String,
    pub title: String,
    pub is_visible: bool,
    #[ts(type = "string | null")]
    pub start_time: Option<DateTime<Utc>>,
    #[ts(type = "string | null")]
    pub end_time: Option<DateTime<Utc>>,
    pub meta_desc: Option<String>,
    pub meta_keywords: Option<String>,
    // Computed in SQL: a non-empty password is set.
    pub is_protected: bool,
}

/// ProtectedPage
///
/// What a visitor sees of a password-gated page when the password is missing or wrong.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ProtectedPage {
    pub title: String,
    pub is_protected: bool,
}

/// UpsertPageRequest
///
/// Input payload for POST /api/pages. `id` present (and non-zero) updates that row,
/// otherwise a new page is inserted. Blank strings coming from admin form inputs
/// are stored as absent values.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpsertPageRequest {
    #[serde(default)]
    pub id: Option<i32>,
    pub slug: String,
    #[serde(default)]
    pub title: String,
    #[serde(default = "default_visible")]
    pub is_visible: bool,
    #[serde(default)]
    #[ts(type = "unknown")]
    #[schema(value_type = Option<Object>)]
    pub blocks: Option<Value>,
    #[serde(default, deserialize_with = "blank_as_none_datetime")]
    #[ts(type = "string | null")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "blank_as_none_datetime")]
    #[ts(type = "string | null")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub page_password: Option<String>,
    #[serde(default)]
    pub meta_desc: Option<String>,
    #[serde(default)]
    pub meta_keywords: Option<String>,
}

impl UpsertPageRequest {
    /// The row to update, if any. A zero id counts as "new page".
    pub fn existing_id(&self) -> Option<i32> {
        self.id.filter(|id| *id != 0)
    }
}

fn default_visible() -> bool {
    true
}

/// PagePasswordQuery
///
/// Query string of GET /api/pages/{slug}.
#[derive(Debug, Clone, Deserialize, utoipa::IntoParams, Default)]
pub struct PagePasswordQuery {
    /// Password for gated pages.
    pub pwd: Option<String>,
}

// --- Job Applications ---

/// CompetitionCv
///
/// A job-application submission (`competition_cvs` table). `file_path` is the public
/// `/uploads/...` path of the stored PDF.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct CompetitionCv {
    pub id: i32,
    #[ts(type = "string")]
    pub submission_datetime: DateTime<Utc>,
    pub surname: String,
    pub name: String,
    pub tax_code: String,
    pub birth_place: Option<String>,
    pub address: Option<String>,
    pub zip_code: Option<String>,
    pub city: Option<String>,
    pub email: String,
    pub phone: Option<String>,
    pub ip_address: Option<String>,
    pub page_slug: Option<String>,
    pub file_path: String,
}

/// CvApplication
///
/// Applicant fields collected from the multipart form of POST /api/cv.
/// Required fields default to the empty string so the gate can report them as missing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CvApplication {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub surname: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub tax_code: String,
    pub phone: Option<String>,
    pub city: Option<String>,
    pub zip_code: Option<String>,
    pub address: Option<String>,
    pub birth_place: Option<String>,
    pub page_slug: Option<String>,
}

/// NewCompetitionCv
///
/// Everything the repository needs to insert an accepted submission.
/// `submission_datetime` is assigned by the database.
#[derive(Debug, Clone, PartialEq)]
pub struct NewCompetitionCv {
    pub application: CvApplication,
    pub ip_address: String,
    pub file_path: String,
}

/// CvUploadForm
///
/// Documentation-only shape of the multipart body of POST /api/cv.
#[derive(Debug, Clone, ToSchema)]
pub struct CvUploadForm {
    /// The PDF, declared as `application/pdf`.
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
    pub name: String,
    pub surname: String,
    pub email: String,
    pub tax_code: String,
    pub phone: Option<String>,
    pub city: Option<String>,
    pub zip_code: Option<String>,
    pub address: Option<String>,
    pub birth_place: Option<String>,
    pub page_slug: Option<String>,
    /// Sub-folder of the upload root; sanitized to `[A-Za-z0-9_-]`.
    pub folder: Option<String>,
}

/// FileUploadForm
///
/// Documentation-only shape of the multipart body of POST /api/upload.
#[derive(Debug, Clone, ToSchema)]
pub struct FileUploadForm {
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
    pub folder: Option<String>,
}

// --- Settings, Content, Contact ---

/// SiteSetting
///
/// A key/value row of `site_settings`. Used both for presentation keys consumed by the
/// public renderer and for operational limits (`cv_limit`, `cv_max_size_mb`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct SiteSetting {
    pub key: String,
    pub value: String,
}

/// SettingsPayload
///
/// POST /api/settings accepts either one setting or an array of settings.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum SettingsPayload {
    Many(Vec<SiteSetting>),
    One(SiteSetting),
}

impl SettingsPayload {
    pub fn into_vec(self) -> Vec<SiteSetting> {
        match self {
            SettingsPayload::Many(items) => items,
            SettingsPayload::One(item) => vec![item],
        }
    }
}

/// SaveContentRequest
///
/// Input payload for POST /api/content/{page}: an arbitrary JSON blob keyed by page name.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct SaveContentRequest {
    #[serde(default)]
    #[ts(type = "unknown")]
    #[schema(value_type = Object)]
    pub content: Value,
}

/// ContactMessage
///
/// A message left through the public contact form. Write-once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct ContactMessage {
    pub id: i32,
    pub name: String,
    pub surname: String,
    pub email: String,
    pub message: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// CreateContactRequest
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateContactRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub surname: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub message: String,
}

// --- Generic Responses ---

/// SuccessResponse
///
/// Body returned by every successful mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct SuccessResponse {
    pub success: bool,
}

impl SuccessResponse {
    pub fn ok() -> Self {
        Self { success: true }
    }
}

/// UploadResponse
///
/// Body returned by POST /api/upload: the public path of the stored file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct UploadResponse {
    #[serde(rename = "filePath")]
    pub file_path: String,
}

// --- Deserialization Helpers ---

fn blank_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.is_empty()))
}

/// Accepts RFC 3339 timestamps as well as the zone-less `YYYY-MM-DDTHH:MM[:SS]`
/// produced by `datetime-local` inputs, which is read as UTC. Blank means absent.
fn blank_as_none_datetime<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(raw) = Option::<String>::deserialize(deserializer)? else {
        return Ok(None);
    };
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    parse_timestamp(raw)
        .map(Some)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {raw}")))
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|naive| naive.and_utc())
}
