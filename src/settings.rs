use crate::models::SiteSetting;
use async_trait::async_trait;
use std::sync::Arc;

// --- Setting Keys ---

pub const CV_LIMIT: &str = "cv_limit";
pub const CV_MAX_SIZE_MB: &str = "cv_max_size_mb";
pub const STYLE_FONT: &str = "style_font";
pub const STYLE_TITLE_COLOR: &str = "style_title_color";
pub const STYLE_BODY_COLOR: &str = "style_body_color";
pub const CUSTOM_CSS: &str = "custom_css";
pub const SITE_FAVICON: &str = "site_favicon";
pub const SITE_LOGO: &str = "site_logo";
pub const CUSTOM_JS_HEAD: &str = "custom_js_head";
pub const MAINTENANCE_MODE: &str = "maintenance_mode";

pub const DEFAULT_CV_LIMIT: i64 = 30;
pub const DEFAULT_CV_MAX_SIZE_MB: i64 = 5;

/// SettingsStore
///
/// Key/value source of truth for presentation and operational parameters.
/// Implemented by the Postgres repository and by in-memory doubles in tests.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Every stored setting, in storage order.
    async fn list_settings(&self) -> Result<Vec<SiteSetting>, sqlx::Error>;

    /// Only the settings whose key is in `keys`. Missing keys are simply absent.
    async fn get_settings(&self, keys: &[&str]) -> Result<Vec<SiteSetting>, sqlx::Error>;

    /// Upsert-by-key, one statement per item, last writer wins.
    async fn upsert_settings(&self, items: Vec<SiteSetting>) -> Result<(), sqlx::Error>;
}

/// SettingsState
///
/// The concrete type used to share the settings store across the application state.
pub type SettingsState = Arc<dyn SettingsStore>;

/// Looks a key up in a settings list, treating an empty value like a missing one.
pub fn lookup<'a>(settings: &'a [SiteSetting], key: &str) -> Option<&'a str> {
    settings
        .iter()
        .find(|setting| setting.key == key)
        .map(|setting| setting.value.as_str())
        .filter(|value| !value.is_empty())
}

/// SubmissionLimits
///
/// Operational caps applied by the submission gate, re-read on every submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmissionLimits {
    /// Maximum number of applications per page slug.
    pub cv_limit: i64,
    /// Maximum PDF size in mebibytes.
    pub cv_max_size_mb: i64,
}

impl Default for SubmissionLimits {
    fn default() -> Self {
        Self {
            cv_limit: DEFAULT_CV_LIMIT,
            cv_max_size_mb: DEFAULT_CV_MAX_SIZE_MB,
        }
    }
}

impl SubmissionLimits {
    /// Builds the limits from raw settings. Missing, empty or non-integer values
    /// fall back to the defaults.
    pub fn from_settings(settings: &[SiteSetting]) -> Self {
        let parse = |key: &str, default: i64| {
            lookup(settings, key)
                .and_then(|value| value.trim().parse::<i64>().ok())
                .unwrap_or(default)
        };

        Self {
            cv_limit: parse(CV_LIMIT, DEFAULT_CV_LIMIT),
            cv_max_size_mb: parse(CV_MAX_SIZE_MB, DEFAULT_CV_MAX_SIZE_MB),
        }
    }

    /// Reads the two limit keys from the store.
    pub async fn resolve(store: &dyn SettingsStore) -> Result<Self, sqlx::Error> {
        let settings = store.get_settings(&[CV_LIMIT, CV_MAX_SIZE_MB]).await?;
        Ok(Self::from_settings(&settings))
    }

    /// Size cap in bytes.
    pub fn max_size_bytes(&self) -> i64 {
        self.cv_max_size_mb.saturating_mul(1024 * 1024)
    }
}
