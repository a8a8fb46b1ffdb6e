use axum::extract::FromRef;

use crate::{
    AppState,
    error::AppError,
    models::{CvApplication, NewCompetitionCv},
    repository::RepositoryState,
    settings::{SettingsState, SubmissionLimits},
    storage::{StorageState, StoredFile},
};

/// The only declared MIME type accepted for a CV.
pub const PDF_MIME: &str = "application/pdf";

/// CvSubmission
///
/// One CV intake request after the upload layer has already written the file.
#[derive(Debug, Clone)]
pub struct CvSubmission {
    pub application: CvApplication,
    pub file: StoredFile,
    /// MIME type declared by the client for the `file` part.
    pub content_type: Option<String>,
    pub ip_address: String,
}

/// SubmissionGate
///
/// Accepts or rejects job applications. The file is already on disk when the gate
/// runs, so every rejection and every store failure removes it again; only an
/// accepted submission keeps its file and gains exactly one `competition_cvs` row.
///
/// The duplicate check and the insert are separate statements: two identical
/// submissions racing each other can both be accepted.
#[derive(Clone)]
pub struct SubmissionGate {
    repo: RepositoryState,
    settings: SettingsState,
    storage: StorageState,
}

impl FromRef<AppState> for SubmissionGate {
    fn from_ref(state: &AppState) -> Self {
        Self::new(
            state.repo.clone(),
            state.settings.clone(),
            state.storage.clone(),
        )
    }
}

impl SubmissionGate {
    pub fn new(repo: RepositoryState, settings: SettingsState, storage: StorageState) -> Self {
        Self {
            repo,
            settings,
            storage,
        }
    }

    /// Runs the pipeline and discards the stored file on any error.
    pub async fn submit(&self, submission: CvSubmission) -> Result<(), AppError> {
        let file = submission.file.clone();
        let outcome = self.check_and_insert(submission).await;

        if let Err(e) = &outcome {
            match e {
                AppError::Database(_) | AppError::Storage(_) => {}
                rejection => tracing::info!("CV submission rejected: {}", rejection),
            }
            self.storage.discard(&file).await;
        }
        outcome
    }

    async fn check_and_insert(&self, submission: CvSubmission) -> Result<(), AppError> {
        let CvSubmission {
            application,
            file,
            content_type,
            ip_address,
        } = submission;

        // 1. Required fields
        let required = [
            &application.name,
            &application.surname,
            &application.email,
            &application.tax_code,
        ];
        if required.iter().any(|field| field.is_empty()) {
            return Err(AppError::InvalidInput(
                "Missing required fields.".to_string(),
            ));
        }

        // 2. Declared format
        if content_type.as_deref() != Some(PDF_MIME) {
            return Err(AppError::InvalidFormat);
        }

        // 3. Size (limits are re-read on every submission)
        let limits = SubmissionLimits::resolve(self.settings.as_ref()).await?;
        if file.size > u64::try_from(limits.max_size_bytes()).unwrap_or(0) {
            return Err(AppError::TooLarge {
                max_mb: limits.cv_max_size_mb,
            });
        }

        let page_slug = application.page_slug.as_deref();

        // 4. One application per tax code / email per page
        if self
            .repo
            .cv_exists(page_slug, &application.tax_code, &application.email)
            .await?
        {
            return Err(AppError::Duplicate);
        }

        // 5. Per-page quota
        let count = self.repo.count_cvs(page_slug).await?;
        if count >= limits.cv_limit {
            return Err(AppError::QuotaExceeded);
        }

        // 6. Record
        self.repo
            .insert_cv(NewCompetitionCv {
                application,
                ip_address,
                file_path: file.public_path,
            })
            .await?;

        Ok(())
    }
}
