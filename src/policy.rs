use chrono::{DateTime, Utc};

use crate::{
    error::AppError,
    models::{CustomPage, ProtectedPage},
};

/// HiddenReason
///
/// Why a page lookup ended in NotFound. Each reason has its own client message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HiddenReason {
    /// No page with that slug.
    Missing,
    /// `is_visible` is false and visibility enforcement is on.
    Unpublished,
    /// `start_time` lies in the future.
    NotYetAvailable,
    /// `end_time` lies in the past.
    Expired,
}

impl HiddenReason {
    pub fn message(&self) -> &'static str {
        match self {
            HiddenReason::Missing | HiddenReason::Unpublished => "Page not found",
            HiddenReason::NotYetAvailable => "Page not yet available",
            HiddenReason::Expired => "Page expired",
        }
    }
}

/// PageLookupResult
///
/// Closed outcome of a single-page lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum PageLookupResult {
    /// The full record, blocks included.
    Served(CustomPage),
    /// Password gate: title only.
    Protected(ProtectedPage),
    NotFound(HiddenReason),
}

impl From<HiddenReason> for AppError {
    fn from(reason: HiddenReason) -> Self {
        AppError::NotFound(reason.message().to_string())
    }
}

/// VisibilityPolicy
///
/// Decides whether a custom page may be served to an anonymous visitor.
///
/// Rules, first match wins:
/// 1. no page: NotFound(Missing)
/// 2. enforcement on and `is_visible == false`: NotFound(Unpublished)
/// 3. `start_time > now`: NotFound(NotYetAvailable)
/// 4. `end_time < now`: NotFound(Expired)
/// 5. non-empty password and `pwd` absent or different: Protected
/// 6. otherwise Served
///
/// Both window bounds are compared strictly, so a page is still served at the exact
/// instant of its `end_time`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VisibilityPolicy {
    pub enforce_visibility_flag: bool,
}

impl VisibilityPolicy {
    pub fn new(enforce_visibility_flag: bool) -> Self {
        Self {
            enforce_visibility_flag,
        }
    }

    pub fn evaluate(
        &self,
        page: Option<CustomPage>,
        now: DateTime<Utc>,
        pwd: Option<&str>,
    ) -> PageLookupResult {
        let Some(page) = page else {
            return PageLookupResult::NotFound(HiddenReason::Missing);
        };

        if self.enforce_visibility_flag && !page.is_visible {
            return PageLookupResult::NotFound(HiddenReason::Unpublished);
        }

        if page.start_time.is_some_and(|start| start > now) {
            return PageLookupResult::NotFound(HiddenReason::NotYetAvailable);
        }

        if page.end_time.is_some_and(|end| end < now) {
            return PageLookupResult::NotFound(HiddenReason::Expired);
        }

        if page.is_password_protected() && pwd != page.page_password.as_deref() {
            return PageLookupResult::Protected(ProtectedPage {
                title: page.title,
                is_protected: true,
            });
        }

        PageLookupResult::Served(page)
    }
}
