use chrono::{DateTime, Duration, Utc};
use serde_json::json;
use site_cms::{
    error::AppError,
    models::{CustomPage, ProtectedPage},
    policy::{HiddenReason, PageLookupResult, VisibilityPolicy},
};

fn now() -> DateTime<Utc> {
    "2025-06-01T12:00:00Z".parse().unwrap()
}

fn page() -> CustomPage {
    CustomPage {
        id: 7,
        slug: "bando-2025".to_string(),
        title: "Bando 2025".to_string(),
        is_visible: true,
        blocks: Some(json!([{ "type": "text", "content": "Hello" }])),
        ..CustomPage::default()
    }
}

#[test]
fn test_missing_page_is_not_found() {
    let result = VisibilityPolicy::default().evaluate(None, now(), None);
    assert_eq!(result, PageLookupResult::NotFound(HiddenReason::Missing));
}

#[test]
fn test_plain_page_is_served_whole() {
    let result = VisibilityPolicy::default().evaluate(Some(page()), now(), None);
    assert_eq!(result, PageLookupResult::Served(page()));
}

#[test]
fn test_future_start_hides_page_regardless_of_password() {
    let mut future = page();
    future.start_time = Some(now() + Duration::minutes(1));
    future.page_password = Some("secret".to_string());

    for pwd in [None, Some("secret"), Some("wrong")] {
        let result = VisibilityPolicy::default().evaluate(Some(future.clone()), now(), pwd);
        assert_eq!(
            result,
            PageLookupResult::NotFound(HiddenReason::NotYetAvailable)
        );
    }
}

#[test]
fn test_future_start_hides_page_even_when_enforcing_visibility() {
    let mut future = page();
    future.start_time = Some(now() + Duration::hours(1));

    let result = VisibilityPolicy::new(true).evaluate(Some(future), now(), None);

    assert!(matches!(result, PageLookupResult::NotFound(_)));
}

#[test]
fn test_window_bounds_are_strict() {
    let mut starts_now = page();
    starts_now.start_time = Some(now());
    assert!(matches!(
        VisibilityPolicy::default().evaluate(Some(starts_now), now(), None),
        PageLookupResult::Served(_)
    ));

    let mut ends_now = page();
    ends_now.end_time = Some(now());
    assert!(matches!(
        VisibilityPolicy::default().evaluate(Some(ends_now), now(), None),
        PageLookupResult::Served(_)
    ));
}

#[test]
fn test_past_end_is_expired() {
    let mut expired = page();
    expired.start_time = Some(now() - Duration::days(30));
    expired.end_time = Some(now() - Duration::seconds(1));

    let result = VisibilityPolicy::default().evaluate(Some(expired), now(), None);

    assert_eq!(result, PageLookupResult::NotFound(HiddenReason::Expired));
}

#[test]
fn test_password_gate_exposes_title_only() {
    let mut gated = page();
    gated.page_password = Some("secret".to_string());

    for pwd in [None, Some("wrong"), Some("")] {
        let result = VisibilityPolicy::default().evaluate(Some(gated.clone()), now(), pwd);
        assert_eq!(
            result,
            PageLookupResult::Protected(ProtectedPage {
                title: "Bando 2025".to_string(),
                is_protected: true,
            })
        );
    }

    let protected = serde_json::to_value(ProtectedPage {
        title: "Bando 2025".to_string(),
        is_protected: true,
    })
    .unwrap();
    assert_eq!(
        protected,
        json!({ "title": "Bando 2025", "is_protected": true })
    );
}

#[test]
fn test_matching_password_serves_page() {
    let mut gated = page();
    gated.page_password = Some("secret".to_string());

    let result = VisibilityPolicy::default().evaluate(Some(gated.clone()), now(), Some("secret"));

    assert_eq!(result, PageLookupResult::Served(gated));
}

#[test]
fn test_empty_password_is_no_gate() {
    let mut open = page();
    open.page_password = Some(String::new());

    let result = VisibilityPolicy::default().evaluate(Some(open), now(), None);

    assert!(matches!(result, PageLookupResult::Served(_)));
}

#[test]
fn test_visibility_flag_is_ignored_by_default() {
    let mut hidden = page();
    hidden.is_visible = false;

    let result = VisibilityPolicy::default().evaluate(Some(hidden), now(), None);

    assert!(matches!(result, PageLookupResult::Served(_)));
}

#[test]
fn test_visibility_flag_when_enforced() {
    let mut hidden = page();
    hidden.is_visible = false;

    let result = VisibilityPolicy::new(true).evaluate(Some(hidden), now(), None);

    assert_eq!(result, PageLookupResult::NotFound(HiddenReason::Unpublished));
}

#[test]
fn test_hidden_reasons_map_to_404_messages() {
    let cases = [
        (HiddenReason::Missing, "Page not found"),
        (HiddenReason::Unpublished, "Page not found"),
        (HiddenReason::NotYetAvailable, "Page not yet available"),
        (HiddenReason::Expired, "Page expired"),
    ];

    for (reason, message) in cases {
        let error = AppError::from(reason);
        assert_eq!(error.status(), axum::http::StatusCode::NOT_FOUND);
        assert_eq!(error.to_string(), message);
    }
}
