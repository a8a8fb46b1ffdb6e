#![allow(dead_code)]

use async_trait::async_trait;
use axum::{Json, Router, routing::get};
use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use serde_json::{Value, json};
use site_cms::{
    AppConfig, AppState, create_router,
    auth::{Claims, TokenVerifier, VerifierState, VerifyError},
    models::{
        CompetitionCv, ContactMessage, CreateContactRequest, CustomPage, FooterLink,
        FooterLinkInput, MenuItem, NewCompetitionCv, PageSummary, SiteSetting, UpsertPageRequest,
    },
    repository::{Repository, RepositoryState},
    settings::{SettingsState, SettingsStore},
    storage::StorageState,
};
use std::{
    collections::HashMap,
    net::SocketAddr,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};
use tokio::net::TcpListener;

pub const ADMIN_TOKEN: &str = "valid-admin-token";

pub const SIGNING_KEY_PEM: &str = include_str!("../fixtures/signing_key.pem");
pub const SIGNING_KEY_N: &str = include_str!("../fixtures/signing_key.n");
pub const ROGUE_KEY_PEM: &str = include_str!("../fixtures/rogue_key.pem");
pub const ROGUE_KEY_N: &str = include_str!("../fixtures/rogue_key.n");

// --- IN-MEMORY REPOSITORY ---

#[derive(Default)]
struct Store {
    menu: Option<Vec<MenuItem>>,
    footer: Vec<FooterLink>,
    pages: Vec<CustomPage>,
    cvs: Vec<CompetitionCv>,
    content: HashMap<String, Value>,
    messages: Vec<ContactMessage>,
    settings: Vec<SiteSetting>,
    next_id: i32,
}

impl Store {
    fn next_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }
}

/// Mirrors the SQL semantics of `PostgresRepository` without a database.
#[derive(Default)]
pub struct InMemoryRepository {
    store: Mutex<Store>,
    /// When true, `insert_cv` fails like a lost connection would.
    pub fail_cv_inserts: bool,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_cv_inserts() -> Self {
        Self {
            fail_cv_inserts: true,
            ..Self::default()
        }
    }

    pub fn with_settings(settings: &[(&str, &str)]) -> Self {
        let repo = Self::new();
        repo.store.lock().unwrap().settings = settings
            .iter()
            .map(|(key, value)| SiteSetting {
                key: key.to_string(),
                value: value.to_string(),
            })
            .collect();
        repo
    }

    pub fn insert_page(&self, mut page: CustomPage) -> i32 {
        let mut store = self.store.lock().unwrap();
        page.id = store.next_id();
        let id = page.id;
        store.pages.push(page);
        id
    }

    pub fn cv_count(&self) -> usize {
        self.store.lock().unwrap().cvs.len()
    }

    pub fn cvs(&self) -> Vec<CompetitionCv> {
        self.store.lock().unwrap().cvs.clone()
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn get_menu(&self) -> Result<Option<Vec<MenuItem>>, sqlx::Error> {
        Ok(self.store.lock().unwrap().menu.clone())
    }

    async fn save_menu(&self, structure: Vec<MenuItem>) -> Result<(), sqlx::Error> {
        self.store.lock().unwrap().menu = Some(structure);
        Ok(())
    }

    async fn get_footer_links(&self) -> Result<Vec<FooterLink>, sqlx::Error> {
        let mut links = self.store.lock().unwrap().footer.clone();
        links.sort_by_key(|link| (link.position, link.id));
        Ok(links)
    }

    async fn replace_footer_links(&self, links: Vec<FooterLinkInput>) -> Result<(), sqlx::Error> {
        let mut store = self.store.lock().unwrap();
        store.footer.clear();
        for link in links {
            let id = store.next_id();
            store.footer.push(FooterLink {
                id,
                label: link.label,
                url: link.url,
                section: link.section,
                position: link.position,
            });
        }
        Ok(())
    }

    async fn list_pages(&self) -> Result<Vec<PageSummary>, sqlx::Error> {
        let store = self.store.lock().unwrap();
        let mut pages: Vec<PageSummary> = store
            .pages
            .iter()
            .map(|page| PageSummary {
                id: page.id,
                slug: page.slug.clone(),
                title: page.title.clone(),
                is_visible: page.is_visible,
                start_time: page.start_time,
                end_time: page.end_time,
                meta_desc: page.meta_desc.clone(),
                meta_keywords: page.meta_keywords.clone(),
                is_protected: page.is_password_protected(),
            })
            .collect();
        pages.sort_by_key(|page| page.id);
        Ok(pages)
    }

    async fn get_page_by_slug(&self, slug: &str) -> Result<Option<CustomPage>, sqlx::Error> {
        let store = self.store.lock().unwrap();
        Ok(store
            .pages
            .iter()
            .filter(|page| page.slug == slug)
            .min_by_key(|page| page.id)
            .cloned())
    }

    async fn upsert_page(&self, page: UpsertPageRequest) -> Result<(), sqlx::Error> {
        let mut store = self.store.lock().unwrap();
        let existing_id = page.existing_id();
        let id = match existing_id {
            Some(id) => id,
            None => store.next_id(),
        };
        let record = CustomPage {
            id,
            slug: page.slug,
            title: page.title,
            is_visible: page.is_visible,
            blocks: page.blocks,
            start_time: page.start_time,
            end_time: page.end_time,
            page_password: page.page_password,
            meta_desc: page.meta_desc,
            meta_keywords: page.meta_keywords,
        };

        match existing_id {
            // Updating a missing row is a no-op, like an UPDATE matching nothing.
            Some(id) => {
                if let Some(existing) = store.pages.iter_mut().find(|p| p.id == id) {
                    *existing = record;
                }
            }
            None => store.pages.push(record),
        }
        Ok(())
    }

    async fn delete_page(&self, id: i32) -> Result<bool, sqlx::Error> {
        let mut store = self.store.lock().unwrap();
        let before = store.pages.len();
        store.pages.retain(|page| page.id != id);
        Ok(store.pages.len() != before)
    }

    async fn cv_exists(
        &self,
        page_slug: Option<&str>,
        tax_code: &str,
        email: &str,
    ) -> Result<bool, sqlx::Error> {
        let Some(slug) = page_slug else {
            return Ok(false);
        };
        let store = self.store.lock().unwrap();
        Ok(store.cvs.iter().any(|cv| {
            cv.page_slug.as_deref() == Some(slug) && (cv.tax_code == tax_code || cv.email == email)
        }))
    }

    async fn count_cvs(&self, page_slug: Option<&str>) -> Result<i64, sqlx::Error> {
        let Some(slug) = page_slug else {
            return Ok(0);
        };
        let store = self.store.lock().unwrap();
        Ok(store
            .cvs
            .iter()
            .filter(|cv| cv.page_slug.as_deref() == Some(slug))
            .count() as i64)
    }

    async fn insert_cv(&self, cv: NewCompetitionCv) -> Result<(), sqlx::Error> {
        if self.fail_cv_inserts {
            return Err(sqlx::Error::PoolTimedOut);
        }
        let mut store = self.store.lock().unwrap();
        let id = store.next_id();
        let application = cv.application;
        store.cvs.push(CompetitionCv {
            id,
            submission_datetime: Utc::now(),
            surname: application.surname,
            name: application.name,
            tax_code: application.tax_code,
            birth_place: application.birth_place,
            address: application.address,
            zip_code: application.zip_code,
            city: application.city,
            email: application.email,
            phone: application.phone,
            ip_address: Some(cv.ip_address),
            page_slug: application.page_slug,
            file_path: cv.file_path,
        });
        Ok(())
    }

    async fn list_cvs(&self) -> Result<Vec<CompetitionCv>, sqlx::Error> {
        let mut cvs = self.store.lock().unwrap().cvs.clone();
        cvs.reverse();
        Ok(cvs)
    }

    async fn delete_cv(&self, id: i32) -> Result<bool, sqlx::Error> {
        let mut store = self.store.lock().unwrap();
        let before = store.cvs.len();
        store.cvs.retain(|cv| cv.id != id);
        Ok(store.cvs.len() != before)
    }

    async fn get_content(&self, page_name: &str) -> Result<Option<Value>, sqlx::Error> {
        Ok(self.store.lock().unwrap().content.get(page_name).cloned())
    }

    async fn save_content(&self, page_name: &str, content: Value) -> Result<(), sqlx::Error> {
        self.store
            .lock()
            .unwrap()
            .content
            .insert(page_name.to_string(), content);
        Ok(())
    }

    async fn insert_contact(&self, message: CreateContactRequest) -> Result<(), sqlx::Error> {
        let mut store = self.store.lock().unwrap();
        let id = store.next_id();
        store.messages.push(ContactMessage {
            id,
            name: message.name,
            surname: message.surname,
            email: message.email,
            message: message.message,
            created_at: Utc::now(),
        });
        Ok(())
    }

    async fn list_messages(&self) -> Result<Vec<ContactMessage>, sqlx::Error> {
        let mut messages = self.store.lock().unwrap().messages.clone();
        messages.reverse();
        Ok(messages)
    }

    async fn delete_message(&self, id: i32) -> Result<bool, sqlx::Error> {
        let mut store = self.store.lock().unwrap();
        let before = store.messages.len();
        store.messages.retain(|message| message.id != id);
        Ok(store.messages.len() != before)
    }
}

#[async_trait]
impl SettingsStore for InMemoryRepository {
    async fn list_settings(&self) -> Result<Vec<SiteSetting>, sqlx::Error> {
        Ok(self.store.lock().unwrap().settings.clone())
    }

    async fn get_settings(&self, keys: &[&str]) -> Result<Vec<SiteSetting>, sqlx::Error> {
        let store = self.store.lock().unwrap();
        Ok(store
            .settings
            .iter()
            .filter(|setting| keys.contains(&setting.key.as_str()))
            .cloned()
            .collect())
    }

    async fn upsert_settings(&self, items: Vec<SiteSetting>) -> Result<(), sqlx::Error> {
        let mut store = self.store.lock().unwrap();
        for item in items {
            match store.settings.iter_mut().find(|s| s.key == item.key) {
                Some(existing) => existing.value = item.value,
                None => store.settings.push(item),
            }
        }
        Ok(())
    }
}

// --- TOKEN VERIFIER DOUBLE ---

/// Accepts exactly `ADMIN_TOKEN`.
pub struct StaticVerifier;

#[async_trait]
impl TokenVerifier for StaticVerifier {
    async fn verify(&self, token: &str) -> Result<Claims, VerifyError> {
        if token == ADMIN_TOKEN {
            Ok(Claims {
                sub: "admin-subject".to_string(),
                exp: usize::MAX,
                iat: None,
                preferred_username: Some("admin".to_string()),
                email: None,
            })
        } else {
            Err(VerifyError::UnknownKey(None))
        }
    }
}

// --- APP ASSEMBLY ---

pub fn build_state(
    repo: Arc<InMemoryRepository>,
    storage: StorageState,
    verifier: VerifierState,
    config: AppConfig,
) -> AppState {
    AppState {
        repo: repo.clone() as RepositoryState,
        settings: repo as SettingsState,
        storage,
        verifier,
        config,
    }
}

/// Serves the real router on an ephemeral port and returns its base URL.
pub async fn spawn_app(state: AppState) -> String {
    let router = create_router(state);

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind port");
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });

    format!("http://127.0.0.1:{}", port)
}

// --- JWKS FIXTURES ---

pub fn rsa_jwk(kid: &str, n: &str) -> Value {
    json!({
        "kty": "RSA",
        "use": "sig",
        "alg": "RS256",
        "kid": kid,
        "n": n.trim(),
        "e": "AQAB"
    })
}

/// Serves `document` at `/certs` and counts the fetches.
pub async fn spawn_jwks_server(document: Value) -> (String, Arc<AtomicUsize>) {
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();

    let router = Router::new().route(
        "/certs",
        get(move || {
            let counter = counter.clone();
            let document = document.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Json(document)
            }
        }),
    );

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind port");
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    (format!("http://127.0.0.1:{}/certs", port), hits)
}

pub fn claims_expiring_in(seconds: i64) -> Claims {
    let now = Utc::now().timestamp();
    Claims {
        sub: "f3c1a2b4-admin".to_string(),
        exp: (now + seconds) as usize,
        iat: Some(now as usize),
        preferred_username: Some("editor".to_string()),
        email: Some("editor@example.org".to_string()),
    }
}

pub fn sign_rs256(pem: &str, kid: Option<&str>, claims: &Claims) -> String {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = kid.map(str::to_string);
    let key = EncodingKey::from_rsa_pem(pem.as_bytes()).unwrap();
    encode(&header, claims, &key).unwrap()
}

pub fn hits(counter: &AtomicUsize) -> usize {
    counter.load(Ordering::SeqCst)
}
