use crate::{
    models::{
        CompetitionCv, ContactMessage, CreateContactRequest, CustomPage, FooterLink,
        FooterLinkInput, MenuItem, NewCompetitionCv, PageSummary, SiteSetting, UpsertPageRequest,
    },
    settings::SettingsStore,
};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::{PgPool, types::Json};
use std::sync::Arc;

/// Repository Trait
///
/// Defines the abstract contract for all persistence operations on site content. Handlers,
/// the visibility policy and the submission gate talk to this trait only, so tests can swap
/// the Postgres implementation for an in-memory one.
///
/// Every write is last-writer-wins: there is no versioning and no optimistic concurrency.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Menu & Footer ---
    // None when the menu has never been saved.
    async fn get_menu(&self) -> Result<Option<Vec<MenuItem>>, sqlx::Error>;
    // Singleton upsert (id = 1); the whole tree is replaced.
    async fn save_menu(&self, structure: Vec<MenuItem>) -> Result<(), sqlx::Error>;
    // Ordered by position ascending.
    async fn get_footer_links(&self) -> Result<Vec<FooterLink>, sqlx::Error>;
    // Delete-all then insert-each.
    async fn replace_footer_links(&self, links: Vec<FooterLinkInput>) -> Result<(), sqlx::Error>;

    // --- Pages ---
    // Restricted projection, ordered by id ascending.
    async fn list_pages(&self) -> Result<Vec<PageSummary>, sqlx::Error>;
    async fn get_page_by_slug(&self, slug: &str) -> Result<Option<CustomPage>, sqlx::Error>;
    // id present => update, absent => insert. The id is never derived from the slug.
    async fn upsert_page(&self, page: UpsertPageRequest) -> Result<(), sqlx::Error>;
    // Returns true if a row was removed.
    async fn delete_page(&self, id: i32) -> Result<bool, sqlx::Error>;

    // --- Job Applications ---
    // True if the page already holds an application with this tax code OR this email.
    async fn cv_exists(
        &self,
        page_slug: Option<&str>,
        tax_code: &str,
        email: &str,
    ) -> Result<bool, sqlx::Error>;
    async fn count_cvs(&self, page_slug: Option<&str>) -> Result<i64, sqlx::Error>;
    async fn insert_cv(&self, cv: NewCompetitionCv) -> Result<(), sqlx::Error>;
    // Newest first.
    async fn list_cvs(&self) -> Result<Vec<CompetitionCv>, sqlx::Error>;
    async fn delete_cv(&self, id: i32) -> Result<bool, sqlx::Error>;

    // --- Free-form Content ---
    async fn get_content(&self, page_name: &str) -> Result<Option<Value>, sqlx::Error>;
    async fn save_content(&self, page_name: &str, content: Value) -> Result<(), sqlx::Error>;

    // --- Contact Messages ---
    async fn insert_contact(&self, message: CreateContactRequest) -> Result<(), sqlx::Error>;
    // Newest first.
    async fn list_messages(&self) -> Result<Vec<ContactMessage>, sqlx::Error>;
    async fn delete_message(&self, id: i32) -> Result<bool, sqlx::Error>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer access across the application state.
pub type RepositoryState = Arc<dyn Repository>;

const PAGE_COLUMNS: &str = "id, slug, title, is_visible, blocks, start_time, end_time, \
                            page_password, meta_desc, meta_keywords";

const CV_COLUMNS: &str = "id, submission_datetime, surname, name, tax_code, birth_place, \
                          address, zip_code, city, email, phone, ip_address, page_slug, file_path";

/// PostgresRepository
///
/// The concrete implementation of `Repository` and `SettingsStore`, backed by PostgreSQL.
/// Every operation is a single parameterized statement, except the footer replacement
/// which runs inside one transaction.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn get_menu(&self) -> Result<Option<Vec<MenuItem>>, sqlx::Error> {
        let structure = sqlx::query_scalar::<_, Json<Vec<MenuItem>>>(
            "SELECT structure FROM site_menu WHERE id = 1",
        )
        .fetch_optional(&self.pool)
        .await?;
        Ok(structure.map(|Json(items)| items))
    }

    async fn save_menu(&self, structure: Vec<MenuItem>) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO site_menu (id, structure) VALUES (1, $1) \
             ON CONFLICT (id) DO UPDATE SET structure = EXCLUDED.structure",
        )
        .bind(Json(structure))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_footer_links(&self) -> Result<Vec<FooterLink>, sqlx::Error> {
        sqlx::query_as::<_, FooterLink>(
            "SELECT id, label, url, section, position FROM footer_links ORDER BY position ASC, id ASC",
        )
        .fetch_all(&self.pool)
        .await
    }

    /// replace_footer_links
    ///
    /// Deletes every link and re-inserts the submitted set inside one transaction:
    /// readers see either the old set or the new one.
    async fn replace_footer_links(&self, links: Vec<FooterLinkInput>) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM footer_links")
            .execute(&mut *tx)
            .await?;

        for link in links {
            sqlx::query(
                "INSERT INTO footer_links (label, url, section, position) VALUES ($1, $2, $3, $4)",
            )
            .bind(link.label)
            .bind(link.url)
            .bind(link.section)
            .bind(link.position)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await
    }

    async fn list_pages(&self) -> Result<Vec<PageSummary>, sqlx::Error> {
        sqlx::query_as::<_, PageSummary>(
            r#"
            SELECT id, slug, title, is_visible, start_time, end_time, meta_desc, meta_keywords,
                   COALESCE(page_password, '') <> '' AS is_protected
            FROM custom_pages
            ORDER BY id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
    }

    /// get_page_by_slug
    ///
    /// Slug uniqueness is not enforced by the schema; the lowest id wins on collisions.
    async fn get_page_by_slug(&self, slug: &str) -> Result<Option<CustomPage>, sqlx::Error> {
        let query =
            format!("SELECT {PAGE_COLUMNS} FROM custom_pages WHERE slug = $1 ORDER BY id ASC LIMIT 1");
        sqlx::query_as::<_, CustomPage>(&query)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await
    }

    /// upsert_page
    ///
    /// Updating a missing id affects zero rows and is not reported as an error.
    async fn upsert_page(&self, page: UpsertPageRequest) -> Result<(), sqlx::Error> {
        let query = match page.existing_id() {
            Some(_) => {
                "UPDATE custom_pages SET slug = $1, title = $2, is_visible = $3, blocks = $4, \
                 start_time = $5, end_time = $6, page_password = $7, meta_desc = $8, \
                 meta_keywords = $9 WHERE id = $10"
            }
            None => {
                "INSERT INTO custom_pages (slug, title, is_visible, blocks, start_time, end_time, \
                 page_password, meta_desc, meta_keywords) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)"
            }
        };

        let mut statement = sqlx::query(query)
            .bind(&page.slug)
            .bind(&page.title)
            .bind(page.is_visible)
            .bind(&page.blocks)
            .bind(page.start_time)
            .bind(page.end_time)
            .bind(&page.page_password)
            .bind(&page.meta_desc)
            .bind(&page.meta_keywords);

        if let Some(id) = page.existing_id() {
            statement = statement.bind(id);
        }

        statement.execute(&self.pool).await?;
        Ok(())
    }

    async fn delete_page(&self, id: i32) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM custom_pages WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// cv_exists
    ///
    /// Plain SQL equality: a NULL page slug never matches, mirroring the lack of a
    /// uniqueness constraint. Check-then-insert is not atomic.
    async fn cv_exists(
        &self,
        page_slug: Option<&str>,
        tax_code: &str,
        email: &str,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM competition_cvs \
             WHERE page_slug = $1 AND (tax_code = $2 OR email = $3))",
        )
        .bind(page_slug)
        .bind(tax_code)
        .bind(email)
        .fetch_one(&self.pool)
        .await
    }

    async fn count_cvs(&self, page_slug: Option<&str>) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM competition_cvs WHERE page_slug = $1")
            .bind(page_slug)
            .fetch_one(&self.pool)
            .await
    }

    async fn insert_cv(&self, cv: NewCompetitionCv) -> Result<(), sqlx::Error> {
        let NewCompetitionCv {
            application,
            ip_address,
            file_path,
        } = cv;

        sqlx::query(
            r#"
            INSERT INTO competition_cvs
                (submission_datetime, surname, name, tax_code, birth_place, address, zip_code,
                 city, email, phone, ip_address, page_slug, file_path)
            VALUES (NOW(), $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(application.surname)
        .bind(application.name)
        .bind(application.tax_code)
        .bind(application.birth_place)
        .bind(application.address)
        .bind(application.zip_code)
        .bind(application.city)
        .bind(application.email)
        .bind(application.phone)
        .bind(ip_address)
        .bind(application.page_slug)
        .bind(file_path)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_cvs(&self) -> Result<Vec<CompetitionCv>, sqlx::Error> {
        let query =
            format!("SELECT {CV_COLUMNS} FROM competition_cvs ORDER BY submission_datetime DESC");
        sqlx::query_as::<_, CompetitionCv>(&query)
            .fetch_all(&self.pool)
            .await
    }

    async fn delete_cv(&self, id: i32) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM competition_cvs WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn get_content(&self, page_name: &str) -> Result<Option<Value>, sqlx::Error> {
        sqlx::query_scalar::<_, Value>("SELECT content FROM site_content WHERE page_name = $1")
            .bind(page_name)
            .fetch_optional(&self.pool)
            .await
    }

    async fn save_content(&self, page_name: &str, content: Value) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO site_content (page_name, content) VALUES ($1, $2) \
             ON CONFLICT (page_name) DO UPDATE SET content = EXCLUDED.content",
        )
        .bind(page_name)
        .bind(content)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn insert_contact(&self, message: CreateContactRequest) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO contact_messages (name, surname, email, message) VALUES ($1, $2, $3, $4)",
        )
        .bind(message.name)
        .bind(message.surname)
        .bind(message.email)
        .bind(message.message)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_messages(&self) -> Result<Vec<ContactMessage>, sqlx::Error> {
        sqlx::query_as::<_, ContactMessage>(
            "SELECT id, name, surname, email, message, created_at FROM contact_messages \
             ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await
    }

    async fn delete_message(&self, id: i32) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM contact_messages WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl SettingsStore for PostgresRepository {
    async fn list_settings(&self) -> Result<Vec<SiteSetting>, sqlx::Error> {
        sqlx::query_as::<_, SiteSetting>("SELECT key, value FROM site_settings")
            .fetch_all(&self.pool)
            .await
    }

    async fn get_settings(&self, keys: &[&str]) -> Result<Vec<SiteSetting>, sqlx::Error> {
        let keys: Vec<String> = keys.iter().map(|key| key.to_string()).collect();
        sqlx::query_as::<_, SiteSetting>("SELECT key, value FROM site_settings WHERE key = ANY($1)")
            .bind(keys)
            .fetch_all(&self.pool)
            .await
    }

    async fn upsert_settings(&self, items: Vec<SiteSetting>) -> Result<(), sqlx::Error> {
        for item in items {
            sqlx::query(
                "INSERT INTO site_settings (key, value) VALUES ($1, $2) \
                 ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value",
            )
            .bind(item.key)
            .bind(item.value)
            .execute(&self.pool)
            .await?;
        }
        Ok(())
    }
}
