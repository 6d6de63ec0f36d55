use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::types::Json;
use std::time::{Duration, Instant};
use tracing::{info, instrument};

use super::{CredentialStore, StoreError, SummaryStore, UniqueField};
use crate::config::DatabaseConfig;
use crate::models::{
    Doi, Highlight, HighlightChanges, NewHighlight, NewUser, Summary, User, UserFlags, UserLookup,
};
use crate::services::metrics::observe_query;

const USER_COLUMNS: &str =
    "id, username, email, full_name, disabled, is_admin, hashed_password, created_at";
const HIGHLIGHT_COLUMNS: &str = "id, user_id, doi, highlight, comment, created_at";

/// Postgres backed store.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a connection pool sized from configuration.
    #[instrument(skip(config), fields(max = config.max_connections, min = config.min_connections))]
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, StoreError> {
        info!("Connecting to PostgreSQL");

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .max_lifetime(Duration::from_secs(1800))
            .connect(&config.url)
            .await?;

        info!("PostgreSQL connection pool established");
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run embedded database migrations.
    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<(), StoreError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("Database migrations completed");
        Ok(())
    }
}

/// Translate unique index violations into the field that collided.
fn map_unique_violation(err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
            match db_err.constraint() {
                Some(c) if c.contains("email") => StoreError::Duplicate(UniqueField::Email),
                _ => StoreError::Duplicate(UniqueField::Username),
            }
        }
        other => StoreError::Database(other),
    }
}

fn lookup_clause(lookup: &UserLookup) -> &'static str {
    match lookup {
        UserLookup::Id(_) => "id = $1",
        UserLookup::Username(_) => "username = $1",
        UserLookup::Email(_) => "email = $1",
    }
}

fn bind_lookup<'q, O>(
    query: sqlx::query::QueryAs<'q, sqlx::Postgres, O, sqlx::postgres::PgArguments>,
    lookup: &'q UserLookup,
) -> sqlx::query::QueryAs<'q, sqlx::Postgres, O, sqlx::postgres::PgArguments> {
    match lookup {
        UserLookup::Id(id) => query.bind(*id),
        UserLookup::Username(username) => query.bind(username.as_str()),
        UserLookup::Email(email) => query.bind(email.as_str()),
    }
}

#[async_trait]
impl CredentialStore for PgStore {
    async fn health_check(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    #[instrument(skip(self, user), fields(username = %user.username))]
    async fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        let started = Instant::now();
        let sql = format!(
            "INSERT INTO users (username, email, full_name, hashed_password) \
             VALUES ($1, $2, $3, $4) RETURNING {USER_COLUMNS}"
        );

        let created = sqlx::query_as::<_, User>(&sql)
            .bind(&user.username)
            .bind(&user.email)
            .bind(&user.full_name)
            .bind(&user.hashed_password)
            .fetch_one(&self.pool)
            .await
            .map_err(map_unique_violation)?;

        observe_query("create_user", started);
        info!(user_id = created.id, "User row inserted");
        Ok(created)
    }

    async fn find_user(&self, lookup: &UserLookup) -> Result<Option<User>, StoreError> {
        let started = Instant::now();
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users WHERE {}",
            lookup_clause(lookup)
        );

        let user = bind_lookup(sqlx::query_as::<_, User>(&sql), lookup)
            .fetch_optional(&self.pool)
            .await?;

        observe_query("find_user", started);
        Ok(user)
    }

    async fn username_exists(&self, username: &str) -> Result<bool, StoreError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE username = $1)")
                .bind(username)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn email_exists(&self, email: &str) -> Result<bool, StoreError> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
            .bind(email)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    #[instrument(skip(self))]
    async fn update_user_flags(
        &self,
        lookup: &UserLookup,
        flags: UserFlags,
    ) -> Result<Option<User>, StoreError> {
        let started = Instant::now();
        let sql = format!(
            "UPDATE users SET disabled = COALESCE($2, disabled), is_admin = COALESCE($3, is_admin) \
             WHERE {} RETURNING {USER_COLUMNS}",
            lookup_clause(lookup)
        );

        let user = bind_lookup(sqlx::query_as::<_, User>(&sql), lookup)
            .bind(flags.disabled)
            .bind(flags.is_admin)
            .fetch_optional(&self.pool)
            .await?;

        observe_query("update_user_flags", started);
        Ok(user)
    }

    #[instrument(skip(self))]
    async fn delete_user(&self, lookup: &UserLookup) -> Result<Option<User>, StoreError> {
        let started = Instant::now();
        let sql = format!(
            "DELETE FROM users WHERE {} RETURNING {USER_COLUMNS}",
            lookup_clause(lookup)
        );

        let user = bind_lookup(sqlx::query_as::<_, User>(&sql), lookup)
            .fetch_optional(&self.pool)
            .await?;

        observe_query("delete_user", started);
        Ok(user)
    }

    #[instrument(skip(self, highlight), fields(user_id = highlight.user_id, doi = %highlight.doi))]
    async fn create_highlight(&self, highlight: NewHighlight) -> Result<Highlight, StoreError> {
        let started = Instant::now();
        let sql = format!(
            "INSERT INTO highlights (user_id, doi, highlight, comment) \
             VALUES ($1, $2, $3, $4) RETURNING {HIGHLIGHT_COLUMNS}"
        );

        let created = sqlx::query_as::<_, Highlight>(&sql)
            .bind(highlight.user_id)
            .bind(highlight.doi.as_str())
            .bind(Json(&highlight.highlight))
            .bind(&highlight.comment)
            .fetch_one(&self.pool)
            .await?;

        observe_query("create_highlight", started);
        Ok(created)
    }

    async fn get_highlight(&self, id: i64) -> Result<Option<Highlight>, StoreError> {
        let started = Instant::now();
        let sql = format!("SELECT {HIGHLIGHT_COLUMNS} FROM highlights WHERE id = $1");

        let highlight = sqlx::query_as::<_, Highlight>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        observe_query("get_highlight", started);
        Ok(highlight)
    }

    async fn list_user_highlights(&self, user_id: i64) -> Result<Vec<Highlight>, StoreError> {
        let started = Instant::now();
        let sql = format!(
            "SELECT {HIGHLIGHT_COLUMNS} FROM highlights WHERE user_id = $1 ORDER BY id"
        );

        let highlights = sqlx::query_as::<_, Highlight>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        observe_query("list_user_highlights", started);
        Ok(highlights)
    }

    async fn list_highlights(&self, doi: Option<&Doi>) -> Result<Vec<Highlight>, StoreError> {
        let started = Instant::now();
        let sql = format!(
            "SELECT {HIGHLIGHT_COLUMNS} FROM highlights \
             WHERE ($1::text IS NULL OR doi = $1) ORDER BY id"
        );

        let highlights = sqlx::query_as::<_, Highlight>(&sql)
            .bind(doi.map(Doi::as_str))
            .fetch_all(&self.pool)
            .await?;

        observe_query("list_highlights", started);
        Ok(highlights)
    }

    #[instrument(skip(self, changes))]
    async fn update_owned_highlight(
        &self,
        id: i64,
        owner_id: i64,
        changes: HighlightChanges,
    ) -> Result<Option<Highlight>, StoreError> {
        let started = Instant::now();
        let sql = format!(
            "UPDATE highlights SET highlight = $4, comment = $5 \
             WHERE id = $1 AND user_id = $2 AND doi = $3 RETURNING {HIGHLIGHT_COLUMNS}"
        );

        let highlight = sqlx::query_as::<_, Highlight>(&sql)
            .bind(id)
            .bind(owner_id)
            .bind(changes.doi.as_str())
            .bind(Json(&changes.highlight))
            .bind(&changes.comment)
            .fetch_optional(&self.pool)
            .await?;

        observe_query("update_owned_highlight", started);
        Ok(highlight)
    }

    #[instrument(skip(self))]
    async fn delete_owned_highlight(
        &self,
        id: i64,
        owner_id: i64,
    ) -> Result<Option<Highlight>, StoreError> {
        let started = Instant::now();
        let sql = format!(
            "DELETE FROM highlights WHERE id = $1 AND user_id = $2 RETURNING {HIGHLIGHT_COLUMNS}"
        );

        let highlight = sqlx::query_as::<_, Highlight>(&sql)
            .bind(id)
            .bind(owner_id)
            .fetch_optional(&self.pool)
            .await?;

        observe_query("delete_owned_highlight", started);
        Ok(highlight)
    }
}

#[async_trait]
impl SummaryStore for PgStore {
    async fn create_summary(&self, url: &str) -> Result<Summary, StoreError> {
        let summary = sqlx::query_as::<_, Summary>(
            r#"
            INSERT INTO summaries (url, summary)
            VALUES ($1, '')
            RETURNING id, url, summary, created_at
            "#,
        )
        .bind(url)
        .fetch_one(&self.pool)
        .await?;
        Ok(summary)
    }

    async fn get_summary(&self, id: i64) -> Result<Option<Summary>, StoreError> {
        let summary = sqlx::query_as::<_, Summary>(
            "SELECT id, url, summary, created_at FROM summaries WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(summary)
    }

    async fn list_summaries(&self) -> Result<Vec<Summary>, StoreError> {
        let summaries = sqlx::query_as::<_, Summary>(
            "SELECT id, url, summary, created_at FROM summaries ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(summaries)
    }

    async fn update_summary(
        &self,
        id: i64,
        url: &str,
        summary: &str,
    ) -> Result<Option<Summary>, StoreError> {
        let updated = sqlx::query_as::<_, Summary>(
            r#"
            UPDATE summaries SET url = $2, summary = $3
            WHERE id = $1
            RETURNING id, url, summary, created_at
            "#,
        )
        .bind(id)
        .bind(url)
        .bind(summary)
        .fetch_optional(&self.pool)
        .await?;
        Ok(updated)
    }

    async fn set_summary_text(&self, id: i64, summary: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("UPDATE summaries SET summary = $2 WHERE id = $1")
            .bind(id)
            .bind(summary)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn delete_summary(&self, id: i64) -> Result<Option<Summary>, StoreError> {
        let deleted = sqlx::query_as::<_, Summary>(
            "DELETE FROM summaries WHERE id = $1 RETURNING id, url, summary, created_at",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> DatabaseConfig {
        DatabaseConfig {
            url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgres://localhost/citations_test".to_string()),
            max_connections: 2,
            min_connections: 1,
        }
    }

    #[tokio::test]
    #[ignore] // Requires running PostgreSQL
    async fn duplicate_username_maps_to_conflict() {
        let store = PgStore::connect(&config()).await.unwrap();
        store.run_migrations().await.unwrap();

        let username = format!("pg_{}", chrono::Utc::now().timestamp_nanos_opt().unwrap_or(0));
        let new_user = |email: &str| NewUser {
            username: username.clone(),
            email: email.to_string(),
            full_name: None,
            hashed_password: "$argon2id$stub".to_string(),
        };

        let created = store
            .create_user(new_user(&format!("{}@x.com", username)))
            .await
            .unwrap();
        let err = store
            .create_user(new_user(&format!("{}-2@x.com", username)))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(UniqueField::Username)));

        store.delete_user(&UserLookup::Id(created.id)).await.unwrap();
    }

    #[tokio::test]
    #[ignore] // Requires running PostgreSQL
    async fn owned_update_is_conditional_on_owner() {
        let store = PgStore::connect(&config()).await.unwrap();
        store.run_migrations().await.unwrap();

        let tag = chrono::Utc::now().timestamp_nanos_opt().unwrap_or(0);
        let owner = store
            .create_user(NewUser {
                username: format!("owner_{}", tag),
                email: format!("owner_{}@x.com", tag),
                full_name: None,
                hashed_password: "$argon2id$stub".to_string(),
            })
            .await
            .unwrap();

        let doi = Doi::parse("10.1234/pg.test").unwrap();
        let highlight = store
            .create_highlight(NewHighlight {
                user_id: owner.id,
                doi: doi.clone(),
                highlight: Default::default(),
                comment: None,
            })
            .await
            .unwrap();

        let changes = HighlightChanges {
            doi,
            highlight: Default::default(),
            comment: Some("edited".to_string()),
        };
        assert!(store
            .update_owned_highlight(highlight.id, owner.id + 1_000_000, changes.clone())
            .await
            .unwrap()
            .is_none());
        let updated = store
            .update_owned_highlight(highlight.id, owner.id, changes)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.comment.as_deref(), Some("edited"));

        store.delete_user(&UserLookup::Id(owner.id)).await.unwrap();
        assert!(store.get_highlight(highlight.id).await.unwrap().is_none());
    }
}
