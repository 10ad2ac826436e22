use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::types::Json;
use sqlx::{Error as SqlxError, Row};
use std::time::Duration;
use tracing::{debug, error, info};

use crate::models::{BackendError, UserProfile};
use crate::services::doc_store_service::DocumentStore;
use crate::services::user_service::UserDirectory;

/// Postgres-backed document store and user directory.
///
/// Expects a `documents (id TEXT PRIMARY KEY, content JSONB, updated_at
/// TIMESTAMPTZ)` table and a `users (id TEXT PRIMARY KEY, username TEXT,
/// email TEXT)` table.
pub struct DbDocs {
    pool: PgPool,
}

impl DbDocs {
    /// Create a new database connection pool
    ///
    /// # Arguments
    /// * `database_url` - PostgreSQL connection string
    /// * `max_connections` - Upper bound of the pool
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, SqlxError> {
        info!("Connecting to database...");

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(2)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .max_lifetime(Duration::from_secs(1800))
            .connect(database_url)
            .await?;

        info!("Database connection pool created successfully");

        Ok(Self { pool })
    }

    fn log_pool_state(&self, action: &str, document_id: &str) {
        let pool_idle = self.pool.num_idle() as u32;
        let pool_size = self.pool.size();
        debug!(
            "{} document {}. Pool connections: {} idle, {} in use",
            action,
            document_id,
            pool_idle,
            pool_size.saturating_sub(pool_idle)
        );
    }
}

#[async_trait]
impl DocumentStore for DbDocs {
    async fn fetch(&self, document_id: &str) -> Result<Option<Value>, BackendError> {
        self.log_pool_state("Loading", document_id);

        let row = sqlx::query("SELECT content FROM documents WHERE id = $1")
            .bind(document_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                error!("Database error loading document '{}': {}", document_id, e);
                e
            })?;

        match row {
            Some(row) => {
                let content: Option<Json<Value>> = row.try_get("content")?;
                Ok(Some(content.map(|Json(v)| v).unwrap_or(Value::Null)))
            }
            None => Ok(None),
        }
    }

    async fn exists(&self, document_id: &str) -> Result<bool, BackendError> {
        let row = sqlx::query("SELECT EXISTS (SELECT 1 FROM documents WHERE id = $1) AS present")
            .bind(document_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get("present")?)
    }

    async fn overwrite(&self, document_id: &str, content: &Value) -> Result<(), BackendError> {
        self.log_pool_state("Saving", document_id);

        let result = sqlx::query("UPDATE documents SET content = $2, updated_at = NOW() WHERE id = $1")
            .bind(document_id)
            .bind(Json(content))
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(BackendError::MissingDocument(document_id.to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl UserDirectory for DbDocs {
    async fn find_user(&self, user_id: &str) -> Result<Option<UserProfile>, BackendError> {
        let row = sqlx::query("SELECT username, email FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(UserProfile {
                username: row.try_get("username")?,
                email: row.try_get("email")?,
            })),
            None => Ok(None),
        }
    }
}
