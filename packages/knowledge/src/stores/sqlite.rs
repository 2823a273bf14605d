//! SQLite storage implementation.
//!
//! A file-based knowledge store using SQLite. Good for:
//! - Local development
//! - Single-server deployments
//! - Testing with persistent data
//!
//! Values and tags are stored as JSON text; timestamps as RFC 3339.

use async_trait::async_trait;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::{KnowledgeError, Result};
use crate::traits::store::KnowledgeStore;
use crate::types::field::FieldValue;
use crate::types::knowledge::{KnowledgeItem, KnowledgeKey, KnowledgeStatus};

/// SQLite-based knowledge store.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Create a new SQLite store with the given connection URL.
    ///
    /// # Example URLs
    /// - `sqlite::memory:` - In-memory database (ephemeral)
    /// - `sqlite:./knowledge.db` - File-based database
    pub async fn new(database_url: &str) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .map_err(|e| KnowledgeError::Storage(e.to_string().into()))?;

        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    /// Create an in-memory SQLite store (for testing).
    pub async fn in_memory() -> Result<Self> {
        Self::new("sqlite::memory:").await
    }

    /// Run database migrations.
    async fn run_migrations(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS knowledge_items (
                id TEXT PRIMARY KEY,
                client_id TEXT,
                project_id TEXT,
                field_path TEXT NOT NULL,
                value TEXT NOT NULL,
                label TEXT NOT NULL,
                category TEXT NOT NULL,
                is_canonical INTEGER NOT NULL,
                tags TEXT NOT NULL DEFAULT '[]',
                status TEXT NOT NULL,
                source_document_id TEXT NOT NULL,
                source_document_name TEXT NOT NULL,
                source_text TEXT NOT NULL,
                original_label TEXT NOT NULL,
                normalization_confidence REAL NOT NULL,
                superseded_by TEXT,
                added_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_knowledge_source
                ON knowledge_items(source_document_id, field_path);
            CREATE INDEX IF NOT EXISTS idx_knowledge_client
                ON knowledge_items(client_id, field_path, status);
            CREATE INDEX IF NOT EXISTS idx_knowledge_project
                ON knowledge_items(project_id, field_path, status);
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| KnowledgeError::Storage(e.to_string().into()))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS reconciled_documents (
                document_id TEXT PRIMARY KEY,
                reconciled_at TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| KnowledgeError::Storage(e.to_string().into()))?;

        Ok(())
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

const ITEM_COLUMNS: &str = "id, client_id, project_id, field_path, value, label, category, \
    is_canonical, tags, status, source_document_id, source_document_name, source_text, \
    original_label, normalization_confidence, superseded_by, added_at, updated_at";

// Row type for sqlx queries
#[derive(Debug, FromRow)]
struct KnowledgeRow {
    id: String,
    client_id: Option<String>,
    project_id: Option<String>,
    field_path: String,
    value: String,
    label: String,
    category: String,
    is_canonical: bool,
    tags: String,
    status: String,
    source_document_id: String,
    source_document_name: String,
    source_text: String,
    original_label: String,
    normalization_confidence: f32,
    superseded_by: Option<String>,
    added_at: String,
    updated_at: String,
}

fn parse_uuid(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw)
        .map_err(|e| KnowledgeError::Storage(format!("invalid uuid `{raw}`: {e}").into()))
}

fn parse_timestamp(raw: &str) -> Result<chrono::DateTime<chrono::Utc>> {
    chrono::DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&chrono::Utc))
        .map_err(|e| KnowledgeError::Storage(format!("invalid timestamp: {e}").into()))
}

impl KnowledgeRow {
    fn into_item(self) -> Result<KnowledgeItem> {
        let value: FieldValue = serde_json::from_str(&self.value)?;
        let tags: Vec<String> = serde_json::from_str(&self.tags)?;
        let status = KnowledgeStatus::parse(&self.status).ok_or_else(|| {
            KnowledgeError::Storage(format!("invalid status `{}`", self.status).into())
        })?;

        Ok(KnowledgeItem {
            id: parse_uuid(&self.id)?,
            client_id: self.client_id.as_deref().map(parse_uuid).transpose()?,
            project_id: self.project_id.as_deref().map(parse_uuid).transpose()?,
            field_path: self.field_path,
            value,
            label: self.label,
            category: self.category,
            is_canonical: self.is_canonical,
            tags,
            status,
            source_document_id: parse_uuid(&self.source_document_id)?,
            source_document_name: self.source_document_name,
            source_text: self.source_text,
            original_label: self.original_label,
            normalization_confidence: self.normalization_confidence,
            superseded_by: self.superseded_by.as_deref().map(parse_uuid).transpose()?,
            added_at: parse_timestamp(&self.added_at)?,
            updated_at: parse_timestamp(&self.updated_at)?,
        })
    }
}

fn rows_into_items(rows: Vec<KnowledgeRow>) -> Result<Vec<KnowledgeItem>> {
    rows.into_iter().map(KnowledgeRow::into_item).collect()
}

#[async_trait]
impl KnowledgeStore for SqliteStore {
    async fn find_by_source(
        &self,
        document_id: Uuid,
        field_path: &str,
    ) -> Result<Option<KnowledgeItem>> {
        let row = sqlx::query_as::<_, KnowledgeRow>(&format!(
            "SELECT {ITEM_COLUMNS} FROM knowledge_items \
             WHERE source_document_id = ? AND field_path = ? \
             ORDER BY CASE WHEN status = 'active' THEN 0 ELSE 1 END \
             LIMIT 1"
        ))
        .bind(document_id.to_string())
        .bind(field_path)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| KnowledgeError::Storage(e.to_string().into()))?;

        row.map(KnowledgeRow::into_item).transpose()
    }

    async fn find_active(&self, key: &KnowledgeKey) -> Result<Option<KnowledgeItem>> {
        let row = sqlx::query_as::<_, KnowledgeRow>(&format!(
            "SELECT {ITEM_COLUMNS} FROM knowledge_items \
             WHERE client_id IS ? AND project_id IS ? AND field_path = ? \
               AND status = 'active' \
             LIMIT 1"
        ))
        .bind(key.client_id.map(|id| id.to_string()))
        .bind(key.project_id.map(|id| id.to_string()))
        .bind(&key.field_path)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| KnowledgeError::Storage(e.to_string().into()))?;

        row.map(KnowledgeRow::into_item).transpose()
    }

    async fn insert(&self, item: &KnowledgeItem) -> Result<()> {
        let value = serde_json::to_string(&item.value)?;
        let tags = serde_json::to_string(&item.tags)?;

        sqlx::query(
            r#"
            INSERT INTO knowledge_items (
                id, client_id, project_id, field_path, value, label, category,
                is_canonical, tags, status, source_document_id, source_document_name,
                source_text, original_label, normalization_confidence, superseded_by,
                added_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(item.id.to_string())
        .bind(item.client_id.map(|id| id.to_string()))
        .bind(item.project_id.map(|id| id.to_string()))
        .bind(&item.field_path)
        .bind(&value)
        .bind(&item.label)
        .bind(&item.category)
        .bind(item.is_canonical)
        .bind(&tags)
        .bind(item.status.as_str())
        .bind(item.source_document_id.to_string())
        .bind(&item.source_document_name)
        .bind(&item.source_text)
        .bind(&item.original_label)
        .bind(item.normalization_confidence)
        .bind(item.superseded_by.map(|id| id.to_string()))
        .bind(item.added_at.to_rfc3339())
        .bind(item.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| KnowledgeError::Storage(e.to_string().into()))?;

        Ok(())
    }

    async fn update(&self, item: &KnowledgeItem) -> Result<()> {
        let value = serde_json::to_string(&item.value)?;
        let tags = serde_json::to_string(&item.tags)?;

        let result = sqlx::query(
            r#"
            UPDATE knowledge_items SET
                value = ?,
                label = ?,
                source_text = ?,
                normalization_confidence = ?,
                tags = ?,
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&value)
        .bind(&item.label)
        .bind(&item.source_text)
        .bind(item.normalization_confidence)
        .bind(&tags)
        .bind(item.updated_at.to_rfc3339())
        .bind(item.id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| KnowledgeError::Storage(e.to_string().into()))?;

        if result.rows_affected() == 0 {
            return Err(KnowledgeError::ItemNotFound { id: item.id });
        }
        Ok(())
    }

    async fn mark_superseded(&self, id: Uuid, superseded_by: Uuid) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE knowledge_items SET
                status = 'superseded',
                superseded_by = ?,
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(superseded_by.to_string())
        .bind(chrono::Utc::now().to_rfc3339())
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| KnowledgeError::Storage(e.to_string().into()))?;

        if result.rows_affected() == 0 {
            return Err(KnowledgeError::ItemNotFound { id });
        }
        Ok(())
    }

    async fn active_for_document(&self, document_id: Uuid) -> Result<Vec<KnowledgeItem>> {
        let rows = sqlx::query_as::<_, KnowledgeRow>(&format!(
            "SELECT {ITEM_COLUMNS} FROM knowledge_items \
             WHERE source_document_id = ? AND status = 'active'"
        ))
        .bind(document_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| KnowledgeError::Storage(e.to_string().into()))?;

        rows_into_items(rows)
    }

    async fn active_for_client(&self, client_id: Uuid) -> Result<Vec<KnowledgeItem>> {
        let rows = sqlx::query_as::<_, KnowledgeRow>(&format!(
            "SELECT {ITEM_COLUMNS} FROM knowledge_items \
             WHERE client_id = ? AND status = 'active'"
        ))
        .bind(client_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| KnowledgeError::Storage(e.to_string().into()))?;

        rows_into_items(rows)
    }

    async fn active_for_project(&self, project_id: Uuid) -> Result<Vec<KnowledgeItem>> {
        let rows = sqlx::query_as::<_, KnowledgeRow>(&format!(
            "SELECT {ITEM_COLUMNS} FROM knowledge_items \
             WHERE project_id = ? AND status = 'active'"
        ))
        .bind(project_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| KnowledgeError::Storage(e.to_string().into()))?;

        rows_into_items(rows)
    }

    async fn mark_document_reconciled(&self, document_id: Uuid) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO reconciled_documents (document_id, reconciled_at)
            VALUES (?, ?)
            ON CONFLICT(document_id) DO NOTHING
            "#,
        )
        .bind(document_id.to_string())
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| KnowledgeError::Storage(e.to_string().into()))?;

        Ok(())
    }

    async fn is_document_reconciled(&self, document_id: Uuid) -> Result<bool> {
        let count: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM reconciled_documents WHERE document_id = ?")
                .bind(document_id.to_string())
                .fetch_one(&self.pool)
                .await
                .map_err(|e| KnowledgeError::Storage(e.to_string().into()))?;

        Ok(count.0 > 0)
    }
}
