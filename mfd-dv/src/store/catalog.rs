//! File metadata catalog (SQLite)

use std::path::Path;

use chrono::{DateTime, Utc};
use mfd_common::{Error, FileMetadata, Result};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

type FileRow = (
    String,
    String,
    String,
    String,
    Option<DateTime<Utc>>,
    Option<DateTime<Utc>>,
    DateTime<Utc>,
);

const SELECT_FILES: &str = "SELECT id, project_id, file_name, storage_path, start_date, end_date, uploaded_at FROM files";

/// Upload metadata table
#[derive(Debug, Clone)]
pub struct FileCatalog {
    pool: SqlitePool,
}

impl FileCatalog {
    /// Open (creating if needed) the catalog database
    pub async fn open(db_path: &Path) -> Result<Self> {
        let newly_created = !db_path.exists();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&db_url)
            .await?;

        sqlx::query("PRAGMA journal_mode = WAL")
            .execute(&pool)
            .await?;
        sqlx::query("PRAGMA busy_timeout = 5000")
            .execute(&pool)
            .await?;

        if newly_created {
            info!("Initialized new catalog: {}", db_path.display());
        } else {
            info!("Opened existing catalog: {}", db_path.display());
        }

        Self::from_pool(pool).await
    }

    /// Private in-memory catalog
    pub async fn in_memory() -> Result<Self> {
        // Every connection to :memory: is a separate database
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;
        Self::from_pool(pool).await
    }

    pub async fn from_pool(pool: SqlitePool) -> Result<Self> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS files (
                id TEXT PRIMARY KEY,
                project_id TEXT NOT NULL,
                file_name TEXT NOT NULL,
                storage_path TEXT NOT NULL,
                start_date TEXT,
                end_date TEXT,
                uploaded_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_files_project ON files(project_id)")
            .execute(&pool)
            .await?;

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn insert(&self, file: &FileMetadata) -> Result<()> {
        sqlx::query(
            "INSERT INTO files (id, project_id, file_name, storage_path, start_date, end_date, uploaded_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(file.id.to_string())
        .bind(&file.project_id)
        .bind(&file.file_name)
        .bind(&file.storage_path)
        .bind(file.start_date)
        .bind(file.end_date)
        .bind(file.uploaded_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get(&self, id: Uuid) -> Result<FileMetadata> {
        let row: Option<FileRow> = sqlx::query_as(&format!("{} WHERE id = ?", SELECT_FILES))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.ok_or_else(|| Error::NotFound(format!("File {}", id)))
            .and_then(from_row)
    }

    /// Files of one project, oldest upload first
    pub async fn list_for_project(&self, project_id: &str) -> Result<Vec<FileMetadata>> {
        let rows: Vec<FileRow> = sqlx::query_as(&format!(
            "{} WHERE project_id = ? ORDER BY uploaded_at, file_name",
            SELECT_FILES
        ))
        .bind(project_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(from_row).collect()
    }

    /// Cache an analysed sampling span on the file record
    pub async fn update_date_range(
        &self,
        id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<()> {
        let result = sqlx::query("UPDATE files SET start_date = ?, end_date = ? WHERE id = ?")
            .bind(start)
            .bind(end)
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("File {}", id)));
        }
        Ok(())
    }
}

fn from_row(row: FileRow) -> Result<FileMetadata> {
    let (id, project_id, file_name, storage_path, start_date, end_date, uploaded_at) = row;
    let id = Uuid::parse_str(&id)
        .map_err(|e| Error::Internal(format!("Corrupt file id {}: {}", id, e)))?;
    Ok(FileMetadata {
        id,
        project_id,
        file_name,
        storage_path,
        start_date,
        end_date,
        uploaded_at,
    })
}
