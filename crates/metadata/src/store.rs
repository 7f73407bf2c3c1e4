//! Metadata store trait and implementations.

use crate::error::{MetadataError, MetadataResult};
use crate::repos::{FileChanges, FileFilter, FileRepo};
use async_trait::async_trait;
use spool_core::config::is_sql_identifier;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, QueryBuilder, Sqlite};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};

/// Combined metadata store trait.
#[async_trait]
pub trait MetadataStore: FileRepo + Send + Sync {
    /// Create the table and indexes if missing.
    async fn migrate(&self) -> MetadataResult<()>;

    /// Check database connectivity and health.
    async fn health_check(&self) -> MetadataResult<()>;

    /// Table holding this store's records.
    fn table_name(&self) -> &str;
}

/// SQLite-based metadata store over one file-record table.
pub struct SqliteStore {
    pool: Pool<Sqlite>,
    table: String,
    query_timeout_secs: u64,
}

impl SqliteStore {
    /// Open (creating if needed) the database at `path` and migrate `table`.
    pub async fn new(
        path: impl AsRef<Path>,
        table: &str,
        query_timeout_secs: Option<u64>,
    ) -> MetadataResult<Self> {
        if !is_sql_identifier(table) {
            return Err(MetadataError::Config(format!(
                "invalid table name: {table:?}"
            )));
        }
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}?mode=rwc", path.display()))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            // Prevent transient "database is locked" errors under concurrent access.
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            // A single connection serializes writers, which SQLite requires anyway.
            .max_connections(1)
            .connect_with(opts)
            .await?;

        let store = Self {
            pool,
            table: table.to_string(),
            query_timeout_secs: query_timeout_secs.unwrap_or(30),
        };
        store.migrate().await?;

        tracing::debug!(
            table = %store.table,
            query_timeout_secs = store.query_timeout_secs,
            "SQLite metadata store ready"
        );

        Ok(store)
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    /// Advisory query timeout; SQLite cannot cancel running statements.
    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs)
    }

    fn select(&self, filter: &FileFilter) -> MetadataResult<QueryBuilder<'static, Sqlite>> {
        let mut qb = QueryBuilder::new(format!("SELECT * FROM {}", self.table));
        push_filter(&mut qb, filter)?;
        qb.push(" ORDER BY id");
        Ok(qb)
    }

    fn update(
        &self,
        filter: &FileFilter,
        changes: &FileChanges,
    ) -> MetadataResult<QueryBuilder<'static, Sqlite>> {
        let mut qb = QueryBuilder::new(format!("UPDATE {} SET ", self.table));
        {
            let mut sets = qb.separated(", ");
            if let Some(is_temp) = changes.is_temp {
                sets.push("is_temp = ").push_bind_unseparated(is_temp);
            }
            if let Some(link_id) = &changes.link_id {
                sets.push("link_id = ").push_bind_unseparated(link_id.clone());
            }
        }
        push_filter(&mut qb, filter)?;
        Ok(qb)
    }
}

/// Render `at` as fixed-width UTC text, so string order is time order.
///
/// `create_time` is stored in this form and compared as text.
pub(crate) fn sortable_timestamp(at: OffsetDateTime) -> MetadataResult<String> {
    let format =
        format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:9]Z");
    at.to_offset(UtcOffset::UTC)
        .format(format)
        .map_err(|e| MetadataError::Constraint(format!("timestamp {at} not storable: {e}")))
}

/// Append a WHERE clause for `filter`.
fn push_filter(qb: &mut QueryBuilder<'static, Sqlite>, filter: &FileFilter) -> MetadataResult<()> {
    qb.push(" WHERE 1 = 1");
    if let Some(id) = filter.id {
        qb.push(" AND id = ").push_bind(id);
    }
    if let Some(uri_name) = &filter.uri_name {
        qb.push(" AND uri_name = ").push_bind(uri_name.clone());
    }
    if let Some(uri_names) = &filter.uri_names {
        if uri_names.is_empty() {
            qb.push(" AND 0");
        } else {
            qb.push(" AND uri_name IN (");
            let mut list = qb.separated(", ");
            for name in uri_names {
                list.push_bind(name.clone());
            }
            list.push_unseparated(")");
        }
    }
    if let Some(path) = &filter.path {
        qb.push(" AND path = ").push_bind(path.clone());
    }
    if let Some(link_id) = &filter.link_id {
        qb.push(" AND link_id = ").push_bind(link_id.clone());
    }
    if let Some(is_temp) = filter.is_temp {
        qb.push(" AND is_temp = ").push_bind(is_temp);
    }
    if let Some(cutoff) = filter.created_before {
        qb.push(" AND create_time < ")
            .push_bind(sortable_timestamp(cutoff)?);
    }
    Ok(())
}

fn refuse_unbounded(filter: &FileFilter, op: &str) -> MetadataResult<()> {
    if filter.is_unbounded() {
        return Err(MetadataError::Constraint(format!(
            "refusing {op} without a predicate"
        )));
    }
    Ok(())
}

#[async_trait]
impl MetadataStore for SqliteStore {
    async fn migrate(&self) -> MetadataResult<()> {
        sqlx::raw_sql(&schema_sql(&self.table))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn health_check(&self) -> MetadataResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    fn table_name(&self) -> &str {
        &self.table
    }
}

mod sqlite_impl {
    use super::*;
    use crate::models::FileRow;
    use spool_core::FileRecord;

    #[async_trait]
    impl FileRepo for SqliteStore {
        async fn insert_file(&self, record: &FileRecord) -> MetadataResult<FileRow> {
            let size = i64::try_from(record.size).map_err(|_| {
                MetadataError::Constraint(format!("file size {} out of range", record.size))
            })?;
            let sql = format!(
                "INSERT INTO {} (name, size, path, extension, uri_name, is_temp, create_time, link_id) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?) RETURNING *",
                self.table
            );
            sqlx::query_as::<_, FileRow>(&sql)
                .bind(&record.name)
                .bind(size)
                .bind(&record.path)
                .bind(&record.extension)
                .bind(&record.uri_name)
                .bind(record.is_temp)
                .bind(sortable_timestamp(record.create_time)?)
                .bind(&record.link_id)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| match e {
                    sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                        MetadataError::AlreadyExists(record.uri_name.clone())
                    }
                    other => other.into(),
                })
        }

        async fn update_files(
            &self,
            filter: &FileFilter,
            changes: &FileChanges,
        ) -> MetadataResult<u64> {
            refuse_unbounded(filter, "update")?;
            if changes.is_empty() {
                return Ok(0);
            }
            let result = self.update(filter, changes)?.build().execute(&self.pool).await?;
            Ok(result.rows_affected())
        }

        async fn delete_files(&self, filter: &FileFilter) -> MetadataResult<u64> {
            refuse_unbounded(filter, "delete")?;
            let mut qb = QueryBuilder::new(format!("DELETE FROM {}", self.table));
            push_filter(&mut qb, filter)?;
            let result = qb.build().execute(&self.pool).await?;
            Ok(result.rows_affected())
        }

        async fn find_file(&self, filter: &FileFilter) -> MetadataResult<Option<FileRow>> {
            let mut qb = self.select(filter)?;
            qb.push(" LIMIT 1");
            let row = qb
                .build_query_as::<FileRow>()
                .fetch_optional(&self.pool)
                .await?;
            Ok(row)
        }

        async fn find_files(&self, filter: &FileFilter) -> MetadataResult<Vec<FileRow>> {
            let rows = self
                .select(filter)?
                .build_query_as::<FileRow>()
                .fetch_all(&self.pool)
                .await?;
            Ok(rows)
        }

        async fn relink_files(&self, link_id: &str, uri_names: &[String]) -> MetadataResult<u64> {
            // Detach and adopt commit together.
            let mut tx = self.pool.begin().await?;

            self.update(
                &FileFilter::new().link_id(link_id).is_temp(false),
                &FileChanges::new().is_temp(true),
            )?
            .build()
            .execute(&mut *tx)
            .await?;

            let adopted = if uri_names.is_empty() {
                0
            } else {
                self.update(
                    &FileFilter::new().uri_names(uri_names.to_vec()),
                    &FileChanges::new().is_temp(false).link_id(link_id),
                )?
                .build()
                .execute(&mut *tx)
                .await?
                .rows_affected()
            };

            tx.commit().await?;
            Ok(adopted)
        }
    }
}

fn schema_sql(table: &str) -> String {
    format!(
        r#"
CREATE TABLE IF NOT EXISTS {table} (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    size INTEGER NOT NULL CHECK (size >= 0),
    path TEXT NOT NULL,
    extension TEXT NOT NULL,
    uri_name TEXT NOT NULL UNIQUE,
    is_temp INTEGER NOT NULL DEFAULT 1,
    create_time TEXT NOT NULL,
    link_id TEXT NOT NULL DEFAULT ''
);

CREATE INDEX IF NOT EXISTS idx_{table}_link_id ON {table} (link_id);
CREATE INDEX IF NOT EXISTS idx_{table}_temp_created ON {table} (is_temp, create_time);
CREATE INDEX IF NOT EXISTS idx_{table}_path ON {table} (path);
"#
    )
}
