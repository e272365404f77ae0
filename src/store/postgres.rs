use super::{
    ContentRecord, NewRedirect, RecordStore, RedirectEdge, RedirectStore, Store, StoreError,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{
    postgres::{PgPoolOptions, PgRow},
    Connection, FromRow, PgPool, Row,
};
use std::time::Duration;
use tracing::{debug, instrument};
use uuid::Uuid;

const SCHEMA_SQL: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/sql/schema.sql"));

const RECORD_COLUMNS: &str = "id, title, slug, created_at, updated_at";
const REDIRECT_COLUMNS: &str = "id, old_slug, new_slug, record_id, note, created_at";

impl<'r> FromRow<'r, PgRow> for ContentRecord {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            title: row.try_get("title")?,
            slug: row.try_get("slug")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl<'r> FromRow<'r, PgRow> for RedirectEdge {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            old_slug: row.try_get("old_slug")?,
            new_slug: row.try_get("new_slug")?,
            record_id: row.try_get("record_id")?,
            note: row.try_get("note")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

/// `PostgreSQL` backend. See `sql/schema.sql` for the tables and indexes it relies on.
#[derive(Clone, Debug)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect a pool to `dsn`.
    ///
    /// # Errors
    /// Returns an error if the database is unreachable.
    pub async fn connect(dsn: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .min_connections(1)
            .max_connections(max_connections.max(1))
            .max_lifetime(Duration::from_secs(60 * 2))
            .test_before_acquire(true)
            .connect(dsn)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    /// Apply `sql/schema.sql`. Every statement is idempotent, so this runs on each start.
    ///
    /// # Errors
    /// Returns an error naming the first statement that failed.
    pub async fn apply_schema(&self) -> Result<()> {
        let mut connection = self.pool.acquire().await?;
        for (index, statement) in split_sql_statements(SCHEMA_SQL).iter().enumerate() {
            sqlx::query(statement)
                .execute(&mut *connection)
                .await
                .with_context(|| format!("failed to execute schema statement {}", index + 1))?;
        }
        debug!("schema applied");
        Ok(())
    }
}

/// Splits a schema file into statements. Assumes statements end with `;` at
/// end of line and contain no nested semicolons.
fn split_sql_statements(sql: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();

    for line in sql.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with("--") {
            continue;
        }
        current.push_str(line);
        current.push('\n');

        if trimmed.ends_with(';') {
            let statement = current.trim();
            if !statement.is_empty() {
                statements.push(statement.to_string());
            }
            current.clear();
        }
    }

    let leftover = current.trim();
    if !leftover.is_empty() {
        statements.push(leftover.to_string());
    }

    statements
}

/// Maps SQLSTATE `23505` to [`StoreError::UniqueViolation`] with the constraint name.
fn map_write_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.code().as_deref() == Some("23505") {
            let constraint = db_err.constraint().unwrap_or("unknown").to_string();
            return StoreError::UniqueViolation(constraint);
        }
    }
    StoreError::Database(err)
}

fn batch_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

#[async_trait]
impl RecordStore for PgStore {
    #[instrument(skip(self))]
    async fn insert_record(&self, title: &str, slug: &str) -> Result<ContentRecord, StoreError> {
        let query = format!(
            "INSERT INTO content_records (id, title, slug) VALUES ($1, $2, $3) RETURNING {RECORD_COLUMNS}"
        );
        sqlx::query_as::<_, ContentRecord>(&query)
            .bind(Uuid::new_v4())
            .bind(title)
            .bind(slug)
            .fetch_one(&self.pool)
            .await
            .map_err(map_write_error)
    }

    async fn find_record(&self, id: Uuid) -> Result<Option<ContentRecord>, StoreError> {
        let query = format!("SELECT {RECORD_COLUMNS} FROM content_records WHERE id = $1");
        Ok(sqlx::query_as::<_, ContentRecord>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_slug_owner(
        &self,
        slug: &str,
        exclude: Option<Uuid>,
    ) -> Result<Option<ContentRecord>, StoreError> {
        let query = format!(
            r"
            SELECT {RECORD_COLUMNS}
            FROM content_records
            WHERE (
                slug = $1
                OR id IN (
                    SELECT record_id FROM slug_redirects
                    WHERE old_slug = $1 AND record_id IS NOT NULL
                )
            )
            AND ($2::uuid IS NULL OR id <> $2)
            ORDER BY (slug = $1) DESC
            LIMIT 1
            "
        );
        Ok(sqlx::query_as::<_, ContentRecord>(&query)
            .bind(slug)
            .bind(exclude)
            .fetch_optional(&self.pool)
            .await?)
    }

    #[instrument(skip(self))]
    async fn taken_slugs_with_prefix(
        &self,
        prefix: &str,
        exclude: Option<Uuid>,
    ) -> Result<Vec<String>, StoreError> {
        // Prefixes are validated slugs, so they never contain LIKE wildcards.
        let rows = sqlx::query(
            r"
            SELECT slug FROM content_records
            WHERE slug LIKE $1 || '%' AND ($2::uuid IS NULL OR id <> $2)
            UNION
            SELECT old_slug FROM slug_redirects
            WHERE old_slug LIKE $1 || '%'
              AND record_id IS NOT NULL
              AND ($2::uuid IS NULL OR record_id <> $2)
            ",
        )
        .bind(prefix)
        .bind(exclude)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|row| row.get(0)).collect())
    }

    #[instrument(skip(self))]
    async fn update_record(
        &self,
        id: Uuid,
        slug: &str,
        title: Option<&str>,
    ) -> Result<Option<ContentRecord>, StoreError> {
        let query = format!(
            r"
            UPDATE content_records
            SET slug = $2, title = COALESCE($3, title), updated_at = NOW()
            WHERE id = $1
            RETURNING {RECORD_COLUMNS}
            "
        );
        sqlx::query_as::<_, ContentRecord>(&query)
            .bind(id)
            .bind(slug)
            .bind(title)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_write_error)
    }
}

#[async_trait]
impl RedirectStore for PgStore {
    async fn find_redirect(&self, old_slug: &str) -> Result<Option<RedirectEdge>, StoreError> {
        let query = format!("SELECT {REDIRECT_COLUMNS} FROM slug_redirects WHERE old_slug = $1");
        Ok(sqlx::query_as::<_, RedirectEdge>(&query)
            .bind(old_slug)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_record_redirect(
        &self,
        record_id: Uuid,
        old_slug: &str,
        new_slug: &str,
    ) -> Result<Option<RedirectEdge>, StoreError> {
        let query = format!(
            r"
            SELECT {REDIRECT_COLUMNS} FROM slug_redirects
            WHERE record_id = $1 AND old_slug = $2 AND new_slug = $3
            LIMIT 1
            "
        );
        Ok(sqlx::query_as::<_, RedirectEdge>(&query)
            .bind(record_id)
            .bind(old_slug)
            .bind(new_slug)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn redirect_ids_targeting(
        &self,
        new_slug: &str,
        limit: usize,
    ) -> Result<Vec<Uuid>, StoreError> {
        let rows = sqlx::query(
            r"
            SELECT id FROM slug_redirects
            WHERE new_slug = $1
            ORDER BY created_at, id
            LIMIT $2
            ",
        )
        .bind(new_slug)
        .bind(batch_limit(limit))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|row| row.get("id")).collect())
    }

    async fn retarget_redirects(&self, ids: &[Uuid], new_slug: &str) -> Result<u64, StoreError> {
        let result = sqlx::query("UPDATE slug_redirects SET new_slug = $2 WHERE id = ANY($1)")
            .bind(ids)
            .bind(new_slug)
            .execute(&self.pool)
            .await
            .map_err(map_write_error)?;
        Ok(result.rows_affected())
    }

    async fn insert_redirect(&self, redirect: NewRedirect) -> Result<RedirectEdge, StoreError> {
        let query = format!(
            r"
            INSERT INTO slug_redirects (id, old_slug, new_slug, record_id, note)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {REDIRECT_COLUMNS}
            "
        );
        sqlx::query_as::<_, RedirectEdge>(&query)
            .bind(Uuid::new_v4())
            .bind(&redirect.old_slug)
            .bind(&redirect.new_slug)
            .bind(redirect.record_id)
            .bind(&redirect.note)
            .fetch_one(&self.pool)
            .await
            .map_err(map_write_error)
    }

    async fn delete_redirect(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM slug_redirects WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_self_redirects(&self, record_id: Uuid, slug: &str) -> Result<u64, StoreError> {
        let result = sqlx::query(
            r"
            DELETE FROM slug_redirects
            WHERE record_id = $1 AND old_slug = $2 AND new_slug = $2
            ",
        )
        .bind(record_id)
        .bind(slug)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn list_redirects(
        &self,
        record_id: Option<Uuid>,
    ) -> Result<Vec<RedirectEdge>, StoreError> {
        let query = format!(
            r"
            SELECT {REDIRECT_COLUMNS} FROM slug_redirects
            WHERE ($1::uuid IS NULL OR record_id = $1)
            ORDER BY created_at DESC, id
            "
        );
        Ok(sqlx::query_as::<_, RedirectEdge>(&query)
            .bind(record_id)
            .fetch_all(&self.pool)
            .await?)
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> Result<(), StoreError> {
        let mut connection = self.pool.acquire().await?;
        connection.ping().await?;
        Ok(())
    }
}
