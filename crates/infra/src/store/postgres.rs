//! Postgres-backed history store.
//!
//! The table name comes from configuration and is spliced into statements;
//! [`TableName`] guarantees it is a bare identifier. Every value is bound.
//!
//! ## Error Mapping
//!
//! | SQLx error | StoreError |
//! |------------|------------|
//! | `Database`, `Io`, `PoolTimedOut`, `PoolClosed`, other | `Unavailable` |
//! | row decode failure | `CorruptRow` |
//!
//! ## Live-row updates
//!
//! `update_live` is a single `UPDATE ... WHERE id = (SELECT ... LIMIT 1)`
//! statement, so concurrent signals for different identifiers never contend
//! and two signals for the same identifier are last-write-wins.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use tracing::{Span, instrument};

use jobwatch_core::{JobHistoryId, JobHistoryRecord, JobStatus, NewJobHistory, Progress};

use super::{
    HistoryFilter, HistoryStats, HistoryUpdate, JobHistoryStore, Page, PageRequest, StoreError,
};
use crate::config::TableName;

const COLUMNS: &str = "id, job_id, job_class, queue, status, progress, attempt, payload, \
                       error_message, started_at, finished_at, created_at, updated_at";

/// Postgres history store.
///
/// `Send + Sync`; the SQLx pool handles connection sharing.
#[derive(Debug, Clone)]
pub struct PostgresHistoryStore {
    pool: Arc<PgPool>,
    table: TableName,
}

impl PostgresHistoryStore {
    pub fn new(pool: PgPool, table: TableName) -> Self {
        Self {
            pool: Arc::new(pool),
            table,
        }
    }

    pub fn table(&self) -> &TableName {
        &self.table
    }

    /// Create the history table and its indexes if they do not exist.
    ///
    /// Mirrors `migrations/0001_create_job_histories.sql` for a configured
    /// table name.
    #[instrument(skip(self), fields(table = %self.table), err)]
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        let table = self.table.as_str();
        let statements = [
            format!(
                r#"
                CREATE TABLE IF NOT EXISTS {table} (
                    id            BIGSERIAL PRIMARY KEY,
                    job_id        TEXT NULL,
                    job_class     TEXT NOT NULL,
                    queue         TEXT NOT NULL,
                    status        TEXT NOT NULL DEFAULT 'pending',
                    progress      SMALLINT NOT NULL DEFAULT 0 CHECK (progress BETWEEN 0 AND 100),
                    attempt       INTEGER NOT NULL DEFAULT 1 CHECK (attempt >= 1),
                    payload       JSONB NULL,
                    error_message TEXT NULL,
                    started_at    TIMESTAMPTZ NULL,
                    finished_at   TIMESTAMPTZ NULL,
                    created_at    TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                    updated_at    TIMESTAMPTZ NOT NULL DEFAULT NOW()
                )
                "#
            ),
            format!("CREATE INDEX IF NOT EXISTS {table}_job_id_idx ON {table} (job_id)"),
            format!("CREATE INDEX IF NOT EXISTS {table}_status_idx ON {table} (status)"),
            format!("CREATE INDEX IF NOT EXISTS {table}_created_at_idx ON {table} (created_at DESC)"),
        ];

        for sql in statements {
            sqlx::query(&sql)
                .execute(&*self.pool)
                .await
                .map_err(|e| map_sqlx_error("ensure_schema", e))?;
        }
        Ok(())
    }

    fn push_filters<'a>(qb: &mut QueryBuilder<'a, Postgres>, filter: &'a HistoryFilter) {
        if let Some(search) = &filter.search {
            let pattern = like_pattern(search);
            qb.push(" AND (job_id ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR job_class ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR error_message ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
        if let Some(status) = filter.status {
            qb.push(" AND status = ").push_bind(status.as_str());
        }
        if let Some(queue) = &filter.queue {
            qb.push(" AND queue = ").push_bind(queue.as_str());
        }
        if let Some(job_type) = &filter.job_type {
            qb.push(" AND job_class ILIKE ").push_bind(like_pattern(job_type));
        }
        if let Some(from) = filter.created_from {
            qb.push(" AND created_at >= ").push_bind(from);
        }
        if let Some(to) = filter.created_to {
            qb.push(" AND created_at <= ").push_bind(to);
        }
    }
}

#[async_trait::async_trait]
impl JobHistoryStore for PostgresHistoryStore {
    #[instrument(
        skip(self, new),
        fields(job_id = ?new.job_id, job_class = %new.job_class, queue = %new.queue),
        err
    )]
    async fn insert(&self, new: NewJobHistory) -> Result<JobHistoryRecord, StoreError> {
        let sql = format!(
            r#"
            INSERT INTO {table} (
                job_id, job_class, queue, status, progress, attempt, payload, started_at,
                finished_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, CASE WHEN $9 THEN NOW() ELSE NULL END)
            RETURNING {COLUMNS}
            "#,
            table = self.table
        );

        let row = sqlx::query(&sql)
            .bind(new.job_id.as_deref())
            .bind(&new.job_class)
            .bind(&new.queue)
            .bind(new.status.as_str())
            .bind(i16::from(new.progress))
            .bind(i32::try_from(new.attempt.max(1)).unwrap_or(i32::MAX))
            .bind(new.payload.clone())
            .bind(new.started_at)
            .bind(new.status.is_finished())
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("insert", e))?;

        decode_row(&row)
    }

    #[instrument(
        skip(self, update),
        fields(update = ?update, updated = tracing::field::Empty),
        err
    )]
    async fn update_live(
        &self,
        job_id: &str,
        update: HistoryUpdate,
    ) -> Result<Option<JobHistoryId>, StoreError> {
        let table = self.table.as_str();
        let live = format!(
            "(SELECT id FROM {table} WHERE job_id = $1 AND status = 'processing' \
             ORDER BY id DESC LIMIT 1)"
        );

        let sql = match &update {
            HistoryUpdate::Completed { .. } => format!(
                "UPDATE {table} SET status = 'completed', progress = 100, \
                 error_message = NULL, finished_at = $2, updated_at = NOW() \
                 WHERE id = {live} RETURNING id"
            ),
            HistoryUpdate::Failed { .. } => format!(
                "UPDATE {table} SET status = 'failed', error_message = $3, \
                 finished_at = $2, updated_at = NOW() WHERE id = {live} RETURNING id"
            ),
            HistoryUpdate::Progress(_) => format!(
                "UPDATE {table} SET progress = $2, updated_at = NOW() \
                 WHERE id = {live} RETURNING id"
            ),
        };

        let query = sqlx::query_scalar::<_, i64>(&sql).bind(job_id);
        let query = match update {
            HistoryUpdate::Completed { at } => query.bind(at),
            HistoryUpdate::Failed { error_message, at } => query.bind(at).bind(error_message),
            HistoryUpdate::Progress(p) => query.bind(i16::from(p)),
        };

        let updated = query
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("update_live", e))?;

        Span::current().record("updated", updated.is_some());
        Ok(updated.map(JobHistoryId::new))
    }

    #[instrument(skip(self), fields(id = %id), err)]
    async fn get(&self, id: JobHistoryId) -> Result<Option<JobHistoryRecord>, StoreError> {
        let sql = format!("SELECT {COLUMNS} FROM {} WHERE id = $1", self.table);
        let row = sqlx::query(&sql)
            .bind(id.get())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get", e))?;

        row.as_ref().map(decode_row).transpose()
    }

    #[instrument(skip(self), fields(row_count = tracing::field::Empty), err)]
    async fn list(
        &self,
        filter: &HistoryFilter,
        page: PageRequest,
    ) -> Result<Page<JobHistoryRecord>, StoreError> {
        let mut count = QueryBuilder::<Postgres>::new(format!(
            "SELECT COUNT(*) FROM {} WHERE TRUE",
            self.table
        ));
        Self::push_filters(&mut count, filter);
        let total: i64 = count
            .build_query_scalar()
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list.count", e))?;

        let mut select = QueryBuilder::<Postgres>::new(format!(
            "SELECT {COLUMNS} FROM {} WHERE TRUE",
            self.table
        ));
        Self::push_filters(&mut select, filter);
        select
            .push(" ORDER BY created_at DESC, id DESC LIMIT ")
            .push_bind(i64::from(page.per_page))
            .push(" OFFSET ")
            .push_bind(i64::try_from(page.offset()).unwrap_or(i64::MAX));

        let rows = select
            .build()
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list", e))?;

        let data = rows.iter().map(decode_row).collect::<Result<Vec<_>, _>>()?;
        Span::current().record("row_count", data.len());
        Ok(Page::new(data, u64::try_from(total).unwrap_or(0), page))
    }

    #[instrument(skip(self), err)]
    async fn stats(&self) -> Result<HistoryStats, StoreError> {
        let sql = format!(
            r#"
            SELECT
                COUNT(*)                                          AS total_jobs,
                COUNT(*) FILTER (WHERE status = 'pending')        AS pending_jobs,
                COUNT(*) FILTER (WHERE status = 'completed')      AS completed_jobs,
                COUNT(*) FILTER (WHERE status = 'failed')         AS failed_jobs,
                COALESCE(SUM(TRUNC(EXTRACT(EPOCH FROM (finished_at - started_at))))
                    FILTER (WHERE started_at IS NOT NULL AND finished_at IS NOT NULL), 0)::BIGINT
                                                                  AS total_runtime,
                COUNT(*) FILTER (WHERE started_at IS NOT NULL AND finished_at IS NOT NULL)
                                                                  AS timed_rows
            FROM {}
            "#,
            self.table
        );

        let row = sqlx::query(&sql)
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("stats", e))?;

        let count = |name: &str| -> Result<u64, StoreError> {
            let v: i64 = row.try_get(name).map_err(|e| StoreError::CorruptRow {
                id: 0,
                reason: format!("{name}: {e}"),
            })?;
            Ok(u64::try_from(v).unwrap_or(0))
        };

        let total_runtime: i64 = row.try_get("total_runtime").map_err(|e| StoreError::CorruptRow {
            id: 0,
            reason: format!("total_runtime: {e}"),
        })?;

        let stats = HistoryStats {
            total_jobs: count("total_jobs")?,
            pending_jobs: count("pending_jobs")?,
            completed_jobs: count("completed_jobs")?,
            failed_jobs: count("failed_jobs")?,
            ..Default::default()
        };
        Ok(stats.with_runtimes(total_runtime, count("timed_rows")?))
    }
}

// SQLx row types

#[derive(Debug)]
struct HistoryRow {
    id: i64,
    job_id: Option<String>,
    job_class: String,
    queue: String,
    status: String,
    progress: i16,
    attempt: i32,
    payload: Option<serde_json::Value>,
    error_message: Option<String>,
    started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for HistoryRow {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(HistoryRow {
            id: row.try_get("id")?,
            job_id: row.try_get("job_id")?,
            job_class: row.try_get("job_class")?,
            queue: row.try_get("queue")?,
            status: row.try_get("status")?,
            progress: row.try_get("progress")?,
            attempt: row.try_get("attempt")?,
            payload: row.try_get("payload")?,
            error_message: row.try_get("error_message")?,
            started_at: row.try_get("started_at")?,
            finished_at: row.try_get("finished_at")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl TryFrom<HistoryRow> for JobHistoryRecord {
    type Error = StoreError;

    fn try_from(row: HistoryRow) -> Result<Self, Self::Error> {
        let status: JobStatus = row.status.parse().map_err(|e| StoreError::CorruptRow {
            id: row.id,
            reason: format!("{e}"),
        })?;

        Ok(JobHistoryRecord {
            id: JobHistoryId::new(row.id),
            job_id: row.job_id,
            job_class: row.job_class,
            queue: row.queue,
            status,
            progress: Progress::clamped(i64::from(row.progress)),
            attempt: u32::try_from(row.attempt).unwrap_or(1).max(1),
            payload: row.payload,
            error_message: row.error_message,
            started_at: row.started_at,
            finished_at: row.finished_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn decode_row(row: &sqlx::postgres::PgRow) -> Result<JobHistoryRecord, StoreError> {
    let raw = <HistoryRow as sqlx::FromRow<_>>::from_row(row).map_err(|e| StoreError::CorruptRow {
        id: row.try_get::<i64, _>("id").unwrap_or(0),
        reason: e.to_string(),
    })?;
    JobHistoryRecord::try_from(raw)
}

/// Escape LIKE metacharacters and wrap in `%...%`.
fn like_pattern(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len() + 2);
    escaped.push('%');
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => StoreError::Unavailable(format!(
            "database error in {operation}: {} (code {})",
            db_err.message(),
            db_err.code().as_deref().unwrap_or("none"),
        )),
        sqlx::Error::PoolClosed => {
            StoreError::Unavailable(format!("connection pool closed in {operation}"))
        }
        sqlx::Error::PoolTimedOut => {
            StoreError::Unavailable(format!("connection pool timed out in {operation}"))
        }
        sqlx::Error::ColumnDecode { index, source } => StoreError::CorruptRow {
            id: 0,
            reason: format!("column {index} in {operation}: {source}"),
        },
        other => StoreError::Unavailable(format!("{operation}: {other}")),
    }
}
