//! Postgres queue: inserts into the `background_jobs` table polled by
//! workers (see `migrations/0002_create_background_jobs.sql`).

use sqlx::PgPool;
use tracing::instrument;

use super::{JobQueue, QueueError, SubmittedJob};

#[derive(Debug, Clone)]
pub struct PostgresJobQueue {
    pool: PgPool,
}

impl PostgresJobQueue {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create `background_jobs` if it does not exist.
    #[instrument(name = "queue.ensure_schema", skip(self), err)]
    pub async fn ensure_schema(&self) -> Result<(), QueueError> {
        let statements = [
            r#"
            CREATE TABLE IF NOT EXISTS background_jobs (
                id         BIGSERIAL PRIMARY KEY,
                job_type   TEXT NOT NULL,
                queue      TEXT NOT NULL DEFAULT 'default',
                data       JSONB NOT NULL,
                retries    INTEGER NOT NULL DEFAULT 0,
                priority   SMALLINT NOT NULL DEFAULT 0,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                last_retry TIMESTAMPTZ NULL
            )
            "#,
            "CREATE INDEX IF NOT EXISTS background_jobs_queue_idx \
             ON background_jobs (queue, priority DESC, id)",
        ];
        for sql in statements {
            sqlx::query(sql)
                .execute(&self.pool)
                .await
                .map_err(|e| QueueError::Unavailable(e.to_string()))?;
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl JobQueue for PostgresJobQueue {
    #[instrument(
        name = "queue.submit",
        skip(self, job),
        fields(job_class = %job.job_class, queue = %job.queue),
        err
    )]
    async fn submit(&self, job: SubmittedJob) -> Result<String, QueueError> {
        let id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO background_jobs (job_type, queue, data) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(&job.job_class)
        .bind(&job.queue)
        .bind(&job.command)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) => QueueError::Rejected(db.message().to_string()),
            other => QueueError::Unavailable(other.to_string()),
        })?;

        Ok(id.to_string())
    }
}
