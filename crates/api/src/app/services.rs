use std::io;
use std::sync::Arc;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};

use jobwatch_events::{InMemoryEventBus, JobLifecycleEvent};
use jobwatch_infra::{
    HistoryQuery, HistoryRecorder, InMemoryHistoryStore, InMemoryJobQueue, JobHistoryStore,
    JobQueue, JobRegistry, MonitorConfig, PostgresHistoryStore, PostgresJobQueue, RecorderWorker,
    RetryService, TrackingFilter, WorkerHandle,
};

/// Shared handles behind every route.
pub struct AppServices {
    pub config: MonitorConfig,
    pub store: Arc<dyn JobHistoryStore>,
    pub queue: Arc<dyn JobQueue>,
    pub registry: Arc<JobRegistry>,
    /// Bus the queue system publishes lifecycle signals to.
    pub bus: Arc<InMemoryEventBus<JobLifecycleEvent>>,
    pub recorder: HistoryRecorder,
    pub query: HistoryQuery,
    pub retry: RetryService,
}

impl AppServices {
    pub fn new(
        config: MonitorConfig,
        store: Arc<dyn JobHistoryStore>,
        queue: Arc<dyn JobQueue>,
        registry: JobRegistry,
    ) -> Self {
        let registry = Arc::new(registry);
        let recorder = HistoryRecorder::new(store.clone(), TrackingFilter::from_config(&config));
        let query = HistoryQuery::new(store.clone(), config.per_page);
        let retry = RetryService::new(store.clone(), registry.clone(), queue.clone());

        Self {
            config,
            store,
            queue,
            registry,
            bus: Arc::new(InMemoryEventBus::new()),
            recorder,
            query,
            retry,
        }
    }

    /// In-memory store and queue (dev/tests).
    pub fn in_memory(config: MonitorConfig, registry: JobRegistry) -> Self {
        Self::new(
            config,
            InMemoryHistoryStore::arc(),
            Arc::new(InMemoryJobQueue::new()),
            registry,
        )
    }

    /// Postgres store and queue when `DATABASE_URL` is set, in-memory otherwise.
    pub async fn from_env(config: MonitorConfig, registry: JobRegistry) -> anyhow::Result<Self> {
        let Ok(database_url) = std::env::var("DATABASE_URL") else {
            warn!("DATABASE_URL not set; using in-memory stores");
            return Ok(Self::in_memory(config, registry));
        };

        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(&database_url)
            .await
            .context("failed to connect to Postgres")?;

        let store = PostgresHistoryStore::new(pool.clone(), config.table_name.clone());
        store
            .ensure_schema()
            .await
            .context("failed to prepare job history table")?;

        let queue = PostgresJobQueue::new(pool);
        queue
            .ensure_schema()
            .await
            .context("failed to prepare background_jobs table")?;

        info!(table = %config.table_name, "using Postgres job history store");
        Ok(Self::new(config, Arc::new(store), Arc::new(queue), registry))
    }

    /// Start the recorder worker on the current tokio runtime.
    ///
    /// Returns `None` when tracking is disabled.
    pub fn start_recorder(&self) -> io::Result<Option<WorkerHandle>> {
        if !self.config.enabled {
            info!("job tracking disabled; recorder worker not started");
            return Ok(None);
        }

        let handle = RecorderWorker::spawn(
            "job-history-recorder",
            self.bus.as_ref(),
            self.recorder.clone(),
            tokio::runtime::Handle::current(),
        )?;
        Ok(Some(handle))
    }
}
