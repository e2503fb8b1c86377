//! Registry of re-submittable job classes.
//!
//! Retry needs to turn a stored payload back into a job the queue accepts.
//! Instead of resolving class names at runtime, the host registers every job
//! type it wants retryable, keyed by the class name the queue reports.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::queue::SubmittedJob;

/// A job type whose history rows can be retried.
pub trait TrackedJob: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Class name as it appears in `job_class`.
    ///
    /// This MUST be unique for the whole application.
    const JOB_CLASS: &'static str;
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("payload has no serialized command")]
    MissingCommand,

    #[error("cannot decode {job_class}: {source}")]
    Invalid {
        job_class: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{0}")]
    Rejected(String),
}

/// Turns a stored command into a queue submission for `queue`.
pub type DecodeFn = dyn Fn(&Value, &str) -> Result<SubmittedJob, DecodeError> + Send + Sync;

#[derive(Clone, Default)]
pub struct JobRegistry {
    decoders: HashMap<String, Arc<DecodeFn>>,
}

impl core::fmt::Debug for JobRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let mut classes: Vec<&str> = self.job_classes().collect();
        classes.sort_unstable();
        f.debug_struct("JobRegistry").field("classes", &classes).finish()
    }
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `J` under [`TrackedJob::JOB_CLASS`].
    ///
    /// The stored command must deserialize as `J`; it is re-serialized from
    /// the typed value so the submission carries only fields `J` knows.
    pub fn register<J: TrackedJob>(&mut self) -> &mut Self {
        self.register_with(J::JOB_CLASS, |command, queue| {
            let job: J = serde_json::from_value(command.clone()).map_err(|source| {
                DecodeError::Invalid {
                    job_class: J::JOB_CLASS.to_string(),
                    source,
                }
            })?;
            let command = serde_json::to_value(&job).map_err(|source| DecodeError::Invalid {
                job_class: J::JOB_CLASS.to_string(),
                source,
            })?;
            Ok(SubmittedJob::new(J::JOB_CLASS, queue, command))
        })
    }

    /// Register a custom decoder under `job_class`.
    pub fn register_with<F>(&mut self, job_class: impl Into<String>, decoder: F) -> &mut Self
    where
        F: Fn(&Value, &str) -> Result<SubmittedJob, DecodeError> + Send + Sync + 'static,
    {
        self.decoders.insert(job_class.into(), Arc::new(decoder));
        self
    }

    pub fn contains(&self, job_class: &str) -> bool {
        self.decoders.contains_key(job_class)
    }

    pub fn job_classes(&self) -> impl Iterator<Item = &str> {
        self.decoders.keys().map(String::as_str)
    }

    /// Decode `command` for `job_class`. `None` if the class is unregistered.
    pub fn decode(
        &self,
        job_class: &str,
        command: &Value,
        queue: &str,
    ) -> Option<Result<SubmittedJob, DecodeError>> {
        self.decoders
            .get(job_class)
            .map(|decoder| decoder(command, queue))
    }
}
