//! Tracking filter: which job executions get a history row.

use crate::config::MonitorConfig;

/// Pure predicate over the skip-list and track-list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackingFilter {
    skip_jobs: Vec<String>,
    track_queues: Vec<String>,
}

impl TrackingFilter {
    pub fn new(skip_jobs: Vec<String>, track_queues: Vec<String>) -> Self {
        Self {
            skip_jobs,
            track_queues,
        }
    }

    pub fn from_config(config: &MonitorConfig) -> Self {
        Self::new(config.skip_jobs.clone(), config.track_queues.clone())
    }

    /// Skip-listed classes are never tracked; with a non-empty track-list,
    /// only its queues are. Everything else is tracked.
    pub fn should_track(&self, job_class: &str, queue: &str) -> bool {
        if self.skip_jobs.iter().any(|s| s == job_class) {
            return false;
        }
        if !self.track_queues.is_empty() && !self.track_queues.iter().any(|q| q == queue) {
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn default_tracks_everything() {
        let filter = TrackingFilter::default();
        assert!(filter.should_track("AnyJob", "any-queue"));
        assert!(filter.should_track("", ""));
    }

    #[test]
    fn skip_list_is_exact_match() {
        let filter = TrackingFilter::new(vec!["App\\Jobs\\Ping".into()], vec![]);
        assert!(!filter.should_track("App\\Jobs\\Ping", "default"));
        assert!(filter.should_track("App\\Jobs\\PingAll", "default"));
        assert!(filter.should_track("app\\jobs\\ping", "default"));
    }

    #[test]
    fn track_list_restricts_queues() {
        let filter = TrackingFilter::new(vec![], vec!["default".into(), "high".into()]);
        assert!(filter.should_track("Job", "default"));
        assert!(filter.should_track("Job", "high"));
        assert!(!filter.should_track("Job", "low"));
        assert!(!filter.should_track("Job", ""));
    }

    #[test]
    fn skip_wins_over_tracked_queue() {
        let filter = TrackingFilter::new(vec!["Job".into()], vec!["default".into()]);
        assert!(!filter.should_track("Job", "default"));
    }

    proptest! {
        #[test]
        fn skipped_classes_are_never_tracked(class in ".{0,16}", queue in ".{0,16}") {
            let filter = TrackingFilter::new(vec![class.clone()], vec![]);
            prop_assert!(!filter.should_track(&class, &queue));
        }

        #[test]
        fn excluded_queues_are_never_tracked(queue in "[a-z]{1,8}", class in ".{0,16}") {
            let filter = TrackingFilter::new(vec![], vec![format!("{queue}-only")]);
            prop_assert!(!filter.should_track(&class, &queue));
        }
    }
}
