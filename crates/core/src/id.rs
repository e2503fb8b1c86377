//! Strongly-typed identifiers.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::MonitorError;

/// Primary key of a job history row.
///
/// Assigned by the store on insert and monotonically increasing, so a larger
/// id always belongs to a later insert.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobHistoryId(i64);

impl JobHistoryId {
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn get(&self) -> i64 {
        self.0
    }
}

impl core::fmt::Display for JobHistoryId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl From<i64> for JobHistoryId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<JobHistoryId> for i64 {
    fn from(value: JobHistoryId) -> Self {
        value.0
    }
}

impl FromStr for JobHistoryId {
    type Err = MonitorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s
            .trim()
            .parse::<i64>()
            .map_err(|e| MonitorError::invalid_id(format!("JobHistoryId: {e}")))?;
        if value <= 0 {
            return Err(MonitorError::invalid_id("JobHistoryId: must be positive"));
        }
        Ok(Self(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_positive_integers() {
        let id: JobHistoryId = "42".parse().unwrap();
        assert_eq!(id.get(), 42);
        assert_eq!(id.to_string(), "42");
    }

    #[test]
    fn rejects_garbage_and_non_positive() {
        assert!(matches!("abc".parse::<JobHistoryId>(), Err(MonitorError::InvalidId(_))));
        assert!(matches!("0".parse::<JobHistoryId>(), Err(MonitorError::InvalidId(_))));
        assert!(matches!("-3".parse::<JobHistoryId>(), Err(MonitorError::InvalidId(_))));
    }
}
