//! Progress percentage value object.

use serde::{Deserialize, Serialize};

/// Job progress percentage, always within `0..=100`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
#[serde(transparent)]
pub struct Progress(u8);

impl Progress {
    pub const ZERO: Progress = Progress(0);
    pub const COMPLETE: Progress = Progress(100);

    /// Build a progress value, clamping out-of-range input into `0..=100`.
    pub fn clamped(percentage: i64) -> Self {
        Self(percentage.clamp(0, 100) as u8)
    }

    pub fn get(&self) -> u8 {
        self.0
    }
}

impl From<Progress> for i16 {
    fn from(value: Progress) -> Self {
        i16::from(value.0)
    }
}

// Stored rows are trusted to be in range, but clamp anyway so a hand-edited
// row can never produce an invalid value.
impl<'de> Deserialize<'de> for Progress {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = i64::deserialize(deserializer)?;
        Ok(Progress::clamped(raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn clamps_boundaries() {
        assert_eq!(Progress::clamped(-5).get(), 0);
        assert_eq!(Progress::clamped(0).get(), 0);
        assert_eq!(Progress::clamped(55).get(), 55);
        assert_eq!(Progress::clamped(100).get(), 100);
        assert_eq!(Progress::clamped(250).get(), 100);
    }

    #[test]
    fn deserializing_out_of_range_clamps() {
        let p: Progress = serde_json::from_str("140").unwrap();
        assert_eq!(p, Progress::COMPLETE);
    }

    proptest! {
        #[test]
        fn clamped_matches_std_clamp(p in any::<i64>()) {
            prop_assert_eq!(i64::from(Progress::clamped(p).get()), p.clamp(0, 100));
        }
    }
}
