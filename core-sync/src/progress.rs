//! Download and retry counters.

use serde::{Deserialize, Serialize};

/// Items downloaded versus items expected.
///
/// `actual` grows as stubs are discovered, so early in a run it is smaller
/// than the configured `estimated` figure. The display total is whichever is
/// larger.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressCounters {
    pub estimated_items_to_download: u64,
    pub actual_items_to_download: u64,
    pub downloaded_items: u64,
}

impl ProgressCounters {
    pub fn new(estimated_items_to_download: u64) -> Self {
        Self {
            estimated_items_to_download,
            ..Self::default()
        }
    }

    pub fn total(&self) -> u64 {
        self.estimated_items_to_download
            .max(self.actual_items_to_download)
    }

    /// Completion in whole percent, capped at 100.
    pub fn percent(&self) -> u8 {
        let total = self.total();
        if total == 0 {
            return 0;
        }
        ((self.downloaded_items.min(total) * 100) / total) as u8
    }
}

/// Consecutive failures of the current stage, by kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetryCounters {
    /// Stage queue and results were both empty.
    pub time_retries: u32,
    /// Fetch failed (network, credentials, non-2xx status).
    pub connection_retries: u32,
}

impl RetryCounters {
    pub fn exceeds(&self, ceiling: u32) -> bool {
        self.time_retries > ceiling || self.connection_retries > ceiling
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_prefers_larger_count() {
        let mut progress = ProgressCounters::new(100);
        assert_eq!(progress.total(), 100);

        progress.actual_items_to_download = 250;
        assert_eq!(progress.total(), 250);
    }

    #[test]
    fn test_percent() {
        let mut progress = ProgressCounters::new(0);
        assert_eq!(progress.percent(), 0);

        progress.actual_items_to_download = 6;
        progress.downloaded_items = 3;
        assert_eq!(progress.percent(), 50);

        progress.downloaded_items = 9;
        assert_eq!(progress.percent(), 100);
    }

    #[test]
    fn test_retry_ceiling_is_exclusive() {
        let mut retries = RetryCounters {
            time_retries: 5,
            connection_retries: 5,
        };
        assert!(!retries.exceeds(5));

        retries.connection_retries = 6;
        assert!(retries.exceeds(5));

        retries.reset();
        assert_eq!(retries, RetryCounters::default());
    }
}
