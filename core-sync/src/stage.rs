//! # Pipeline Stage Machine
//!
//! ```text
//! Idle → FetchExpansionIndex → FetchExpansionJournals → FetchRaidJournals
//!      → FetchDungeonJournals → Done
//! ```
//!
//! Transitions only move forward. A stage either advances, retries itself
//! after a delay, or stalls for good.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStage {
    Idle,
    FetchExpansionIndex,
    FetchExpansionJournals,
    FetchRaidJournals,
    FetchDungeonJournals,
    Done,
}

impl SyncStage {
    /// The stage that follows this one. `Done` is terminal.
    pub fn next(self) -> SyncStage {
        match self {
            SyncStage::Idle => SyncStage::FetchExpansionIndex,
            SyncStage::FetchExpansionIndex => SyncStage::FetchExpansionJournals,
            SyncStage::FetchExpansionJournals => SyncStage::FetchRaidJournals,
            SyncStage::FetchRaidJournals => SyncStage::FetchDungeonJournals,
            SyncStage::FetchDungeonJournals => SyncStage::Done,
            SyncStage::Done => SyncStage::Done,
        }
    }

    pub fn is_fetching(self) -> bool {
        !matches!(self, SyncStage::Idle | SyncStage::Done)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SyncStage::Idle => "idle",
            SyncStage::FetchExpansionIndex => "fetch_expansion_index",
            SyncStage::FetchExpansionJournals => "fetch_expansion_journals",
            SyncStage::FetchRaidJournals => "fetch_raid_journals",
            SyncStage::FetchDungeonJournals => "fetch_dungeon_journals",
            SyncStage::Done => "done",
        }
    }
}

impl fmt::Display for SyncStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a stage stopped permanently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StallReason {
    /// A retry counter went past the ceiling.
    RetryCeiling {
        time_retries: u32,
        connection_retries: u32,
    },
    /// A response body did not match the expected record.
    Decode { message: String },
}

impl fmt::Display for StallReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StallReason::RetryCeiling {
                time_retries,
                connection_retries,
            } => write!(
                f,
                "failed after {} timer retries and {} connection errors",
                time_retries, connection_retries
            ),
            StallReason::Decode { message } => write!(f, "decode failed: {}", message),
        }
    }
}

/// Result of one pipeline step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// More work in the current stage, run the next step now.
    Continue,
    /// Run the current stage again after the delay.
    RetryAfter(Duration),
    /// The current stage finished.
    Advance(SyncStage),
    /// The current stage stopped permanently.
    Stall(StallReason),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transitions_only_move_forward() {
        let mut stage = SyncStage::Idle;
        let mut visited = vec![stage];
        while stage != SyncStage::Done {
            let next = stage.next();
            assert!(next > stage);
            stage = next;
            visited.push(stage);
        }

        assert_eq!(visited.len(), 6);
        assert_eq!(SyncStage::Done.next(), SyncStage::Done);
    }

    #[test]
    fn test_stage_labels() {
        assert_eq!(SyncStage::FetchRaidJournals.to_string(), "fetch_raid_journals");
        assert_eq!(
            serde_json::to_string(&SyncStage::FetchExpansionIndex).unwrap(),
            "\"fetch_expansion_index\""
        );
        assert!(!SyncStage::Idle.is_fetching());
        assert!(SyncStage::FetchDungeonJournals.is_fetching());
    }

    #[test]
    fn test_stall_reason_display() {
        let reason = StallReason::RetryCeiling {
            time_retries: 0,
            connection_retries: 6,
        };
        assert_eq!(
            reason.to_string(),
            "failed after 0 timer retries and 6 connection errors"
        );
    }
}
