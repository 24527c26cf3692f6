//! # Game Data Store
//!
//! Holds everything the pipeline publishes: the expansion, raid and dungeon
//! collections, the download counters, the current stage and the "loading
//! allowed" gate. Every mutation that a reader can observe is announced on
//! the [`EventBus`].
//!
//! Readers get cloned snapshots and may see a run in progress.

use crate::postprocess;
use crate::progress::ProgressCounters;
use crate::stage::SyncStage;
use core_journal::{ExpansionJournal, InstanceJournal};
use core_runtime::events::{CoreEvent, EventBus, SyncEvent};
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::debug;

/// Point-in-time copy of the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GameDataSnapshot {
    pub expansions: Vec<ExpansionJournal>,
    pub raids: Vec<InstanceJournal>,
    pub dungeons: Vec<InstanceJournal>,
    pub progress: ProgressCounters,
    pub stage: SyncStage,
    pub loading_allowed: bool,
}

#[derive(Debug)]
struct State {
    expansions: Vec<ExpansionJournal>,
    raids: Vec<InstanceJournal>,
    dungeons: Vec<InstanceJournal>,
    progress: ProgressCounters,
    stage: SyncStage,
    loading_allowed: bool,
}

pub struct GameDataStore {
    state: RwLock<State>,
    event_bus: EventBus,
}

impl GameDataStore {
    pub fn new(estimated_items_to_download: u64, event_bus: EventBus) -> Self {
        Self {
            state: RwLock::new(State {
                expansions: Vec::new(),
                raids: Vec::new(),
                dungeons: Vec::new(),
                progress: ProgressCounters::new(estimated_items_to_download),
                stage: SyncStage::Idle,
                loading_allowed: true,
            }),
            event_bus,
        }
    }

    pub async fn snapshot(&self) -> GameDataSnapshot {
        let state = self.state.read().await;
        GameDataSnapshot {
            expansions: state.expansions.clone(),
            raids: state.raids.clone(),
            dungeons: state.dungeons.clone(),
            progress: state.progress,
            stage: state.stage,
            loading_allowed: state.loading_allowed,
        }
    }

    pub async fn expansions(&self) -> Vec<ExpansionJournal> {
        self.state.read().await.expansions.clone()
    }

    pub async fn raids(&self) -> Vec<InstanceJournal> {
        self.state.read().await.raids.clone()
    }

    pub async fn dungeons(&self) -> Vec<InstanceJournal> {
        self.state.read().await.dungeons.clone()
    }

    pub async fn progress(&self) -> ProgressCounters {
        self.state.read().await.progress
    }

    pub async fn stage(&self) -> SyncStage {
        self.state.read().await.stage
    }

    pub async fn loading_allowed(&self) -> bool {
        self.state.read().await.loading_allowed
    }

    /// Close the loading gate if a run may start.
    ///
    /// A run may start only when no expansions are loaded and the gate is
    /// open. Returns whether the caller now owns the run.
    pub async fn try_begin_loading(&self) -> bool {
        let mut state = self.state.write().await;
        if !state.expansions.is_empty() || !state.loading_allowed {
            debug!(
                expansions = state.expansions.len(),
                loading_allowed = state.loading_allowed,
                "Sync start refused"
            );
            return false;
        }
        state.loading_allowed = false;
        drop(state);

        self.emit(SyncEvent::LoadingGateChanged { allowed: false });
        true
    }

    /// Reopen the loading gate after a completed run.
    pub async fn finish_loading(&self) {
        self.state.write().await.loading_allowed = true;
        self.emit(SyncEvent::LoadingGateChanged { allowed: true });
    }

    pub async fn set_stage(&self, run_id: &str, stage: SyncStage) {
        let from = {
            let mut state = self.state.write().await;
            std::mem::replace(&mut state.stage, stage)
        };
        if from != stage {
            self.emit(SyncEvent::StageChanged {
                run_id: run_id.to_string(),
                from: from.to_string(),
                to: stage.to_string(),
            });
        }
    }

    pub async fn add_expected_items(&self, count: u64) {
        if count == 0 {
            return;
        }
        let mut state = self.state.write().await;
        state.progress.actual_items_to_download += count;
        self.emit_progress(&state);
    }

    pub async fn record_expansion(&self, journal: ExpansionJournal) {
        let mut state = self.state.write().await;
        state.expansions.push(journal);
        state.progress.downloaded_items += 1;
        self.emit_progress(&state);
    }

    pub async fn record_raid(&self, raid: InstanceJournal) {
        let mut state = self.state.write().await;
        state.raids.push(raid);
        state.progress.downloaded_items += 1;
        self.emit_progress(&state);
    }

    pub async fn record_dungeon(&self, dungeon: InstanceJournal) {
        let mut state = self.state.write().await;
        state.dungeons.push(dungeon);
        state.progress.downloaded_items += 1;
        self.emit_progress(&state);
    }

    /// Number of records in the collection filled by `stage`.
    pub async fn result_count(&self, stage: SyncStage) -> usize {
        let state = self.state.read().await;
        match stage {
            SyncStage::FetchExpansionJournals => state.expansions.len(),
            SyncStage::FetchRaidJournals => state.raids.len(),
            SyncStage::FetchDungeonJournals => state.dungeons.len(),
            SyncStage::Idle | SyncStage::FetchExpansionIndex | SyncStage::Done => 0,
        }
    }

    /// Apply the ordering for a finished stage's collection.
    pub async fn finalize_stage(&self, stage: SyncStage) {
        let mut state = self.state.write().await;
        match stage {
            SyncStage::FetchExpansionJournals => postprocess::sort_expansions(&mut state.expansions),
            SyncStage::FetchRaidJournals => postprocess::sort_instances(&mut state.raids),
            SyncStage::FetchDungeonJournals => {
                let dungeons = std::mem::take(&mut state.dungeons);
                state.dungeons = postprocess::dedup_and_sort_instances(dungeons);
            }
            SyncStage::Idle | SyncStage::FetchExpansionIndex | SyncStage::Done => {}
        }
    }

    /// Clear the loaded data and close the loading gate, if the gate is
    /// open.
    ///
    /// Check, clear and claim happen under one write lock, so a run in
    /// progress never sees its collections cleared. Returns whether the
    /// caller now owns the run.
    pub async fn try_begin_refresh(&self) -> bool {
        let mut state = self.state.write().await;
        if !state.loading_allowed {
            debug!("Refresh refused while loading");
            return false;
        }
        state.expansions.clear();
        state.raids.clear();
        state.dungeons.clear();
        state.progress.actual_items_to_download = 0;
        state.progress.downloaded_items = 0;
        state.stage = SyncStage::Idle;
        state.loading_allowed = false;

        self.emit(SyncEvent::DataCleared);
        self.emit_progress(&state);
        drop(state);

        self.emit(SyncEvent::LoadingGateChanged { allowed: false });
        true
    }

    fn emit_progress(&self, state: &State) {
        self.emit(SyncEvent::Progress {
            stage: state.stage.to_string(),
            downloaded_items: state.progress.downloaded_items,
            total_items: state.progress.total(),
            percent: state.progress.percent(),
        });
    }

    fn emit(&self, event: SyncEvent) {
        // No subscribers is not an error.
        let _ = self.event_bus.emit(CoreEvent::Sync(event));
    }
}
