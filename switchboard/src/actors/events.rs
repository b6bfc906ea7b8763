//! Mission event fan-out.
//!
//! Mission state lives in `MissionControlActor`; this bus is the delivery
//! plane only. Observers subscribe for incremental updates instead of
//! polling snapshots; a slow observer lags and skips, it never backpressures
//! the mission.

use shared_types::{AttemptStatus, ProviderId, ScoredOffer, Utterance};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Incremental mission news, in the order the orchestrator observed it.
#[derive(Debug, Clone)]
pub enum MissionEvent {
    MissionStarted {
        request_id: Uuid,
        total_attempts: usize,
    },
    /// Directory lookup returned nothing; nothing was spawned.
    NoProviders {
        request_id: Uuid,
    },
    StatusChanged {
        provider_id: ProviderId,
        status: AttemptStatus,
    },
    UtteranceAdded {
        provider_id: ProviderId,
        utterance: Utterance,
    },
    ProgressChanged {
        completed: usize,
        total: usize,
    },
    MissionCompleted {
        request_id: Uuid,
        results: Vec<ScoredOffer>,
    },
    MissionStopped {
        request_id: Uuid,
    },
}

/// Broadcast fan-out with a bounded per-subscriber buffer.
pub struct MissionEventBus {
    tx: broadcast::Sender<MissionEvent>,
}

impl MissionEventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publish to all live subscribers. No subscribers is not an error.
    pub fn publish(&self, event: MissionEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MissionEvent> {
        self.tx.subscribe()
    }
}

impl Default for MissionEventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
