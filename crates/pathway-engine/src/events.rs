//! Event bus for communication between engine components.
//!
//! Components publish typed [`ProgressionEvent`]s instead of calling each
//! other through callback fields. The integration controller drains the bus
//! once per tick and routes events to the animation orchestrator and the host.

use crossbeam_channel::{unbounded, Receiver, Sender};
use pathway_common::AchievementId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

use crate::performance::QualityLevel;

/// Default backlog size above which the bus warns.
pub const DEFAULT_EVENT_CAPACITY: usize = 1024;

/// Change of one integer statistic between two snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatisticDelta {
    /// Previous value (0 if the key is new).
    pub old_value: i64,
    /// Current value.
    pub new_value: i64,
    /// `new_value - old_value`.
    pub delta: i64,
}

/// Event types that can be sent through the event bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ProgressionEvent {
    /// Progress toward an achievement changed
    Progress {
        /// Achievement id
        id: AchievementId,
        /// Previous progress fraction
        old_progress: f32,
        /// New progress fraction
        new_progress: f32,
        /// Whether a 25% boundary was crossed upward
        is_significant_milestone: bool,
    },
    /// Achievement went from locked to unlocked
    Unlocked {
        /// Achievement id
        id: AchievementId,
    },
    /// Achievement disappeared from the snapshot
    AchievementRemoved {
        /// Achievement id
        id: AchievementId,
    },
    /// Statistics changed; only changed keys are present
    Statistics {
        /// Changed keys with their deltas
        deltas: BTreeMap<String, StatisticDelta>,
    },
    /// Unlock celebration began playing
    CelebrationStarted {
        /// Achievement id
        id: AchievementId,
    },
    /// Unlock celebration finished
    CelebrationFinished {
        /// Achievement id
        id: AchievementId,
    },
    /// Adaptive quality stepped
    QualityChanged {
        /// New particle quality
        particle: QualityLevel,
        /// New graphics quality
        graphics: QualityLevel,
        /// Whether expensive effects are suppressed
        reduce_effects: bool,
    },
    /// Reveal scan line reached the bottom
    RevealFinished,
}

impl ProgressionEvent {
    /// Achievement the event refers to, if any.
    #[must_use]
    pub fn achievement_id(&self) -> Option<&AchievementId> {
        match self {
            Self::Progress { id, .. }
            | Self::Unlocked { id }
            | Self::AchievementRemoved { id }
            | Self::CelebrationStarted { id }
            | Self::CelebrationFinished { id } => Some(id),
            Self::Statistics { .. } | Self::QualityChanged { .. } | Self::RevealFinished => None,
        }
    }
}

/// Event bus for broadcasting events to the controller.
#[derive(Debug)]
pub struct EventBus {
    /// Sender for broadcasting events
    sender: Sender<ProgressionEvent>,
    /// Receiver for collecting events
    receiver: Receiver<ProgressionEvent>,
    /// Backlog size that triggers a warning
    capacity: usize,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

impl EventBus {
    /// Creates a new event bus that warns once `capacity` events are pending.
    ///
    /// The channel itself is unbounded, so an unlock is never lost to a
    /// backlog.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (sender, receiver) = unbounded();
        Self {
            sender,
            receiver,
            capacity,
        }
    }

    /// Publishes an event to the bus.
    ///
    /// Never blocks and never drops. Crossing the capacity logs a warning.
    pub fn publish(&self, event: ProgressionEvent) {
        // The bus owns its receiver, so the channel cannot be disconnected.
        let _ = self.sender.send(event);
        let pending = self.receiver.len();
        if pending == self.capacity + 1 {
            warn!("Event bus backlog exceeded {} pending events", self.capacity);
        }
    }

    /// Drains all pending events.
    pub fn drain(&self) -> Vec<ProgressionEvent> {
        self.receiver.try_iter().collect()
    }

    /// Returns the number of pending events.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.receiver.len()
    }

    /// Returns the backlog warning threshold.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }
}
