//! Change tracking between successive achievement snapshots.
//!
//! The hub keeps the last snapshot it saw and turns every new one into
//! [`ProgressionEvent`]s. Pushed updates from the source are the primary
//! input; a periodic poll of the source catches anything a push missed.
//! Both paths go through the same diff, so a snapshot seen twice produces
//! no events the second time.

use crossbeam_channel::{Receiver, TryRecvError};
use pathway_common::AchievementId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{debug, info};

use crate::achievement::{Achievement, AchievementCategory, Statistics};
use crate::events::{EventBus, ProgressionEvent, StatisticDelta, DEFAULT_EVENT_CAPACITY};
use crate::source::{AchievementSource, SourceUpdate};

/// Change hub settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HubConfig {
    /// Seconds between safety-net polls of the source.
    pub poll_interval: f32,
    /// Pending events above which the bus logs a warning. Events past this
    /// backlog are still delivered.
    pub event_capacity: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            poll_interval: 0.5,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

/// Outcome of diffing two snapshots.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SnapshotDiff {
    /// Events in emission order.
    pub events: Vec<ProgressionEvent>,
    /// Whether ids, categories or targets changed, which invalidates geometry.
    pub membership_changed: bool,
    /// Whether anything at all changed.
    pub changed: bool,
}

/// What a hub tick produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HubUpdate {
    /// Latest snapshot, present only if achievements changed.
    pub snapshot: Option<Vec<Achievement>>,
    /// Whether any applied snapshot changed membership.
    pub membership_changed: bool,
    /// Whether statistics changed.
    pub statistics_changed: bool,
}

impl HubUpdate {
    fn merge(&mut self, other: HubUpdate) {
        if other.snapshot.is_some() {
            self.snapshot = other.snapshot;
        }
        self.membership_changed |= other.membership_changed;
        self.statistics_changed |= other.statistics_changed;
    }
}

/// Whether moving from `old` to `new` crossed a 25% boundary upward.
#[must_use]
pub fn crossed_milestone(old: f32, new: f32) -> bool {
    (new * 4.0).floor() > (old * 4.0).floor()
}

/// Diffs two achievement snapshots.
#[must_use]
pub fn diff_snapshots(old: &[Achievement], new: &[Achievement]) -> SnapshotDiff {
    if old == new {
        return SnapshotDiff::default();
    }

    let previous: HashMap<&AchievementId, &Achievement> = old.iter().map(|a| (&a.id, a)).collect();
    let mut events = Vec::new();

    for current in new {
        let Some(before) = previous.get(&current.id) else {
            continue;
        };
        if before.current_progress != current.current_progress {
            let old_progress = before.progress_fraction();
            let new_progress = current.progress_fraction();
            events.push(ProgressionEvent::Progress {
                id: current.id.clone(),
                old_progress,
                new_progress,
                is_significant_milestone: crossed_milestone(old_progress, new_progress),
            });
        }
        if !before.is_unlocked && current.is_unlocked {
            events.push(ProgressionEvent::Unlocked {
                id: current.id.clone(),
            });
        }
    }

    let current_ids: HashSet<&AchievementId> = new.iter().map(|a| &a.id).collect();
    for before in old {
        if !current_ids.contains(&before.id) {
            events.push(ProgressionEvent::AchievementRemoved {
                id: before.id.clone(),
            });
        }
    }

    SnapshotDiff {
        events,
        membership_changed: membership(old) != membership(new),
        changed: true,
    }
}

fn membership(list: &[Achievement]) -> Vec<(&AchievementId, AchievementCategory, u32)> {
    let mut key: Vec<_> = list
        .iter()
        .map(|a| (&a.id, a.category, a.target_value))
        .collect();
    key.sort();
    key
}

/// Diffs two statistics maps. Removed keys report a new value of 0.
#[must_use]
pub fn diff_statistics(old: &Statistics, new: &Statistics) -> BTreeMap<String, StatisticDelta> {
    let mut deltas = BTreeMap::new();
    for (key, &new_value) in new {
        let old_value = old.get(key).copied().unwrap_or(0);
        if old_value != new_value {
            deltas.insert(
                key.clone(),
                StatisticDelta {
                    old_value,
                    new_value,
                    delta: new_value - old_value,
                },
            );
        }
    }
    for (key, &old_value) in old {
        if !new.contains_key(key) && old_value != 0 {
            deltas.insert(
                key.clone(),
                StatisticDelta {
                    old_value,
                    new_value: 0,
                    delta: -old_value,
                },
            );
        }
    }
    deltas
}

/// Tracks the last snapshot and publishes diffs.
#[derive(Debug)]
pub struct ChangeHub {
    previous: Option<Vec<Achievement>>,
    previous_statistics: Option<Statistics>,
    /// Source snapshot that was current when the host last applied one.
    host_override: Option<Vec<Achievement>>,
    push: Option<Receiver<SourceUpdate>>,
    poll_interval: f32,
    since_poll: f32,
}

impl ChangeHub {
    /// Creates a hub with no baseline.
    #[must_use]
    pub fn new(config: HubConfig) -> Self {
        Self {
            previous: None,
            previous_statistics: None,
            host_override: None,
            push: None,
            poll_interval: config.poll_interval.max(0.0),
            since_poll: 0.0,
        }
    }

    /// Subscribes to the source's push channel, if it offers one.
    pub fn connect(&mut self, source: &mut dyn AchievementSource) {
        self.push = source.subscribe();
        if self.push.is_some() {
            info!("Change hub subscribed to push updates, polling every {}s as fallback", self.poll_interval);
        } else {
            info!("Source has no push channel, polling every {}s", self.poll_interval);
        }
    }

    /// Whether a push subscription is active.
    #[must_use]
    pub fn is_push_connected(&self) -> bool {
        self.push.is_some()
    }

    /// Latest snapshot seen, empty before the first one.
    #[must_use]
    pub fn latest(&self) -> &[Achievement] {
        self.previous.as_deref().unwrap_or(&[])
    }

    /// Applies one snapshot, publishing its diff.
    ///
    /// The first snapshot only establishes the baseline.
    pub fn apply_snapshot(&mut self, snapshot: Vec<Achievement>, bus: &EventBus) -> HubUpdate {
        let Some(previous) = self.previous.as_ref() else {
            debug!("Baseline snapshot with {} achievements", snapshot.len());
            self.previous = Some(snapshot.clone());
            return HubUpdate {
                snapshot: Some(snapshot),
                membership_changed: true,
                statistics_changed: false,
            };
        };

        let diff = diff_snapshots(previous, &snapshot);
        if !diff.changed {
            return HubUpdate::default();
        }
        debug!("Snapshot diff produced {} events", diff.events.len());
        for event in diff.events {
            bus.publish(event);
        }
        self.previous = Some(snapshot.clone());
        HubUpdate {
            snapshot: Some(snapshot),
            membership_changed: diff.membership_changed,
            statistics_changed: false,
        }
    }

    /// Applies a snapshot supplied by the host rather than the source.
    ///
    /// `source_view` is what the source reports right now. Polls returning
    /// exactly that are stale and skipped until the source changes.
    pub fn apply_host_snapshot(
        &mut self,
        snapshot: Vec<Achievement>,
        source_view: Vec<Achievement>,
        bus: &EventBus,
    ) -> HubUpdate {
        self.host_override = (source_view != snapshot).then_some(source_view);
        self.apply_snapshot(snapshot, bus)
    }

    /// Applies a statistics snapshot, publishing changed keys.
    pub fn apply_statistics(&mut self, statistics: Statistics, bus: &EventBus) -> bool {
        let changed = match self.previous_statistics.as_ref() {
            None => false,
            Some(previous) => {
                let deltas = diff_statistics(previous, &statistics);
                if deltas.is_empty() {
                    false
                } else {
                    bus.publish(ProgressionEvent::Statistics { deltas });
                    true
                }
            }
        };
        self.previous_statistics = Some(statistics);
        changed
    }

    /// Drains pushed updates, then polls the source if the interval elapsed.
    pub fn tick(&mut self, dt: f32, source: &dyn AchievementSource, bus: &EventBus) -> HubUpdate {
        let mut update = HubUpdate::default();

        let mut disconnected = false;
        if let Some(receiver) = self.push.as_ref() {
            let mut pending = Vec::new();
            loop {
                match receiver.try_recv() {
                    Ok(item) => pending.push(item),
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        disconnected = true;
                        break;
                    }
                }
            }
            for item in pending {
                update.merge(self.apply_update(item, bus));
            }
        }
        if disconnected {
            info!("Push channel closed, falling back to polling only");
            self.push = None;
        }

        self.since_poll += dt;
        if self.since_poll >= self.poll_interval {
            self.since_poll = 0.0;
            let polled = source.snapshot();
            if self.host_override.as_ref() == Some(&polled) {
                debug!("Poll matches pre-override source state, skipping");
            } else {
                self.host_override = None;
                update.merge(self.apply_snapshot(polled, bus));
            }
            let statistics_changed = self.apply_statistics(source.statistics(), bus);
            update.statistics_changed |= statistics_changed;
        }

        update
    }

    fn apply_update(&mut self, item: SourceUpdate, bus: &EventBus) -> HubUpdate {
        match item {
            SourceUpdate::Achievements(list) => {
                self.host_override = None;
                self.apply_snapshot(list, bus)
            }
            SourceUpdate::Statistics(statistics) => HubUpdate {
                statistics_changed: self.apply_statistics(statistics, bus),
                ..HubUpdate::default()
            },
        }
    }

    /// Forgets the baseline (screen torn down).
    pub fn reset(&mut self) {
        self.previous = None;
        self.previous_statistics = None;
        self.host_override = None;
        self.since_poll = 0.0;
    }
}
