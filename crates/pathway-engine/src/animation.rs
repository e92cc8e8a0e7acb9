//! Per-node animation timelines and the unlock celebration queue.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────┐     ┌──────────────────┐     ┌─────────────────────┐
//! │ AnimationArena     │────▶│ NodeAnimations   │────▶│ AnimationController │
//! │ (id → controllers) │     │ (glow/pulse/     │     │ (0.0 - 1.0 timeline)│
//! └────────────────────┘     │  unlock + state) │     └─────────────────────┘
//!           ▲                └──────────────────┘
//!           │
//! ┌────────────────────┐
//! │ CelebrationQueue   │  one celebration at a time, staggered
//! └────────────────────┘
//! ```
//!
//! Each node runs a small state machine:
//! `Idle` (locked), `Pulsing` (in progress), `Glowing` (unlocked) and the
//! transient `Celebrating`, entered only from an unlock event.

use pathway_common::{AchievementId, AnimationError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use tracing::{debug, warn};

use crate::achievement::VisualState;
use crate::easing::Easing;
use crate::events::{EventBus, ProgressionEvent};
use crate::nodes::NodePosition;

/// Cooldowns below this are treated as elapsed.
const COOLDOWN_EPSILON: f32 = 1e-4;

/// Animation durations and magnitudes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationTimings {
    /// One glow sweep (forward half of the loop), seconds.
    pub glow_period: f32,
    /// One pulse sweep, seconds.
    pub pulse_period: f32,
    /// Whole celebration, seconds.
    pub celebration_duration: f32,
    /// Time held at full scale during a celebration, seconds.
    pub celebration_hold: f32,
    /// Pause between consecutive celebrations, seconds.
    pub stagger_delay: f32,
    /// Extra scale at the celebration peak (0.5 = 150%).
    pub celebration_scale: f32,
}

impl Default for AnimationTimings {
    fn default() -> Self {
        Self {
            glow_period: 2.0,
            pulse_period: 1.2,
            celebration_duration: 1.5,
            celebration_hold: 0.5,
            stagger_delay: 0.3,
            celebration_scale: 0.5,
        }
    }
}

impl AnimationTimings {
    /// Duration of the scale-up and of the return phase.
    #[must_use]
    pub fn celebration_ramp(&self) -> f32 {
        ((self.celebration_duration - self.celebration_hold) / 2.0).max(0.0)
    }
}

/// Whether a timeline plays once or loops back and forth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackMode {
    /// Play to the end and stop.
    Once,
    /// Play forward, then backward, forever.
    RepeatReverse,
}

/// Current direction of a timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackStatus {
    /// Not playing.
    #[default]
    Stopped,
    /// Moving toward the end.
    Forward,
    /// Moving back toward the start.
    Reverse,
    /// A one-shot timeline reached its end.
    Completed,
}

/// A single normalized timeline.
#[derive(Debug, Clone)]
pub struct AnimationController {
    owner: AchievementId,
    duration: f32,
    elapsed: f32,
    mode: PlaybackMode,
    status: PlaybackStatus,
    easing: Easing,
    disposed: bool,
}

impl AnimationController {
    /// Creates a stopped controller.
    #[must_use]
    pub fn new(owner: AchievementId, duration: f32, mode: PlaybackMode, easing: Easing) -> Self {
        Self {
            owner,
            duration: duration.max(0.001),
            elapsed: 0.0,
            mode,
            status: PlaybackStatus::Stopped,
            easing,
            disposed: false,
        }
    }

    fn check(&self) -> Result<(), AnimationError> {
        if self.disposed {
            Err(AnimationError::ControllerDisposed {
                id: self.owner.clone(),
            })
        } else {
            Ok(())
        }
    }

    /// Starts from the beginning.
    pub fn start(&mut self) -> Result<(), AnimationError> {
        self.check()?;
        self.elapsed = 0.0;
        self.status = PlaybackStatus::Forward;
        Ok(())
    }

    /// Stops and rewinds to the start.
    pub fn stop(&mut self) -> Result<(), AnimationError> {
        self.check()?;
        self.elapsed = 0.0;
        self.status = PlaybackStatus::Stopped;
        Ok(())
    }

    /// Advances the timeline. Returns `true` when a one-shot timeline completes.
    pub fn tick(&mut self, dt: f32) -> Result<bool, AnimationError> {
        self.check()?;
        match self.status {
            PlaybackStatus::Forward => {
                self.elapsed += dt;
                if self.elapsed >= self.duration {
                    match self.mode {
                        PlaybackMode::Once => {
                            self.elapsed = self.duration;
                            self.status = PlaybackStatus::Completed;
                            return Ok(true);
                        }
                        PlaybackMode::RepeatReverse => {
                            let overshoot = (self.elapsed - self.duration).min(self.duration);
                            self.elapsed = self.duration - overshoot;
                            self.status = PlaybackStatus::Reverse;
                        }
                    }
                }
            }
            PlaybackStatus::Reverse => {
                self.elapsed -= dt;
                if self.elapsed <= 0.0 {
                    self.elapsed = (-self.elapsed).min(self.duration);
                    self.status = PlaybackStatus::Forward;
                }
            }
            PlaybackStatus::Stopped | PlaybackStatus::Completed => {}
        }
        Ok(false)
    }

    /// Raw position, 0.0-1.0.
    #[must_use]
    pub fn progress(&self) -> f32 {
        (self.elapsed / self.duration).clamp(0.0, 1.0)
    }

    /// Eased position.
    #[must_use]
    pub fn eased(&self) -> f32 {
        self.easing.apply(self.progress())
    }

    /// Seconds into the timeline.
    #[must_use]
    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    /// Current status.
    #[must_use]
    pub fn status(&self) -> PlaybackStatus {
        self.status
    }

    /// Whether the timeline is advancing.
    #[must_use]
    pub fn is_running(&self) -> bool {
        matches!(self.status, PlaybackStatus::Forward | PlaybackStatus::Reverse)
    }

    /// Releases the controller. Every later call fails.
    pub fn dispose(&mut self) {
        self.disposed = true;
        self.status = PlaybackStatus::Stopped;
    }

    /// Whether the controller was disposed.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }
}

/// Animation state of one node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum NodeAnimState {
    /// Locked, no ambient motion.
    #[default]
    Idle,
    /// In progress, looping pulse.
    Pulsing,
    /// Unlocked, looping glow.
    Glowing,
    /// Playing the unlock celebration.
    Celebrating,
}

impl NodeAnimState {
    /// Ambient state for a visual state.
    #[must_use]
    pub const fn ambient_for(visual: VisualState) -> Self {
        match visual {
            VisualState::Locked => Self::Idle,
            VisualState::InProgress => Self::Pulsing,
            VisualState::Unlocked | VisualState::RewardAvailable => Self::Glowing,
        }
    }
}

/// Values the renderer tweens a node with.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NodeAnimationSample {
    /// Current state.
    pub state: NodeAnimState,
    /// Glow intensity, 0.0-1.0.
    pub glow_intensity: f32,
    /// Progress pulse intensity, 0.0-1.0.
    pub pulse_intensity: f32,
    /// Celebration timeline position, 0.0-1.0.
    pub unlock_progress: f32,
    /// Node scale multiplier, 1.0 at rest.
    pub unlock_scale: f32,
    /// Opacity of the celebration burst, 0.0-1.0.
    pub unlock_opacity: f32,
}

impl Default for NodeAnimationSample {
    fn default() -> Self {
        Self {
            state: NodeAnimState::Idle,
            glow_intensity: 0.0,
            pulse_intensity: 0.0,
            unlock_progress: 0.0,
            unlock_scale: 1.0,
            unlock_opacity: 0.0,
        }
    }
}

/// The glow, pulse and unlock timelines of one achievement.
///
/// The three controllers are created together and disposed together.
#[derive(Debug, Clone)]
pub struct NodeAnimations {
    id: AchievementId,
    glow: AnimationController,
    pulse: AnimationController,
    unlock: AnimationController,
    state: NodeAnimState,
    visual_state: VisualState,
    awaiting_celebration: bool,
    timings: AnimationTimings,
}

impl NodeAnimations {
    /// Creates idle timelines for an achievement.
    #[must_use]
    pub fn new(id: AchievementId, timings: AnimationTimings) -> Self {
        Self {
            glow: AnimationController::new(
                id.clone(),
                timings.glow_period,
                PlaybackMode::RepeatReverse,
                Easing::SmoothStep,
            ),
            pulse: AnimationController::new(
                id.clone(),
                timings.pulse_period,
                PlaybackMode::RepeatReverse,
                Easing::EaseInOut,
            ),
            unlock: AnimationController::new(
                id.clone(),
                timings.celebration_duration,
                PlaybackMode::Once,
                Easing::Linear,
            ),
            id,
            state: NodeAnimState::Idle,
            visual_state: VisualState::Locked,
            awaiting_celebration: false,
            timings,
        }
    }

    /// Achievement id.
    #[must_use]
    pub fn id(&self) -> &AchievementId {
        &self.id
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> NodeAnimState {
        self.state
    }

    /// Follows the node's visual state with the matching ambient loop.
    ///
    /// While celebrating, or while an unlock celebration is queued, the new
    /// visual state is only recorded.
    pub fn sync(&mut self, visual: VisualState) -> Result<(), AnimationError> {
        self.visual_state = visual;
        if self.state == NodeAnimState::Celebrating || self.awaiting_celebration {
            return Ok(());
        }
        self.enter(NodeAnimState::ambient_for(visual))
    }

    fn enter(&mut self, state: NodeAnimState) -> Result<(), AnimationError> {
        if state == self.state && state != NodeAnimState::Idle {
            return Ok(());
        }
        match state {
            NodeAnimState::Idle => {
                self.glow.stop()?;
                self.pulse.stop()?;
            }
            NodeAnimState::Pulsing => {
                self.glow.stop()?;
                self.pulse.start()?;
            }
            NodeAnimState::Glowing => {
                self.pulse.stop()?;
                self.glow.start()?;
            }
            NodeAnimState::Celebrating => {
                self.glow.stop()?;
                self.pulse.stop()?;
                self.unlock.start()?;
            }
        }
        self.state = state;
        Ok(())
    }

    /// Holds the ambient state until the queued celebration plays.
    pub fn mark_awaiting_celebration(&mut self) {
        self.awaiting_celebration = true;
    }

    /// Starts the unlock celebration.
    pub fn celebrate(&mut self) -> Result<(), AnimationError> {
        self.unlock.check()?;
        self.awaiting_celebration = false;
        if self.state == NodeAnimState::Celebrating {
            return Err(AnimationError::AlreadyRunning {
                id: self.id.clone(),
            });
        }
        self.enter(NodeAnimState::Celebrating)
    }

    /// Restarts the pulse loop so a progress update is visible.
    pub fn nudge_pulse(&mut self) -> Result<(), AnimationError> {
        if self.state == NodeAnimState::Pulsing {
            self.pulse.start()?;
        }
        Ok(())
    }

    /// Advances the active timelines. Returns `true` when a celebration ends.
    pub fn tick(&mut self, dt: f32) -> Result<bool, AnimationError> {
        match self.state {
            NodeAnimState::Idle => {
                self.unlock.check()?;
                Ok(false)
            }
            NodeAnimState::Pulsing => self.pulse.tick(dt).map(|_| false),
            NodeAnimState::Glowing => self.glow.tick(dt).map(|_| false),
            NodeAnimState::Celebrating => {
                if !self.unlock.tick(dt)? {
                    return Ok(false);
                }
                self.enter(NodeAnimState::ambient_for(self.visual_state))?;
                Ok(true)
            }
        }
    }

    /// Current renderer values.
    #[must_use]
    pub fn sample(&self) -> NodeAnimationSample {
        let mut sample = NodeAnimationSample {
            state: self.state,
            ..NodeAnimationSample::default()
        };
        match self.state {
            NodeAnimState::Idle => {}
            NodeAnimState::Pulsing => sample.pulse_intensity = self.pulse.eased(),
            NodeAnimState::Glowing => sample.glow_intensity = 0.4 + 0.6 * self.glow.eased(),
            NodeAnimState::Celebrating => {
                let (scale, opacity) = self.celebration_curve();
                sample.glow_intensity = 1.0;
                sample.unlock_progress = self.unlock.progress();
                sample.unlock_scale = scale;
                sample.unlock_opacity = opacity;
            }
        }
        sample
    }

    /// Scale-up with elastic easing, hold, then ease back to rest.
    fn celebration_curve(&self) -> (f32, f32) {
        let t = self.unlock.elapsed();
        let ramp = self.timings.celebration_ramp();
        let hold = self.timings.celebration_hold;
        let peak = self.timings.celebration_scale;
        if ramp <= 0.0 {
            return (1.0 + peak, 1.0);
        }
        if t < ramp {
            let p = t / ramp;
            (1.0 + peak * Easing::ElasticOut.apply(p), p)
        } else if t < ramp + hold {
            (1.0 + peak, 1.0)
        } else {
            let p = ((t - ramp - hold) / ramp).clamp(0.0, 1.0);
            (1.0 + peak * (1.0 - Easing::EaseInOut.apply(p)), 1.0 - p)
        }
    }

    /// Disposes all three controllers.
    pub fn dispose(&mut self) {
        self.glow.dispose();
        self.pulse.dispose();
        self.unlock.dispose();
    }

    /// Whether the controllers were disposed.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.unlock.is_disposed()
    }
}

/// Owner of every node's animation controllers, keyed by achievement id.
#[derive(Debug, Default)]
pub struct AnimationArena {
    nodes: HashMap<AchievementId, NodeAnimations>,
    timings: AnimationTimings,
}

impl AnimationArena {
    /// Creates an empty arena.
    #[must_use]
    pub fn new(timings: AnimationTimings) -> Self {
        Self {
            nodes: HashMap::new(),
            timings,
        }
    }

    /// Controllers for an id, created on first use.
    pub fn get_or_create(&mut self, id: &AchievementId) -> &mut NodeAnimations {
        let timings = self.timings;
        self.nodes
            .entry(id.clone())
            .or_insert_with(|| NodeAnimations::new(id.clone(), timings))
    }

    /// Controllers for an id, if created.
    #[must_use]
    pub fn get(&self, id: &AchievementId) -> Option<&NodeAnimations> {
        self.nodes.get(id)
    }

    /// Mutable controllers for an id, if created.
    pub fn get_mut(&mut self, id: &AchievementId) -> Option<&mut NodeAnimations> {
        self.nodes.get_mut(id)
    }

    /// Disposes and removes all controllers of an id in one step.
    pub fn remove(&mut self, id: &AchievementId) -> bool {
        match self.nodes.remove(id) {
            Some(mut node) => {
                node.dispose();
                true
            }
            None => false,
        }
    }

    /// Removes every id not in `keep`. Returns the removed ids.
    pub fn retain_ids(&mut self, keep: &HashSet<&AchievementId>) -> Vec<AchievementId> {
        let stale: Vec<AchievementId> = self
            .nodes
            .keys()
            .filter(|id| !keep.contains(id))
            .cloned()
            .collect();
        for id in &stale {
            self.remove(id);
        }
        stale
    }

    /// Disposes and removes everything.
    pub fn clear(&mut self) {
        for node in self.nodes.values_mut() {
            node.dispose();
        }
        self.nodes.clear();
    }

    /// Number of ids with controllers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the arena is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn iter_mut(&mut self) -> impl Iterator<Item = (&AchievementId, &mut NodeAnimations)> {
        self.nodes.iter_mut()
    }
}

/// Plays unlock celebrations one at a time with a stagger between them.
#[derive(Debug, Default)]
pub struct CelebrationQueue {
    pending: VecDeque<AchievementId>,
    active: Option<AchievementId>,
    cooldown: f32,
    stagger: f32,
}

impl CelebrationQueue {
    /// Creates an empty queue.
    #[must_use]
    pub fn new(stagger: f32) -> Self {
        Self {
            stagger: stagger.max(0.0),
            ..Self::default()
        }
    }

    /// Queues an id unless it is already queued or playing.
    pub fn enqueue(&mut self, id: AchievementId) -> bool {
        if self.active.as_ref() == Some(&id) || self.pending.contains(&id) {
            return false;
        }
        self.pending.push_back(id);
        true
    }

    /// Marks the active celebration done and starts the stagger.
    pub fn finish(&mut self, id: &AchievementId) {
        if self.active.as_ref() == Some(id) {
            self.active = None;
            self.cooldown = self.stagger;
        }
    }

    /// Drops an id from the queue, ending it if active.
    pub fn remove(&mut self, id: &AchievementId) {
        self.pending.retain(|p| p != id);
        self.finish(id);
    }

    fn cool_down(&mut self, dt: f32) {
        if self.active.is_none() && self.cooldown > 0.0 {
            self.cooldown -= dt;
        }
    }

    fn next_ready(&mut self) -> Option<AchievementId> {
        if self.active.is_some() || self.cooldown > COOLDOWN_EPSILON {
            return None;
        }
        let id = self.pending.pop_front()?;
        self.active = Some(id.clone());
        Some(id)
    }

    /// Celebration currently playing.
    #[must_use]
    pub fn active(&self) -> Option<&AchievementId> {
        self.active.as_ref()
    }

    /// Number of queued celebrations.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Empties the queue.
    pub fn clear(&mut self) {
        self.pending.clear();
        self.active = None;
        self.cooldown = 0.0;
    }
}

/// Drives every node's animations from engine events.
#[derive(Debug, Default)]
pub struct AnimationOrchestrator {
    arena: AnimationArena,
    queue: CelebrationQueue,
}

impl AnimationOrchestrator {
    /// Creates an orchestrator with no nodes.
    #[must_use]
    pub fn new(timings: AnimationTimings) -> Self {
        Self {
            arena: AnimationArena::new(timings),
            queue: CelebrationQueue::new(timings.stagger_delay),
        }
    }

    /// Brings the arena in line with the current nodes.
    ///
    /// Unknown ids get controllers, vanished ids lose theirs, and every
    /// node's ambient loop follows its visual state.
    pub fn sync_nodes(&mut self, nodes: &[NodePosition]) {
        let keep: HashSet<&AchievementId> = nodes.iter().map(|n| &n.achievement_id).collect();
        for id in self.arena.retain_ids(&keep) {
            debug!("Dropped animations for removed achievement {id}");
            self.queue.remove(&id);
        }
        for node in nodes {
            let anim = self.arena.get_or_create(&node.achievement_id);
            if let Err(e) = anim.sync(node.visual_state) {
                warn!("Ignoring animation sync for {}: {e}", node.achievement_id);
            }
        }
    }

    /// Reacts to one engine event.
    pub fn handle_event(&mut self, event: &ProgressionEvent) {
        match event {
            ProgressionEvent::Unlocked { id } => {
                self.arena.get_or_create(id).mark_awaiting_celebration();
                if self.queue.enqueue(id.clone()) {
                    debug!("Queued celebration for {id} ({} pending)", self.queue.pending_len());
                }
            }
            ProgressionEvent::Progress { id, .. } => {
                if let Some(anim) = self.arena.get_mut(id) {
                    if let Err(e) = anim.nudge_pulse() {
                        warn!("Ignoring progress pulse for {id}: {e}");
                    }
                }
            }
            ProgressionEvent::AchievementRemoved { id } => self.remove(id),
            _ => {}
        }
    }

    /// Advances every animation and the celebration queue.
    pub fn tick(&mut self, dt: f32, bus: &EventBus) {
        self.queue.cool_down(dt);

        let mut finished = Vec::new();
        for (id, anim) in self.arena.iter_mut() {
            match anim.tick(dt) {
                Ok(true) => finished.push(id.clone()),
                Ok(false) => {}
                Err(e) => warn!("Skipping animation tick for {id}: {e}"),
            }
        }
        if let Some(active) = self.queue.active().cloned() {
            let gone = self.arena.get(&active).map_or(true, NodeAnimations::is_disposed);
            if gone {
                warn!("Celebration target {active} disappeared, skipping");
                self.queue.finish(&active);
            }
        }
        for id in finished {
            self.queue.finish(&id);
            bus.publish(ProgressionEvent::CelebrationFinished { id });
        }

        while let Some(id) = self.queue.next_ready() {
            let started = match self.arena.get_mut(&id) {
                Some(anim) => anim.celebrate(),
                None => Err(AnimationError::ControllerDisposed { id: id.clone() }),
            };
            match started {
                Ok(()) => {
                    debug!("Celebrating {id}");
                    bus.publish(ProgressionEvent::CelebrationStarted { id });
                    break;
                }
                Err(e) => {
                    warn!("Could not start celebration: {e}");
                    self.queue.finish(&id);
                }
            }
        }
    }

    /// Removes an id's controllers and any queued celebration.
    pub fn remove(&mut self, id: &AchievementId) {
        self.queue.remove(id);
        self.arena.remove(id);
    }

    /// Renderer values for one node.
    #[must_use]
    pub fn sample(&self, id: &AchievementId) -> Option<NodeAnimationSample> {
        self.arena.get(id).map(NodeAnimations::sample)
    }

    /// Renderer values for every node, ordered by id.
    #[must_use]
    pub fn samples(&self) -> BTreeMap<AchievementId, NodeAnimationSample> {
        self.arena
            .nodes
            .iter()
            .map(|(id, anim)| (id.clone(), anim.sample()))
            .collect()
    }

    /// Celebration currently playing.
    #[must_use]
    pub fn active_celebration(&self) -> Option<&AchievementId> {
        self.queue.active()
    }

    /// Number of celebrations waiting.
    #[must_use]
    pub fn pending_celebrations(&self) -> usize {
        self.queue.pending_len()
    }

    /// Controllers, for inspection.
    #[must_use]
    pub fn arena(&self) -> &AnimationArena {
        &self.arena
    }

    /// Mutable controllers.
    pub fn arena_mut(&mut self) -> &mut AnimationArena {
        &mut self.arena
    }

    /// Disposes everything (screen torn down).
    pub fn teardown(&mut self) {
        self.queue.clear();
        self.arena.clear();
    }
}
