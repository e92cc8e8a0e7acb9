//! The façade the render host talks to.
//!
//! Owns every component and runs them in a fixed order each tick:
//!
//! ```text
//! source ──▶ ChangeHub ──▶ layout / nodes ──▶ EventBus ──▶ AnimationOrchestrator
//!                                                               │
//!          FrameState ◀── QualityController ◀── RevealController ◀── ScrollController
//! ```

use pathway_common::{AchievementId, PathResult, Point, Rect, Size};
use std::sync::Arc;
use tracing::{debug, info};

use crate::achievement::{Achievement, Statistics};
use crate::animation::AnimationOrchestrator;
use crate::config::EngineConfig;
use crate::events::{EventBus, ProgressionEvent};
use crate::frame::{FrameState, NodeInstance};
use crate::hub::{ChangeHub, HubUpdate};
use crate::layout::{PathLayout, PathLayoutCalculator, PathSegment};
use crate::navigation::ScrollController;
use crate::nodes::{self, NodePosition};
use crate::performance::{self, Culler, HostSignals, QualityController, RenderSettings};
use crate::reveal::RevealController;
use crate::source::AchievementSource;

/// Progression screen controller.
///
/// Generic over the achievement source; `Box<dyn AchievementSource>` works too.
pub struct ProgressionController<S: AchievementSource> {
    config: EngineConfig,
    source: S,
    bus: EventBus,
    hub: ChangeHub,
    calculator: PathLayoutCalculator,
    layout: Arc<PathLayout>,
    nodes: Arc<Vec<NodePosition>>,
    nodes_dirty: bool,
    viewport: Size,
    orchestrator: AnimationOrchestrator,
    scroll: ScrollController,
    reveal: RevealController,
    reveal_armed: bool,
    quality: QualityController,
    culler: Culler,
    frame: u64,
    torn_down: bool,
}

impl<S: AchievementSource> std::fmt::Debug for ProgressionController<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressionController")
            .field("viewport", &self.viewport)
            .field("segments", &self.layout.segments.len())
            .field("nodes", &self.nodes.len())
            .field("frame", &self.frame)
            .field("torn_down", &self.torn_down)
            .finish_non_exhaustive()
    }
}

impl<S: AchievementSource> ProgressionController<S> {
    /// Creates a controller and takes the source's current snapshot as baseline.
    ///
    /// Fails only if the configuration is unusable.
    pub fn new(config: EngineConfig, mut source: S) -> PathResult<Self> {
        config.check()?;

        let bus = EventBus::new(config.hub.event_capacity);
        let mut hub = ChangeHub::new(config.hub);
        hub.connect(&mut source);

        let calculator = PathLayoutCalculator::new(config.layout.branches.clone())
            .with_spacing(config.layout.node_spacing, config.layout.row_spacing);

        let mut controller = Self {
            bus,
            hub,
            calculator,
            layout: Arc::default(),
            nodes: Arc::default(),
            nodes_dirty: false,
            viewport: Size::default(),
            orchestrator: AnimationOrchestrator::new(config.animation),
            scroll: ScrollController::new(config.scroll),
            reveal: RevealController::new(config.reveal),
            reveal_armed: true,
            quality: QualityController::new(config.quality),
            culler: Culler::new(config.culling),
            frame: 0,
            torn_down: false,
            source,
            config,
        };

        let baseline = controller.source.snapshot();
        let update = controller.hub.apply_snapshot(baseline, &controller.bus);
        controller.absorb(update);
        let statistics = controller.source.statistics();
        controller.hub.apply_statistics(statistics, &controller.bus);

        info!(
            "Progression controller ready with {} achievements",
            controller.hub.latest().len()
        );
        Ok(controller)
    }

    /// Configuration in use.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Achievement source.
    #[must_use]
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Mutable achievement source. Changes made through a pushing source
    /// arrive on the next update.
    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    /// Current viewport.
    #[must_use]
    pub fn viewport(&self) -> Size {
        self.viewport
    }

    /// Current layout.
    #[must_use]
    pub fn layout(&self) -> &PathLayout {
        &self.layout
    }

    /// Current nodes.
    #[must_use]
    pub fn nodes(&self) -> &[NodePosition] {
        &self.nodes
    }

    /// Latest achievements seen.
    #[must_use]
    pub fn achievements(&self) -> &[Achievement] {
        self.hub.latest()
    }

    /// Resizes the viewport, re-laying out the path.
    ///
    /// The reveal starts on the first non-empty viewport.
    pub fn set_viewport(&mut self, size: Size) {
        if size == self.viewport {
            return;
        }
        self.viewport = size;
        self.reveal.set_height(size.height);
        self.relayout();
        if self.reveal_armed && !size.is_empty() {
            self.reveal_armed = false;
            self.reveal.start();
        }
    }

    /// Applies a snapshot pushed by the host.
    ///
    /// Polls ignore the source until it reports something new, so a source
    /// that lags behind the host does not revert the snapshot.
    pub fn apply_snapshot(&mut self, achievements: Vec<Achievement>) {
        let source_view = self.source.snapshot();
        let update = self
            .hub
            .apply_host_snapshot(achievements, source_view, &self.bus);
        self.absorb(update);
    }

    /// Applies statistics pushed by the host. Returns whether any key changed.
    pub fn apply_statistics(&mut self, statistics: Statistics) -> bool {
        self.hub.apply_statistics(statistics, &self.bus)
    }

    fn absorb(&mut self, update: HubUpdate) {
        if update.snapshot.is_none() {
            return;
        }
        if update.membership_changed {
            self.relayout();
        } else {
            let latest = self.hub.latest();
            Arc::make_mut(&mut self.layout).refresh_completion(latest);
            let slots = Arc::make_mut(&mut self.nodes).as_mut_slice();
            let changed = nodes::refresh_states(slots, latest);
            debug!("Refreshed {changed} node states without relayout");
            self.nodes_dirty = true;
        }
    }

    fn relayout(&mut self) {
        let layout = self.calculator.calculate(self.viewport, self.hub.latest());
        let nodes = nodes::resolve(&layout, self.hub.latest());
        info!(
            "Laid out {} segments and {} nodes ({:?})",
            layout.segments.len(),
            nodes.len(),
            layout.strategy
        );
        self.scroll
            .set_extents(self.viewport.height, layout.content_size.height);
        self.layout = Arc::new(layout);
        self.nodes = Arc::new(nodes);
        self.nodes_dirty = true;
    }

    /// Runs one tick and returns the frame to render.
    pub fn update(&mut self, dt: f32, signals: HostSignals) -> FrameState {
        self.frame += 1;
        if self.torn_down {
            debug!("Update after teardown ignored");
            return FrameState {
                frame: self.frame,
                ..FrameState::default()
            };
        }
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };

        let update = self.hub.tick(dt, &self.source, &self.bus);
        self.absorb(update);

        let mut events = self.bus.drain();
        for event in &events {
            self.orchestrator.handle_event(event);
        }
        if self.nodes_dirty {
            self.orchestrator.sync_nodes(&self.nodes);
            self.nodes_dirty = false;
        }
        self.orchestrator.tick(dt, &self.bus);

        self.scroll.tick(dt);

        if self.reveal.tick(dt) {
            self.bus.publish(ProgressionEvent::RevealFinished);
        }

        if let Some(change) = self.quality.update(dt, signals) {
            self.bus.publish(ProgressionEvent::QualityChanged {
                particle: change.particle,
                graphics: change.graphics,
                reduce_effects: change.reduce_effects,
            });
        }

        events.extend(self.bus.drain());
        self.build_frame(events)
    }

    fn build_frame(&self, events: Vec<ProgressionEvent>) -> FrameState {
        let viewport = self.viewport_rect();
        let visible_segments = self
            .layout
            .segments
            .iter()
            .enumerate()
            .filter(|(_, s)| self.culler.is_segment_visible(s, &viewport))
            .map(|(i, _)| i)
            .collect();
        let visible_nodes: Vec<usize> = self
            .nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| self.culler.is_node_visible(n.position, &viewport))
            .map(|(i, _)| i)
            .collect();

        let animations = self.orchestrator.samples();
        let offset = self.scroll.offset();
        let instances = visible_nodes
            .iter()
            .map(|&i| {
                let node = &self.nodes[i];
                let sample = animations
                    .get(&node.achievement_id)
                    .copied()
                    .unwrap_or_default();
                let color = self.calculator.branches().get(node.category).color;
                let opacity = self.reveal.reveal_opacity(node.position.y - offset);
                NodeInstance::new(node, &sample, color, opacity)
            })
            .collect();

        FrameState {
            frame: self.frame,
            layout: Arc::clone(&self.layout),
            nodes: Arc::clone(&self.nodes),
            animations,
            visible_segments,
            visible_nodes,
            instances,
            render_settings: self.quality.render_settings(),
            particle_quality: self.quality.particle_quality(),
            graphics_quality: self.quality.graphics_quality(),
            scroll: self.scroll.snapshot(),
            reveal: self.reveal.snapshot(),
            events,
        }
    }

    // === Navigation ===

    /// Auto-scrolls to center an achievement's node.
    pub fn scroll_to_achievement(&mut self, id: &AchievementId) -> PathResult<f32> {
        self.scroll.scroll_to_achievement(&self.nodes, id)
    }

    /// Auto-scrolls to the player's current progress.
    pub fn scroll_to_current_progress(&mut self) -> Option<f32> {
        self.scroll.scroll_to_current_progress(&self.nodes)
    }

    /// Finger down.
    pub fn begin_drag(&mut self) {
        self.scroll.begin_drag();
    }

    /// Finger moved by `delta` pixels of scroll.
    pub fn drag_by(&mut self, delta: f32) {
        self.scroll.drag_by(delta);
    }

    /// Finger up with a release velocity.
    pub fn end_drag(&mut self, velocity: f32) {
        self.scroll.end_drag(velocity);
    }

    /// Scroll controller, for inspection.
    #[must_use]
    pub fn scroll(&self) -> &ScrollController {
        &self.scroll
    }

    // === Culling ===

    /// Content-space rectangle currently on screen.
    #[must_use]
    pub fn viewport_rect(&self) -> Rect {
        performance::viewport_rect(self.scroll.offset(), self.viewport)
    }

    /// Whether a segment should be drawn.
    #[must_use]
    pub fn is_segment_visible(&self, segment: &PathSegment) -> bool {
        self.culler.is_segment_visible(segment, &self.viewport_rect())
    }

    /// Whether a node at `position` should be drawn.
    #[must_use]
    pub fn is_node_visible(&self, position: Point) -> bool {
        self.culler.is_node_visible(position, &self.viewport_rect())
    }

    /// Render settings for the current quality.
    #[must_use]
    pub fn optimized_render_settings(&self) -> RenderSettings {
        self.quality.render_settings()
    }

    // === Reveal ===

    /// Whether screen row `y` is revealed.
    #[must_use]
    pub fn should_reveal_point(&self, y: f32) -> bool {
        self.reveal.should_reveal_point(y)
    }

    /// Reveal opacity of screen row `y`.
    #[must_use]
    pub fn reveal_opacity(&self, y: f32) -> f32 {
        self.reveal.reveal_opacity(y)
    }

    /// Scan line glow.
    #[must_use]
    pub fn scan_line_glow(&self) -> f32 {
        self.reveal.scan_line_glow()
    }

    /// Reveal controller, for start/stop/reset.
    pub fn reveal_mut(&mut self) -> &mut RevealController {
        &mut self.reveal
    }

    /// Reveal controller, for inspection.
    #[must_use]
    pub fn reveal(&self) -> &RevealController {
        &self.reveal
    }

    /// Animation orchestrator, for inspection.
    #[must_use]
    pub fn animations(&self) -> &AnimationOrchestrator {
        &self.orchestrator
    }

    /// Quality controller, for inspection.
    #[must_use]
    pub fn quality(&self) -> &QualityController {
        &self.quality
    }

    /// Releases all animation controllers and forgets the baseline.
    ///
    /// Later updates return empty frames.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.orchestrator.teardown();
        self.hub.reset();
        self.reveal.stop();
        self.bus.drain();
        self.layout = Arc::default();
        self.nodes = Arc::default();
        self.torn_down = true;
        info!("Progression controller torn down");
    }

    /// Whether `teardown` ran.
    #[must_use]
    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::achievement::AchievementCategory;
    use crate::source::StaticSource;

    fn achievements() -> Vec<Achievement> {
        (0..6)
            .map(|i| {
                let a = Achievement::new(format!("score_{i}"), AchievementCategory::Score, (i + 1) * 10);
                if i < 2 {
                    a.with_progress((i + 1) * 10).unlocked()
                } else {
                    a
                }
            })
            .collect()
    }

    fn controller() -> ProgressionController<StaticSource> {
        let source = StaticSource::new(achievements());
        let mut controller =
            ProgressionController::new(EngineConfig::default(), source).expect("controller");
        controller.set_viewport(Size::new(400.0, 800.0));
        controller
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = EngineConfig::default();
        config.quality.tick_interval = 0.0;
        let source: Box<dyn AchievementSource> = Box::new(StaticSource::default());
        let result = ProgressionController::new(config, source);
        assert!(result.is_err());
    }

    #[test]
    fn test_viewport_lays_out_and_starts_reveal() {
        let controller = controller();
        assert_eq!(controller.nodes().len(), 6);
        assert_eq!(controller.layout().segments.len(), 1);
        assert!(controller.reveal().is_running());
    }

    #[test]
    fn test_update_produces_frame() {
        let mut controller = controller();
        let frame = controller.update(1.0 / 60.0, HostSignals::default());
        assert_eq!(frame.frame, 1);
        assert_eq!(frame.nodes.len(), 6);
        assert_eq!(frame.instances.len(), frame.visible_nodes.len());
        assert_eq!(frame.animations.len(), 6);
    }

    #[test]
    fn test_progress_update_keeps_geometry() {
        let mut controller = controller();
        let before = controller.update(0.016, HostSignals::default());
        let mut list = achievements();
        list[2].current_progress = 25;
        list[2].is_unlocked = true;
        controller.apply_snapshot(list);
        let after = controller.update(0.016, HostSignals::default());

        let points = |f: &FrameState| f.layout.segments[0].points.clone();
        assert_eq!(points(&before), points(&after));
        assert!(after
            .events
            .iter()
            .any(|e| matches!(e, ProgressionEvent::Unlocked { id } if id.as_str() == "score_2")));
        assert!(before.layout.segments[0].completion_fraction < after.layout.segments[0].completion_fraction);
    }

    #[test]
    fn test_source_push_arrives_on_next_update() {
        let mut controller = controller();
        controller.update(0.016, HostSignals::default());
        let mut list = achievements();
        list[3].current_progress = 20;
        controller.source_mut().set_achievements(list);
        let frame = controller.update(0.016, HostSignals::default());
        assert!(frame
            .events
            .iter()
            .any(|e| matches!(e, ProgressionEvent::Progress { id, .. } if id.as_str() == "score_3")));
    }

    #[test]
    fn test_teardown_disposes_everything() {
        let mut controller = controller();
        controller.update(0.016, HostSignals::default());
        controller.teardown();
        assert!(controller.animations().arena().is_empty());
        let frame = controller.update(0.016, HostSignals::default());
        assert!(frame.nodes.is_empty());
    }
}
