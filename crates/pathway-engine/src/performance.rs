//! Frame sampling, adaptive quality and viewport culling.
//!
//! The quality loop samples every frame but only adjusts on a fixed tick.
//! Each adjustment moves at most one level, and a change in the opposite
//! direction of the previous one is refused until the hysteresis window has
//! passed.

use pathway_common::{Point, Rect, Size};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::{debug, info};

use crate::layout::PathSegment;

/// Graphics or particle quality preset.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub enum QualityLevel {
    /// Low quality for performance.
    Low,
    /// Medium quality.
    Medium,
    /// High quality.
    #[default]
    High,
    /// Ultra quality.
    Ultra,
}

impl QualityLevel {
    /// One level lower, saturating at `Low`.
    #[must_use]
    pub const fn lower(self) -> Self {
        match self {
            Self::Low | Self::Medium => Self::Low,
            Self::High => Self::Medium,
            Self::Ultra => Self::High,
        }
    }

    /// One level higher, saturating at `Ultra`.
    #[must_use]
    pub const fn higher(self) -> Self {
        match self {
            Self::Low => Self::Medium,
            Self::Medium => Self::High,
            Self::High | Self::Ultra => Self::Ultra,
        }
    }

    /// Render resolution multiplier.
    #[must_use]
    pub const fn scale_factor(self) -> f32 {
        match self {
            Self::Low => 0.6,
            Self::Medium => 0.8,
            Self::High | Self::Ultra => 1.0,
        }
    }

    /// Particles per celebration burst.
    #[must_use]
    pub const fn particle_count(self) -> u32 {
        match self {
            Self::Low => 10,
            Self::Medium => 25,
            Self::High => 50,
            Self::Ultra => 100,
        }
    }
}

/// Thresholds and timing of the adaptive quality loop.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityConfig {
    /// Score below which quality steps down.
    pub lower_threshold: f32,
    /// Score that must be sustained before quality steps up.
    pub upper_threshold: f32,
    /// Average frame time over target that also drops graphics quality.
    pub severe_frame_ratio: f32,
    /// Consecutive healthy frames required to step up.
    pub sustained_samples: usize,
    /// Adjustment ticks before a reversal is allowed.
    pub hysteresis_ticks: u32,
    /// Seconds between adjustments.
    pub tick_interval: f32,
    /// Target frame time, seconds.
    pub target_frame_time: f32,
    /// Frame time window size.
    pub window_size: usize,
    /// Quality at startup.
    pub initial_quality: QualityLevel,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            lower_threshold: 0.7,
            upper_threshold: 0.9,
            severe_frame_ratio: 1.5,
            sustained_samples: 30,
            hysteresis_ticks: 4,
            tick_interval: 0.5,
            target_frame_time: 1.0 / 60.0,
            window_size: 60,
            initial_quality: QualityLevel::High,
        }
    }
}

/// Per-frame signals from the host.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HostSignals {
    /// Device reports memory pressure.
    pub memory_pressure: bool,
    /// External performance monitor score, 0.0-1.0.
    pub monitor_score: f32,
}

impl Default for HostSignals {
    fn default() -> Self {
        Self {
            memory_pressure: false,
            monitor_score: 1.0,
        }
    }
}

/// Composite score: unweighted mean of frame ratio, memory and monitor
/// score, clamped to 0.0-1.0.
#[must_use]
pub fn performance_score(frame_ratio: f32, signals: HostSignals) -> f32 {
    let memory = if signals.memory_pressure { 0.0 } else { 1.0 };
    let monitor = signals.monitor_score.clamp(0.0, 1.0);
    ((frame_ratio.clamp(0.0, 1.0) + memory + monitor) / 3.0).clamp(0.0, 1.0)
}

/// Rolling window of frame times.
#[derive(Debug, Clone)]
pub struct FrameSampler {
    samples: VecDeque<f32>,
    capacity: usize,
}

impl Default for FrameSampler {
    fn default() -> Self {
        Self::new(60)
    }
}

impl FrameSampler {
    /// Creates an empty window.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Records a frame time. Non-positive and non-finite values are ignored.
    pub fn record(&mut self, frame_time: f32) {
        if !frame_time.is_finite() || frame_time <= 0.0 {
            return;
        }
        self.samples.push_back(frame_time);
        if self.samples.len() > self.capacity {
            self.samples.pop_front();
        }
    }

    /// Average frame time, 0.0 when empty.
    #[must_use]
    pub fn average(&self) -> f32 {
        if self.samples.is_empty() {
            return 0.0;
        }
        self.samples.iter().sum::<f32>() / self.samples.len() as f32
    }

    /// Average frames per second.
    #[must_use]
    pub fn average_fps(&self) -> f32 {
        let avg = self.average();
        if avg > 0.0 {
            1.0 / avg
        } else {
            0.0
        }
    }

    /// `target / average`, clamped; 1.0 when empty.
    #[must_use]
    pub fn frame_ratio(&self, target: f32) -> f32 {
        let avg = self.average();
        if avg <= 0.0 {
            1.0
        } else {
            (target / avg).clamp(0.0, 1.0)
        }
    }

    /// Number of samples held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether no samples are held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Clears the window.
    pub fn clear(&mut self) {
        self.samples.clear();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Down,
    Up,
}

/// Result of an adjustment that changed something.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityChange {
    /// Particle quality after the change.
    pub particle: QualityLevel,
    /// Graphics quality after the change.
    pub graphics: QualityLevel,
    /// Whether expensive effects are suppressed.
    pub reduce_effects: bool,
    /// Score that triggered the change.
    pub score: f32,
}

/// Closed-loop particle and graphics quality.
#[derive(Debug, Clone)]
pub struct QualityController {
    config: QualityConfig,
    sampler: FrameSampler,
    recent_scores: VecDeque<f32>,
    signals: HostSignals,
    particle: QualityLevel,
    graphics: QualityLevel,
    reduce_effects: bool,
    since_tick: f32,
    ticks: u64,
    last_change: Option<(u64, Direction)>,
}

impl Default for QualityController {
    fn default() -> Self {
        Self::new(QualityConfig::default())
    }
}

impl QualityController {
    /// Creates a controller at the configured initial quality.
    #[must_use]
    pub fn new(config: QualityConfig) -> Self {
        Self {
            sampler: FrameSampler::new(config.window_size),
            recent_scores: VecDeque::with_capacity(config.sustained_samples),
            signals: HostSignals::default(),
            particle: config.initial_quality,
            graphics: config.initial_quality,
            reduce_effects: false,
            since_tick: 0.0,
            ticks: 0,
            last_change: None,
            config,
        }
    }

    /// Particle quality.
    #[must_use]
    pub fn particle_quality(&self) -> QualityLevel {
        self.particle
    }

    /// Graphics quality.
    #[must_use]
    pub fn graphics_quality(&self) -> QualityLevel {
        self.graphics
    }

    /// Whether expensive effects are suppressed.
    #[must_use]
    pub fn reduce_effects(&self) -> bool {
        self.reduce_effects
    }

    /// Frame time window.
    #[must_use]
    pub fn sampler(&self) -> &FrameSampler {
        &self.sampler
    }

    /// Score over the current window with the latest host signals.
    #[must_use]
    pub fn score(&self) -> f32 {
        performance_score(
            self.sampler.frame_ratio(self.config.target_frame_time),
            self.signals,
        )
    }

    /// Records one frame and its host signals.
    pub fn record_frame(&mut self, frame_time: f32, signals: HostSignals) {
        self.signals = signals;
        self.sampler.record(frame_time);
        if frame_time > 0.0 && frame_time.is_finite() {
            let ratio = (self.config.target_frame_time / frame_time).clamp(0.0, 1.0);
            self.recent_scores.push_back(performance_score(ratio, signals));
            if self.recent_scores.len() > self.config.sustained_samples.max(1) {
                self.recent_scores.pop_front();
            }
        }
    }

    /// Records a frame and adjusts when the tick interval has elapsed.
    pub fn update(&mut self, frame_time: f32, signals: HostSignals) -> Option<QualityChange> {
        self.record_frame(frame_time, signals);
        self.since_tick += frame_time.max(0.0);
        if self.since_tick < self.config.tick_interval {
            return None;
        }
        self.since_tick = 0.0;
        self.adjust()
    }

    fn sustained_high(&self) -> bool {
        self.recent_scores.len() >= self.config.sustained_samples.max(1)
            && self
                .recent_scores
                .iter()
                .all(|s| *s > self.config.upper_threshold)
    }

    fn reversal_blocked(&self, direction: Direction) -> bool {
        match self.last_change {
            Some((tick, last)) if last != direction => {
                self.ticks - tick < u64::from(self.config.hysteresis_ticks)
            }
            _ => false,
        }
    }

    /// Runs one adjustment tick. Returns the change, if any level moved.
    pub fn adjust(&mut self) -> Option<QualityChange> {
        self.ticks += 1;
        let score = self.score();
        let pressure = self.signals.memory_pressure;

        let direction = if score < self.config.lower_threshold || pressure {
            Direction::Down
        } else if !pressure && self.sustained_high() {
            Direction::Up
        } else {
            return None;
        };
        if self.reversal_blocked(direction) {
            debug!("Quality {direction:?} refused within hysteresis window (score {score:.2})");
            return None;
        }

        let (particle, graphics, reduce_effects) = match direction {
            Direction::Down => {
                let severe = self.sampler.average()
                    > self.config.target_frame_time * self.config.severe_frame_ratio;
                if severe {
                    (self.particle.lower(), self.graphics.lower(), true)
                } else {
                    (self.particle.lower(), self.graphics, self.reduce_effects)
                }
            }
            Direction::Up => (self.particle.higher(), self.graphics.higher(), false),
        };
        if (particle, graphics, reduce_effects) == (self.particle, self.graphics, self.reduce_effects) {
            return None;
        }

        info!(
            "Quality {direction:?}: particles {:?} -> {particle:?}, graphics {:?} -> {graphics:?} (score {score:.2})",
            self.particle, self.graphics
        );
        self.particle = particle;
        self.graphics = graphics;
        self.reduce_effects = reduce_effects;
        self.last_change = Some((self.ticks, direction));
        Some(QualityChange {
            particle,
            graphics,
            reduce_effects,
            score,
        })
    }

    /// Render settings for the current levels.
    #[must_use]
    pub fn render_settings(&self) -> RenderSettings {
        RenderSettings::for_levels(self.particle, self.graphics, self.reduce_effects)
    }
}

/// Settings the renderer applies, derived only from quality.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RenderSettings {
    /// Draw glow effects.
    pub glow_enabled: bool,
    /// Antialias strokes.
    pub antialiasing: bool,
    /// Render resolution multiplier.
    pub quality_scale: f32,
    /// Particles per celebration burst.
    pub particle_count: u32,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self::for_levels(QualityLevel::default(), QualityLevel::default(), false)
    }
}

impl RenderSettings {
    /// Derives settings from quality levels.
    #[must_use]
    pub const fn for_levels(
        particle: QualityLevel,
        graphics: QualityLevel,
        reduce_effects: bool,
    ) -> Self {
        let particles = particle.particle_count();
        Self {
            glow_enabled: !reduce_effects && !matches!(graphics, QualityLevel::Low),
            antialiasing: matches!(graphics, QualityLevel::High | QualityLevel::Ultra),
            quality_scale: graphics.scale_factor(),
            particle_count: if reduce_effects { particles / 2 } else { particles },
        }
    }
}

/// Culling tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CullingConfig {
    /// Margin around the viewport within which nodes stay visible (px).
    pub node_buffer: f32,
}

impl Default for CullingConfig {
    fn default() -> Self {
        Self { node_buffer: 50.0 }
    }
}

/// Content-space rectangle shown at a scroll offset.
#[must_use]
pub fn viewport_rect(scroll_offset: f32, viewport: Size) -> Rect {
    Rect::from_origin_size(Point::new(0.0, scroll_offset), viewport)
}

/// Viewport culling predicates.
#[derive(Debug, Clone, Copy, Default)]
pub struct Culler {
    config: CullingConfig,
}

impl Culler {
    /// Creates a culler.
    #[must_use]
    pub const fn new(config: CullingConfig) -> Self {
        Self { config }
    }

    /// Whether a segment's stroke-inflated bounds touch the viewport.
    #[must_use]
    pub fn is_segment_visible(&self, segment: &PathSegment, viewport: &Rect) -> bool {
        segment
            .bounds()
            .is_some_and(|bounds| bounds.expanded(segment.width).intersects(viewport))
    }

    /// Whether a node lies within the buffered viewport.
    #[must_use]
    pub fn is_node_visible(&self, position: Point, viewport: &Rect) -> bool {
        viewport.expanded(self.config.node_buffer).contains(position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::achievement::AchievementCategory;
    use pathway_common::SegmentId;

    const GOOD_FRAME: f32 = 1.0 / 60.0;
    const SLOW_FRAME: f32 = 1.0 / 20.0;

    fn bad_signals() -> HostSignals {
        HostSignals {
            memory_pressure: false,
            monitor_score: 0.0,
        }
    }

    fn feed(controller: &mut QualityController, frames: usize, frame_time: f32, signals: HostSignals) {
        for _ in 0..frames {
            controller.record_frame(frame_time, signals);
        }
    }

    #[test]
    fn test_level_ordering_and_steps() {
        assert!(QualityLevel::Low < QualityLevel::Medium);
        assert!(QualityLevel::High < QualityLevel::Ultra);
        assert_eq!(QualityLevel::Low.lower(), QualityLevel::Low);
        assert_eq!(QualityLevel::Ultra.higher(), QualityLevel::Ultra);
        assert_eq!(QualityLevel::Medium.higher(), QualityLevel::High);
    }

    #[test]
    fn test_sampler_window() {
        let mut sampler = FrameSampler::new(60);
        for _ in 0..100 {
            sampler.record(0.02);
        }
        sampler.record(-1.0);
        sampler.record(f32::NAN);
        assert_eq!(sampler.len(), 60);
        assert!((sampler.average() - 0.02).abs() < 1e-6);
        assert!((sampler.average_fps() - 50.0).abs() < 1e-2);
    }

    #[test]
    fn test_score() {
        assert_eq!(performance_score(1.0, HostSignals::default()), 1.0);
        let pressured = HostSignals {
            memory_pressure: true,
            monitor_score: 1.0,
        };
        assert!((performance_score(1.0, pressured) - 2.0 / 3.0).abs() < 1e-6);
        let weird = HostSignals {
            memory_pressure: false,
            monitor_score: 7.0,
        };
        assert_eq!(performance_score(3.0, weird), 1.0);
    }

    #[test]
    fn test_low_score_steps_particles_only() {
        let mut controller = QualityController::default();
        feed(&mut controller, 60, GOOD_FRAME, bad_signals());
        let change = controller.adjust().expect("step down");
        assert_eq!(change.particle, QualityLevel::Medium);
        assert_eq!(change.graphics, QualityLevel::High);
        assert!(!change.reduce_effects);
    }

    #[test]
    fn test_severe_frame_time_drops_graphics_and_effects() {
        let mut controller = QualityController::default();
        feed(&mut controller, 60, SLOW_FRAME, bad_signals());
        let change = controller.adjust().expect("step down");
        assert_eq!(change.particle, QualityLevel::Medium);
        assert_eq!(change.graphics, QualityLevel::Medium);
        assert!(change.reduce_effects);
        assert!(!controller.render_settings().glow_enabled);
    }

    #[test]
    fn test_memory_pressure_steps_down_even_with_good_frames() {
        let mut controller = QualityController::default();
        let signals = HostSignals {
            memory_pressure: true,
            monitor_score: 1.0,
        };
        feed(&mut controller, 60, GOOD_FRAME, signals);
        assert!(controller.adjust().is_some());
        assert_eq!(controller.particle_quality(), QualityLevel::Medium);
    }

    #[test]
    fn test_one_step_per_tick() {
        let mut controller = QualityController::new(QualityConfig {
            initial_quality: QualityLevel::Ultra,
            ..QualityConfig::default()
        });
        let mut previous = controller.particle_quality();
        for _ in 0..6 {
            feed(&mut controller, 30, SLOW_FRAME, bad_signals());
            controller.adjust();
            let current = controller.particle_quality();
            assert!(current == previous || current == previous.lower());
            previous = current;
        }
        assert_eq!(controller.particle_quality(), QualityLevel::Low);
        assert!(controller.adjust().is_none());
    }

    #[test]
    fn test_step_up_needs_sustained_healthy_frames() {
        let mut controller = QualityController::default();
        feed(&mut controller, 29, GOOD_FRAME, HostSignals::default());
        assert!(controller.adjust().is_none());
        feed(&mut controller, 1, GOOD_FRAME, HostSignals::default());
        let change = controller.adjust().expect("step up");
        assert_eq!(change.particle, QualityLevel::Ultra);
        assert_eq!(change.graphics, QualityLevel::Ultra);
    }

    #[test]
    fn test_reversal_waits_for_hysteresis_window() {
        let mut controller = QualityController::default();
        feed(&mut controller, 60, GOOD_FRAME, bad_signals());
        assert!(controller.adjust().is_some());

        feed(&mut controller, 60, GOOD_FRAME, HostSignals::default());
        for _ in 0..3 {
            assert!(controller.adjust().is_none());
        }
        let change = controller.adjust().expect("step up after window");
        assert_eq!(change.particle, QualityLevel::High);
    }

    #[test]
    fn test_alternating_input_never_flips_twice_in_window() {
        let config = QualityConfig::default();
        let mut controller = QualityController::new(config);
        let mut changes: Vec<(usize, QualityLevel)> = Vec::new();
        for tick in 0..40 {
            let signals = if (tick / 2) % 2 == 0 {
                bad_signals()
            } else {
                HostSignals::default()
            };
            feed(&mut controller, 30, GOOD_FRAME, signals);
            if let Some(change) = controller.adjust() {
                changes.push((tick, change.particle));
            }
        }
        for pair in changes.windows(3) {
            let first_dir = pair[1].1.cmp(&pair[0].1);
            let second_dir = pair[2].1.cmp(&pair[1].1);
            if first_dir != second_dir {
                assert!(pair[2].0 - pair[1].0 >= config.hysteresis_ticks as usize);
            }
        }
    }

    #[test]
    fn test_render_settings_are_pure() {
        let a = RenderSettings::for_levels(QualityLevel::Low, QualityLevel::Low, false);
        let b = RenderSettings::for_levels(QualityLevel::Low, QualityLevel::Low, false);
        assert_eq!(a, b);
        assert!(!a.glow_enabled);
        assert!(!a.antialiasing);
        let ultra = RenderSettings::for_levels(QualityLevel::Ultra, QualityLevel::Ultra, false);
        assert!(ultra.glow_enabled && ultra.antialiasing);
        assert_eq!(ultra.particle_count, 100);
        assert_eq!(
            RenderSettings::for_levels(QualityLevel::Ultra, QualityLevel::Ultra, true).particle_count,
            50
        );
    }

    #[test]
    fn test_node_culling_buffer() {
        let culler = Culler::default();
        let viewport = viewport_rect(1000.0, Size::new(400.0, 800.0));
        assert!(culler.is_node_visible(Point::new(200.0, 1400.0), &viewport));
        assert!(culler.is_node_visible(Point::new(200.0, 1840.0), &viewport));
        assert!(!culler.is_node_visible(Point::new(200.0, 1860.0), &viewport));
        assert!(culler.is_node_visible(Point::new(-40.0, 1200.0), &viewport));
        assert!(!culler.is_node_visible(Point::new(200.0, 940.0), &viewport));
    }

    #[test]
    fn test_segment_culling_uses_stroke_width() {
        let culler = Culler::default();
        let segment = PathSegment {
            id: SegmentId::new("main"),
            category: AchievementCategory::Score,
            points: vec![Point::new(0.0, 0.0), Point::new(100.0, 100.0)],
            color: 0,
            width: 10.0,
            is_main_path: true,
            completion_fraction: 0.0,
            achievement_ids: Vec::new(),
        };
        let touching = Rect::new(0.0, 105.0, 400.0, 900.0);
        let far = Rect::new(0.0, 200.0, 400.0, 900.0);
        assert!(culler.is_segment_visible(&segment, &touching));
        assert!(!culler.is_segment_visible(&segment, &far));
    }
}
