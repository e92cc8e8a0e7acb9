//! Vertical scrolling with fling physics and animated auto-scroll.
//!
//! The offset is the content-space y coordinate at the top of the viewport.
//! User input always wins: any drag cancels a running auto-scroll.

use pathway_common::{AchievementId, PathError, PathResult};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::easing::Easing;
use crate::nodes::{self, NodePosition};

/// Largest physics step; longer frames are split.
const MAX_PHYSICS_STEP: f32 = 1.0 / 120.0;

/// Scroll physics tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrollPhysicsConfig {
    /// Exponential velocity decay rate per second.
    pub friction: f32,
    /// Release velocity below which no momentum runs (px/s).
    pub min_fling_velocity: f32,
    /// Spring stiffness pulling overscroll back to the edge.
    pub spring_stiffness: f32,
    /// Spring damping.
    pub spring_damping: f32,
    /// Speed at which motion is considered settled (px/s).
    pub rest_velocity: f32,
    /// Distance from the edge at which the spring snaps (px).
    pub rest_distance: f32,
    /// Fraction of drag applied while overscrolled.
    pub overscroll_resistance: f32,
    /// Auto-scroll animation length, seconds.
    pub auto_scroll_duration: f32,
}

impl Default for ScrollPhysicsConfig {
    fn default() -> Self {
        Self {
            friction: 4.0,
            min_fling_velocity: 50.0,
            spring_stiffness: 180.0,
            spring_damping: 24.0,
            rest_velocity: 5.0,
            rest_distance: 0.5,
            overscroll_resistance: 0.5,
            auto_scroll_duration: 0.8,
        }
    }
}

/// What is currently moving the scroll offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ScrollActivity {
    /// At rest.
    #[default]
    Idle,
    /// Finger down.
    Dragging,
    /// Fling or spring-back after release.
    Momentum,
    /// Programmatic animation; cancelled by user input.
    Auto,
}

#[derive(Debug, Clone, Copy)]
struct AutoScroll {
    from: f32,
    to: f32,
    elapsed: f32,
}

/// Scroll state handed to the renderer each frame.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ScrollSnapshot {
    /// Current offset.
    pub offset: f32,
    /// Current velocity (px/s).
    pub velocity: f32,
    /// Largest in-bounds offset.
    pub max_extent: f32,
    /// `offset / max_extent`, clamped to 0.0-1.0.
    pub progress_position: f32,
    /// What is driving the offset.
    pub activity: ScrollActivity,
}

/// Scroll offset, velocity and auto-scroll state.
#[derive(Debug, Clone, Default)]
pub struct ScrollController {
    config: ScrollPhysicsConfig,
    offset: f32,
    velocity: f32,
    max_extent: f32,
    viewport_height: f32,
    activity: ScrollActivity,
    auto: Option<AutoScroll>,
    spring_edge: Option<f32>,
}

impl ScrollController {
    /// Creates a controller at offset 0.
    #[must_use]
    pub fn new(config: ScrollPhysicsConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Updates the scrollable range from viewport and content heights.
    pub fn set_extents(&mut self, viewport_height: f32, content_height: f32) {
        self.viewport_height = viewport_height.max(0.0);
        self.max_extent = (content_height - self.viewport_height).max(0.0);
        if let Some(auto) = &mut self.auto {
            auto.to = auto.to.clamp(0.0, self.max_extent);
        }
        if self.activity == ScrollActivity::Idle {
            self.offset = self.offset.clamp(0.0, self.max_extent);
        }
    }

    /// Current offset.
    #[must_use]
    pub fn offset(&self) -> f32 {
        self.offset
    }

    /// Current velocity.
    #[must_use]
    pub fn velocity(&self) -> f32 {
        self.velocity
    }

    /// Largest in-bounds offset.
    #[must_use]
    pub fn max_extent(&self) -> f32 {
        self.max_extent
    }

    /// Viewport height used for centering.
    #[must_use]
    pub fn viewport_height(&self) -> f32 {
        self.viewport_height
    }

    /// What is driving the offset.
    #[must_use]
    pub fn activity(&self) -> ScrollActivity {
        self.activity
    }

    /// Whether an auto-scroll animation is running.
    #[must_use]
    pub fn is_auto_scrolling(&self) -> bool {
        self.activity == ScrollActivity::Auto
    }

    /// Normalized scroll position, 0.0 when nothing can scroll.
    #[must_use]
    pub fn progress_position(&self) -> f32 {
        if self.max_extent <= 0.0 {
            0.0
        } else {
            (self.offset / self.max_extent).clamp(0.0, 1.0)
        }
    }

    /// Frame snapshot.
    #[must_use]
    pub fn snapshot(&self) -> ScrollSnapshot {
        ScrollSnapshot {
            offset: self.offset,
            velocity: self.velocity,
            max_extent: self.max_extent,
            progress_position: self.progress_position(),
            activity: self.activity,
        }
    }

    fn overscroll(&self) -> f32 {
        self.offset - self.offset.clamp(0.0, self.max_extent)
    }

    fn cancel_auto(&mut self) {
        if self.auto.take().is_some() {
            debug!("Auto-scroll cancelled by user input at {:.1}", self.offset);
        }
    }

    /// Finger down. Cancels auto-scroll and any momentum.
    pub fn begin_drag(&mut self) {
        self.cancel_auto();
        self.spring_edge = None;
        self.velocity = 0.0;
        self.activity = ScrollActivity::Dragging;
    }

    /// Moves the offset by `delta`, with resistance past either edge.
    pub fn drag_by(&mut self, delta: f32) {
        if self.activity != ScrollActivity::Dragging {
            self.begin_drag();
        }
        let next = self.offset + delta;
        let outside = next < 0.0 || next > self.max_extent;
        self.offset += if outside {
            delta * self.config.overscroll_resistance
        } else {
            delta
        };
    }

    /// Finger up with a release velocity (px/s, positive scrolls down).
    pub fn end_drag(&mut self, velocity: f32) {
        self.cancel_auto();
        if velocity.abs() >= self.config.min_fling_velocity {
            self.velocity = velocity;
            self.activity = ScrollActivity::Momentum;
        } else if self.overscroll() != 0.0 {
            self.velocity = 0.0;
            self.activity = ScrollActivity::Momentum;
        } else {
            self.velocity = 0.0;
            self.activity = ScrollActivity::Idle;
        }
    }

    /// Offset that centers content-space `y` in the viewport, clamped.
    #[must_use]
    pub fn center_target(&self, y: f32) -> f32 {
        (y - self.viewport_height / 2.0).clamp(0.0, self.max_extent)
    }

    /// Animates to `target` with the cubic auto-scroll curve.
    pub fn animate_to(&mut self, target: f32) {
        let to = target.clamp(0.0, self.max_extent);
        self.spring_edge = None;
        self.velocity = 0.0;
        if (to - self.offset).abs() < self.config.rest_distance {
            self.offset = to;
            self.auto = None;
            self.activity = ScrollActivity::Idle;
            return;
        }
        self.auto = Some(AutoScroll {
            from: self.offset,
            to,
            elapsed: 0.0,
        });
        self.activity = ScrollActivity::Auto;
    }

    /// Auto-scrolls so the achievement's node is centered.
    ///
    /// Returns the target offset.
    pub fn scroll_to_achievement(
        &mut self,
        nodes: &[NodePosition],
        id: &AchievementId,
    ) -> PathResult<f32> {
        let node =
            nodes::find(nodes, id).ok_or_else(|| PathError::UnknownAchievement(id.clone()))?;
        let target = self.center_target(node.position.y);
        self.animate_to(target);
        Ok(target)
    }

    /// Auto-scrolls to the player's current progress node.
    ///
    /// Returns the target offset, or `None` when there are no nodes.
    pub fn scroll_to_current_progress(&mut self, nodes: &[NodePosition]) -> Option<f32> {
        let node = nodes::current_progress_node(nodes)?;
        let target = self.center_target(node.position.y);
        debug!("Scrolling to current progress {} at {target:.1}", node.achievement_id);
        self.animate_to(target);
        Some(target)
    }

    /// Advances momentum, spring-back or auto-scroll.
    ///
    /// Non-positive and non-finite `dt` are ignored.
    pub fn tick(&mut self, dt: f32) {
        if !(dt > 0.0 && dt.is_finite()) {
            return;
        }
        match self.activity {
            ScrollActivity::Idle | ScrollActivity::Dragging => {}
            ScrollActivity::Auto => self.tick_auto(dt),
            ScrollActivity::Momentum => {
                let mut remaining = dt;
                while remaining > 0.0 && self.activity == ScrollActivity::Momentum {
                    let step = remaining.min(MAX_PHYSICS_STEP);
                    self.step_momentum(step);
                    remaining -= step;
                }
            }
        }
    }

    fn tick_auto(&mut self, dt: f32) {
        let Some(auto) = &mut self.auto else {
            self.activity = ScrollActivity::Idle;
            return;
        };
        auto.elapsed += dt;
        let duration = self.config.auto_scroll_duration.max(f32::EPSILON);
        let t = (auto.elapsed / duration).min(1.0);
        self.offset = auto.from + (auto.to - auto.from) * Easing::EaseInOutCubic.apply(t);
        if t >= 1.0 {
            self.offset = auto.to;
            self.auto = None;
            self.activity = ScrollActivity::Idle;
        }
    }

    /// Once past an edge, the spring owns the motion until it settles there.
    fn step_momentum(&mut self, dt: f32) {
        let c = self.config;
        if self.spring_edge.is_none() && self.overscroll() != 0.0 {
            self.spring_edge = Some(self.offset.clamp(0.0, self.max_extent));
        }
        if let Some(edge) = self.spring_edge {
            let displacement = self.offset - edge;
            let accel = -c.spring_stiffness * displacement - c.spring_damping * self.velocity;
            self.velocity += accel * dt;
            self.offset += self.velocity * dt;
            if (self.offset - edge).abs() < c.rest_distance && self.velocity.abs() < c.rest_velocity {
                self.settle(edge);
            }
        } else {
            self.offset += self.velocity * dt;
            self.velocity *= (-c.friction * dt).exp();
            if self.velocity.abs() < c.rest_velocity && self.overscroll() == 0.0 {
                self.settle(self.offset);
            }
        }
    }

    fn settle(&mut self, offset: f32) {
        self.spring_edge = None;
        self.offset = offset;
        self.velocity = 0.0;
        self.activity = ScrollActivity::Idle;
    }
}
