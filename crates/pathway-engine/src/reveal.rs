//! One-shot scan line that reveals the screen on first display.
//!
//! The line sweeps in screen space from the top past the bottom edge. Content
//! above the line fades in across a band trailing behind it. The renderer
//! masks per row using [`RevealController::reveal_opacity`].

use serde::{Deserialize, Serialize};
use std::f32::consts::TAU;
use tracing::debug;

/// Reveal timing and shape.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RevealConfig {
    /// Sweep duration, seconds.
    pub duration: f32,
    /// Height of the fade band behind the line (px).
    pub fade_band: f32,
    /// Period of the scan line glow pulse, seconds.
    pub glow_period: f32,
}

impl Default for RevealConfig {
    fn default() -> Self {
        Self {
            duration: 2.0,
            fade_band: 80.0,
            glow_period: 0.5,
        }
    }
}

/// Lifecycle of the reveal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RevealState {
    /// Not started; nothing is visible.
    #[default]
    Pending,
    /// Sweeping.
    Running,
    /// Swept to the end.
    Finished,
    /// Stopped early; everything is visible.
    Stopped,
}

/// Reveal values for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RevealSnapshot {
    /// Lifecycle state.
    pub state: RevealState,
    /// Screen y of the scan line.
    pub line_y: f32,
    /// Normalized sweep progress.
    pub progress: f32,
    /// Scan line glow, 0.0-1.0.
    pub glow: f32,
}

/// Scan line reveal state.
#[derive(Debug, Clone, Default)]
pub struct RevealController {
    config: RevealConfig,
    state: RevealState,
    elapsed: f32,
    height: f32,
}

impl RevealController {
    /// Creates a pending reveal.
    #[must_use]
    pub fn new(config: RevealConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Sets the swept height (the viewport height).
    pub fn set_height(&mut self, height: f32) {
        self.height = height.max(0.0);
    }

    /// Lifecycle state.
    #[must_use]
    pub fn state(&self) -> RevealState {
        self.state
    }

    /// Whether the sweep is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state == RevealState::Running
    }

    /// Whether everything is visible.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        matches!(self.state, RevealState::Finished | RevealState::Stopped)
    }

    /// Starts the sweep. Only a pending reveal can start; returns whether it did.
    pub fn start(&mut self) -> bool {
        if self.state != RevealState::Pending {
            debug!("Reveal already {:?}, reset() required to restart", self.state);
            return false;
        }
        self.elapsed = 0.0;
        self.state = RevealState::Running;
        true
    }

    /// Ends the sweep early and shows everything.
    pub fn stop(&mut self) {
        if matches!(self.state, RevealState::Pending | RevealState::Running) {
            self.state = RevealState::Stopped;
        }
    }

    /// Returns to pending so the reveal can play again.
    pub fn reset(&mut self) {
        self.state = RevealState::Pending;
        self.elapsed = 0.0;
    }

    /// Advances the sweep. Returns `true` on the tick it finishes.
    pub fn tick(&mut self, dt: f32) -> bool {
        if self.state != RevealState::Running {
            return false;
        }
        self.elapsed += dt.max(0.0);
        if self.elapsed >= self.config.duration {
            self.elapsed = self.config.duration;
            self.state = RevealState::Finished;
            return true;
        }
        false
    }

    /// Normalized sweep progress.
    #[must_use]
    pub fn progress(&self) -> f32 {
        match self.state {
            RevealState::Pending => 0.0,
            RevealState::Running => (self.elapsed / self.config.duration.max(f32::EPSILON)).min(1.0),
            RevealState::Finished | RevealState::Stopped => 1.0,
        }
    }

    /// Screen y of the scan line. It overshoots the bottom by the fade band
    /// so the last rows reach full opacity.
    #[must_use]
    pub fn line_y(&self) -> f32 {
        self.progress() * (self.height + self.config.fade_band)
    }

    /// Whether screen row `y` is revealed.
    #[must_use]
    pub fn should_reveal_point(&self, y: f32) -> bool {
        match self.state {
            RevealState::Pending => false,
            RevealState::Running => y <= self.line_y(),
            RevealState::Finished | RevealState::Stopped => true,
        }
    }

    /// Opacity of screen row `y`, ramping from 0 at the line to 1 a fade
    /// band behind it.
    #[must_use]
    pub fn reveal_opacity(&self, y: f32) -> f32 {
        match self.state {
            RevealState::Pending => 0.0,
            RevealState::Finished | RevealState::Stopped => 1.0,
            RevealState::Running => {
                let behind = self.line_y() - y;
                if behind < 0.0 {
                    0.0
                } else if self.config.fade_band <= 0.0 {
                    1.0
                } else {
                    (behind / self.config.fade_band).min(1.0)
                }
            }
        }
    }

    /// Pulsing glow of the scan line; zero unless running.
    #[must_use]
    pub fn scan_line_glow(&self) -> f32 {
        if self.state != RevealState::Running {
            return 0.0;
        }
        let phase = self.elapsed / self.config.glow_period.max(f32::EPSILON);
        0.5 + 0.5 * (phase * TAU).sin()
    }

    /// Frame snapshot.
    #[must_use]
    pub fn snapshot(&self) -> RevealSnapshot {
        RevealSnapshot {
            state: self.state,
            line_y: self.line_y(),
            progress: self.progress(),
            glow: self.scan_line_glow(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn running() -> RevealController {
        let mut reveal = RevealController::new(RevealConfig::default());
        reveal.set_height(920.0);
        assert!(reveal.start());
        reveal
    }

    #[test]
    fn test_pending_hides_everything() {
        let reveal = RevealController::new(RevealConfig::default());
        assert!(!reveal.should_reveal_point(0.0));
        assert_eq!(reveal.reveal_opacity(0.0), 0.0);
        assert_eq!(reveal.scan_line_glow(), 0.0);
    }

    #[test]
    fn test_sweep_halfway() {
        let mut reveal = running();
        reveal.tick(1.0);
        assert!((reveal.line_y() - 500.0).abs() < 1e-3);
        assert!(reveal.should_reveal_point(100.0));
        assert!(!reveal.should_reveal_point(600.0));
        assert_eq!(reveal.reveal_opacity(100.0), 1.0);
        assert!((reveal.reveal_opacity(460.0) - 0.5).abs() < 1e-3);
        assert_eq!(reveal.reveal_opacity(700.0), 0.0);
        let glow = reveal.scan_line_glow();
        assert!((0.0..=1.0).contains(&glow));
    }

    #[test]
    fn test_finishes_once() {
        let mut reveal = running();
        let finished: Vec<bool> = (0..30).map(|_| reveal.tick(0.1)).collect();
        assert_eq!(finished.iter().filter(|f| **f).count(), 1);
        assert_eq!(reveal.state(), RevealState::Finished);
        assert_eq!(reveal.reveal_opacity(10_000.0), 1.0);
    }

    #[test]
    fn test_restart_requires_reset() {
        let mut reveal = running();
        reveal.tick(0.5);
        assert!(!reveal.start());
        reveal.stop();
        assert_eq!(reveal.state(), RevealState::Stopped);
        assert!(reveal.should_reveal_point(10_000.0));
        assert!(!reveal.start());
        reveal.reset();
        assert!(reveal.start());
        assert_eq!(reveal.progress(), 0.0);
    }
}
