//! Engine configuration.
//!
//! Groups the tuning of every component. Configuration can be loaded from
//! and saved to a TOML file; missing sections fall back to defaults.

use pathway_common::{ConfigError, PathResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::animation::AnimationTimings;
use crate::branch::{BranchConfigSet, DEFAULT_NODE_SPACING, DEFAULT_ROW_SPACING};
use crate::hub::HubConfig;
use crate::navigation::ScrollPhysicsConfig;
use crate::performance::{CullingConfig, QualityConfig};
use crate::reveal::RevealConfig;

/// Configuration file name.
const CONFIG_FILE: &str = "pathway.toml";

/// Path geometry settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Base spacing between nodes along a path (px)
    pub node_spacing: f32,
    /// Base vertical distance between snake rows (px)
    pub row_spacing: f32,
    /// Per-category branch settings
    pub branches: BranchConfigSet,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            node_spacing: DEFAULT_NODE_SPACING,
            row_spacing: DEFAULT_ROW_SPACING,
            branches: BranchConfigSet::default(),
        }
    }
}

/// Engine configuration parameters.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Path geometry
    pub layout: LayoutConfig,
    /// Change detection
    pub hub: HubConfig,
    /// Node animations and celebrations
    pub animation: AnimationTimings,
    /// Scroll physics and auto-scroll
    pub scroll: ScrollPhysicsConfig,
    /// Reveal scan line
    pub reveal: RevealConfig,
    /// Adaptive quality
    pub quality: QualityConfig,
    /// Viewport culling
    pub culling: CullingConfig,
}

impl EngineConfig {
    /// Load configuration from the default file location.
    /// Returns default config if file doesn't exist.
    pub fn load() -> Self {
        Self::load_from(Self::config_path())
    }

    /// Load configuration from a specific path.
    /// Returns default config if file doesn't exist or is invalid.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();

        if !path.exists() {
            info!("Config file not found, using defaults");
            return Self::default();
        }

        let mut contents = String::new();
        if let Err(e) = fs::File::open(path).and_then(|mut f| f.read_to_string(&mut contents)) {
            warn!("Failed to read config file: {e}");
            return Self::default();
        }

        match Self::from_toml(&contents) {
            Ok(mut config) => {
                config.validate();
                info!("Loaded config from {}", path.display());
                config
            },
            Err(e) => {
                warn!("{e}");
                Self::default()
            },
        }
    }

    /// Parses configuration from TOML text.
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Serializes configuration to TOML text.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))
    }

    /// Save configuration to the default file location.
    pub fn save(&self) -> PathResult<()> {
        self.save_to(Self::config_path())
    }

    /// Save configuration to a specific path.
    ///
    /// Filesystem failures surface as [`PathError::Io`], serialization
    /// failures as [`PathError::Config`].
    ///
    /// [`PathError::Io`]: pathway_common::PathError::Io
    /// [`PathError::Config`]: pathway_common::PathError::Config
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> PathResult<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = self.to_toml()?;

        let mut file = fs::File::create(path)?;
        file.write_all(contents.as_bytes())?;

        info!("Saved config to {}", path.display());
        Ok(())
    }

    /// Get the default configuration file path.
    fn config_path() -> PathBuf {
        if let Some(config_dir) = dirs_config_path() {
            config_dir.join("pathway").join(CONFIG_FILE)
        } else {
            PathBuf::from(CONFIG_FILE)
        }
    }

    /// Validate and clamp configuration values to sensible ranges.
    pub fn validate(&mut self) {
        // Layout
        self.layout.node_spacing = self.layout.node_spacing.clamp(20.0, 400.0);
        self.layout.row_spacing = self.layout.row_spacing.clamp(20.0, 600.0);
        self.layout.branches.validate();

        // Hub
        self.hub.poll_interval = self.hub.poll_interval.clamp(0.05, 60.0);
        self.hub.event_capacity = self.hub.event_capacity.clamp(16, 65_536);

        // Animation
        let a = &mut self.animation;
        a.glow_period = a.glow_period.clamp(0.1, 10.0);
        a.pulse_period = a.pulse_period.clamp(0.1, 10.0);
        a.celebration_duration = a.celebration_duration.clamp(0.1, 10.0);
        a.celebration_hold = a.celebration_hold.clamp(0.0, a.celebration_duration);
        a.stagger_delay = a.stagger_delay.clamp(0.0, 5.0);
        a.celebration_scale = a.celebration_scale.clamp(0.0, 2.0);

        // Scroll
        let s = &mut self.scroll;
        s.friction = s.friction.clamp(0.1, 50.0);
        s.min_fling_velocity = s.min_fling_velocity.max(0.0);
        s.spring_stiffness = s.spring_stiffness.clamp(1.0, 2000.0);
        s.spring_damping = s.spring_damping.clamp(0.0, 200.0);
        s.rest_velocity = s.rest_velocity.clamp(0.01, 100.0);
        s.rest_distance = s.rest_distance.clamp(0.01, 10.0);
        s.overscroll_resistance = s.overscroll_resistance.clamp(0.0, 1.0);
        s.auto_scroll_duration = s.auto_scroll_duration.clamp(0.05, 5.0);

        // Reveal
        self.reveal.duration = self.reveal.duration.clamp(0.1, 10.0);
        self.reveal.fade_band = self.reveal.fade_band.clamp(0.0, 1000.0);
        self.reveal.glow_period = self.reveal.glow_period.clamp(0.05, 5.0);

        // Quality
        let q = &mut self.quality;
        q.lower_threshold = q.lower_threshold.clamp(0.0, 1.0);
        q.upper_threshold = q.upper_threshold.clamp(q.lower_threshold, 1.0);
        q.severe_frame_ratio = q.severe_frame_ratio.clamp(1.0, 10.0);
        q.sustained_samples = q.sustained_samples.clamp(1, 600);
        q.tick_interval = q.tick_interval.clamp(0.05, 10.0);
        q.target_frame_time = q.target_frame_time.clamp(1.0 / 240.0, 1.0 / 15.0);
        q.window_size = q.window_size.clamp(1, 600);

        // Culling
        self.culling.node_buffer = self.culling.node_buffer.clamp(0.0, 500.0);
    }

    /// Rejects values no component can run with.
    pub fn check(&self) -> Result<(), ConfigError> {
        let positive = [
            ("layout.node_spacing", self.layout.node_spacing),
            ("layout.row_spacing", self.layout.row_spacing),
            ("hub.poll_interval", self.hub.poll_interval),
            ("animation.celebration_duration", self.animation.celebration_duration),
            ("scroll.auto_scroll_duration", self.scroll.auto_scroll_duration),
            ("reveal.duration", self.reveal.duration),
            ("quality.tick_interval", self.quality.tick_interval),
            ("quality.target_frame_time", self.quality.target_frame_time),
        ];
        for (field, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::OutOfRange { field, value });
            }
        }
        let q = &self.quality;
        if !(0.0..=1.0).contains(&q.lower_threshold) {
            return Err(ConfigError::OutOfRange {
                field: "quality.lower_threshold",
                value: q.lower_threshold,
            });
        }
        if !(q.lower_threshold..=1.0).contains(&q.upper_threshold) {
            return Err(ConfigError::OutOfRange {
                field: "quality.upper_threshold",
                value: q.upper_threshold,
            });
        }
        if self.animation.celebration_hold > self.animation.celebration_duration {
            return Err(ConfigError::OutOfRange {
                field: "animation.celebration_hold",
                value: self.animation.celebration_hold,
            });
        }
        Ok(())
    }
}

/// Get platform-specific config directory.
fn dirs_config_path() -> Option<PathBuf> {
    #[cfg(target_os = "macos")]
    {
        std::env::var("HOME")
            .ok()
            .map(|home| PathBuf::from(home).join("Library/Application Support"))
    }

    #[cfg(target_os = "windows")]
    {
        std::env::var("APPDATA").ok().map(PathBuf::from)
    }

    #[cfg(target_os = "linux")]
    {
        std::env::var("XDG_CONFIG_HOME")
            .ok()
            .map(PathBuf::from)
            .or_else(|| {
                std::env::var("HOME")
                    .ok()
                    .map(|h| PathBuf::from(h).join(".config"))
            })
    }

    #[cfg(not(any(target_os = "macos", target_os = "windows", target_os = "linux")))]
    {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::performance::QualityLevel;
    use pathway_common::PathError;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.hub.poll_interval, 0.5);
        assert_eq!(config.animation.stagger_delay, 0.3);
        assert_eq!(config.scroll.auto_scroll_duration, 0.8);
        assert_eq!(config.reveal.duration, 2.0);
        assert_eq!(config.quality.window_size, 60);
        assert_eq!(config.culling.node_buffer, 50.0);
        assert!(config.check().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = EngineConfig::default();
        config.layout.node_spacing = 1.0;
        config.quality.upper_threshold = 0.2;
        config.animation.celebration_hold = 99.0;

        config.validate();

        assert_eq!(config.layout.node_spacing, 20.0);
        assert_eq!(config.quality.upper_threshold, config.quality.lower_threshold);
        assert_eq!(config.animation.celebration_hold, config.animation.celebration_duration);
        assert!(config.check().is_ok());
    }

    #[test]
    fn test_check_rejects_zero_durations() {
        let mut config = EngineConfig::default();
        config.reveal.duration = 0.0;
        assert_eq!(
            config.check(),
            Err(ConfigError::OutOfRange {
                field: "reveal.duration",
                value: 0.0
            })
        );
    }

    #[test]
    fn test_config_save_load() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("nested").join("pathway.toml");

        let mut config = EngineConfig::default();
        config.hub.poll_interval = 2.0;
        config.quality.initial_quality = QualityLevel::Medium;
        config.layout.node_spacing = 110.0;

        config.save_to(&config_path).expect("Failed to save config");

        let loaded = EngineConfig::load_from(&config_path);
        assert_eq!(loaded.hub.poll_interval, 2.0);
        assert_eq!(loaded.quality.initial_quality, QualityLevel::Medium);
        assert_eq!(loaded.layout.node_spacing, 110.0);
        assert_eq!(loaded.layout.branches, config.layout.branches);
    }

    #[test]
    fn test_save_under_a_file_is_io_error() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let blocker = temp_dir.path().join("blocker");
        fs::write(&blocker, "not a directory").expect("write blocker");

        let result = EngineConfig::default().save_to(blocker.join("pathway.toml"));
        assert!(matches!(result, Err(PathError::Io(_))));
    }

    #[test]
    fn test_config_load_missing_file() {
        let config = EngineConfig::load_from("/nonexistent/path/pathway.toml");
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config = EngineConfig::from_toml("[reveal]\nduration = 3.0\n").expect("parse");
        assert_eq!(config.reveal.duration, 3.0);
        assert_eq!(config.reveal.fade_band, 80.0);
        assert_eq!(config.hub, HubConfig::default());
    }

    #[test]
    fn test_invalid_file_falls_back() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("pathway.toml");
        fs::write(&config_path, "this is = = not toml").expect("write");
        assert_eq!(EngineConfig::load_from(&config_path), EngineConfig::default());
        assert!(matches!(
            EngineConfig::from_toml("hub = 3"),
            Err(ConfigError::Parse(_))
        ));
    }
}
