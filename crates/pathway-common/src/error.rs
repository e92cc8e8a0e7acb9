//! Error types for the progression path engine.

use thiserror::Error;

use crate::ids::AchievementId;

/// Top-level error type for pathway operations.
#[derive(Debug, Error)]
pub enum PathError {
    /// Animation lifecycle errors
    #[error("Animation error: {0}")]
    Animation(#[from] AnimationError),

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// An operation referenced an achievement the engine does not know about
    #[error("Unknown achievement: {0}")]
    UnknownAchievement(AchievementId),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Animation lifecycle errors.
///
/// These are always recovered at the point of use; they never escape the
/// animation orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnimationError {
    /// The controller was disposed before the call
    #[error("animation controller for {id} has been disposed")]
    ControllerDisposed {
        /// Achievement owning the controller
        id: AchievementId,
    },

    /// A one-shot animation was asked to restart without a reset
    #[error("animation for {id} is already running")]
    AlreadyRunning {
        /// Achievement owning the controller
        id: AchievementId,
    },
}

/// Configuration errors raised while constructing engine components.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// A value lies outside its accepted range
    #[error("{field} out of range: {value}")]
    OutOfRange {
        /// Field name
        field: &'static str,
        /// Offending value
        value: f32,
    },

    /// Config file could not be parsed
    #[error("Failed to parse config: {0}")]
    Parse(String),

    /// Config could not be serialized
    #[error("Failed to serialize config: {0}")]
    Serialize(String),
}

/// Result type alias for pathway operations.
pub type PathResult<T> = Result<T, PathError>;
