//! # Pathway Common
//!
//! Common types, utilities, and shared abstractions for the progression path engine.
//!
//! This crate provides foundational types used across all pathway crates:
//! - Geometry types (points, sizes, rectangles)
//! - ID types (AchievementId, SegmentId, RewardId)
//! - Common error types
//! - Prelude for convenient imports

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod error;
pub mod geometry;
pub mod ids;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::*;
    pub use crate::geometry::*;
    pub use crate::ids::*;
}

pub use prelude::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_from_points() {
        let rect = Rect::from_points(&[Point::new(10.0, 40.0), Point::new(-5.0, 20.0)]);
        assert_eq!(rect, Some(Rect::new(-5.0, 20.0, 10.0, 40.0)));
    }

    #[test]
    fn test_achievement_id_equality() {
        let a = AchievementId::new("score_10");
        let b = AchievementId::from("score_10");
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "score_10");
    }

    #[test]
    fn test_error_display() {
        let err = PathError::from(AnimationError::ControllerDisposed {
            id: AchievementId::new("first_flight"),
        });
        assert!(err.to_string().contains("first_flight"));

        let err = PathError::from(ConfigError::Parse("bad".into()));
        assert!(matches!(err, PathError::Config(_)));
    }
}
