//! Per-category branch configuration and screen-size responsive spacing.

use pathway_common::Size;
use serde::{Deserialize, Serialize};

use crate::achievement::AchievementCategory;

/// Default spacing between neighbouring nodes along a path, in pixels.
pub const DEFAULT_NODE_SPACING: f32 = 90.0;

/// Default vertical distance between rows of the main path, in pixels.
pub const DEFAULT_ROW_SPACING: f32 = 120.0;

/// Default fraction of the main path's arc length where branches split off.
pub const DEFAULT_BRANCH_POINT: f32 = 0.33;

/// Layout parameters for one category's path.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BranchConfig {
    /// Category this config applies to.
    pub category: AchievementCategory,
    /// Stroke color (packed RGBA).
    pub color: u32,
    /// Stroke width in pixels.
    pub width: f32,
    /// Where along the main path this branch starts (0.0-1.0).
    pub branch_point_fraction: f32,
    /// Direction of the branch in degrees, 0 = right, 90 = down.
    pub angle_degrees: f32,
    /// Minimum branch length in pixels.
    pub length: f32,
    /// Higher priority wins the main path.
    pub priority: u8,
}

impl BranchConfig {
    /// Neutral config used for a category missing from the set.
    #[must_use]
    pub const fn fallback(category: AchievementCategory) -> Self {
        Self {
            category,
            color: 0xFFFF_FFFF,
            width: 4.0,
            branch_point_fraction: DEFAULT_BRANCH_POINT,
            angle_degrees: 90.0,
            length: 200.0,
            priority: 0,
        }
    }

    /// Unit direction vector of the branch.
    #[must_use]
    pub fn direction(&self) -> glam::Vec2 {
        let radians = self.angle_degrees.to_radians();
        glam::Vec2::new(radians.cos(), radians.sin())
    }
}

/// Branch configuration for every category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BranchConfigSet {
    configs: Vec<BranchConfig>,
}

impl Default for BranchConfigSet {
    fn default() -> Self {
        use AchievementCategory as C;
        let entry = |category, color, width, angle_degrees, length, priority| BranchConfig {
            category,
            color,
            width,
            branch_point_fraction: DEFAULT_BRANCH_POINT,
            angle_degrees,
            length,
            priority,
        };
        Self {
            configs: vec![
                entry(C::Score, 0x00FF_FFFF, 8.0, 90.0, 0.0, 100),
                entry(C::Total, 0xFF14_93FF, 5.0, 150.0, 240.0, 80),
                entry(C::Pulse, 0x39FF_14FF, 5.0, 30.0, 240.0, 60),
                entry(C::PowerUp, 0xFFD7_00FF, 4.0, 120.0, 200.0, 50),
                entry(C::Survival, 0x9D00_FFFF, 4.0, 60.0, 200.0, 40),
                entry(C::Special, 0xFF45_00FF, 4.0, 90.0, 180.0, 20),
            ],
        }
    }
}

impl BranchConfigSet {
    /// Creates a set from explicit configs. Later duplicates override earlier ones.
    #[must_use]
    pub fn new(configs: Vec<BranchConfig>) -> Self {
        let mut set = Self {
            configs: Vec::with_capacity(configs.len()),
        };
        for config in configs {
            set.insert(config);
        }
        set
    }

    /// Inserts or replaces the config for its category.
    pub fn insert(&mut self, config: BranchConfig) {
        if let Some(existing) = self
            .configs
            .iter_mut()
            .find(|c| c.category == config.category)
        {
            *existing = config;
        } else {
            self.configs.push(config);
        }
    }

    /// Config for a category, falling back to a neutral one.
    #[must_use]
    pub fn get(&self, category: AchievementCategory) -> BranchConfig {
        self.configs
            .iter()
            .find(|c| c.category == category)
            .copied()
            .unwrap_or_else(|| BranchConfig::fallback(category))
    }

    /// Highest-priority category among the present ones.
    ///
    /// Ties resolve to the earlier category in declaration order.
    #[must_use]
    pub fn main_category(
        &self,
        present: impl IntoIterator<Item = AchievementCategory>,
    ) -> Option<AchievementCategory> {
        let mut best: Option<(u8, AchievementCategory)> = None;
        for category in present {
            let priority = self.get(category).priority;
            best = match best {
                Some((p, c)) if p > priority || (p == priority && c <= category) => Some((p, c)),
                _ => Some((priority, category)),
            };
        }
        best.map(|(_, c)| c)
    }

    /// Iterates all configs.
    pub fn iter(&self) -> impl Iterator<Item = &BranchConfig> {
        self.configs.iter()
    }

    /// Clamps every config to sane ranges.
    pub fn validate(&mut self) {
        for config in &mut self.configs {
            config.width = config.width.clamp(1.0, 32.0);
            config.branch_point_fraction = config.branch_point_fraction.clamp(0.0, 1.0);
            config.length = config.length.clamp(0.0, 4000.0);
        }
    }
}

/// Screen-size bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreenClass {
    /// Phones in portrait.
    Small,
    /// Large phones and small tablets.
    Medium,
    /// Tablets and desktop windows.
    Large,
}

impl ScreenClass {
    /// Classifies a viewport by its width.
    #[must_use]
    pub fn for_width(width: f32) -> Self {
        if width < 400.0 {
            Self::Small
        } else if width < 800.0 {
            Self::Medium
        } else {
            Self::Large
        }
    }
}

/// Spacing derived from the viewport size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResponsiveLayout {
    /// Screen bucket.
    pub class: ScreenClass,
    /// Horizontal and top/bottom padding.
    pub padding: f32,
    /// Distance between nodes along a row.
    pub node_spacing: f32,
    /// Distance between rows.
    pub row_spacing: f32,
    /// Multiplier applied to stroke widths.
    pub stroke_scale: f32,
}

impl ResponsiveLayout {
    /// Derives spacing for a viewport from base spacings.
    #[must_use]
    pub fn for_viewport(viewport: Size, node_spacing: f32, row_spacing: f32) -> Self {
        let class = ScreenClass::for_width(viewport.width);
        let (padding_ratio, spacing_scale, stroke_scale) = match class {
            ScreenClass::Small => (0.08, 0.8, 0.75),
            ScreenClass::Medium => (0.1, 1.0, 1.0),
            ScreenClass::Large => (0.12, 1.2, 1.25),
        };
        Self {
            class,
            padding: (viewport.width * padding_ratio).max(16.0),
            node_spacing: node_spacing * spacing_scale,
            row_spacing: row_spacing * spacing_scale,
            stroke_scale,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_main_category_is_score() {
        let set = BranchConfigSet::default();
        let main = set.main_category([
            AchievementCategory::Pulse,
            AchievementCategory::Score,
            AchievementCategory::Total,
        ]);
        assert_eq!(main, Some(AchievementCategory::Score));
    }

    #[test]
    fn test_main_category_without_score() {
        let set = BranchConfigSet::default();
        let main = set.main_category([AchievementCategory::Special, AchievementCategory::Pulse]);
        assert_eq!(main, Some(AchievementCategory::Pulse));
        assert_eq!(set.main_category([]), None);
    }

    #[test]
    fn test_main_category_tie_prefers_declaration_order() {
        let set = BranchConfigSet::new(vec![
            BranchConfig::fallback(AchievementCategory::Survival),
            BranchConfig::fallback(AchievementCategory::Total),
        ]);
        let main = set.main_category([AchievementCategory::Survival, AchievementCategory::Total]);
        assert_eq!(main, Some(AchievementCategory::Total));
    }

    #[test]
    fn test_insert_replaces() {
        let mut set = BranchConfigSet::default();
        let mut pulse = set.get(AchievementCategory::Pulse);
        pulse.priority = 255;
        set.insert(pulse);
        assert_eq!(set.get(AchievementCategory::Pulse).priority, 255);
        assert_eq!(set.iter().count(), AchievementCategory::ALL.len());
    }

    #[test]
    fn test_direction_points_down_at_90() {
        let dir = BranchConfig::fallback(AchievementCategory::Special).direction();
        assert!(dir.x.abs() < 1e-6);
        assert!((dir.y - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_responsive_layout_classes() {
        let small = ResponsiveLayout::for_viewport(Size::new(360.0, 640.0), 90.0, 120.0);
        let large = ResponsiveLayout::for_viewport(Size::new(1024.0, 768.0), 90.0, 120.0);
        assert_eq!(small.class, ScreenClass::Small);
        assert_eq!(large.class, ScreenClass::Large);
        assert!(small.node_spacing < large.node_spacing);
        assert!(small.padding >= 16.0);
    }
}
