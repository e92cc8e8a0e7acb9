//! Path layout: the snaking main path, category branches and curve smoothing.
//!
//! # Pipeline
//!
//! ```text
//! achievements ──▶ group_by_category ──▶ main category? ──▶ snake polyline ──▶ smooth
//!                                              │
//!                                              └──▶ branch origin (arc length) ──▶ branch polyline ──▶ smooth
//! ```
//!
//! Layout is a pure function of the viewport size, the branch config and the
//! achievement list, so identical inputs always produce identical segments.

use pathway_common::{AchievementId, Point, Rect, SegmentId, Size};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

use crate::achievement::{group_by_category, Achievement, AchievementCategory};
use crate::branch::{BranchConfig, BranchConfigSet, ResponsiveLayout, DEFAULT_NODE_SPACING, DEFAULT_ROW_SPACING};

/// Interpolation factor for the control point placed before a corner.
pub const SMOOTHING_NEAR: f32 = 0.7;

/// Interpolation factor for the control point placed after a corner.
pub const SMOOTHING_FAR: f32 = 0.3;

/// Samples generated per smoothed corner (including both control points).
pub const CURVE_STEPS: usize = 5;

/// Sideways wobble applied to branch polylines, in pixels.
const BRANCH_WOBBLE: f32 = 14.0;

/// How the main path was laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum LayoutStrategy {
    /// Nothing to lay out.
    #[default]
    Empty,
    /// Rows walked left-to-right then right-to-left.
    Snake,
    /// Viewport too narrow for two columns; one vertical column.
    SingleColumn,
}

/// One drawable path: the main path or a branch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathSegment {
    /// Segment id (`path-<category>`).
    pub id: SegmentId,
    /// Category drawn by this segment.
    pub category: AchievementCategory,
    /// Smoothed polyline.
    pub points: Vec<Point>,
    /// Stroke color (packed RGBA).
    pub color: u32,
    /// Stroke width in pixels.
    pub width: f32,
    /// Whether this is the main path.
    pub is_main_path: bool,
    /// Unlocked / total for `achievement_ids`.
    pub completion_fraction: f32,
    /// Achievements on this segment, in ascending target-value order.
    pub achievement_ids: Vec<AchievementId>,
}

impl PathSegment {
    /// Total arc length.
    #[must_use]
    pub fn length(&self) -> f32 {
        polyline_length(&self.points)
    }

    /// Point at an arc-length fraction.
    #[must_use]
    pub fn sample(&self, fraction: f32) -> Option<Point> {
        sample_polyline(&self.points, fraction)
    }

    /// Bounding box of the polyline, not including the stroke.
    #[must_use]
    pub fn bounds(&self) -> Option<Rect> {
        Rect::from_points(&self.points)
    }

    /// Recomputes the completion fraction from the current achievement states.
    ///
    /// Geometry is left untouched.
    pub fn refresh_completion(&mut self, unlocked: &HashMap<&AchievementId, bool>) {
        self.completion_fraction = completion_fraction(
            self.achievement_ids
                .iter()
                .map(|id| unlocked.get(id).copied().unwrap_or(false)),
        );
    }
}

/// Result of a layout pass.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PathLayout {
    /// Segments, main path first, then branches in category order.
    pub segments: Vec<PathSegment>,
    /// Viewport the layout was computed for.
    pub viewport: Size,
    /// Size of the scrollable content.
    pub content_size: Size,
    /// Strategy used for the main path.
    pub strategy: LayoutStrategy,
}

impl PathLayout {
    /// Whether the layout has no segments.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// The main path segment, if any.
    #[must_use]
    pub fn main_path(&self) -> Option<&PathSegment> {
        self.segments.iter().find(|s| s.is_main_path)
    }

    /// Segment owning an achievement.
    #[must_use]
    pub fn segment_for(&self, id: &AchievementId) -> Option<&PathSegment> {
        self.segments
            .iter()
            .find(|s| s.achievement_ids.contains(id))
    }

    /// Recomputes every segment's completion fraction without touching geometry.
    pub fn refresh_completion(&mut self, achievements: &[Achievement]) {
        let unlocked: HashMap<&AchievementId, bool> = achievements
            .iter()
            .map(|a| (&a.id, a.is_unlocked))
            .collect();
        for segment in &mut self.segments {
            segment.refresh_completion(&unlocked);
        }
    }
}

/// Computes path segments from achievements and the viewport.
#[derive(Debug, Clone)]
pub struct PathLayoutCalculator {
    branches: BranchConfigSet,
    node_spacing: f32,
    row_spacing: f32,
}

impl Default for PathLayoutCalculator {
    fn default() -> Self {
        Self::new(BranchConfigSet::default())
    }
}

impl PathLayoutCalculator {
    /// Creates a calculator with default spacing.
    #[must_use]
    pub fn new(branches: BranchConfigSet) -> Self {
        Self {
            branches,
            node_spacing: DEFAULT_NODE_SPACING,
            row_spacing: DEFAULT_ROW_SPACING,
        }
    }

    /// Overrides the base spacing.
    #[must_use]
    pub fn with_spacing(mut self, node_spacing: f32, row_spacing: f32) -> Self {
        self.node_spacing = node_spacing.max(1.0);
        self.row_spacing = row_spacing.max(1.0);
        self
    }

    /// Branch config in use.
    #[must_use]
    pub fn branches(&self) -> &BranchConfigSet {
        &self.branches
    }

    /// Lays out every category.
    ///
    /// An empty achievement list or an empty viewport yields an empty layout.
    #[must_use]
    pub fn calculate(&self, viewport: Size, achievements: &[Achievement]) -> PathLayout {
        if viewport.is_empty() || achievements.is_empty() {
            return PathLayout {
                viewport,
                content_size: viewport,
                ..PathLayout::default()
            };
        }

        let groups = group_by_category(achievements);
        let Some(main_category) = self.branches.main_category(groups.keys().copied()) else {
            return PathLayout::default();
        };
        let responsive = ResponsiveLayout::for_viewport(viewport, self.node_spacing, self.row_spacing);

        let main_group = &groups[&main_category];
        let (raw_main, strategy) = snake_points(main_group.len(), viewport, &responsive);
        let main_points = smooth_polyline(&raw_main);
        let origin_template = main_points.clone();

        let mut segments = Vec::with_capacity(groups.len());
        segments.push(self.build_segment(main_category, main_points, main_group, true, &responsive));

        for (&category, group) in &groups {
            if category == main_category {
                continue;
            }
            let config = self.branches.get(category);
            let origin = sample_polyline(&origin_template, config.branch_point_fraction)
                .unwrap_or_else(|| Point::new(viewport.width / 2.0, responsive.padding));
            let raw = branch_points(origin, group.len(), &config, viewport, &responsive);
            let points = smooth_polyline(&raw);
            segments.push(self.build_segment(category, points, group, false, &responsive));
        }

        let max_y = segments
            .iter()
            .flat_map(|s| s.points.iter().map(|p| p.y))
            .fold(0.0_f32, f32::max);
        let content_size = Size::new(viewport.width, (max_y + responsive.padding).max(viewport.height));

        debug!(
            "Laid out {} segments ({:?}) for {}x{} viewport",
            segments.len(),
            strategy,
            viewport.width,
            viewport.height
        );

        PathLayout {
            segments,
            viewport,
            content_size,
            strategy,
        }
    }

    fn build_segment(
        &self,
        category: AchievementCategory,
        points: Vec<Point>,
        group: &[&Achievement],
        is_main_path: bool,
        responsive: &ResponsiveLayout,
    ) -> PathSegment {
        let config = self.branches.get(category);
        PathSegment {
            id: SegmentId::new(format!("path-{}", category.key())),
            category,
            points,
            color: config.color,
            width: config.width * responsive.stroke_scale,
            is_main_path,
            completion_fraction: completion_fraction(group.iter().map(|a| a.is_unlocked)),
            achievement_ids: group.iter().map(|a| a.id.clone()).collect(),
        }
    }
}

/// Unlocked / total, or 0.0 for an empty set.
#[must_use]
pub fn completion_fraction(unlocked: impl IntoIterator<Item = bool>) -> f32 {
    let (done, total) = unlocked
        .into_iter()
        .fold((0usize, 0usize), |(d, t), u| (d + usize::from(u), t + 1));
    if total == 0 {
        0.0
    } else {
        done as f32 / total as f32
    }
}

/// Raw main path points: one per achievement, snaking down the viewport.
fn snake_points(count: usize, viewport: Size, layout: &ResponsiveLayout) -> (Vec<Point>, LayoutStrategy) {
    let usable = viewport.width - 2.0 * layout.padding;
    let columns = if usable >= layout.node_spacing {
        (usable / layout.node_spacing).floor() as usize + 1
    } else {
        1
    };

    if columns < 2 {
        let x = viewport.width / 2.0;
        let points = (0..count)
            .map(|i| Point::new(x, layout.padding + i as f32 * layout.row_spacing))
            .collect();
        return (points, LayoutStrategy::SingleColumn);
    }

    let row_width = (columns - 1) as f32 * layout.node_spacing;
    let left = layout.padding + (usable - row_width) / 2.0;
    let points = (0..count)
        .map(|i| {
            let row = i / columns;
            let col = i % columns;
            let col = if row % 2 == 0 { col } else { columns - 1 - col };
            Point::new(
                left + col as f32 * layout.node_spacing,
                layout.padding + row as f32 * layout.row_spacing,
            )
        })
        .collect();
    (points, LayoutStrategy::Snake)
}

/// Raw branch points: the origin followed by one point per achievement.
fn branch_points(
    origin: Point,
    count: usize,
    config: &BranchConfig,
    viewport: Size,
    layout: &ResponsiveLayout,
) -> Vec<Point> {
    let direction = config.direction();
    let normal = direction.perp();
    let length = config.length.max(count as f32 * layout.node_spacing * 0.75);
    let min_x = layout.padding.min(viewport.width / 2.0);
    let max_x = (viewport.width - layout.padding).max(viewport.width / 2.0);

    let mut points = Vec::with_capacity(count + 1);
    points.push(origin);
    for k in 1..=count {
        let t = k as f32 / count as f32;
        let wobble = if k == count {
            0.0
        } else {
            (k as f32 * 1.3).sin() * BRANCH_WOBBLE
        };
        let p = origin + direction * (length * t) + normal * wobble;
        points.push(Point::new(p.x.clamp(min_x, max_x), p.y));
    }
    points
}

/// Smooths a polyline by rounding every interior corner.
///
/// For each interior point two control points are placed at 70% of the way
/// from the previous point and 30% of the way toward the next one, then a
/// quadratic curve through the corner joins them. The first and last points
/// are kept exactly.
#[must_use]
pub fn smooth_polyline(raw: &[Point]) -> Vec<Point> {
    match raw.len() {
        0 => return Vec::new(),
        1 => return vec![raw[0], raw[0]],
        2 => return raw.to_vec(),
        _ => {}
    }

    let mut out = Vec::with_capacity(2 + (raw.len() - 2) * CURVE_STEPS);
    out.push(raw[0]);
    for window in raw.windows(3) {
        let (prev, corner, next) = (window[0], window[1], window[2]);
        let start = prev.lerp(corner, SMOOTHING_NEAR);
        let end = corner.lerp(next, SMOOTHING_FAR);
        for step in 0..CURVE_STEPS {
            let t = step as f32 / (CURVE_STEPS - 1) as f32;
            out.push(quadratic(start, corner, end, t));
        }
    }
    out.push(raw[raw.len() - 1]);
    out
}

fn quadratic(a: Point, control: Point, b: Point, t: f32) -> Point {
    let u = 1.0 - t;
    a * (u * u) + control * (2.0 * u * t) + b * (t * t)
}

/// Total length of a polyline.
#[must_use]
pub fn polyline_length(points: &[Point]) -> f32 {
    points.windows(2).map(|w| w[0].distance(w[1])).sum()
}

/// Point at an arc-length fraction (clamped to `[0, 1]`).
#[must_use]
pub fn sample_polyline(points: &[Point], fraction: f32) -> Option<Point> {
    let first = *points.first()?;
    let total = polyline_length(points);
    if total <= f32::EPSILON {
        return Some(first);
    }
    let fraction = if fraction.is_nan() { 0.0 } else { fraction.clamp(0.0, 1.0) };
    if fraction >= 1.0 {
        return points.last().copied();
    }

    let mut remaining = total * fraction;
    for w in points.windows(2) {
        let len = w[0].distance(w[1]);
        if remaining <= len {
            if len <= f32::EPSILON {
                return Some(w[0]);
            }
            return Some(w[0].lerp(w[1], remaining / len));
        }
        remaining -= len;
    }
    points.last().copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn score(n: u32) -> Vec<Achievement> {
        (0..n)
            .map(|i| Achievement::new(format!("score_{i}"), AchievementCategory::Score, (i + 1) * 10))
            .collect()
    }

    #[test]
    fn test_empty_inputs_give_empty_layout() {
        let calc = PathLayoutCalculator::default();
        assert!(calc.calculate(Size::new(400.0, 800.0), &[]).is_empty());
        assert!(calc.calculate(Size::new(0.0, 800.0), &score(3)).is_empty());
    }

    #[test]
    fn test_main_path_snakes() {
        let calc = PathLayoutCalculator::default();
        let layout = calc.calculate(Size::new(500.0, 900.0), &score(10));
        assert_eq!(layout.strategy, LayoutStrategy::Snake);
        let main = layout.main_path().expect("main path");
        assert_eq!(main.achievement_ids.len(), 10);
        assert!(main.points.len() > 10);
        // Path must go down the screen as it proceeds.
        let first = main.points[0];
        let last = main.points[main.points.len() - 1];
        assert!(last.y > first.y);
    }

    #[test]
    fn test_narrow_viewport_falls_back_to_single_column() {
        let calc = PathLayoutCalculator::default();
        let layout = calc.calculate(Size::new(60.0, 900.0), &score(4));
        assert_eq!(layout.strategy, LayoutStrategy::SingleColumn);
        let main = layout.main_path().expect("main path");
        assert!(main.points.iter().all(|p| (p.x - 30.0).abs() < 1e-3));
    }

    #[test]
    fn test_branches_start_on_main_path() {
        let mut list = score(6);
        list.push(Achievement::new("pulse_1", AchievementCategory::Pulse, 5));
        list.push(Achievement::new("pulse_2", AchievementCategory::Pulse, 50));
        let calc = PathLayoutCalculator::default();
        let layout = calc.calculate(Size::new(500.0, 900.0), &list);
        assert_eq!(layout.segments.len(), 2);

        let main = layout.main_path().expect("main path");
        let branch = &layout.segments[1];
        assert!(!branch.is_main_path);
        assert_eq!(branch.category, AchievementCategory::Pulse);
        let origin = main.sample(0.33).expect("origin");
        assert!(branch.points[0].distance(origin) < 1e-3);
    }

    #[test]
    fn test_empty_category_has_no_segment() {
        let calc = PathLayoutCalculator::default();
        let layout = calc.calculate(Size::new(500.0, 900.0), &score(3));
        assert_eq!(layout.segments.len(), 1);
        assert!(layout
            .segments
            .iter()
            .all(|s| s.category == AchievementCategory::Score));
    }

    #[test]
    fn test_completion_fraction_six_of_ten() {
        let mut list = score(10);
        for a in list.iter_mut().take(6) {
            a.is_unlocked = true;
        }
        let calc = PathLayoutCalculator::default();
        let layout = calc.calculate(Size::new(500.0, 900.0), &list);
        let main = layout.main_path().expect("main path");
        assert!((main.completion_fraction - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_refresh_completion_keeps_geometry() {
        let mut list = score(4);
        let calc = PathLayoutCalculator::default();
        let mut layout = calc.calculate(Size::new(500.0, 900.0), &list);
        let before: Vec<Point> = layout.segments[0].points.clone();

        list[0].is_unlocked = true;
        layout.refresh_completion(&list);

        assert!((layout.segments[0].completion_fraction - 0.25).abs() < 1e-6);
        assert_eq!(layout.segments[0].points, before);
    }

    #[test]
    fn test_single_point_polyline_is_degenerate_segment() {
        let smoothed = smooth_polyline(&[Point::new(5.0, 5.0)]);
        assert_eq!(smoothed.len(), 2);
        assert_eq!(polyline_length(&smoothed), 0.0);
        assert_eq!(sample_polyline(&smoothed, 0.5), Some(Point::new(5.0, 5.0)));
    }

    #[test]
    fn test_sample_polyline_midpoint() {
        let points = [Point::new(0.0, 0.0), Point::new(10.0, 0.0), Point::new(10.0, 10.0)];
        let mid = sample_polyline(&points, 0.5).expect("mid");
        assert!(mid.distance(Point::new(10.0, 0.0)) < 1e-4);
        assert_eq!(sample_polyline(&[], 0.5), None);
    }

    #[test]
    fn test_layout_is_deterministic() {
        let mut list = score(7);
        list.push(Achievement::new("total_1", AchievementCategory::Total, 100));
        list.push(Achievement::new("special", AchievementCategory::Special, 1));
        let calc = PathLayoutCalculator::default();
        let a = calc.calculate(Size::new(420.0, 800.0), &list);
        list.reverse();
        let b = calc.calculate(Size::new(420.0, 800.0), &list);
        assert_eq!(a, b);
    }

    proptest! {
        #[test]
        fn prop_smoothing_preserves_endpoints(
            raw in proptest::collection::vec((-500.0f32..500.0, -500.0f32..500.0), 2..40)
        ) {
            let raw: Vec<Point> = raw.into_iter().map(|(x, y)| Point::new(x, y)).collect();
            let smoothed = smooth_polyline(&raw);
            prop_assert_eq!(smoothed.first(), raw.first());
            prop_assert_eq!(smoothed.last(), raw.last());
            prop_assert!(smoothed.len() >= raw.len());
        }

        #[test]
        fn prop_layout_points_are_finite(width in 1.0f32..2000.0, count in 1u32..40) {
            let layout = PathLayoutCalculator::default().calculate(Size::new(width, 800.0), &score(count));
            for segment in &layout.segments {
                prop_assert!(segment.points.iter().all(|p| p.is_finite()));
            }
        }
    }
}
