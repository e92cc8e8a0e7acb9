//! Node placement along path segments.

use pathway_common::{AchievementId, Point};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::achievement::{Achievement, AchievementCategory, VisualState};
use crate::layout::PathLayout;

/// Where one achievement's node sits and how it looks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodePosition {
    /// Achievement shown by this node.
    pub achievement_id: AchievementId,
    /// Position in content space.
    pub position: Point,
    /// Category of the owning segment.
    pub category: AchievementCategory,
    /// Derived visual state.
    pub visual_state: VisualState,
    /// Arc-length fraction along the owning segment.
    pub path_progress: f32,
    /// Whether the owning segment is the main path.
    pub is_on_main_path: bool,
}

/// Evenly spaced arc-length fractions for `count` nodes.
///
/// A single node sits at the midpoint.
#[must_use]
pub fn distribute(count: usize) -> Vec<f32> {
    match count {
        0 => Vec::new(),
        1 => vec![0.5],
        n => (0..n).map(|i| i as f32 / (n - 1) as f32).collect(),
    }
}

/// Places every achievement on its segment.
///
/// Ids present in the layout but missing from `achievements` are skipped;
/// the caller re-lays out whenever the id set changes.
#[must_use]
pub fn resolve(layout: &PathLayout, achievements: &[Achievement]) -> Vec<NodePosition> {
    let by_id: HashMap<&AchievementId, &Achievement> =
        achievements.iter().map(|a| (&a.id, a)).collect();

    let mut nodes = Vec::with_capacity(achievements.len());
    for segment in &layout.segments {
        let fractions = distribute(segment.achievement_ids.len());
        for (id, fraction) in segment.achievement_ids.iter().zip(fractions) {
            let Some(achievement) = by_id.get(id) else {
                continue;
            };
            let Some(position) = segment.sample(fraction) else {
                continue;
            };
            nodes.push(NodePosition {
                achievement_id: id.clone(),
                position,
                category: segment.category,
                visual_state: achievement.visual_state(),
                path_progress: fraction,
                is_on_main_path: segment.is_main_path,
            });
        }
    }
    nodes
}

/// Updates visual states in place, leaving positions untouched.
///
/// Returns the number of nodes whose state changed.
pub fn refresh_states(nodes: &mut [NodePosition], achievements: &[Achievement]) -> usize {
    let by_id: HashMap<&AchievementId, &Achievement> =
        achievements.iter().map(|a| (&a.id, a)).collect();
    let mut changed = 0;
    for node in nodes {
        if let Some(achievement) = by_id.get(&node.achievement_id) {
            let state = achievement.visual_state();
            if state != node.visual_state {
                node.visual_state = state;
                changed += 1;
            }
        }
    }
    changed
}

/// Node to center on when showing the player's progress.
///
/// The unlocked main-path node with the highest path progress; if nothing is
/// unlocked, the first locked main-path node; without a main path, the first node.
#[must_use]
pub fn current_progress_node(nodes: &[NodePosition]) -> Option<&NodePosition> {
    let main = || nodes.iter().filter(|n| n.is_on_main_path);
    main()
        .filter(|n| n.visual_state.is_unlocked())
        .max_by(|a, b| a.path_progress.total_cmp(&b.path_progress))
        .or_else(|| {
            main()
                .filter(|n| !n.visual_state.is_unlocked())
                .min_by(|a, b| a.path_progress.total_cmp(&b.path_progress))
        })
        .or_else(|| nodes.first())
}

/// Finds a node by achievement id.
#[must_use]
pub fn find<'a>(nodes: &'a [NodePosition], id: &AchievementId) -> Option<&'a NodePosition> {
    nodes.iter().find(|n| &n.achievement_id == id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::PathLayoutCalculator;
    use pathway_common::Size;

    fn category(n: u32, unlocked: u32) -> Vec<Achievement> {
        (0..n)
            .map(|i| {
                let a = Achievement::new(format!("s{i}"), AchievementCategory::Score, (i + 1) * 10);
                if i < unlocked {
                    a.with_progress((i + 1) * 10).unlocked()
                } else {
                    a
                }
            })
            .collect()
    }

    #[test]
    fn test_distribute() {
        assert!(distribute(0).is_empty());
        assert_eq!(distribute(1), vec![0.5]);
        assert_eq!(distribute(3), vec![0.0, 0.5, 1.0]);
    }

    #[test]
    fn test_resolve_path_progress_in_target_order() {
        let list = category(5, 0);
        let layout = PathLayoutCalculator::default().calculate(Size::new(400.0, 800.0), &list);
        let nodes = resolve(&layout, &list);
        assert_eq!(nodes.len(), 5);
        let progress: Vec<f32> = nodes.iter().map(|n| n.path_progress).collect();
        assert_eq!(progress, vec![0.0, 0.25, 0.5, 0.75, 1.0]);
        assert!(nodes.iter().all(|n| n.is_on_main_path));
    }

    #[test]
    fn test_single_node_sits_at_midpoint() {
        let list = category(1, 0);
        let layout = PathLayoutCalculator::default().calculate(Size::new(400.0, 800.0), &list);
        let nodes = resolve(&layout, &list);
        assert_eq!(nodes[0].path_progress, 0.5);
    }

    #[test]
    fn test_refresh_states_keeps_positions() {
        let mut list = category(3, 0);
        let layout = PathLayoutCalculator::default().calculate(Size::new(400.0, 800.0), &list);
        let mut nodes = resolve(&layout, &list);
        let positions: Vec<Point> = nodes.iter().map(|n| n.position).collect();

        list[1].current_progress = 5;
        assert_eq!(refresh_states(&mut nodes, &list), 1);
        assert_eq!(nodes[1].visual_state, VisualState::InProgress);
        assert_eq!(nodes.iter().map(|n| n.position).collect::<Vec<_>>(), positions);
    }

    #[test]
    fn test_current_progress_node() {
        let list = category(10, 6);
        let layout = PathLayoutCalculator::default().calculate(Size::new(400.0, 800.0), &list);
        let nodes = resolve(&layout, &list);
        let node = current_progress_node(&nodes).expect("node");
        assert_eq!(node.achievement_id.as_str(), "s5");

        let none_unlocked = category(4, 0);
        let layout = PathLayoutCalculator::default().calculate(Size::new(400.0, 800.0), &none_unlocked);
        let nodes = resolve(&layout, &none_unlocked);
        let node = current_progress_node(&nodes).expect("node");
        assert_eq!(node.achievement_id.as_str(), "s0");
        assert!(current_progress_node(&[]).is_none());
    }
}
