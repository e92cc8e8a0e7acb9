//! Immutable per-tick snapshot handed to the renderer.

use bytemuck::{Pod, Zeroable};
use pathway_common::AchievementId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::animation::{NodeAnimState, NodeAnimationSample};
use crate::events::ProgressionEvent;
use crate::layout::PathLayout;
use crate::nodes::NodePosition;
use crate::performance::{QualityLevel, RenderSettings};
use crate::navigation::ScrollSnapshot;
use crate::reveal::{RevealSnapshot, RevealState};

/// GPU-compatible per-node instance data.
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable, Default)]
#[repr(C)]
pub struct NodeInstance {
    /// Node center in content space.
    pub position: [f32; 2],
    /// Scale multiplier (celebration pop).
    pub scale: f32,
    /// Reveal opacity.
    pub opacity: f32,
    /// Glow intensity.
    pub glow: f32,
    /// Progress pulse intensity.
    pub pulse: f32,
    /// Category color (packed RGBA).
    pub color: u32,
    /// Visual state (see `VisualState::to_shader_value`).
    pub state: u32,
}

impl NodeInstance {
    /// Builds an instance from a node, its animation sample and reveal opacity.
    #[must_use]
    pub fn new(node: &NodePosition, sample: &NodeAnimationSample, color: u32, opacity: f32) -> Self {
        Self {
            position: node.position.to_array(),
            scale: sample.unlock_scale,
            opacity,
            glow: sample.glow_intensity,
            pulse: sample.pulse_intensity,
            color,
            state: node.visual_state.to_shader_value(),
        }
    }
}

/// Everything the renderer needs for one frame.
///
/// Layout and nodes are shared with the controller until the next change,
/// so cloning a frame is cheap.
#[derive(Debug, Clone, Default)]
pub struct FrameState {
    /// Frame counter.
    pub frame: u64,
    /// Path geometry.
    pub layout: Arc<PathLayout>,
    /// All nodes.
    pub nodes: Arc<Vec<NodePosition>>,
    /// Animation values per node.
    pub animations: BTreeMap<AchievementId, NodeAnimationSample>,
    /// Indices into `layout.segments` that pass culling.
    pub visible_segments: Vec<usize>,
    /// Indices into `nodes` that pass culling.
    pub visible_nodes: Vec<usize>,
    /// Instance data for the visible nodes, in `visible_nodes` order.
    pub instances: Vec<NodeInstance>,
    /// Render settings for the current quality.
    pub render_settings: RenderSettings,
    /// Particle quality.
    pub particle_quality: QualityLevel,
    /// Graphics quality.
    pub graphics_quality: QualityLevel,
    /// Scroll state.
    pub scroll: ScrollSnapshot,
    /// Reveal state.
    pub reveal: RevealSnapshot,
    /// Events raised since the previous frame.
    pub events: Vec<ProgressionEvent>,
}

impl FrameState {
    /// Instance data as bytes for a GPU buffer upload.
    #[must_use]
    pub fn instance_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.instances)
    }

    /// Visible nodes.
    pub fn visible_node_positions(&self) -> impl Iterator<Item = &NodePosition> {
        self.visible_nodes.iter().filter_map(|&i| self.nodes.get(i))
    }

    /// Whether a node is celebrating this frame.
    #[must_use]
    pub fn is_celebrating(&self, id: &AchievementId) -> bool {
        self.animations
            .get(id)
            .is_some_and(|s| s.state == NodeAnimState::Celebrating)
    }

    /// Compact summary for logs and tooling.
    #[must_use]
    pub fn summary(&self) -> FrameSummary {
        FrameSummary {
            frame: self.frame,
            segments: self.layout.segments.len(),
            nodes: self.nodes.len(),
            visible_segments: self.visible_segments.len(),
            visible_nodes: self.visible_nodes.len(),
            celebrating: self
                .animations
                .iter()
                .find(|(_, s)| s.state == NodeAnimState::Celebrating)
                .map(|(id, _)| id.clone()),
            scroll_offset: self.scroll.offset,
            progress_position: self.scroll.progress_position,
            particle_quality: self.particle_quality,
            graphics_quality: self.graphics_quality,
            reveal: self.reveal.state,
            events: self.events.len(),
        }
    }
}

/// Serializable frame summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameSummary {
    /// Frame counter
    pub frame: u64,
    /// Segment count
    pub segments: usize,
    /// Node count
    pub nodes: usize,
    /// Segments passing culling
    pub visible_segments: usize,
    /// Nodes passing culling
    pub visible_nodes: usize,
    /// Node currently celebrating
    pub celebrating: Option<AchievementId>,
    /// Scroll offset
    pub scroll_offset: f32,
    /// Normalized scroll position
    pub progress_position: f32,
    /// Particle quality
    pub particle_quality: QualityLevel,
    /// Graphics quality
    pub graphics_quality: QualityLevel,
    /// Reveal lifecycle
    pub reveal: RevealState,
    /// Events raised this frame
    pub events: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::achievement::{AchievementCategory, VisualState};
    use pathway_common::Point;

    #[test]
    fn test_instance_layout_is_tightly_packed() {
        assert_eq!(std::mem::size_of::<NodeInstance>(), 32);
        let frame = FrameState {
            instances: vec![NodeInstance::default(); 3],
            ..FrameState::default()
        };
        assert_eq!(frame.instance_bytes().len(), 96);
    }

    #[test]
    fn test_instance_from_node() {
        let node = NodePosition {
            achievement_id: "a".into(),
            position: Point::new(12.0, 34.0),
            category: AchievementCategory::Pulse,
            visual_state: VisualState::Unlocked,
            path_progress: 0.5,
            is_on_main_path: false,
        };
        let sample = NodeAnimationSample {
            glow_intensity: 0.8,
            ..NodeAnimationSample::default()
        };
        let instance = NodeInstance::new(&node, &sample, 0x39FF_14FF, 0.5);
        assert_eq!(instance.position, [12.0, 34.0]);
        assert_eq!(instance.scale, 1.0);
        assert_eq!(instance.glow, 0.8);
        assert_eq!(instance.state, VisualState::Unlocked.to_shader_value());
    }
}
