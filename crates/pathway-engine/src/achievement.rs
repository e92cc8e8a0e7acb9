//! Achievement records and their derived visual state.
//!
//! Achievements are owned by the tracking subsystem. The engine only ever
//! reads them as immutable values within one snapshot.

use pathway_common::{AchievementId, RewardId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Integer statistics published alongside achievements (games played, best score...).
pub type Statistics = BTreeMap<String, i64>;

/// Category an achievement belongs to. Each category gets its own path segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AchievementCategory {
    /// Single-run score milestones.
    Score,
    /// Lifetime totals.
    Total,
    /// Pulse ability usage.
    Pulse,
    /// Power-up collection.
    PowerUp,
    /// Survival time.
    Survival,
    /// Hidden and one-off achievements.
    Special,
}

impl AchievementCategory {
    /// Every category, in declaration order.
    pub const ALL: [Self; 6] = [
        Self::Score,
        Self::Total,
        Self::Pulse,
        Self::PowerUp,
        Self::Survival,
        Self::Special,
    ];

    /// Stable lowercase key used in segment ids and config files.
    #[must_use]
    pub const fn key(&self) -> &'static str {
        match self {
            Self::Score => "score",
            Self::Total => "total",
            Self::Pulse => "pulse",
            Self::PowerUp => "power_up",
            Self::Survival => "survival",
            Self::Special => "special",
        }
    }
}

/// Visual state of a node, derived from its achievement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum VisualState {
    /// No progress yet.
    #[default]
    Locked,
    /// Some progress, not unlocked.
    InProgress,
    /// Unlocked, nothing to claim.
    Unlocked,
    /// Unlocked and carrying a reward.
    RewardAvailable,
}

impl VisualState {
    /// Derives the visual state from the fields that matter.
    #[must_use]
    pub fn derive(is_unlocked: bool, current_progress: u32, has_reward: bool) -> Self {
        match (is_unlocked, has_reward) {
            (true, true) => Self::RewardAvailable,
            (true, false) => Self::Unlocked,
            (false, _) if current_progress > 0 => Self::InProgress,
            (false, _) => Self::Locked,
        }
    }

    /// Whether the node counts as unlocked.
    #[must_use]
    pub const fn is_unlocked(&self) -> bool {
        matches!(self, Self::Unlocked | Self::RewardAvailable)
    }

    /// Shader-friendly numeric value.
    #[must_use]
    pub const fn to_shader_value(&self) -> u32 {
        match self {
            Self::Locked => 0,
            Self::InProgress => 1,
            Self::Unlocked => 2,
            Self::RewardAvailable => 3,
        }
    }
}

/// One achievement as reported by the tracking subsystem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Achievement {
    /// Unique id.
    pub id: AchievementId,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Owning category.
    pub category: AchievementCategory,
    /// Value required to unlock.
    pub target_value: u32,
    /// Current progress toward `target_value`.
    pub current_progress: u32,
    /// Whether the tracker considers it unlocked.
    pub is_unlocked: bool,
    /// Reward granted on unlock, if any.
    #[serde(default)]
    pub reward_id: Option<RewardId>,
}

impl Achievement {
    /// Creates a locked achievement with no progress.
    #[must_use]
    pub fn new(id: impl Into<AchievementId>, category: AchievementCategory, target_value: u32) -> Self {
        let id = id.into();
        Self {
            name: id.as_str().to_string(),
            id,
            category,
            target_value,
            current_progress: 0,
            is_unlocked: false,
            reward_id: None,
        }
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the current progress.
    #[must_use]
    pub fn with_progress(mut self, progress: u32) -> Self {
        self.current_progress = progress;
        self
    }

    /// Marks the achievement unlocked.
    #[must_use]
    pub fn unlocked(mut self) -> Self {
        self.is_unlocked = true;
        self
    }

    /// Attaches a reward.
    #[must_use]
    pub fn with_reward(mut self, reward: impl Into<String>) -> Self {
        self.reward_id = Some(RewardId::new(reward));
        self
    }

    /// Progress as a fraction of the target, clamped to `[0, 1]`.
    #[must_use]
    pub fn progress_fraction(&self) -> f32 {
        if self.target_value == 0 {
            return if self.is_unlocked { 1.0 } else { 0.0 };
        }
        (self.current_progress as f32 / self.target_value as f32).clamp(0.0, 1.0)
    }

    /// Visual state for this achievement.
    #[must_use]
    pub fn visual_state(&self) -> VisualState {
        VisualState::derive(
            self.is_unlocked,
            self.current_progress,
            self.reward_id.is_some(),
        )
    }
}

/// Groups achievements per category, each group in ascending target-value order.
///
/// Ties are broken by id so the grouping is deterministic for any input order.
#[must_use]
pub fn group_by_category(
    achievements: &[Achievement],
) -> BTreeMap<AchievementCategory, Vec<&Achievement>> {
    let mut groups: BTreeMap<AchievementCategory, Vec<&Achievement>> = BTreeMap::new();
    for achievement in achievements {
        groups.entry(achievement.category).or_default().push(achievement);
    }
    for group in groups.values_mut() {
        group.sort_by(|a, b| {
            a.target_value
                .cmp(&b.target_value)
                .then_with(|| a.id.cmp(&b.id))
        });
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_visual_state_rules() {
        let base = Achievement::new("a", AchievementCategory::Score, 10);
        assert_eq!(base.visual_state(), VisualState::Locked);
        assert_eq!(
            base.clone().with_progress(3).visual_state(),
            VisualState::InProgress
        );
        assert_eq!(
            base.clone().with_progress(10).unlocked().visual_state(),
            VisualState::Unlocked
        );
        assert_eq!(
            base.with_progress(10).unlocked().with_reward("neon_trail").visual_state(),
            VisualState::RewardAvailable
        );
    }

    #[test]
    fn test_reward_without_unlock_is_not_available() {
        let a = Achievement::new("a", AchievementCategory::Special, 1).with_reward("skin");
        assert_eq!(a.visual_state(), VisualState::Locked);
    }

    #[test]
    fn test_progress_fraction_clamped() {
        let a = Achievement::new("a", AchievementCategory::Score, 100).with_progress(150);
        assert!((a.progress_fraction() - 1.0).abs() < f32::EPSILON);

        let zero_target = Achievement::new("z", AchievementCategory::Special, 0);
        assert_eq!(zero_target.progress_fraction(), 0.0);
        assert_eq!(zero_target.unlocked().progress_fraction(), 1.0);
    }

    #[test]
    fn test_group_by_category_sorted_by_target() {
        let list = vec![
            Achievement::new("s3", AchievementCategory::Score, 100),
            Achievement::new("p1", AchievementCategory::Pulse, 5),
            Achievement::new("s1", AchievementCategory::Score, 10),
            Achievement::new("s2", AchievementCategory::Score, 50),
        ];
        let groups = group_by_category(&list);
        let score: Vec<&str> = groups[&AchievementCategory::Score]
            .iter()
            .map(|a| a.id.as_str())
            .collect();
        assert_eq!(score, vec!["s1", "s2", "s3"]);
        assert_eq!(groups[&AchievementCategory::Pulse].len(), 1);
        assert!(!groups.contains_key(&AchievementCategory::Total));
    }

    proptest! {
        #[test]
        fn prop_visual_state_is_pure(
            unlocked in any::<bool>(),
            progress in 0u32..1000,
            reward in any::<bool>(),
            target_a in 1u32..1000,
            target_b in 1u32..1000,
        ) {
            let mut a = Achievement::new("a", AchievementCategory::Score, target_a).with_progress(progress);
            let mut b = Achievement::new("b", AchievementCategory::Total, target_b).with_progress(progress);
            a.is_unlocked = unlocked;
            b.is_unlocked = unlocked;
            if reward {
                a = a.with_reward("r");
                b = b.with_reward("r");
            }
            prop_assert_eq!(a.visual_state(), b.visual_state());
        }
    }
}
