//! Simulated player session feeding the engine.

use pathway_engine::prelude::*;

/// Achievement tracks per category: id prefix, category and target values.
const TRACKS: &[(&str, AchievementCategory, &[u32])] = &[
    (
        "score",
        AchievementCategory::Score,
        &[100, 250, 500, 1_000, 2_500, 5_000, 10_000, 25_000, 50_000, 100_000],
    ),
    ("pulse", AchievementCategory::Pulse, &[10, 50, 100, 250, 500, 1_000]),
    ("powerup", AchievementCategory::PowerUp, &[5, 25, 50, 100]),
    ("survival", AchievementCategory::Survival, &[30, 60, 120, 300]),
    ("special", AchievementCategory::Special, &[1, 3]),
];

/// Frames between simulated runs.
const RUN_INTERVAL: u32 = 45;

/// Running totals of a fake player.
#[derive(Debug, Default)]
pub struct Session {
    score: u32,
    pulses: u32,
    powerups: u32,
    best_survival: u32,
    specials: u32,
    runs: u32,
    frames: u32,
}

impl Session {
    /// Fresh session with nothing achieved.
    pub fn new() -> Self {
        Self::default()
    }

    /// Advances one frame. Returns true when the totals changed.
    pub fn advance(&mut self, rng: &mut fastrand::Rng) -> bool {
        self.frames += 1;
        if self.frames % RUN_INTERVAL != 0 {
            return false;
        }
        self.runs += 1;
        self.score = self.score.saturating_add(rng.u32(50..2_500).saturating_mul(self.runs));
        self.pulses = self.pulses.saturating_add(rng.u32(1..40));
        self.powerups = self.powerups.saturating_add(rng.u32(0..6));
        self.best_survival = self.best_survival.max(rng.u32(5..40) + self.runs * 3);
        if rng.f32() < 0.05 {
            self.specials += 1;
        }
        true
    }

    fn value_for(&self, category: AchievementCategory) -> u32 {
        match category {
            AchievementCategory::Score | AchievementCategory::Total => self.score,
            AchievementCategory::Pulse => self.pulses,
            AchievementCategory::PowerUp => self.powerups,
            AchievementCategory::Survival => self.best_survival,
            AchievementCategory::Special => self.specials,
        }
    }

    /// Achievement snapshot for the current totals.
    pub fn achievements(&self) -> Vec<Achievement> {
        TRACKS
            .iter()
            .flat_map(|&(prefix, category, targets)| {
                let value = self.value_for(category);
                targets.iter().map(move |&target| {
                    let achievement = Achievement::new(format!("{prefix}_{target}"), category, target)
                        .with_name(format!("{prefix} {target}"))
                        .with_progress(value.min(target));
                    if value >= target {
                        achievement.unlocked()
                    } else {
                        achievement
                    }
                })
            })
            .collect()
    }

    /// Statistics snapshot for the current totals.
    pub fn statistics(&self) -> Statistics {
        Statistics::from([
            ("score".to_string(), i64::from(self.score)),
            ("pulses".to_string(), i64::from(self.pulses)),
            ("powerups".to_string(), i64::from(self.powerups)),
            ("best_survival".to_string(), i64::from(self.best_survival)),
            ("runs".to_string(), i64::from(self.runs)),
        ])
    }

    /// Host signals with the odd memory warning.
    pub fn signals(rng: &mut fastrand::Rng) -> HostSignals {
        HostSignals {
            memory_pressure: rng.f32() < 0.001,
            monitor_score: rng.f32().mul_add(0.2, 0.8),
        }
    }
}
