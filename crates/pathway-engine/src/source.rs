//! Interface to the achievement tracking subsystem.

use crossbeam_channel::{unbounded, Receiver, Sender};

use crate::achievement::{Achievement, Statistics};

/// Update pushed by a source that supports subscriptions.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceUpdate {
    /// Full achievement snapshot.
    Achievements(Vec<Achievement>),
    /// Full statistics snapshot.
    Statistics(Statistics),
}

/// Read access to achievement truth data.
///
/// `snapshot` is polled as a safety net; sources that can push should also
/// return a receiver from `subscribe`, which the hub then treats as primary.
pub trait AchievementSource {
    /// Current achievements.
    fn snapshot(&self) -> Vec<Achievement>;

    /// Current statistics.
    fn statistics(&self) -> Statistics {
        Statistics::new()
    }

    /// Push channel, if the source supports one.
    fn subscribe(&mut self) -> Option<Receiver<SourceUpdate>> {
        None
    }
}

impl<S: AchievementSource + ?Sized> AchievementSource for Box<S> {
    fn snapshot(&self) -> Vec<Achievement> {
        (**self).snapshot()
    }

    fn statistics(&self) -> Statistics {
        (**self).statistics()
    }

    fn subscribe(&mut self) -> Option<Receiver<SourceUpdate>> {
        (**self).subscribe()
    }
}

/// In-memory source. Useful for hosts that already hold the data and for tests.
#[derive(Debug, Default)]
pub struct StaticSource {
    achievements: Vec<Achievement>,
    statistics: Statistics,
    subscribers: Vec<Sender<SourceUpdate>>,
}

impl StaticSource {
    /// Creates a source holding the given achievements.
    #[must_use]
    pub fn new(achievements: Vec<Achievement>) -> Self {
        Self {
            achievements,
            ..Self::default()
        }
    }

    /// Replaces the achievements and pushes them to subscribers.
    pub fn set_achievements(&mut self, achievements: Vec<Achievement>) {
        self.achievements = achievements;
        let update = SourceUpdate::Achievements(self.achievements.clone());
        self.subscribers.retain(|s| s.send(update.clone()).is_ok());
    }

    /// Replaces the statistics and pushes them to subscribers.
    pub fn set_statistics(&mut self, statistics: Statistics) {
        self.statistics = statistics;
        let update = SourceUpdate::Statistics(self.statistics.clone());
        self.subscribers.retain(|s| s.send(update.clone()).is_ok());
    }

    /// Mutable access without notifying subscribers; only polling will see it.
    pub fn achievements_mut(&mut self) -> &mut Vec<Achievement> {
        &mut self.achievements
    }
}

impl AchievementSource for StaticSource {
    fn snapshot(&self) -> Vec<Achievement> {
        self.achievements.clone()
    }

    fn statistics(&self) -> Statistics {
        self.statistics.clone()
    }

    fn subscribe(&mut self) -> Option<Receiver<SourceUpdate>> {
        let (sender, receiver) = unbounded();
        self.subscribers.push(sender);
        Some(receiver)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::achievement::AchievementCategory;

    #[test]
    fn test_static_source_pushes_to_subscribers() {
        let mut source = StaticSource::new(Vec::new());
        let receiver = source.subscribe().expect("subscription");
        source.set_achievements(vec![Achievement::new("a", AchievementCategory::Score, 1)]);

        match receiver.try_recv() {
            Ok(SourceUpdate::Achievements(list)) => assert_eq!(list.len(), 1),
            other => panic!("unexpected update: {other:?}"),
        }
    }

    #[test]
    fn test_dropped_subscriber_is_pruned() {
        let mut source = StaticSource::new(Vec::new());
        drop(source.subscribe());
        source.set_statistics(Statistics::from([("games".to_string(), 1)]));
        assert!(source.subscribers.is_empty());
    }
}
