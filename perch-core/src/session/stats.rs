//! Episode reward telemetry.
use std::collections::VecDeque;

/// Per-episode reward telemetry surfaced to reporting collaborators.
#[derive(Debug)]
pub struct EpisodeStats {
    episodes: usize,
    last_reward: f32,
    high_score: f32,
    history: VecDeque<(usize, f32)>,
    capacity: usize,
}

impl EpisodeStats {
    /// Creates empty telemetry with a bounded rolling history.
    pub fn new(capacity: usize) -> Self {
        Self {
            episodes: 0,
            last_reward: 0.0,
            high_score: f32::MIN,
            history: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Records the total reward of a finished episode.
    pub fn record_episode(&mut self, reward: f32) {
        self.episodes += 1;
        self.last_reward = reward;
        if reward > self.high_score {
            self.high_score = reward;
        }
        if self.history.len() == self.capacity {
            self.history.pop_front();
        }
        self.history.push_back((self.episodes, reward));
    }

    /// Number of completed episodes.
    pub fn episodes(&self) -> usize {
        self.episodes
    }

    /// Total reward of the most recent episode.
    pub fn last_reward(&self) -> f32 {
        self.last_reward
    }

    /// Best episode reward seen so far, if any episode completed.
    pub fn high_score(&self) -> Option<f32> {
        (self.episodes > 0).then(|| self.high_score)
    }

    /// Rolling `(episode, reward)` history, oldest first.
    pub fn history(&self) -> &VecDeque<(usize, f32)> {
        &self.history
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_is_bounded_and_high_score_sticks() {
        let mut stats = EpisodeStats::new(3);
        for r in [1.0, 5.0, 2.0, 3.0] {
            stats.record_episode(r);
        }

        assert_eq!(stats.episodes(), 4);
        assert_eq!(stats.last_reward(), 3.0);
        assert_eq!(stats.high_score(), Some(5.0));
        assert_eq!(
            stats.history().iter().copied().collect::<Vec<_>>(),
            vec![(2, 5.0), (3, 2.0), (4, 3.0)]
        );
    }

    #[test]
    fn no_high_score_before_first_episode() {
        let stats = EpisodeStats::new(3);
        assert_eq!(stats.high_score(), None);
    }
}
