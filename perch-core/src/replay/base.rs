//! Ring-buffer storage with uniform sampling.
use super::ExperienceBufferConfig;
use crate::base::Transition;
use rand::{rngs::StdRng, RngCore, SeedableRng};

/// Fixed-capacity store of past transitions.
///
/// Insertion evicts the oldest entry once the buffer is at capacity (strict
/// FIFO). Sampling draws a batch of distinct indices uniformly at random;
/// there is no recency weighting.
pub struct ExperienceBuffer {
    /// Maximum number of transitions that can be stored.
    capacity: usize,

    /// Current insertion index.
    i: usize,

    /// Current number of stored transitions.
    size: usize,

    /// Storage, indexed physically; logical order is derived from `i`.
    transitions: Vec<Option<Transition>>,

    /// Random number generator for sampling.
    rng: StdRng,
}

impl ExperienceBuffer {
    /// Creates an empty buffer with the given configuration.
    pub fn build(config: &ExperienceBufferConfig) -> Self {
        Self {
            capacity: config.capacity,
            i: 0,
            size: 0,
            transitions: vec![None; config.capacity],
            rng: StdRng::seed_from_u64(config.seed),
        }
    }

    /// Returns the current number of transitions in the buffer.
    pub fn len(&self) -> usize {
        self.size
    }

    /// Returns `true` if the buffer holds no transitions.
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Adds a transition, evicting the oldest one when at capacity.
    pub fn push(&mut self, tr: Transition) {
        self.transitions[self.i] = Some(tr);
        self.i = (self.i + 1) % self.capacity;
        if self.size < self.capacity {
            self.size += 1;
        }
    }

    /// The k-th oldest stored transition.
    pub fn get(&self, k: usize) -> Option<&Transition> {
        if k >= self.size {
            return None;
        }
        let ix = if self.size == self.capacity {
            (self.i + k) % self.capacity
        } else {
            k
        };
        self.transitions[ix].as_ref()
    }

    /// Samples `min(len, batch_size)` transitions without replacement.
    ///
    /// Indices are drawn uniformly at random, rejecting duplicates within
    /// the batch. Returns `None` when the buffer is empty; callers treat
    /// this as "skip training this call".
    pub fn sample(&mut self, batch_size: usize) -> Option<Vec<Transition>> {
        if self.size == 0 {
            return None;
        }

        let n = batch_size.min(self.size);
        let mut ixs: Vec<usize> = Vec::with_capacity(n);
        while ixs.len() < n {
            let ix = (self.rng.next_u32() as usize) % self.size;
            if !ixs.contains(&ix) {
                ixs.push(ix);
            }
        }

        Some(
            ixs.iter()
                .map(|&ix| self.transitions[ix].clone().unwrap())
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::Push;

    fn transition(tag: f32) -> Transition {
        Transition {
            obs: [tag, 0.0, 0.0, 0.0],
            act: Push::Left,
            reward: tag,
            next_obs: [tag, 0.0, 0.0, 0.0],
            is_done: false,
        }
    }

    fn buffer(capacity: usize) -> ExperienceBuffer {
        ExperienceBuffer::build(&ExperienceBufferConfig::default().capacity(capacity).seed(1))
    }

    #[test]
    fn empty_buffer_returns_none() {
        let mut buf = buffer(8);
        assert!(buf.sample(4).is_none());
    }

    #[test]
    fn fifo_eviction_keeps_newest_in_order() {
        let capacity = 16;
        let extra = 5;
        let mut buf = buffer(capacity);
        for k in 0..capacity + extra {
            buf.push(transition(k as f32));
        }

        assert_eq!(buf.len(), capacity);
        for k in 0..capacity {
            let tr = buf.get(k).unwrap();
            assert_eq!(tr.reward, (extra + k) as f32);
        }
        assert!(buf.get(capacity).is_none());
    }

    #[test]
    fn sample_has_no_duplicates_and_caps_at_len() {
        let mut buf = buffer(64);
        for k in 0..10 {
            buf.push(transition(k as f32));
        }

        let batch = buf.sample(32).unwrap();
        assert_eq!(batch.len(), 10);

        let mut rewards: Vec<f32> = batch.iter().map(|tr| tr.reward).collect();
        rewards.sort_by(|a, b| a.partial_cmp(b).unwrap());
        rewards.dedup();
        assert_eq!(rewards.len(), 10);
    }

    #[test]
    fn length_never_exceeds_capacity() {
        let mut buf = buffer(4);
        for k in 0..100 {
            buf.push(transition(k as f32));
            assert!(buf.len() <= 4);
        }
    }
}
