//! Generalized advantage estimation.

/// Computes per-step advantages and value targets over one episode.
///
/// Advantages follow a single backward recursion over the temporal
/// difference errors:
///
/// ```text
/// delta_t = r_t + gamma * V(o_{t+1}) * not_done_t - V(o_t)
/// A_t     = delta_t + gamma * lambda * not_done_t * A_{t+1}
/// ```
///
/// The bootstrap and the carry-over are both masked on terminal steps, so
/// no value leaks across an episode boundary. Value targets are
/// `A_t + V(o_t)`.
pub fn gae(
    rewards: &[f32],
    values: &[f32],
    next_values: &[f32],
    dones: &[bool],
    gamma: f32,
    lambda: f32,
) -> (Vec<f32>, Vec<f32>) {
    let n = rewards.len();
    let mut advantages = vec![0f32; n];
    let mut acc = 0f32;

    for t in (0..n).rev() {
        let not_done = if dones[t] { 0.0 } else { 1.0 };
        let delta = rewards[t] + gamma * next_values[t] * not_done - values[t];
        acc = delta + gamma * lambda * not_done * acc;
        advantages[t] = acc;
    }

    let returns = advantages
        .iter()
        .zip(values.iter())
        .map(|(a, v)| a + v)
        .collect();

    (advantages, returns)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn undiscounted_gae_telescopes_to_reward_sums() {
        // With gamma = lambda = 1 and a zero value function, the advantage
        // at t is the total remaining reward.
        let rewards = [1.0, 2.0, 3.0];
        let zeros = [0.0, 0.0, 0.0];
        let dones = [false, false, true];

        let (adv, ret) = gae(&rewards, &zeros, &zeros, &dones, 1.0, 1.0);
        assert_eq!(adv, vec![6.0, 5.0, 3.0]);
        assert_eq!(ret, adv);
    }

    #[test]
    fn terminal_steps_cut_the_recursion() {
        let rewards = [1.0, 1.0];
        let values = [0.5, 0.5];
        let next_values = [9.0, 9.0];
        let dones = [true, true];

        // delta = r - v on terminal steps, with nothing carried over.
        let (adv, _) = gae(&rewards, &values, &next_values, &dones, 0.99, 0.95);
        assert_eq!(adv, vec![0.5, 0.5]);
    }

    #[test]
    fn matches_hand_computed_two_step_case() {
        let gamma = 0.9;
        let lambda = 0.5;
        let rewards = [1.0, 2.0];
        let values = [0.1, 0.2];
        let next_values = [0.2, 0.0];
        let dones = [false, true];

        let delta1 = 2.0 - 0.2;
        let delta0 = 1.0 + gamma * 0.2 - 0.1;
        let (adv, ret) = gae(&rewards, &values, &next_values, &dones, gamma, lambda);

        assert!((adv[1] - delta1).abs() < 1e-6);
        assert!((adv[0] - (delta0 + gamma * lambda * delta1)).abs() < 1e-6);
        assert!((ret[0] - (adv[0] + 0.1)).abs() < 1e-6);
    }
}
