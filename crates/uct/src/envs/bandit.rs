//! One-step bandit with a reward and a penalty per arm.

use cmdp_core::{Environment, Outcome};

/// A single-decision environment: pull one arm, observe its fixed reward
/// and penalty, and the episode ends.
///
/// The classic constrained instance is [`RiskyBandit::two_armed`]: a safe
/// arm (reward 1, penalty 0) against a risky arm (reward 3, penalty 1).
#[derive(Clone, Debug)]
pub struct RiskyBandit {
    arms: Vec<(f32, f32)>,
    done: bool,
    checkpoint: bool,
}

impl RiskyBandit {
    /// A bandit with the given `(reward, penalty)` arms.
    pub fn new(arms: Vec<(f32, f32)>) -> Self {
        Self {
            arms,
            done: false,
            checkpoint: false,
        }
    }

    /// The safe-versus-risky two-armed instance.
    pub fn two_armed() -> Self {
        Self::new(vec![(1.0, 0.0), (3.0, 1.0)])
    }
}

impl Environment for RiskyBandit {
    type State = u8;
    type Action = usize;

    fn name(&self) -> &str {
        "risky_bandit"
    }

    fn num_actions(&self) -> usize {
        self.arms.len()
    }

    fn possible_actions(&self) -> Vec<usize> {
        (0..self.arms.len()).collect()
    }

    fn get_action(&self, i: usize) -> usize {
        i
    }

    fn current_state(&self) -> u8 {
        u8::from(self.done)
    }

    fn is_over(&self) -> bool {
        self.done
    }

    fn play_action(&mut self, action: usize) -> Outcome<u8> {
        let (reward, penalty) = self.arms[action];
        self.done = true;
        Outcome {
            state: 1,
            reward,
            penalty,
            done: true,
        }
    }

    fn make_checkpoint(&mut self) {
        self.checkpoint = self.done;
    }

    fn restore_checkpoint(&mut self) {
        self.done = self.checkpoint;
    }

    fn reset(&mut self) {
        self.done = false;
        self.checkpoint = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pull_ends_episode() {
        let mut bandit = RiskyBandit::two_armed();
        assert!(!bandit.is_over());

        let outcome = bandit.play_action(1);
        assert!((outcome.reward - 3.0).abs() < 1e-6);
        assert!((outcome.penalty - 1.0).abs() < 1e-6);
        assert!(outcome.done);
        assert!(bandit.is_over());
    }

    #[test]
    fn test_checkpoint_round_trip() {
        let mut bandit = RiskyBandit::two_armed();
        bandit.make_checkpoint();
        bandit.play_action(0);
        bandit.restore_checkpoint();
        assert!(!bandit.is_over());
    }
}
