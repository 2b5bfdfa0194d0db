//! Action-value table for one-step Q-learning

use std::collections::HashMap;

use crate::{Action, Error, Position, Result, Reward};

/// Q-table mapping every (position, action) pair to a value estimate.
///
/// All pairs are registered, at 0.0, when the table is built; the table
/// never grows or shrinks afterwards.
#[derive(Debug, Clone)]
pub struct QTable {
    values: HashMap<(Position, Action), f64>,
    actions: Vec<Action>,
    /// Learning rate α
    learning_rate: f64,
    /// Discount factor γ
    discount_factor: f64,
}

impl QTable {
    pub fn new(
        positions: &[Position],
        actions: &[Action],
        learning_rate: f64,
        discount_factor: f64,
    ) -> Self {
        let values = positions
            .iter()
            .flat_map(|&position| actions.iter().map(move |&action| ((position, action), 0.0)))
            .collect();
        Self {
            values,
            actions: actions.to_vec(),
            learning_rate,
            discount_factor,
        }
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    /// Get Q-value for a state-action pair
    pub fn value(&self, position: Position, action: Action) -> Result<f64> {
        self.values
            .get(&(position, action))
            .copied()
            .ok_or(Error::UnregisteredPair { position, action })
    }

    /// Maximum value over all actions at `position`.
    pub fn max_value(&self, position: Position) -> Result<f64> {
        self.actions.iter().try_fold(f64::NEG_INFINITY, |best, &action| {
            Ok(best.max(self.value(position, action)?))
        })
    }

    /// Q-learning update: off-policy TD control
    ///
    /// Q(s,a) ← Q(s,a) + α[r + γ max_a' Q(s',a') - Q(s,a)]
    ///
    /// Returns the change applied to Q(s,a), which is exactly α times the
    /// TD error.
    pub fn update(
        &mut self,
        position: Position,
        action: Action,
        reward: Reward,
        next_position: Position,
    ) -> Result<f64> {
        let current_q = self.value(position, action)?;
        let td_target = reward + self.discount_factor * self.max_value(next_position)?;
        let delta = self.learning_rate * (td_target - current_q);
        self.values.insert((position, action), current_q + delta);
        Ok(delta)
    }

    /// All actions whose value equals the maximum at `position`, in
    /// enumeration order. Equality is exact.
    pub fn max_actions(&self, position: Position) -> Result<Vec<Action>> {
        let best = self.max_value(position)?;
        let mut greedy = Vec::with_capacity(self.actions.len());
        for &action in &self.actions {
            if self.value(position, action)? == best {
                greedy.push(action);
            }
        }
        Ok(greedy)
    }

    /// Get total number of Q-values stored
    pub fn size(&self) -> usize {
        self.values.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_eq::*;

    const ALPHA: f64 = 0.1;
    const GAMMA: f64 = 0.95;

    fn positions() -> Vec<Position> {
        vec![Position::new(0, 0), Position::new(0, 1), Position::new(0, 2)]
    }

    fn table() -> QTable {
        QTable::new(&positions(), &Action::ALL, ALPHA, GAMMA)
    }

    #[test]
    fn every_pair_starts_at_zero() {
        let q = table();
        assert_eq!(q.size(), 12);
        for position in positions() {
            for action in Action::ALL {
                assert_eq!(q.value(position, action).unwrap(), 0.0);
            }
        }
    }

    #[test]
    fn fresh_table_reports_every_action_as_greedy() {
        let q = table();
        for position in positions() {
            assert_eq!(q.max_actions(position).unwrap(), Action::ALL.to_vec());
        }
    }

    #[test]
    fn unregistered_pairs_are_errors() {
        let q = table();
        let stray = Position::new(5, 5);
        assert_eq!(
            q.value(stray, Action::Up),
            Err(Error::UnregisteredPair {
                position: stray,
                action: Action::Up
            })
        );
        assert!(q.max_actions(stray).is_err());
    }

    #[test]
    fn update_applies_the_q_learning_rule() {
        let mut q = table();
        let (s, s2) = (Position::new(0, 0), Position::new(0, 1));
        q.update(s2, Action::Right, 1.0, Position::new(0, 2)).unwrap();
        assert_float_eq!(q.value(s2, Action::Right).unwrap(), 0.1, abs <= 1e-12);

        let delta = q.update(s, Action::Right, 0.0, s2).unwrap();
        // 0 + 0.1 * (0 + 0.95 * 0.1 - 0)
        assert_float_eq!(delta, 0.0095, abs <= 1e-12);
        assert_float_eq!(q.value(s, Action::Right).unwrap(), 0.0095, abs <= 1e-12);
    }

    #[test]
    fn update_delta_is_alpha_times_td_error() {
        let mut q = table();
        let (s, s2) = (Position::new(0, 1), Position::new(0, 2));
        q.update(s2, Action::Left, 2.0, s).unwrap();
        q.update(s, Action::Up, 0.5, s).unwrap();

        let old = q.value(s, Action::Down).unwrap();
        let target = 0.25 + GAMMA * q.max_value(s2).unwrap();
        let delta = q.update(s, Action::Down, 0.25, s2).unwrap();
        assert_eq!(delta, ALPHA * (target - old));
        assert_eq!(q.value(s, Action::Down).unwrap(), old + delta);
    }

    #[test]
    fn update_moves_toward_the_target() {
        let mut q = table();
        let (s, s2) = (Position::new(0, 0), Position::new(0, 1));
        for reward in [1.0, -3.0, 0.5, 0.0, 4.0] {
            let old = q.value(s, Action::Left).unwrap();
            let target = reward + GAMMA * q.max_value(s2).unwrap();
            q.update(s, Action::Left, reward, s2).unwrap();
            let new = q.value(s, Action::Left).unwrap();
            assert!((new - target).abs() <= (old - target).abs());
        }
    }

    #[test]
    fn zero_learning_rate_leaves_the_table_unchanged() {
        let mut q = QTable::new(&positions(), &Action::ALL, 0.0, GAMMA);
        let s = Position::new(0, 0);
        for _ in 0..3 {
            assert_eq!(q.update(s, Action::Right, 1.0, s).unwrap(), 0.0);
        }
        assert_eq!(q.value(s, Action::Right).unwrap(), 0.0);
    }

    #[test]
    fn self_loop_bootstraps_from_pre_update_values() {
        let mut q = table();
        let s = Position::new(0, 0);
        q.update(s, Action::Up, 1.0, s).unwrap();
        assert_float_eq!(q.value(s, Action::Up).unwrap(), 0.1, abs <= 1e-12);
        q.update(s, Action::Up, 1.0, s).unwrap();
        // 0.1 + 0.1 * (1 + 0.95 * 0.1 - 0.1)
        assert_float_eq!(q.value(s, Action::Up).unwrap(), 0.1995, abs <= 1e-12);
    }

    #[test]
    fn max_actions_reports_ties_and_unique_maxima() {
        let mut q = table();
        let (s, s2) = (Position::new(0, 1), Position::new(0, 2));
        q.update(s, Action::Up, 1.0, s2).unwrap();
        q.update(s, Action::Left, 1.0, s2).unwrap();
        assert_eq!(q.max_actions(s).unwrap(), vec![Action::Up, Action::Left]);

        q.update(s, Action::Left, 1.0, s2).unwrap();
        assert_eq!(q.max_actions(s).unwrap(), vec![Action::Left]);
    }
}
