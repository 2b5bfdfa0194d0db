//! Learned environment models used for background planning
//!
//! A model remembers only the most recent outcome of each (position, action)
//! pair. Visited positions and the actions observed at each are kept in
//! first-seen order so that sampling is reproducible from a seed.

use std::collections::HashMap;

use rand::{Rng, seq::IndexedRandom};

use crate::{Action, Error, Position, Result, Reward};

/// One real or simulated transition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transition {
    pub position: Position,
    pub action: Action,
    pub reward: Reward,
    pub next_position: Position,
}

/// Capability shared by the planning models: remember real transitions and
/// replay them.
pub trait TransitionModel {
    /// Records the latest outcome of `transition`, replacing any earlier one.
    fn observe(&mut self, transition: Transition);

    /// Draws a transition to plan with.
    ///
    /// Fails with [`Error::EmptyModel`] before the first observation.
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Transition>;
}

#[derive(Debug, Clone, Default)]
struct Observations {
    outcomes: HashMap<(Position, Action), (Reward, Position)>,
    visited: Vec<Position>,
    actions_at: HashMap<Position, Vec<Action>>,
}

impl Observations {
    fn record(&mut self, transition: Transition) {
        let Transition {
            position,
            action,
            reward,
            next_position,
        } = transition;

        if self
            .outcomes
            .insert((position, action), (reward, next_position))
            .is_none()
        {
            if !self.actions_at.contains_key(&position) {
                self.visited.push(position);
            }
            self.actions_at.entry(position).or_default().push(action);
        }
    }

    fn sample_position<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Position> {
        self.visited.choose(rng).copied().ok_or(Error::EmptyModel)
    }

    fn outcome(&self, position: Position, action: Action) -> Option<(Reward, Position)> {
        self.outcomes.get(&(position, action)).copied()
    }

    fn actions_at(&self, position: Position) -> &[Action] {
        self.actions_at
            .get(&position)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Dyna-Q model: replays only pairs that were actually observed.
#[derive(Debug, Clone, Default)]
pub struct LastOutcomeModel {
    observations: Observations,
}

impl LastOutcomeModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Positions with at least one observation, in first-visit order.
    pub fn visited_positions(&self) -> &[Position] {
        &self.observations.visited
    }

    /// Actions observed at `position`, in first-observation order.
    pub fn observed_actions(&self, position: Position) -> &[Action] {
        self.observations.actions_at(position)
    }
}

impl TransitionModel for LastOutcomeModel {
    fn observe(&mut self, transition: Transition) {
        self.observations.record(transition);
    }

    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Transition> {
        let position = self.observations.sample_position(rng)?;
        let action = *self
            .observations
            .actions_at(position)
            .choose(rng)
            .ok_or(Error::EmptyModel)?;
        let (reward, next_position) = self
            .observations
            .outcome(position, action)
            .ok_or(Error::UnregisteredPair { position, action })?;
        Ok(Transition {
            position,
            action,
            reward,
            next_position,
        })
    }
}

/// Dyna-Q+ model: at a visited position any action may be replayed.
///
/// An action never tried at that position comes back as a zero-reward
/// self-loop.
#[derive(Debug, Clone)]
pub struct ExploratoryModel {
    observations: Observations,
    actions: Vec<Action>,
}

impl ExploratoryModel {
    pub fn new(actions: &[Action]) -> Self {
        Self {
            observations: Observations::default(),
            actions: actions.to_vec(),
        }
    }

    pub fn visited_positions(&self) -> &[Position] {
        &self.observations.visited
    }

    pub fn observed_actions(&self, position: Position) -> &[Action] {
        self.observations.actions_at(position)
    }
}

impl TransitionModel for ExploratoryModel {
    fn observe(&mut self, transition: Transition) {
        self.observations.record(transition);
    }

    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Transition> {
        let position = self.observations.sample_position(rng)?;
        let action = *self
            .actions
            .choose(rng)
            .ok_or_else(|| Error::configuration("model has no actions to sample"))?;
        let (reward, next_position) = self
            .observations
            .outcome(position, action)
            .unwrap_or((0.0, position));
        Ok(Transition {
            position,
            action,
            reward,
            next_position,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{SeedableRng, rngs::StdRng};

    fn transition(position: Position, action: Action, reward: Reward, next: Position) -> Transition {
        Transition {
            position,
            action,
            reward,
            next_position: next,
        }
    }

    #[test]
    fn empty_models_refuse_to_sample() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(
            LastOutcomeModel::new().sample(&mut rng),
            Err(Error::EmptyModel)
        );
        assert_eq!(
            ExploratoryModel::new(&Action::ALL).sample(&mut rng),
            Err(Error::EmptyModel)
        );
    }

    #[test]
    fn base_model_replays_only_observed_pairs() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut model = LastOutcomeModel::new();
        let a = Position::new(0, 0);
        let b = Position::new(0, 1);
        model.observe(transition(a, Action::Right, 0.0, b));
        model.observe(transition(b, Action::Left, 0.0, a));
        model.observe(transition(b, Action::Right, 1.0, a));

        for _ in 0..500 {
            let sampled = model.sample(&mut rng).unwrap();
            assert!(sampled.position == a || sampled.position == b);
            assert!(model.observed_actions(sampled.position).contains(&sampled.action));
            if sampled.position == a {
                assert_eq!(sampled, transition(a, Action::Right, 0.0, b));
            }
        }
    }

    #[test]
    fn base_model_samples_every_observed_pair() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut model = LastOutcomeModel::new();
        let a = Position::new(1, 1);
        for action in [Action::Up, Action::Down] {
            model.observe(transition(a, action, 0.0, a));
        }
        let mut seen = Vec::new();
        for _ in 0..200 {
            let action = model.sample(&mut rng).unwrap().action;
            if !seen.contains(&action) {
                seen.push(action);
            }
        }
        seen.sort();
        assert_eq!(seen, vec![Action::Up, Action::Down]);
    }

    #[test]
    fn repeated_observations_overwrite() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut model = LastOutcomeModel::new();
        let a = Position::new(0, 0);
        model.observe(transition(a, Action::Up, 1.0, Position::new(2, 2)));
        model.observe(transition(a, Action::Up, 0.0, a));

        assert_eq!(model.visited_positions(), &[a]);
        assert_eq!(model.observed_actions(a), &[Action::Up]);
        assert_eq!(
            model.sample(&mut rng).unwrap(),
            transition(a, Action::Up, 0.0, a)
        );
    }

    #[test]
    fn visits_are_kept_in_first_seen_order() {
        let mut model = LastOutcomeModel::new();
        let (a, b) = (Position::new(3, 0), Position::new(0, 3));
        model.observe(transition(a, Action::Left, 0.0, a));
        model.observe(transition(b, Action::Up, 0.0, b));
        model.observe(transition(a, Action::Down, 0.0, a));
        assert_eq!(model.visited_positions(), &[a, b]);
        assert_eq!(model.observed_actions(a), &[Action::Left, Action::Down]);
    }

    #[test]
    fn exploratory_model_synthesizes_self_loops_for_untried_actions() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut model = ExploratoryModel::new(&Action::ALL);
        let a = Position::new(2, 2);
        let observed = transition(a, Action::Right, 1.0, Position::new(0, 0));
        model.observe(observed);

        let mut untried = 0;
        for _ in 0..400 {
            let sampled = model.sample(&mut rng).unwrap();
            assert_eq!(sampled.position, a);
            if sampled.action == Action::Right {
                assert_eq!(sampled, observed);
            } else {
                untried += 1;
                assert_eq!(sampled.reward, 0.0);
                assert_eq!(sampled.next_position, a);
            }
        }
        assert!(untried > 0);
    }

    #[test]
    fn exploratory_model_stays_on_visited_positions() {
        let mut rng = StdRng::seed_from_u64(9);
        let mut model = ExploratoryModel::new(&Action::ALL);
        let (a, b) = (Position::new(0, 0), Position::new(0, 1));
        model.observe(transition(a, Action::Right, 0.0, b));
        for _ in 0..200 {
            assert_eq!(model.sample(&mut rng).unwrap().position, a);
        }
        assert_eq!(model.visited_positions(), &[a]);
        assert!(model.observed_actions(b).is_empty());
    }

    #[test]
    fn same_seed_gives_same_samples() {
        let mut model = LastOutcomeModel::new();
        for (i, action) in Action::ALL.into_iter().enumerate() {
            let p = Position::new(i, 0);
            model.observe(transition(p, action, i as f64, p));
        }
        let draw = |seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            (0..20)
                .map(|_| model.sample(&mut rng).unwrap())
                .collect::<Vec<_>>()
        };
        assert_eq!(draw(42), draw(42));
    }
}
