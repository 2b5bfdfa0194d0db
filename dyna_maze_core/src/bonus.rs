//! Reward bonuses applied to simulated transitions during planning

use std::collections::HashMap;

use crate::{Action, Error, Position, Result, Reward, Timestep};

/// Strategy injected into the planning loop.
///
/// The agent reports every real choice through [`PlanningBonus::record_choice`]
/// and adds [`PlanningBonus::bonus`] to each sampled reward before updating.
pub trait PlanningBonus {
    fn record_choice(&mut self, position: Position, action: Action, timestep: Timestep)
        -> Result<()>;

    fn bonus(&self, position: Position, action: Action, timestep: Timestep) -> Result<Reward>;
}

/// Plain Dyna-Q planning: sampled rewards are used as-is.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoBonus;

impl PlanningBonus for NoBonus {
    fn record_choice(
        &mut self,
        _position: Position,
        _action: Action,
        _timestep: Timestep,
    ) -> Result<()> {
        Ok(())
    }

    fn bonus(&self, _position: Position, _action: Action, _timestep: Timestep) -> Result<Reward> {
        Ok(0.0)
    }
}

/// Dyna-Q+ exploration bonus `κ·sqrt(t - last_chosen)`.
///
/// Every pair starts as if it was last chosen one step before the episode
/// began, so untried pairs accrue the largest bonus.
#[derive(Debug, Clone)]
pub struct RecencyBonus {
    kappa: f64,
    last_chosen: HashMap<(Position, Action), i64>,
}

impl RecencyBonus {
    /// Fails with [`Error::TimestepOverflow`] if `start` exceeds `i64::MAX`.
    pub fn new(
        positions: &[Position],
        actions: &[Action],
        kappa: f64,
        start: Timestep,
    ) -> Result<Self> {
        let never = signed(start)? - 1;
        let last_chosen = positions
            .iter()
            .flat_map(|&position| actions.iter().map(move |&action| ((position, action), never)))
            .collect();
        Ok(Self { kappa, last_chosen })
    }

    /// Timestep at which the real policy last picked the pair.
    pub fn last_chosen(&self, position: Position, action: Action) -> Result<i64> {
        self.last_chosen
            .get(&(position, action))
            .copied()
            .ok_or(Error::UnregisteredPair { position, action })
    }
}

impl PlanningBonus for RecencyBonus {
    fn record_choice(
        &mut self,
        position: Position,
        action: Action,
        timestep: Timestep,
    ) -> Result<()> {
        self.last_chosen.insert((position, action), signed(timestep)?);
        Ok(())
    }

    fn bonus(&self, position: Position, action: Action, timestep: Timestep) -> Result<Reward> {
        let elapsed = signed(timestep)? - self.last_chosen(position, action)?;
        Ok(self.kappa * (elapsed as f64).sqrt())
    }
}

fn signed(timestep: Timestep) -> Result<i64> {
    i64::try_from(timestep).map_err(|_| Error::TimestepOverflow { timestep })
}
