//! Epsilon-greedy action selection over a [`QTable`]

use rand::{Rng, seq::IndexedRandom};

use crate::{Action, Error, Position, Result, q_table::QTable};

/// ε-greedy action selection
///
/// With probability `epsilon` picks uniformly among all actions, otherwise
/// calls [`greedy_action`].
pub fn epsilon_greedy<R: Rng + ?Sized>(
    q_table: &QTable,
    position: Position,
    epsilon: f64,
    rng: &mut R,
) -> Result<Action> {
    if rng.random::<f64>() < epsilon {
        return q_table
            .actions()
            .choose(rng)
            .copied()
            .ok_or_else(|| Error::configuration("no actions to choose from"));
    }
    greedy_action(q_table, position, rng)
}

/// Picks the highest-valued action at `position`.
///
/// Every candidate draws a fresh uniform number and ties on value are broken
/// by the larger draw, so each tied action is equally likely.
pub fn greedy_action<R: Rng + ?Sized>(
    q_table: &QTable,
    position: Position,
    rng: &mut R,
) -> Result<Action> {
    let mut best: Option<(Action, f64, f64)> = None;
    for &action in q_table.actions() {
        let value = q_table.value(position, action)?;
        let draw: f64 = rng.random();
        let better = match best {
            None => true,
            Some((_, best_value, best_draw)) => {
                value > best_value || (value == best_value && draw > best_draw)
            }
        };
        if better {
            best = Some((action, value, draw));
        }
    }
    best.map(|(action, _, _)| action)
        .ok_or_else(|| Error::configuration("no actions to choose from"))
}
