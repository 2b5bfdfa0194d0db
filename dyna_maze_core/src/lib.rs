use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

pub mod agent;
pub mod bonus;
pub mod config;
pub mod driver;
pub mod episode;
pub mod error;
pub mod grid;
pub mod maze;
pub mod model;
pub mod policy;
pub mod q_table;

pub use agent::{Agent, DynaAgent, DynaQAgent, DynaQPlusAgent, StepOutcome};
pub use config::AgentConfig;
pub use episode::Episode;
pub use error::{Error, Result};
pub use maze::{Cell, Maze};

/// Scalar reward returned by a transition.
pub type Reward = f64;

/// Number of real environment steps taken since an episode started.
pub type Timestep = u64;

/// A grid coordinate. Rows grow downward, both axes are 0-indexed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position {
    pub row: usize,
    pub column: usize,
}

impl Position {
    pub const fn new(row: usize, column: usize) -> Self {
        Position { row, column }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.column)
    }
}

/// A move of one cell in a cardinal direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Up,
    Right,
    Down,
    Left,
}

impl Action {
    /// Every action, in the order tables and tie-breaks enumerate them.
    pub const ALL: [Action; 4] = [Action::Up, Action::Right, Action::Down, Action::Left];

    /// Row and column offsets of this move.
    pub fn delta(self) -> (isize, isize) {
        match self {
            Action::Up => (-1, 0),
            Action::Right => (0, 1),
            Action::Down => (1, 0),
            Action::Left => (0, -1),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Action::Up => "up",
            Action::Right => "right",
            Action::Down => "down",
            Action::Left => "left",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Action {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Action::ALL
            .into_iter()
            .find(|action| action.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::InvalidAction {
                value: s.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn actions_enumerate_in_stable_order() {
        assert_eq!(
            Action::ALL,
            [Action::Up, Action::Right, Action::Down, Action::Left]
        );
    }

    #[test]
    fn parse_known_action_names() {
        assert_eq!("up".parse::<Action>().unwrap(), Action::Up);
        assert_eq!("Right".parse::<Action>().unwrap(), Action::Right);
        assert_eq!(" down ".parse::<Action>().unwrap(), Action::Down);
        assert_eq!("left".parse::<Action>().unwrap(), Action::Left);
    }

    #[test]
    fn parse_unknown_action_fails() {
        let err = "jump".parse::<Action>().unwrap_err();
        assert_eq!(
            err,
            Error::InvalidAction {
                value: "jump".to_string()
            }
        );
    }

    #[test]
    fn action_names_round_trip_through_display() {
        for action in Action::ALL {
            assert_eq!(action.to_string().parse::<Action>().unwrap(), action);
        }
    }
}
