//! Maze geometry and the deterministic transition function
//!
//! A maze is either a single fixed layout or two layouts composed around a
//! change timestep. Composition nests, so a maze can switch layout more than
//! once.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Action, Error, Position, Result, Reward, Timestep, grid::Grid};

/// Reward for stepping onto a goal cell.
pub const GOAL_REWARD: Reward = 1.0;

/// The symbol at one maze cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Cell {
    Free,
    Wall,
    Start,
    Goal,
}

impl Cell {
    /// Parses a single map character: `.` free, `X` wall, `S` start, `G` goal.
    pub fn from_symbol(symbol: char) -> Option<Self> {
        match symbol {
            '.' => Some(Cell::Free),
            'X' => Some(Cell::Wall),
            'S' => Some(Cell::Start),
            'G' => Some(Cell::Goal),
            _ => None,
        }
    }

    pub fn symbol(self) -> char {
        match self {
            Cell::Free => '.',
            Cell::Wall => 'X',
            Cell::Start => 'S',
            Cell::Goal => 'G',
        }
    }
}

/// A single, time-invariant layout.
///
/// Holds exactly one start cell and at least one goal cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixedMaze {
    cells: Grid<Cell>,
}

impl FixedMaze {
    pub fn new(cells: Grid<Cell>) -> Result<Self> {
        let starts = cells.iter().filter(|cell| **cell == Cell::Start).count();
        match starts {
            0 => return Err(Error::configuration("no start cell ('S') found in maze")),
            1 => {}
            n => {
                return Err(Error::configuration(format!(
                    "maze has {} start cells ('S'), expected exactly one",
                    n
                )));
            }
        }
        if !cells.iter().any(|cell| *cell == Cell::Goal) {
            return Err(Error::configuration("no goal cell ('G') found in maze"));
        }
        Ok(FixedMaze { cells })
    }
}

/// Two layouts joined at a change timestep.
///
/// `before` answers for every timestep below `change_timestep`, `after` for
/// the rest. Both sides share the same geometry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComposedMaze {
    before: Box<Maze>,
    after: Box<Maze>,
    change_timestep: Timestep,
}

impl ComposedMaze {
    fn active(&self, timestep: Timestep) -> &Maze {
        if timestep < self.change_timestep {
            &self.before
        } else {
            &self.after
        }
    }
}

/// A maze whose layout may depend on the timestep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Maze {
    Fixed(FixedMaze),
    Composed(ComposedMaze),
}

impl Maze {
    /// Parses a maze from whitespace-separated rows of map characters.
    ///
    /// ```
    /// use dyna_maze_core::{Maze, Position};
    ///
    /// let maze = Maze::parse("S.G").unwrap();
    /// assert_eq!(maze.column_count(), 3);
    /// assert_eq!(maze.start_position(0).unwrap(), Position::new(0, 0));
    /// ```
    pub fn parse(text: &str) -> Result<Self> {
        let rows = text
            .split_whitespace()
            .enumerate()
            .map(|(row, line)| {
                line.chars()
                    .enumerate()
                    .map(|(column, symbol)| {
                        Cell::from_symbol(symbol).ok_or(Error::UnknownCell {
                            symbol,
                            row,
                            column,
                        })
                    })
                    .collect::<Result<Vec<Cell>>>()
            })
            .collect::<Result<Vec<Vec<Cell>>>>()?;

        Ok(Maze::Fixed(FixedMaze::new(Grid::from_rows(rows)?)?))
    }

    /// Joins two mazes so that `after` takes over from `change_timestep` on.
    ///
    /// Fails if the two mazes disagree on their row or column count.
    pub fn composed(before: Maze, after: Maze, change_timestep: Timestep) -> Result<Self> {
        if before.row_count() != after.row_count() || before.column_count() != after.column_count()
        {
            return Err(Error::configuration(format!(
                "composed maze geometry mismatch: {}x{} before, {}x{} after",
                before.row_count(),
                before.column_count(),
                after.row_count(),
                after.column_count()
            )));
        }
        Ok(Maze::Composed(ComposedMaze {
            before: Box::new(before),
            after: Box::new(after),
            change_timestep,
        }))
    }

    pub fn row_count(&self) -> usize {
        match self {
            Maze::Fixed(fixed) => fixed.cells.rows(),
            Maze::Composed(composed) => composed.before.row_count(),
        }
    }

    pub fn column_count(&self) -> usize {
        match self {
            Maze::Fixed(fixed) => fixed.cells.columns(),
            Maze::Composed(composed) => composed.before.column_count(),
        }
    }

    /// Returns the symbol at `position` as of `timestep`.
    pub fn cell(&self, timestep: Timestep, position: Position) -> Result<Cell> {
        match self {
            Maze::Fixed(fixed) => fixed.cells.get(position).copied(),
            Maze::Composed(composed) => composed.active(timestep).cell(timestep, position),
        }
    }

    /// Every position of the maze in row-major order.
    pub fn positions(&self) -> impl Iterator<Item = Position> + use<> {
        let columns = self.column_count();
        (0..self.row_count())
            .flat_map(move |row| (0..columns).map(move |column| Position { row, column }))
    }

    /// The actions available everywhere, in a stable order.
    pub fn actions(&self) -> [Action; 4] {
        Action::ALL
    }

    /// Returns the first start cell, in row-major order, at `timestep`.
    pub fn start_position(&self, timestep: Timestep) -> Result<Position> {
        for position in self.positions() {
            if self.cell(timestep, position)? == Cell::Start {
                return Ok(position);
            }
        }
        Err(Error::configuration(format!(
            "no start cell ('S') found at timestep {}",
            timestep
        )))
    }

    /// Whether the active layout changes exactly at `timestep`.
    pub fn changes_at(&self, timestep: Timestep) -> bool {
        match self {
            Maze::Fixed(_) => false,
            Maze::Composed(composed) => {
                composed.change_timestep == timestep || composed.active(timestep).changes_at(timestep)
            }
        }
    }

    /// Applies `action` from `position` at `timestep`.
    ///
    /// Moves are clamped at the boundary. Entering a wall leaves the position
    /// unchanged. Entering a goal pays [`GOAL_REWARD`] and resets to the start.
    pub fn attempt_move(
        &self,
        timestep: Timestep,
        position: Position,
        action: Action,
    ) -> Result<(Reward, Position)> {
        let (row_delta, column_delta) = action.delta();
        let candidate = Position {
            row: clamp_axis(position.row, row_delta, self.row_count()),
            column: clamp_axis(position.column, column_delta, self.column_count()),
        };

        match self.cell(timestep, candidate)? {
            Cell::Wall => Ok((0.0, position)),
            Cell::Goal => Ok((GOAL_REWARD, self.start_position(timestep)?)),
            Cell::Free | Cell::Start => Ok((0.0, candidate)),
        }
    }

    /// Renders the layout active at `timestep` in map characters.
    pub fn render(&self, timestep: Timestep) -> Result<String> {
        let mut out = String::with_capacity(self.row_count() * (self.column_count() + 1));
        for row in 0..self.row_count() {
            for column in 0..self.column_count() {
                out.push(self.cell(timestep, Position { row, column })?.symbol());
            }
            out.push('\n');
        }
        Ok(out)
    }
}

impl fmt::Display for Maze {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let layout = self.render(0).map_err(|_| fmt::Error)?;
        f.write_str(&layout)
    }
}

fn clamp_axis(value: usize, delta: isize, len: usize) -> usize {
    match value.checked_add_signed(delta) {
        Some(moved) if moved < len => moved,
        _ => value,
    }
}

/// Built-in layouts for the classic Dyna experiments.
pub mod presets {
    use super::Maze;
    use crate::{Result, Timestep};

    /// Timestep at which the blocking maze moves its gap.
    pub const BLOCKING_CHANGE: Timestep = 1000;
    /// Timestep at which the shortcut maze opens a second gap.
    pub const SHORTCUT_CHANGE: Timestep = 3000;

    const DYNA: &str = "
        .......XG
        ..X....X.
        S.X....X.
        ..X......
        .....X...
        .........
    ";

    const GAP_RIGHT: &str = "
        ........G
        .........
        .........
        XXXXXXXX.
        .........
        ...S.....
    ";

    const GAP_LEFT: &str = "
        ........G
        .........
        .........
        .XXXXXXXX
        .........
        ...S.....
    ";

    const GAP_BOTH: &str = "
        ........G
        .........
        .........
        .XXXXXXX.
        .........
        ...S.....
    ";

    /// The stationary 6x9 maze.
    pub fn dyna_maze() -> Result<Maze> {
        Maze::parse(DYNA)
    }

    /// A wall with a gap on the right that moves to the left end at
    /// [`BLOCKING_CHANGE`], blocking the learned path.
    pub fn blocking_maze() -> Result<Maze> {
        Maze::composed(
            Maze::parse(GAP_RIGHT)?,
            Maze::parse(GAP_LEFT)?,
            BLOCKING_CHANGE,
        )
    }

    /// A wall with a gap on the left; a shorter gap on the right opens at
    /// [`SHORTCUT_CHANGE`].
    pub fn shortcut_maze() -> Result<Maze> {
        Maze::composed(
            Maze::parse(GAP_LEFT)?,
            Maze::parse(GAP_BOTH)?,
            SHORTCUT_CHANGE,
        )
    }
}
