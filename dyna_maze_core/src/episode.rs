use tracing::debug;

use crate::{Action, Cell, Maze, Position, Result, Reward, Timestep, maze::GOAL_REWARD};

/// Mutable simulation state bound to one maze.
///
/// The timestep starts at 0 and advances by exactly one per [`Episode::step`].
#[derive(Debug, Clone)]
pub struct Episode {
    maze: Maze,
    position: Position,
    timestep: Timestep,
    cumulative_reward: Reward,
}

impl Episode {
    /// Starts an episode at the maze's start cell at timestep 0.
    pub fn new(maze: Maze) -> Result<Self> {
        let position = maze.start_position(0)?;
        debug!(
            rows = maze.row_count(),
            columns = maze.column_count(),
            %position,
            "episode created"
        );
        Ok(Episode {
            maze,
            position,
            timestep: 0,
            cumulative_reward: 0.0,
        })
    }

    pub fn maze(&self) -> &Maze {
        &self.maze
    }

    pub fn all_positions(&self) -> Vec<Position> {
        self.maze.positions().collect()
    }

    pub fn all_actions(&self) -> Vec<Action> {
        self.maze.actions().to_vec()
    }

    pub fn current_position(&self) -> Position {
        self.position
    }

    pub fn current_timestep(&self) -> Timestep {
        self.timestep
    }

    /// Total reward collected since the episode started.
    pub fn cumulative_reward(&self) -> Reward {
        self.cumulative_reward
    }

    /// Applies `action` at the current timestep and position, then advances
    /// the clock. Returns the reward.
    pub fn step(&mut self, action: Action) -> Result<Reward> {
        let (reward, next) = self
            .maze
            .attempt_move(self.timestep, self.position, action)?;
        if reward >= GOAL_REWARD {
            debug!(timestep = self.timestep, from = %self.position, to = %next, "goal reached, reset to start");
        }

        self.position = next;
        self.timestep += 1;
        self.cumulative_reward += reward;

        if self.maze.changes_at(self.timestep) {
            debug!(timestep = self.timestep, "maze layout changed");
        }
        Ok(reward)
    }

    /// The symbol at `position` as of the current timestep.
    pub fn current_cell(&self, position: Position) -> Result<Cell> {
        self.maze.cell(self.timestep, position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn switching_corridor() -> Maze {
        Maze::composed(
            Maze::parse("S.XG").unwrap(),
            Maze::parse("S..G").unwrap(),
            3,
        )
        .unwrap()
    }

    #[test]
    fn new_episode_starts_at_start_cell() {
        let episode = Episode::new(Maze::parse("..\nSG").unwrap()).unwrap();
        assert_eq!(episode.current_position(), Position::new(1, 0));
        assert_eq!(episode.current_timestep(), 0);
        assert_eq!(episode.cumulative_reward(), 0.0);
    }

    #[test]
    fn positions_and_actions_delegate_to_maze() {
        let episode = Episode::new(Maze::parse("S.\n.G").unwrap()).unwrap();
        assert_eq!(episode.all_positions().len(), 4);
        assert_eq!(episode.all_actions(), Action::ALL.to_vec());
    }

    #[test]
    fn every_step_advances_the_clock_by_one() {
        let mut episode = Episode::new(Maze::parse("S.G").unwrap()).unwrap();
        // Bumping into the boundary still costs a timestep.
        assert_eq!(episode.step(Action::Up).unwrap(), 0.0);
        assert_eq!(episode.current_timestep(), 1);
        assert_eq!(episode.current_position(), Position::new(0, 0));

        episode.step(Action::Right).unwrap();
        assert_eq!(episode.current_timestep(), 2);
        assert_eq!(episode.current_position(), Position::new(0, 1));
    }

    #[test]
    fn goal_pays_and_returns_to_start() {
        let mut episode = Episode::new(Maze::parse("S.G").unwrap()).unwrap();
        episode.step(Action::Right).unwrap();
        assert_eq!(episode.step(Action::Right).unwrap(), 1.0);
        assert_eq!(episode.current_position(), Position::new(0, 0));
        assert_eq!(episode.cumulative_reward(), 1.0);
    }

    #[test]
    fn transitions_use_the_layout_of_the_current_timestep() {
        let mut episode = Episode::new(switching_corridor()).unwrap();
        episode.step(Action::Right).unwrap();
        // t = 1 and t = 2: the wall is still up.
        episode.step(Action::Right).unwrap();
        assert_eq!(episode.current_position(), Position::new(0, 1));
        episode.step(Action::Right).unwrap();
        assert_eq!(episode.current_position(), Position::new(0, 1));
        // t = 3: the wall is gone.
        episode.step(Action::Right).unwrap();
        assert_eq!(episode.current_position(), Position::new(0, 2));
    }

    #[test]
    fn current_cell_tracks_the_clock() {
        let mut episode = Episode::new(switching_corridor()).unwrap();
        let gate = Position::new(0, 2);
        assert_eq!(episode.current_cell(gate).unwrap(), Cell::Wall);
        for _ in 0..3 {
            episode.step(Action::Left).unwrap();
        }
        assert_eq!(episode.current_cell(gate).unwrap(), Cell::Free);
    }
}
