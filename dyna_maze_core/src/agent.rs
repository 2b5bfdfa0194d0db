use rand::{SeedableRng, rngs::StdRng};
use tracing::{debug, trace};

use crate::{
    Action, AgentConfig, Episode, Position, Result, Reward,
    bonus::{NoBonus, PlanningBonus, RecencyBonus},
    model::{ExploratoryModel, LastOutcomeModel, Transition, TransitionModel},
    policy,
    q_table::QTable,
};

/// What happened during one real step, for renderers and loggers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepOutcome {
    pub from: Position,
    pub action: Action,
    pub reward: Reward,
    pub to: Position,
}

/// Trait defining the behavior of a learning agent driven one real step at a
/// time.
pub trait Agent {
    /// Takes one real step, learns from it, then plans.
    fn step(&mut self) -> Result<StepOutcome>;

    /// The current greedy action set at `position`.
    fn max_actions(&self, position: Position) -> Result<Vec<Action>>;

    /// The episode this agent is driving.
    fn episode(&self) -> &Episode;
}

/// A Dyna agent: direct Q-learning plus `n` planning updates per real step.
///
/// The model decides which transitions planning may replay; the bonus decides
/// how sampled rewards are adjusted. [`DynaQAgent`] and [`DynaQPlusAgent`]
/// are the two combinations in use.
#[derive(Debug)]
pub struct DynaAgent<M, B> {
    episode: Episode,
    config: AgentConfig,
    q_table: QTable,
    model: M,
    bonus: B,
    rng: StdRng,
}

/// Dyna-Q: replays observed pairs, no bonus.
pub type DynaQAgent = DynaAgent<LastOutcomeModel, NoBonus>;

/// Dyna-Q+: replays any action at visited positions with a recency bonus.
pub type DynaQPlusAgent = DynaAgent<ExploratoryModel, RecencyBonus>;

impl<M: TransitionModel, B: PlanningBonus> DynaAgent<M, B> {
    /// Assembles an agent from its parts.
    ///
    /// The value table is sized from the episode's positions and actions.
    pub fn from_parts(
        episode: Episode,
        config: AgentConfig,
        model: M,
        bonus: B,
        rng: StdRng,
    ) -> Result<Self> {
        config.validate()?;
        let q_table = QTable::new(
            &episode.all_positions(),
            &episode.all_actions(),
            config.alpha,
            config.gamma,
        );
        debug!(
            planning_steps = config.planning_steps,
            epsilon = config.epsilon,
            pairs = q_table.size(),
            "agent created"
        );
        Ok(Self {
            episode,
            config,
            q_table,
            model,
            bonus,
            rng,
        })
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn q_table(&self) -> &QTable {
        &self.q_table
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn bonus(&self) -> &B {
        &self.bonus
    }

    /// Runs the configured number of simulated updates.
    fn plan(&mut self) -> Result<()> {
        let now = self.episode.current_timestep();
        for _ in 0..self.config.planning_steps {
            let Transition {
                position,
                action,
                reward,
                next_position,
            } = self.model.sample(&mut self.rng)?;
            let bonus = self.bonus.bonus(position, action, now)?;
            self.q_table
                .update(position, action, reward + bonus, next_position)?;
        }
        Ok(())
    }
}

impl DynaQAgent {
    pub fn new(episode: Episode, config: AgentConfig, rng: StdRng) -> Result<Self> {
        Self::from_parts(episode, config, LastOutcomeModel::new(), NoBonus, rng)
    }

    pub fn with_seed(episode: Episode, config: AgentConfig, seed: u64) -> Result<Self> {
        Self::new(episode, config, StdRng::seed_from_u64(seed))
    }
}

impl DynaQPlusAgent {
    pub fn new(episode: Episode, config: AgentConfig, rng: StdRng) -> Result<Self> {
        let positions = episode.all_positions();
        let actions = episode.all_actions();
        let bonus = RecencyBonus::new(
            &positions,
            &actions,
            config.kappa,
            episode.current_timestep(),
        )?;
        Self::from_parts(episode, config, ExploratoryModel::new(&actions), bonus, rng)
    }

    pub fn with_seed(episode: Episode, config: AgentConfig, seed: u64) -> Result<Self> {
        Self::new(episode, config, StdRng::seed_from_u64(seed))
    }
}

impl<M: TransitionModel, B: PlanningBonus> Agent for DynaAgent<M, B> {
    fn step(&mut self) -> Result<StepOutcome> {
        let from = self.episode.current_position();
        let action =
            policy::epsilon_greedy(&self.q_table, from, self.config.epsilon, &mut self.rng)?;
        self.bonus
            .record_choice(from, action, self.episode.current_timestep())?;

        let reward = self.episode.step(action)?;
        let to = self.episode.current_position();

        self.q_table.update(from, action, reward, to)?;
        self.model.observe(Transition {
            position: from,
            action,
            reward,
            next_position: to,
        });
        self.plan()?;

        trace!(
            timestep = self.episode.current_timestep(),
            %from,
            %action,
            reward,
            %to,
            "step"
        );
        Ok(StepOutcome {
            from,
            action,
            reward,
            to,
        })
    }

    fn max_actions(&self, position: Position) -> Result<Vec<Action>> {
        self.q_table.max_actions(position)
    }

    fn episode(&self) -> &Episode {
        &self.episode
    }
}
