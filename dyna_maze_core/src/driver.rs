//! Run loops that drive an agent for a fixed number of steps

use rand::{Rng, SeedableRng, rngs::StdRng};
use serde::Serialize;
use tracing::info;

use crate::{
    Agent, AgentConfig, DynaQPlusAgent, Episode, Maze, Result, Reward, StepOutcome, Timestep,
};

/// Totals for one run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RunSummary {
    pub steps: u64,
    pub total_reward: Reward,
    pub goals_reached: u64,
    pub final_timestep: Timestep,
}

/// Total reward one seed collected during a sweep.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SeedScore {
    pub seed: u64,
    pub total_reward: Reward,
}

/// Calls [`Agent::step`] `steps` times.
pub fn run_steps(agent: &mut dyn Agent, steps: u64) -> Result<RunSummary> {
    run_steps_with(agent, steps, |_| {})
}

/// Like [`run_steps`], handing every outcome to `observe`.
pub fn run_steps_with<F>(agent: &mut dyn Agent, steps: u64, mut observe: F) -> Result<RunSummary>
where
    F: FnMut(&StepOutcome),
{
    let mut total_reward = 0.0;
    let mut goals_reached = 0;
    for _ in 0..steps {
        let outcome = agent.step()?;
        total_reward += outcome.reward;
        if outcome.reward > 0.0 {
            goals_reached += 1;
        }
        observe(&outcome);
    }

    let summary = RunSummary {
        steps,
        total_reward,
        goals_reached,
        final_timestep: agent.episode().current_timestep(),
    };
    info!(
        steps,
        total_reward,
        goals_reached,
        final_timestep = summary.final_timestep,
        "run finished"
    );
    Ok(summary)
}

/// Draws `count` distinct seeds in `[0, 2^32)` from a generator seeded with
/// `master_seed`.
pub fn draw_seeds(master_seed: u64, count: usize) -> Vec<u64> {
    let mut rng = StdRng::seed_from_u64(master_seed);
    let mut seeds = Vec::with_capacity(count);
    while seeds.len() < count {
        let seed = rng.random_range(0..=u64::from(u32::MAX));
        if !seeds.contains(&seed) {
            seeds.push(seed);
        }
    }
    seeds
}

/// Runs a fresh Dyna-Q+ agent on `maze` for every seed and returns the
/// scores sorted from lowest to highest total reward.
pub fn rank_seeds(
    maze: &Maze,
    config: &AgentConfig,
    seeds: &[u64],
    steps: u64,
) -> Result<Vec<SeedScore>> {
    let mut scores = Vec::with_capacity(seeds.len());
    for &seed in seeds {
        let episode = Episode::new(maze.clone())?;
        let mut agent = DynaQPlusAgent::with_seed(episode, config.clone(), seed)?;
        let summary = run_steps(&mut agent, steps)?;
        info!(seed, total_reward = summary.total_reward, "seed evaluated");
        scores.push(SeedScore {
            seed,
            total_reward: summary.total_reward,
        });
    }
    scores.sort_by(|a, b| a.total_reward.total_cmp(&b.total_reward));
    Ok(scores)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DynaQAgent;

    #[test]
    fn run_counts_steps_and_rewards() {
        let episode = Episode::new(Maze::parse("S.G").unwrap()).unwrap();
        let mut agent = DynaQAgent::with_seed(episode, AgentConfig::default(), 5).unwrap();
        let mut observed = 0.0;
        let summary = run_steps_with(&mut agent, 200, |outcome| observed += outcome.reward).unwrap();
        assert_eq!(summary.steps, 200);
        assert_eq!(summary.final_timestep, 200);
        assert_eq!(summary.total_reward, observed);
        assert_eq!(summary.total_reward, summary.goals_reached as f64);
        assert_eq!(summary.total_reward, agent.episode().cumulative_reward());
        assert!(summary.goals_reached > 0);
    }

    #[test]
    fn drawn_seeds_are_distinct_and_reproducible() {
        let seeds = draw_seeds(120, 31);
        assert_eq!(seeds.len(), 31);
        let mut unique = seeds.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), 31);
        assert!(seeds.iter().all(|&seed| seed <= u64::from(u32::MAX)));
        assert_eq!(seeds, draw_seeds(120, 31));
    }

    #[test]
    fn ranking_is_sorted_by_reward() {
        let maze = Maze::parse("S.G").unwrap();
        let seeds = draw_seeds(7, 4);
        let scores = rank_seeds(&maze, &AgentConfig::default(), &seeds, 100).unwrap();
        assert_eq!(scores.len(), 4);
        assert!(scores.windows(2).all(|w| w[0].total_reward <= w[1].total_reward));
        for score in &scores {
            assert!(seeds.contains(&score.seed));
        }
    }
}
