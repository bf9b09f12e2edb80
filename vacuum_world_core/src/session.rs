use rand::{SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    Direction, Position,
    agent::{Action, AgentState, ManualMove, MoveError, StepOutcome, VacuumAgent},
    environment::{Environment, EnvironmentError, RoomSnapshot},
};

/// Settings for a new session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Side length of the square room.
    pub size: usize,
    /// Dirt placed at startup and on resets that do not name a count.
    pub dirt_count: usize,
    /// Fixed seed for dirt placement; the OS seeds the generator when absent.
    pub seed: Option<u64>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            size: 10,
            dirt_count: 10,
            seed: None,
        }
    }
}

/// Full observable state: the room plus the agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldState {
    pub room: RoomSnapshot,
    pub agent: AgentState,
}

/// Outcome of a complete auto-clean run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoCleanReport {
    pub actions: Vec<Action>,
    pub final_state: WorldState,
}

fn make_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}

/// One room, one vacuum, and the random source used to dirty the room.
///
/// The session is the unit callers share; mutating methods take `&mut self`
/// so concurrent callers have to serialize access around it.
#[derive(Debug)]
pub struct Session {
    environment: Environment,
    agent: VacuumAgent,
    rng: StdRng,
    default_dirt: usize,
}

impl Session {
    pub fn new(config: &SessionConfig) -> Result<Self, EnvironmentError> {
        let mut rng = make_rng(config.seed);
        let environment = Environment::new(config.size, config.dirt_count, &mut rng)?;
        info!(
            size = config.size,
            dirt = environment.dirt_count(),
            seed = ?config.seed,
            "Session created"
        );
        Ok(Session {
            environment,
            agent: VacuumAgent::default(),
            rng,
            default_dirt: config.dirt_count,
        })
    }

    /// Builds a session around a prepared room, e.g. one loaded from a layout.
    ///
    /// Later resets scatter `default_dirt` units and return the agent to the origin.
    pub fn from_layout(
        environment: Environment,
        start: Position,
        default_dirt: usize,
        seed: Option<u64>,
    ) -> Self {
        Session {
            environment,
            agent: VacuumAgent::new(start),
            rng: make_rng(seed),
            default_dirt,
        }
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    pub fn agent(&self) -> &VacuumAgent {
        &self.agent
    }

    pub fn state(&self) -> WorldState {
        WorldState {
            room: self.environment.snapshot(),
            agent: self.agent.state(),
        }
    }

    /// Re-dirties the room with `dirt_count` units (or the configured default)
    /// and puts the agent back at the origin.
    pub fn reset(&mut self, dirt_count: Option<usize>) {
        let dirt_count = dirt_count.unwrap_or(self.default_dirt);
        self.environment.reset(dirt_count, &mut self.rng);
        self.agent.reset(Position::ORIGIN);
        info!(dirt = self.environment.dirt_count(), "Session reset");
    }

    pub fn manual_move(&mut self, direction: Direction) -> Result<ManualMove, MoveError> {
        self.agent.try_move(&mut self.environment, direction)
    }

    pub fn auto_clean(&mut self) -> AutoCleanReport {
        let actions = self.agent.auto_clean(&mut self.environment);
        AutoCleanReport {
            actions,
            final_state: self.state(),
        }
    }

    pub fn step_auto(&mut self) -> StepOutcome {
        self.agent.step_auto(&mut self.environment)
    }
}
