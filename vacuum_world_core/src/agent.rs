use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{Direction, Position, environment::Environment, map::Grid};

/// One entry of an action log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Action {
    Move { position: Position },
    Clean { position: Position },
}

impl Action {
    pub fn position(&self) -> Position {
        match self {
            Action::Move { position } | Action::Clean { position } => *position,
        }
    }
}

/// Why an automatic run has nothing left to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DoneReason {
    AllClean,
    /// Dirt remains but no path leads to it. Cannot happen on an open grid.
    NoReachableDirt,
}

impl DoneReason {
    pub fn message(self) -> &'static str {
        match self {
            DoneReason::AllClean => "All dirt cleaned",
            DoneReason::NoReachableDirt => "No reachable dirt",
        }
    }
}

/// Result of a single automatic step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Acted(Action),
    Done(DoneReason),
}

/// Result of an accepted manual move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualMove {
    pub position: Position,
    pub cleaned: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MoveError {
    #[error("Invalid move: {direction:?} from {from} leaves the grid")]
    OutOfBounds { from: Position, direction: Direction },
}

/// Serializable view of the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentState {
    pub position: Position,
    pub moves: usize,
}

/// A vacuum cleaner moving on an [`Environment`].
///
/// The agent only tracks its own position and move counter. Every operation
/// receives the environment it acts on, so one room can be shared with the
/// caller without the agent holding on to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VacuumAgent {
    position: Position,
    moves: usize,
}

impl Default for VacuumAgent {
    fn default() -> Self {
        Self::new(Position::ORIGIN)
    }
}

impl VacuumAgent {
    pub fn new(start: Position) -> Self {
        VacuumAgent {
            position: start,
            moves: 0,
        }
    }

    #[inline]
    pub fn position(&self) -> Position {
        self.position
    }

    #[inline]
    pub fn moves(&self) -> usize {
        self.moves
    }

    pub fn state(&self) -> AgentState {
        AgentState {
            position: self.position,
            moves: self.moves,
        }
    }

    /// Puts the agent back at `start` with a zero move counter.
    pub fn reset(&mut self, start: Position) {
        self.position = start;
        self.moves = 0;
    }

    fn step_to(&mut self, position: Position) {
        self.position = position;
        self.moves += 1;
    }

    /// Takes at most one step toward `target` and reports whether the agent is
    /// now standing on it.
    ///
    /// A cardinally adjacent target is entered directly. Otherwise the agent
    /// closes the `x` gap first (west, then east) and the `y` gap after
    /// (north, then south), so any in-bounds target is reached in exactly
    /// `|dx| + |dy|` calls.
    pub fn move_toward(&mut self, environment: &Environment, target: Position) -> bool {
        let current = self.position;
        if current == target {
            return true;
        }

        if environment
            .neighbors(current)
            .any(|neighbor| neighbor == target)
        {
            self.step_to(target);
            return true;
        }

        let next = if target.x < current.x {
            Position::new(current.x - 1, current.y)
        } else if target.x > current.x {
            Position::new(current.x + 1, current.y)
        } else if target.y < current.y {
            Position::new(current.x, current.y - 1)
        } else {
            Position::new(current.x, current.y + 1)
        };
        self.step_to(next);
        self.position == target
    }

    /// Breadth-first search from the agent's position for the closest dirty cell.
    ///
    /// Neighbors are expanded west, east, north, south, which fixes the winner
    /// among cells at equal distance.
    pub fn find_nearest_dirt(&self, environment: &Environment) -> Option<Position> {
        if !environment.has_dirt() {
            return None;
        }

        let size = environment.size();
        let mut visited: Grid<bool> = Grid::new(size, size);
        let mut frontier = VecDeque::from([self.position]);
        visited[self.position] = true;

        while let Some(current) = frontier.pop_front() {
            if environment.is_dirty(current) {
                return Some(current);
            }
            for neighbor in environment.neighbors(current) {
                if !visited[neighbor] {
                    visited[neighbor] = true;
                    frontier.push_back(neighbor);
                }
            }
        }

        None
    }

    /// Cleans the cell under the agent. Does not count as a move.
    pub fn clean_current_cell(&self, environment: &mut Environment) -> bool {
        environment.clean_cell(self.position)
    }

    /// Moves one cell in `direction` and cleans the destination.
    ///
    /// Moves that would leave the grid are rejected without touching any state.
    pub fn try_move(
        &mut self,
        environment: &mut Environment,
        direction: Direction,
    ) -> Result<ManualMove, MoveError> {
        let destination = environment
            .neighbor(self.position, direction)
            .ok_or(MoveError::OutOfBounds {
                from: self.position,
                direction,
            })?;

        self.step_to(destination);
        let cleaned = self.clean_current_cell(environment);
        Ok(ManualMove {
            position: destination,
            cleaned,
        })
    }

    /// Cleans the whole room, always heading for the nearest dirt, and returns
    /// every move and clean performed in order.
    pub fn auto_clean(&mut self, environment: &mut Environment) -> Vec<Action> {
        let mut actions = Vec::new();

        while environment.has_dirt() {
            let Some(dirt) = self.find_nearest_dirt(environment) else {
                break;
            };

            while self.position != dirt {
                self.move_toward(environment, dirt);
                actions.push(Action::Move {
                    position: self.position,
                });
            }

            if self.clean_current_cell(environment) {
                actions.push(Action::Clean {
                    position: self.position,
                });
            }
        }

        debug!(
            actions = actions.len(),
            moves = self.moves,
            remaining = environment.dirt_count(),
            "Auto-clean finished"
        );
        actions
    }

    /// Performs one unit of [`auto_clean`](Self::auto_clean): a single step
    /// toward the nearest dirt, reported as a clean if that step reaches and
    /// cleans it.
    pub fn step_auto(&mut self, environment: &mut Environment) -> StepOutcome {
        if !environment.has_dirt() {
            return StepOutcome::Done(DoneReason::AllClean);
        }
        // Unreachable on an open grid; kept so rooms with obstacles terminate.
        let Some(dirt) = self.find_nearest_dirt(environment) else {
            return StepOutcome::Done(DoneReason::NoReachableDirt);
        };

        let reached = self.move_toward(environment, dirt);
        let position = self.position;
        if reached && self.clean_current_cell(environment) {
            StepOutcome::Acted(Action::Clean { position })
        } else {
            StepOutcome::Acted(Action::Move { position })
        }
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn room(size: usize, dirt: &[(usize, usize)]) -> Environment {
        Environment::with_dirt(size, dirt.iter().map(|&(x, y)| Position::new(x, y))).unwrap()
    }

    #[test]
    fn move_toward_current_position_is_free() {
        let environment = room(3, &[]);
        let mut agent = VacuumAgent::new(Position::new(1, 1));
        assert!(agent.move_toward(&environment, Position::new(1, 1)));
        assert_eq!(agent.moves(), 0);
    }

    #[test]
    fn move_toward_enters_adjacent_target() {
        let environment = room(3, &[]);
        let mut agent = VacuumAgent::new(Position::new(1, 1));
        assert!(agent.move_toward(&environment, Position::new(1, 2)));
        assert_eq!(agent.position(), Position::new(1, 2));
        assert_eq!(agent.moves(), 1);
    }

    #[test]
    fn move_toward_closes_x_gap_first() {
        let environment = room(5, &[]);
        let mut agent = VacuumAgent::new(Position::new(0, 0));
        assert!(!agent.move_toward(&environment, Position::new(2, 3)));
        assert_eq!(agent.position(), Position::new(1, 0));
        assert!(!agent.move_toward(&environment, Position::new(2, 3)));
        assert_eq!(agent.position(), Position::new(2, 0));
        assert!(!agent.move_toward(&environment, Position::new(2, 3)));
        assert_eq!(agent.position(), Position::new(2, 1));
    }

    #[test]
    fn nearest_dirt_prefers_west_on_ties() {
        let environment = room(5, &[(3, 2), (1, 2)]);
        let agent = VacuumAgent::new(Position::new(2, 2));
        assert_eq!(
            agent.find_nearest_dirt(&environment),
            Some(Position::new(1, 2))
        );
    }

    #[test]
    fn nearest_dirt_prefers_north_over_south() {
        let environment = room(5, &[(2, 3), (2, 1)]);
        let agent = VacuumAgent::new(Position::new(2, 2));
        assert_eq!(
            agent.find_nearest_dirt(&environment),
            Some(Position::new(2, 1))
        );
    }

    #[test]
    fn nearest_dirt_on_clean_room_is_none() {
        let environment = room(4, &[]);
        assert_eq!(VacuumAgent::default().find_nearest_dirt(&environment), None);
    }

    #[test]
    fn cleaning_does_not_count_as_move() {
        let mut environment = room(2, &[(0, 0)]);
        let agent = VacuumAgent::default();
        assert!(agent.clean_current_cell(&mut environment));
        assert!(!agent.clean_current_cell(&mut environment));
        assert_eq!(agent.moves(), 0);
    }

    #[test]
    fn try_move_cleans_destination() {
        let mut environment = room(3, &[(1, 0)]);
        let mut agent = VacuumAgent::default();

        let outcome = agent.try_move(&mut environment, Direction::Right).unwrap();
        assert_eq!(
            outcome,
            ManualMove {
                position: Position::new(1, 0),
                cleaned: true,
            }
        );
        assert_eq!(agent.moves(), 1);
        assert!(!environment.has_dirt());

        let outcome = agent.try_move(&mut environment, Direction::Down).unwrap();
        assert!(!outcome.cleaned);
        assert_eq!(agent.state().moves, 2);
    }

    #[test]
    fn try_move_off_grid_is_rejected() {
        let mut environment = room(5, &[(0, 0)]);
        let mut agent = VacuumAgent::default();
        let before = environment.clone();

        let result = agent.try_move(&mut environment, Direction::Up);
        assert_eq!(
            result,
            Err(MoveError::OutOfBounds {
                from: Position::ORIGIN,
                direction: Direction::Up,
            })
        );
        assert_eq!(agent.state(), VacuumAgent::default().state());
        assert_eq!(environment, before);
    }

    #[test]
    fn step_auto_cleans_dirt_under_agent_without_moving() {
        let mut environment = room(3, &[(0, 0)]);
        let mut agent = VacuumAgent::default();
        assert_eq!(
            agent.step_auto(&mut environment),
            StepOutcome::Acted(Action::Clean {
                position: Position::ORIGIN,
            })
        );
        assert_eq!(agent.moves(), 0);
        assert_eq!(
            agent.step_auto(&mut environment),
            StepOutcome::Done(DoneReason::AllClean)
        );
    }

    #[test]
    fn step_auto_reports_moves_then_clean() {
        let mut environment = room(4, &[(0, 3)]);
        let mut agent = VacuumAgent::default();
        let mut log = Vec::new();
        while let StepOutcome::Acted(action) = agent.step_auto(&mut environment) {
            log.push(action);
        }
        assert_eq!(
            log,
            vec![
                Action::Move {
                    position: Position::new(0, 1),
                },
                Action::Move {
                    position: Position::new(0, 2),
                },
                Action::Clean {
                    position: Position::new(0, 3),
                },
            ]
        );
        assert_eq!(agent.moves(), 3);
    }

    #[test]
    fn reset_restores_start() {
        let mut environment = room(3, &[(2, 2)]);
        let mut agent = VacuumAgent::default();
        agent.auto_clean(&mut environment);
        agent.reset(Position::new(1, 1));
        assert_eq!(
            agent.state(),
            AgentState {
                position: Position::new(1, 1),
                moves: 0,
            }
        );
    }

    #[test]
    fn action_serializes_with_type_tag() {
        let action = Action::Clean {
            position: Position::new(2, 0),
        };
        let json = serde_json::to_value(action).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"type": "clean", "position": {"x": 2, "y": 0}})
        );
    }

    fn position_in(size: usize) -> impl Strategy<Value = Position> {
        (0..size, 0..size).prop_map(|(x, y)| Position::new(x, y))
    }

    fn room_and_two_positions() -> impl Strategy<Value = (usize, Position, Position)> {
        (1..15usize).prop_flat_map(|size| (Just(size), position_in(size), position_in(size)))
    }

    proptest! {
        #[test]
        fn move_toward_takes_manhattan_distance_calls(
            (size, start, target) in room_and_two_positions(),
        ) {
            let environment = room(size, &[]);
            let mut agent = VacuumAgent::new(start);
            let expected = start.manhattan_distance(target);

            let mut calls = 0;
            while agent.position() != target {
                agent.move_toward(&environment, target);
                calls += 1;
                prop_assert!(calls <= expected);
            }
            prop_assert_eq!(calls, expected);
            prop_assert_eq!(agent.moves(), expected);
        }

        #[test]
        fn nearest_dirt_is_never_farther_than_other_dirt(
            (size, start, _) in room_and_two_positions(),
            dirt in prop::collection::vec((0..15usize, 0..15usize), 1..20),
        ) {
            let dirt: Vec<(usize, usize)> = dirt
                .into_iter()
                .map(|(x, y)| (x % size, y % size))
                .collect();
            let environment = room(size, &dirt);
            let agent = VacuumAgent::new(start);

            let nearest = agent.find_nearest_dirt(&environment).unwrap();
            prop_assert!(environment.is_dirty(nearest));
            let best = start.manhattan_distance(nearest);
            for other in environment.dirt_positions() {
                prop_assert!(best <= start.manhattan_distance(other));
            }
        }

        #[test]
        fn auto_clean_empties_room(
            (size, start, _) in room_and_two_positions(),
            dirt in prop::collection::vec((0..15usize, 0..15usize), 0..25),
        ) {
            let dirt: Vec<(usize, usize)> = dirt
                .into_iter()
                .map(|(x, y)| (x % size, y % size))
                .collect();
            let mut environment = room(size, &dirt);
            let initial_dirt = environment.dirt_count();
            let mut agent = VacuumAgent::new(start);

            let actions = agent.auto_clean(&mut environment);
            let cleans = actions
                .iter()
                .filter(|action| matches!(action, Action::Clean { .. }))
                .count();

            prop_assert!(!environment.has_dirt());
            prop_assert_eq!(cleans, initial_dirt);
            prop_assert_eq!(actions.len(), agent.moves() + cleans);
        }
    }
}
