use std::collections::BTreeSet;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{Direction, Position, map::Grid};

/// Cleanliness of a single grid cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CellStatus {
    #[default]
    Clean,
    Dirty,
}

/// Errors raised while constructing an environment.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EnvironmentError {
    #[error("Grid size must be at least 1")]
    ZeroSize,
    #[error("Dirt position {position} is out of bounds for grid size {size}")]
    OutOfBounds { position: Position, size: usize },
}

/// Errors raised while parsing a room layout.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoadError {
    #[error("Room layout is empty")]
    Empty,
    #[error("Room must be square: row {row} has {found} cells, expected {expected}")]
    NotSquare {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("Unknown room token '{token}' at ({x}, {y})")]
    UnknownToken { token: String, x: usize, y: usize },
    #[error("Multiple start positions ('S') found")]
    MultipleStarts,
    #[error(transparent)]
    Environment(#[from] EnvironmentError),
}

/// Read-only view of the room, shaped for serialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomSnapshot {
    /// Cell statuses indexed as `grid[y][x]`.
    pub grid: Vec<Vec<CellStatus>>,
    pub dirt_positions: Vec<Position>,
}

/// A square room of `size × size` cells, some of them dirty.
///
/// `dirt_positions` always mirrors the dirty cells of `cells`; every mutation
/// goes through methods that update both together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Environment {
    size: usize,
    cells: Grid<CellStatus>,
    dirt_positions: BTreeSet<Position>,
}

impl Environment {
    /// Creates a room with `dirt_count` units of dirt at random distinct cells.
    pub fn new<R: Rng + ?Sized>(
        size: usize,
        dirt_count: usize,
        rng: &mut R,
    ) -> Result<Self, EnvironmentError> {
        let mut environment = Self::empty(size)?;
        environment.place_dirt(dirt_count, rng);
        Ok(environment)
    }

    /// Creates a room with dirt at exactly the given positions.
    pub fn with_dirt<I>(size: usize, positions: I) -> Result<Self, EnvironmentError>
    where
        I: IntoIterator<Item = Position>,
    {
        let mut environment = Self::empty(size)?;
        for position in positions {
            if !environment.contains(position) {
                return Err(EnvironmentError::OutOfBounds { position, size });
            }
            environment.mark_dirty(position);
        }
        Ok(environment)
    }

    fn empty(size: usize) -> Result<Self, EnvironmentError> {
        if size == 0 {
            return Err(EnvironmentError::ZeroSize);
        }
        Ok(Environment {
            size,
            cells: Grid::new(size, size),
            dirt_positions: BTreeSet::new(),
        })
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of cells currently dirty.
    pub fn dirt_count(&self) -> usize {
        self.dirt_positions.len()
    }

    pub fn has_dirt(&self) -> bool {
        !self.dirt_positions.is_empty()
    }

    pub fn dirt_positions(&self) -> impl Iterator<Item = Position> + '_ {
        self.dirt_positions.iter().copied()
    }

    pub fn cells(&self) -> &Grid<CellStatus> {
        &self.cells
    }

    /// Whether `position` lies inside the room.
    #[inline]
    pub fn contains(&self, position: Position) -> bool {
        self.cells.is_valid(position.x, position.y)
    }

    /// The cell one step from `position` in `direction`, if it is inside the room.
    pub fn neighbor(&self, position: Position, direction: Direction) -> Option<Position> {
        let (dx, dy) = direction.offset();
        position
            .offset(dx, dy)
            .filter(|candidate| self.contains(*candidate))
    }

    /// In-bounds cardinal neighbors in west, east, north, south order.
    pub fn neighbors(&self, position: Position) -> impl Iterator<Item = Position> + '_ {
        Direction::SEARCH_ORDER
            .into_iter()
            .filter_map(move |direction| self.neighbor(position, direction))
    }

    /// Scatters `count` units of dirt over distinct clean cells.
    ///
    /// The request is capped at the number of clean cells left. Returns the
    /// number of units actually placed.
    pub fn place_dirt<R: Rng + ?Sized>(&mut self, count: usize, rng: &mut R) -> usize {
        let free = self.cells.len() - self.dirt_positions.len();
        let target = if count > free {
            warn!(requested = count, free, "Dirt request exceeds clean cells, capping");
            free
        } else {
            count
        };

        let mut placed = 0;
        while placed < target {
            let candidate = Position {
                x: rng.random_range(0..self.size),
                y: rng.random_range(0..self.size),
            };
            if self.cells[candidate] == CellStatus::Clean {
                self.mark_dirty(candidate);
                placed += 1;
            }
        }
        debug!(placed, size = self.size, "Placed dirt");
        placed
    }

    fn mark_dirty(&mut self, position: Position) {
        self.cells[position] = CellStatus::Dirty;
        self.dirt_positions.insert(position);
    }

    /// Whether the cell at `position` is dirty. Out-of-bounds cells are never dirty.
    pub fn is_dirty(&self, position: Position) -> bool {
        self.dirt_positions.contains(&position)
    }

    /// Cleans the cell at `position`. Returns `false` if it was already clean.
    pub fn clean_cell(&mut self, position: Position) -> bool {
        if self.dirt_positions.remove(&position) {
            self.cells[position] = CellStatus::Clean;
            true
        } else {
            false
        }
    }

    /// Clears the room and scatters `dirt_count` fresh units of dirt.
    pub fn reset<R: Rng + ?Sized>(&mut self, dirt_count: usize, rng: &mut R) {
        self.cells.fill(CellStatus::Clean);
        self.dirt_positions.clear();
        self.place_dirt(dirt_count, rng);
    }

    pub fn snapshot(&self) -> RoomSnapshot {
        RoomSnapshot {
            grid: self.cells.rows().map(<[CellStatus]>::to_vec).collect(),
            dirt_positions: self.dirt_positions.iter().copied().collect(),
        }
    }
}

/// Loads a room from a text layout.
///
/// Each line is one row of whitespace-separated tokens: `.` for a clean cell,
/// `D` for a dirty cell and `S` for the (clean) starting cell of the agent.
/// Without an `S` the agent starts at the origin.
pub fn load_room_from_string(layout: &str) -> Result<(Environment, Position), LoadError> {
    let rows: Vec<Vec<&str>> = layout
        .trim()
        .lines()
        .map(|line| line.split_whitespace().collect())
        .filter(|tokens: &Vec<&str>| !tokens.is_empty())
        .collect();
    if rows.is_empty() {
        return Err(LoadError::Empty);
    }

    let size = rows.len();
    let mut dirt = Vec::new();
    let mut start: Option<Position> = None;

    for (y, tokens) in rows.iter().enumerate() {
        if tokens.len() != size {
            return Err(LoadError::NotSquare {
                row: y,
                expected: size,
                found: tokens.len(),
            });
        }
        for (x, token) in tokens.iter().enumerate() {
            let position = Position { x, y };
            match *token {
                "." => {}
                "D" => dirt.push(position),
                "S" => {
                    if start.replace(position).is_some() {
                        return Err(LoadError::MultipleStarts);
                    }
                }
                unknown => {
                    return Err(LoadError::UnknownToken {
                        token: unknown.to_string(),
                        x,
                        y,
                    });
                }
            }
        }
    }

    let environment = Environment::with_dirt(size, dirt)?;
    Ok((environment, start.unwrap_or(Position::ORIGIN)))
}
