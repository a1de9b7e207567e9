//! Rules engine for a grid-based mine-clearing puzzle.
//!
//! [`Grid`] holds the board, [`Engine`] drives a single game, [`Session`]
//! serializes player actions with the one-second timer and fans events out to
//! listeners, [`Leaderboard`] persists results and [`Gateway`] turns raw player
//! intents into session calls.

use std::path::PathBuf;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

pub use cell::*;
pub use engine::*;
pub use error::*;
pub use event::*;
pub use gateway::*;
pub use grid::*;
pub use leaderboard::*;
pub use session::*;
pub use types::*;

pub use sapper_protocol::{Intent, ParseError, RawCoord};

mod cell;
mod engine;
mod error;
mod event;
mod gateway;
mod grid;
mod leaderboard;
mod session;
mod types;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameConfig {
    pub rows: Coord,
    pub cols: Coord,
    pub mines: CellCount,
    /// Seed for mine placement and relocation.
    pub seed: u64,
}

impl GameConfig {
    pub(crate) const fn new_unchecked(rows: Coord, cols: Coord, mines: CellCount, seed: u64) -> Self {
        Self {
            rows,
            cols,
            mines,
            seed,
        }
    }

    /// Board with a seed taken from the system clock.
    pub fn new(rows: Coord, cols: Coord, mines: CellCount) -> Self {
        Self::new_unchecked(rows, cols, mines, clock_seed())
    }

    pub const fn with_seed(rows: Coord, cols: Coord, mines: CellCount, seed: u64) -> Self {
        Self::new_unchecked(rows, cols, mines, seed)
    }

    pub fn beginner() -> Self {
        Self::new(9, 9, 10)
    }

    pub fn intermediate() -> Self {
        Self::new(16, 16, 40)
    }

    pub fn expert() -> Self {
        Self::new(16, 30, 99)
    }

    pub const fn total_cells(&self) -> CellCount {
        mult(self.rows, self.cols)
    }

    /// A board needs at least one row, one column, one mine and one clear cell.
    pub fn validate(&self) -> Result<()> {
        if self.rows < 1 || self.cols < 1 || self.mines < 1 || self.mines >= self.total_cells() {
            Err(GameError::Configuration {
                rows: self.rows,
                cols: self.cols,
                mines: self.mines,
            })
        } else {
            Ok(())
        }
    }
}

fn clock_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_nanos() as u64)
        .unwrap_or_default()
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub leaderboard_path: PathBuf,
    pub tick_interval: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            leaderboard_path: PathBuf::from("score.json"),
            tick_interval: Duration::from_secs(1),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarkOutcome {
    NoChange,
    Changed,
}

impl MarkOutcome {
    pub const fn has_update(self) -> bool {
        match self {
            Self::NoChange => false,
            Self::Changed => true,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RevealOutcome {
    NoChange,
    Revealed,
    HitMine,
    Won,
}

impl RevealOutcome {
    pub const fn has_update(self) -> bool {
        use RevealOutcome::*;
        match self {
            NoChange => false,
            Revealed => true,
            HitMine => true,
            Won => true,
        }
    }
}
