use std::path::PathBuf;

use sapper_protocol::ParseError;
use thiserror::Error;

use crate::{CellCount, Coord, Stage};

#[derive(Error, Debug)]
pub enum GameError {
    #[error("Invalid board: {rows} rows, {cols} columns, {mines} mines")]
    Configuration {
        rows: Coord,
        cols: Coord,
        mines: CellCount,
    },
    #[error("Coordinates ({x}, {y}) are outside the board")]
    OutOfBounds { x: Coord, y: Coord },
    #[error("Invalid action: {0}")]
    InvalidAction(#[from] ParseError),
    #[error("Action not allowed while the game is {0:?}")]
    InactiveStage(Stage),
    #[error("No game has been initialized")]
    NoGame,
    #[error("Name `{0}` is already in the score table")]
    DuplicateName(String),
    #[error("Name `{0}` is not in the score table")]
    NotFound(String),
    #[error("Could not save score table to {}: {source}", path.display())]
    Serialize {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Could not load score table from {}: {reason}", path.display())]
    Deserialize { path: PathBuf, reason: String },
}

pub type Result<T> = core::result::Result<T, GameError>;
