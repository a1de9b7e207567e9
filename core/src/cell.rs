use serde::{Deserialize, Serialize};

use crate::*;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CellKind {
    Clear,
    Mine,
}

impl Default for CellKind {
    fn default() -> Self {
        Self::Clear
    }
}

/// State of a single board position.
///
/// `mines_around` is kept up to date for every cell, mined or not, so that a
/// mine moved away during first-click relocation leaves a correct count behind.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    coords: Coord2,
    kind: CellKind,
    opened: bool,
    flagged: bool,
    #[serde(skip)]
    visited: bool,
    mines_around: u8,
}

impl Cell {
    pub const fn new(coords: Coord2) -> Self {
        Self {
            coords,
            kind: CellKind::Clear,
            opened: false,
            flagged: false,
            visited: false,
            mines_around: 0,
        }
    }

    pub const fn coords(&self) -> Coord2 {
        self.coords
    }

    pub const fn is_mine(&self) -> bool {
        matches!(self.kind, CellKind::Mine)
    }

    pub const fn is_clear(&self) -> bool {
        matches!(self.kind, CellKind::Clear)
    }

    pub const fn is_opened(&self) -> bool {
        self.opened
    }

    pub const fn is_flagged(&self) -> bool {
        self.flagged
    }

    pub const fn mines_around(&self) -> u8 {
        self.mines_around
    }

    pub(crate) const fn is_visited(&self) -> bool {
        self.visited
    }

    pub(crate) fn set_kind(&mut self, kind: CellKind) {
        self.kind = kind;
    }

    pub(crate) fn set_mines_around(&mut self, count: u8) {
        self.mines_around = count;
    }

    pub(crate) fn detect_mine(&mut self) {
        self.mines_around += 1;
    }

    pub(crate) fn lose_mine(&mut self) {
        self.mines_around = self.mines_around.saturating_sub(1);
    }

    pub(crate) fn open(&mut self) {
        self.opened = true;
    }

    pub(crate) fn set_flagged(&mut self, flagged: bool) {
        self.flagged = flagged;
    }

    pub(crate) fn mark_visited(&mut self) {
        self.visited = true;
    }

    pub(crate) fn clear_visited(&mut self) {
        self.visited = false;
    }
}
