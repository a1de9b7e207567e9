use std::collections::VecDeque;
use std::mem;

use serde::{Deserialize, Serialize};

use crate::*;

/// Points a session starts with before any tick.
pub const BASE_SCORE: Score = 1;

/// Valid transitions:
/// - Launched -> Action
/// - Action -> Victory
/// - Action -> Defeat
/// - any stage other than Closed -> Closed
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stage {
    /// Board generated, waiting for the game to start
    Launched,
    /// Accepting clicks and flags
    Action,
    /// Every clear cell opened
    Victory,
    /// Mine opened after the first click
    Defeat,
    /// Game left by the player
    Closed,
}

impl Stage {
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Action)
    }
}

impl Default for Stage {
    fn default() -> Self {
        Self::Launched
    }
}

/// Represents a game from launch to close.
#[derive(Clone, Debug)]
pub struct Engine {
    grid: Grid,
    stage: Stage,
    remaining_safe_cells: CellCount,
    flags_available: CellCount,
    first_click_done: bool,
    elapsed_seconds: u32,
    score: Score,
    score_multiplier: Score,
    events: Vec<GameEvent>,
}

impl Engine {
    pub fn new(config: &GameConfig) -> Result<Self> {
        Ok(Self::from_grid(Grid::new(config)?))
    }

    pub fn from_grid(grid: Grid) -> Self {
        Self {
            remaining_safe_cells: grid.safe_cell_count(),
            flags_available: grid.mine_count(),
            grid,
            stage: Default::default(),
            first_click_done: false,
            elapsed_seconds: 0,
            score: BASE_SCORE,
            score_multiplier: 0,
            events: Vec::new(),
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn dimensions(&self) -> (Coord, Coord) {
        self.grid.dimensions()
    }

    pub fn cell(&self, coords: Coord2) -> Result<Cell> {
        self.grid.cell(coords).copied()
    }

    pub fn remaining_safe_cells(&self) -> CellCount {
        self.remaining_safe_cells
    }

    pub fn flags_available(&self) -> CellCount {
        self.flags_available
    }

    pub fn first_click_done(&self) -> bool {
        self.first_click_done
    }

    pub fn elapsed_seconds(&self) -> u32 {
        self.elapsed_seconds
    }

    pub fn score(&self) -> Score {
        self.score
    }

    pub fn score_multiplier(&self) -> Score {
        self.score_multiplier
    }

    /// Whether the one-second timer should be running.
    pub fn is_timing(&self) -> bool {
        self.stage.is_active() && self.first_click_done
    }

    /// Events produced since the last call, oldest first.
    pub fn take_events(&mut self) -> Vec<GameEvent> {
        mem::take(&mut self.events)
    }

    pub fn start(&mut self) -> Result<()> {
        if self.stage != Stage::Launched {
            return Err(GameError::InactiveStage(self.stage));
        }
        self.change_stage(Stage::Action);
        Ok(())
    }

    pub fn click(&mut self, coords: Coord2) -> Result<RevealOutcome> {
        self.check_active()?;

        let Some(cell) = self.grid.cell(coords).ok().copied() else {
            return Ok(self.ignore());
        };
        if cell.is_opened() || cell.is_flagged() {
            return Ok(self.ignore());
        }

        if cell.is_mine() {
            if self.first_click_done {
                log::debug!("Hit mine at {:?}", coords);
                self.grid.reveal_all();
                self.change_stage(Stage::Defeat);
                return Ok(RevealOutcome::HitMine);
            }
            self.grid.relocate_mine(coords)?;
        }
        if !self.first_click_done {
            log::debug!("First click at {:?}", coords);
            self.first_click_done = true;
        }

        let opened = self.flood_reveal(coords);
        if self.check_victory() {
            return Ok(RevealOutcome::Won);
        }
        self.events.push(GameEvent::FieldChanged(opened));
        Ok(RevealOutcome::Revealed)
    }

    pub fn toggle_flag(&mut self, coords: Coord2) -> Result<MarkOutcome> {
        self.check_active()?;

        let Some(cell) = self.grid.cell(coords).ok().copied() else {
            return Ok(self.ignore_mark());
        };
        if cell.is_opened() {
            return Ok(self.ignore_mark());
        }

        if cell.is_flagged() {
            self.grid.cell_mut(coords).set_flagged(false);
            self.flags_available += 1;
        } else if self.flags_available == 0 {
            return Ok(self.ignore_mark());
        } else {
            self.grid.cell_mut(coords).set_flagged(true);
            self.flags_available -= 1;
        }
        log::debug!(
            "Flag toggled at {:?}, {} flags left",
            coords,
            self.flags_available
        );

        // flags never open cells, this only fires if the board was already cleared
        if !self.check_victory() {
            self.events
                .push(GameEvent::FieldChanged(vec![*self.grid.at(coords)]));
        }
        Ok(MarkOutcome::Changed)
    }

    /// Advances the clock by one second and accrues score.
    ///
    /// Returns `false` without doing anything once the game is not timing.
    pub fn tick(&mut self) -> bool {
        if !self.is_timing() {
            return false;
        }
        self.elapsed_seconds += 1;
        let gained = self.score_multiplier / self.elapsed_seconds as Score;
        self.score = self.score.saturating_add(gained);
        log::trace!(
            "Tick {}, score {} (+{})",
            self.elapsed_seconds,
            self.score,
            gained
        );
        self.events.push(GameEvent::Tick(self.elapsed_seconds));
        true
    }

    /// Leaves the game. Closing an already closed game changes nothing.
    pub fn close(&mut self) -> bool {
        if self.stage == Stage::Closed {
            return false;
        }
        self.change_stage(Stage::Closed);
        true
    }

    /// Opens `start` and, through zero cells, everything reachable from it.
    ///
    /// Returns the cells opened, in the order they were opened.
    fn flood_reveal(&mut self, start: Coord2) -> Vec<Cell> {
        let mut opened = Vec::new();
        let mut visited = Vec::new();
        let mut to_visit = VecDeque::from([start]);

        while let Some(coords) = to_visit.pop_front() {
            let cell = self.grid.cell_mut(coords);
            if cell.is_visited() {
                continue;
            }
            cell.mark_visited();
            visited.push(coords);

            // flagged cells must be unflagged by the player first
            if cell.is_mine() || cell.is_opened() || cell.is_flagged() {
                log::trace!("Skipping cell at {:?}", coords);
                continue;
            }

            cell.open();
            let mines_around = cell.mines_around();
            self.remaining_safe_cells = self.remaining_safe_cells.saturating_sub(1);
            self.score_multiplier = self.score_multiplier.saturating_add(1);
            opened.push(coords);
            log::trace!(
                "Flood opened cell at {:?}, mine count: {}",
                coords,
                mines_around
            );

            if mines_around == 0 {
                to_visit.extend(
                    self.grid
                        .adjacent(coords)
                        .iter()
                        .filter(|&&pos| !self.grid.at(pos).is_visited()),
                );
            }
        }

        for coords in visited {
            self.grid.cell_mut(coords).clear_visited();
        }
        log::debug!(
            "Opened {} cells from {:?}, {} safe cells left",
            opened.len(),
            start,
            self.remaining_safe_cells
        );
        opened.into_iter().map(|coords| *self.grid.at(coords)).collect()
    }

    fn check_victory(&mut self) -> bool {
        if self.stage.is_active() && self.remaining_safe_cells == 0 {
            self.grid.reveal_all();
            self.change_stage(Stage::Victory);
            true
        } else {
            false
        }
    }

    fn change_stage(&mut self, new: Stage) {
        let old = self.stage;
        if old == new {
            return;
        }
        log::debug!("Stage {:?} -> {:?}", old, new);
        self.stage = new;
        self.events.push(GameEvent::StageChanged { old, new });
    }

    fn ignore(&mut self) -> RevealOutcome {
        self.events.push(GameEvent::FieldChanged(Vec::new()));
        RevealOutcome::NoChange
    }

    fn ignore_mark(&mut self) -> MarkOutcome {
        self.events.push(GameEvent::FieldChanged(Vec::new()));
        MarkOutcome::NoChange
    }

    fn check_active(&self) -> Result<()> {
        if self.stage.is_active() {
            Ok(())
        } else {
            Err(GameError::InactiveStage(self.stage))
        }
    }
}
