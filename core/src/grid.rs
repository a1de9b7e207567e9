use ndarray::Array2;
use rand::prelude::*;
use smallvec::SmallVec;

use crate::*;

/// Neighbor list of one cell, at most eight entries.
pub type Neighbors = SmallVec<[Coord2; 8]>;

/// Rectangular board of cells with a neighbor table computed once at construction.
#[derive(Clone, Debug)]
pub struct Grid {
    cells: Array2<Cell>,
    adjacency: Array2<Neighbors>,
    mine_count: CellCount,
    rng: SmallRng,
}

impl Grid {
    /// Builds a board and places `config.mines` mines uniformly at random.
    pub fn new(config: &GameConfig) -> Result<Self> {
        config.validate()?;

        let mut grid = Self::empty(config.rows, config.cols, config.seed);
        // partial shuffle: the first `mines` entries end up a uniform sample
        let mut free: Vec<Coord2> = grid.cells.iter().map(Cell::coords).collect();
        let mines = usize::from(config.mines).min(free.len());
        for place in 0..mines {
            let pick = grid.rng.random_range(place..free.len());
            free.swap(place, pick);
            grid.arm(free[place]);
        }

        // double check mine count
        if grid.mine_count != config.mines {
            log::warn!(
                "Generated grid count mismatch, actual: {}, requested: {}",
                grid.mine_count,
                config.mines
            );
        }
        log::debug!(
            "Generated {}x{} grid with {} mines",
            config.rows,
            config.cols,
            grid.mine_count
        );
        Ok(grid)
    }

    /// Builds a board with mines at exactly the given coordinates.
    pub fn from_mine_coords(rows: Coord, cols: Coord, mine_coords: &[Coord2]) -> Result<Self> {
        let mut grid = Self::empty(rows, cols, 0);
        for &coords in mine_coords {
            let coords = grid.validate_coords(coords)?;
            if !grid.at(coords).is_mine() {
                grid.arm(coords);
            }
        }
        GameConfig::new_unchecked(rows, cols, grid.mine_count, 0).validate()?;
        Ok(grid)
    }

    fn empty(rows: Coord, cols: Coord, seed: u64) -> Self {
        let shape = (usize::from(rows), usize::from(cols));
        let bounds = (cols, rows);
        let cells = Array2::from_shape_fn(shape, |(y, x)| Cell::new((x as Coord, y as Coord)));
        let adjacency = Array2::from_shape_fn(shape, |(y, x)| {
            NeighborIter::new((x as Coord, y as Coord), bounds).collect()
        });
        Self {
            cells,
            adjacency,
            mine_count: 0,
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    pub fn rows(&self) -> Coord {
        self.cells.dim().0 as Coord
    }

    pub fn cols(&self) -> Coord {
        self.cells.dim().1 as Coord
    }

    /// Board dimensions as `(rows, cols)`.
    pub fn dimensions(&self) -> (Coord, Coord) {
        (self.rows(), self.cols())
    }

    pub fn total_cells(&self) -> CellCount {
        mult(self.rows(), self.cols())
    }

    pub fn mine_count(&self) -> CellCount {
        self.mine_count
    }

    pub fn safe_cell_count(&self) -> CellCount {
        self.total_cells() - self.mine_count
    }

    pub fn contains(&self, (x, y): Coord2) -> bool {
        x < self.cols() && y < self.rows()
    }

    pub fn validate_coords(&self, coords: Coord2) -> Result<Coord2> {
        if self.contains(coords) {
            Ok(coords)
        } else {
            Err(GameError::OutOfBounds {
                x: coords.0,
                y: coords.1,
            })
        }
    }

    pub fn cell(&self, coords: Coord2) -> Result<&Cell> {
        let coords = self.validate_coords(coords)?;
        Ok(&self.cells[coords.to_nd_index()])
    }

    pub fn neighbors(&self, coords: Coord2) -> Result<&[Coord2]> {
        let coords = self.validate_coords(coords)?;
        Ok(self.adjacent(coords))
    }

    /// All cells in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = &Cell> {
        self.cells.iter()
    }

    /// Unchecked lookup for coordinates already known to be on the board.
    pub(crate) fn at(&self, coords: Coord2) -> &Cell {
        &self.cells[coords.to_nd_index()]
    }

    pub(crate) fn adjacent(&self, coords: Coord2) -> &[Coord2] {
        &self.adjacency[coords.to_nd_index()]
    }

    pub(crate) fn cell_mut(&mut self, coords: Coord2) -> &mut Cell {
        &mut self.cells[coords.to_nd_index()]
    }

    /// Moves the mine at `coords` to a random clear cell.
    ///
    /// Returns where the mine went, or `None` when `coords` held no mine.
    pub fn relocate_mine(&mut self, coords: Coord2) -> Result<Option<Coord2>> {
        let coords = self.validate_coords(coords)?;
        if !self.at(coords).is_mine() {
            return Ok(None);
        }

        let Some(target) = self.random_clear_cell() else {
            log::warn!("No clear cell left to receive the mine at {:?}", coords);
            return Ok(None);
        };
        self.arm(target);
        self.disarm(coords);
        log::debug!("Relocated mine from {:?} to {:?}", coords, target);
        Ok(Some(target))
    }

    /// Opens every cell.
    pub fn reveal_all(&mut self) {
        for cell in self.cells.iter_mut() {
            cell.open();
        }
    }

    /// Picks the n-th clear cell; scans the board, so only used for relocation.
    fn random_clear_cell(&mut self) -> Option<Coord2> {
        let free_cells = usize::from(self.total_cells() - self.mine_count);
        if free_cells == 0 {
            return None;
        }
        let place = self.rng.random_range(0..free_cells);
        self.cells
            .iter()
            .filter(|cell| cell.is_clear())
            .nth(place)
            .map(Cell::coords)
    }

    fn arm(&mut self, coords: Coord2) {
        let index = coords.to_nd_index();
        self.cells[index].set_kind(CellKind::Mine);
        self.mine_count += 1;
        for &neighbor in &self.adjacency[index] {
            self.cells[neighbor.to_nd_index()].detect_mine();
        }
    }

    fn disarm(&mut self, coords: Coord2) {
        let index = coords.to_nd_index();
        let mut mines_around = 0;
        for &neighbor in &self.adjacency[index] {
            let cell = &mut self.cells[neighbor.to_nd_index()];
            cell.lose_mine();
            if cell.is_mine() {
                mines_around += 1;
            }
        }
        let cell = &mut self.cells[index];
        cell.set_kind(CellKind::Clear);
        cell.set_mines_around(mines_around);
        self.mine_count -= 1;
    }
}
