//! The hexagonal grid that holds all balls.
//!
//! Storage is one `Vec` per row, sized by the row's column count, so a slot
//! index is the column. The board is the single source of truth for topology:
//! it owns the balls, keeps each ball's cached neighbor links current and
//! mirrors every `ROOT` flag in the root set.

use bevy::prelude::*;
use std::collections::BTreeSet;

use super::ball::{Ball, BallColor, BallFlags, BallHandle, BallId};
use super::config::GridConfig;
use super::hex::{self, Cell, GridGeometry};

pub(super) fn plugin(app: &mut App) {
    app.init_resource::<Board>();
}

/// Why a grid mutation was refused.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BoardError {
    /// The cell lies outside the grid.
    InvalidPosition(Cell),
    /// No empty cell within the search radius of the landing point.
    NoSpaceFound { point: Vec2 },
    /// A write into an occupied slot. Only a broken invariant can cause this.
    DuplicateOccupancy(Cell),
}

impl std::fmt::Display for BoardError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BoardError::InvalidPosition(cell) => write!(f, "cell {cell} is outside the grid"),
            BoardError::NoSpaceFound { point } => {
                write!(f, "no empty cell near ({:.2}, {:.2})", point.x, point.y)
            }
            BoardError::DuplicateOccupancy(cell) => write!(f, "cell {cell} is already occupied"),
        }
    }
}

impl std::error::Error for BoardError {}

/// The grid resource holding every ball.
#[derive(Resource, Debug, Clone)]
pub struct Board {
    rows: Vec<Vec<Option<Ball>>>,
    /// Cells whose ball carries `ROOT`. Sorted, so traversal order is stable.
    roots: BTreeSet<Cell>,
    geometry: GridGeometry,
    ceiling_row: Option<i32>,
    next_id: u64,
}

impl FromWorld for Board {
    fn from_world(world: &mut World) -> Self {
        match world.get_resource::<GridConfig>() {
            Some(config) => Self::from_config(config),
            None => Self::from_config(&GridConfig::default()),
        }
    }
}

impl Board {
    /// Create an empty board.
    pub fn new(max_rows: i32, geometry: GridGeometry, ceiling_row: Option<i32>) -> Self {
        let mut board = Self {
            rows: Vec::new(),
            roots: BTreeSet::new(),
            geometry,
            ceiling_row,
            next_id: 1,
        };
        board.initialize(max_rows);
        board
    }

    pub fn from_config(config: &GridConfig) -> Self {
        Self::new(config.max_rows, config.geometry, config.ceiling_row)
    }

    /// Drop every ball and allocate `max_rows` empty rows.
    pub fn initialize(&mut self, max_rows: i32) {
        self.rows = (0..max_rows.max(0))
            .map(|row| vec![None; hex::max_columns(row) as usize])
            .collect();
        self.roots.clear();
    }

    /// Remove every ball, keeping the board size.
    pub fn clear(&mut self) {
        self.initialize(self.max_rows());
    }

    pub fn max_rows(&self) -> i32 {
        self.rows.len() as i32
    }

    pub fn geometry(&self) -> &GridGeometry {
        &self.geometry
    }

    pub fn ceiling_row(&self) -> Option<i32> {
        self.ceiling_row
    }

    /// Row whose balls get rooted on `spawn` and `place` from now on. Balls
    /// already on the board keep their root state.
    pub fn set_ceiling_row(&mut self, row: Option<i32>) {
        self.ceiling_row = row;
    }

    pub fn is_valid(&self, cell: Cell) -> bool {
        hex::is_valid(cell, self.max_rows())
    }

    fn slot(&self, cell: Cell) -> Option<&Option<Ball>> {
        if !self.is_valid(cell) {
            return None;
        }
        self.rows
            .get(cell.row as usize)
            .and_then(|row| row.get(cell.col as usize))
    }

    fn slot_mut(&mut self, cell: Cell) -> Option<&mut Option<Ball>> {
        if !self.is_valid(cell) {
            return None;
        }
        self.rows
            .get_mut(cell.row as usize)
            .and_then(|row| row.get_mut(cell.col as usize))
    }

    /// The ball at `cell`, if any.
    pub fn get(&self, cell: Cell) -> Option<&Ball> {
        self.slot(cell).and_then(Option::as_ref)
    }

    pub(super) fn get_mut(&mut self, cell: Cell) -> Option<&mut Ball> {
        self.slot_mut(cell).and_then(Option::as_mut)
    }

    pub fn is_occupied(&self, cell: Cell) -> bool {
        self.get(cell).is_some()
    }

    /// Whether `cell` is inside the grid and free.
    pub fn is_vacant(&self, cell: Cell) -> bool {
        matches!(self.slot(cell), Some(None))
    }

    fn allocate_id(&mut self) -> BallId {
        let id = BallId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Put a fresh ball into an empty slot and apply the resting flags.
    fn settle(&mut self, cell: Cell, color: BallColor) -> Result<(), BoardError> {
        if !self.is_valid(cell) {
            return Err(BoardError::InvalidPosition(cell));
        }
        if self.is_occupied(cell) {
            error!("Refusing to overwrite occupied cell {}", cell);
            return Err(BoardError::DuplicateOccupancy(cell));
        }

        let id = self.allocate_id();
        let world = self.geometry.cell_to_world(cell);
        let mut ball = Ball::new(id, color, cell, world);
        ball.flags.insert(BallFlags::PINNED);

        if let Some(slot) = self.slot_mut(cell) {
            *slot = Some(ball);
        }
        if self.ceiling_row == Some(cell.row) {
            self.set_root_flag(cell, true);
        }
        Ok(())
    }

    /// Create a pinned ball at `cell`.
    ///
    /// Neighbor links are not updated; call [`Board::finalize`] after a batch
    /// of spawns.
    pub fn spawn(&mut self, cell: Cell, color: BallColor) -> Result<&Ball, BoardError> {
        self.settle(cell, color)?;
        self.get(cell).ok_or(BoardError::InvalidPosition(cell))
    }

    /// Snap a landed ball into the empty cell nearest to `point`.
    ///
    /// The new ball and all of its neighbors get fresh links.
    pub fn place(&mut self, color: BallColor, point: Vec2) -> Result<Cell, BoardError> {
        let cell = hex::nearest_empty_cell(point, &self.geometry, self.max_rows(), |cell| {
            self.is_vacant(cell)
        })
        .ok_or(BoardError::NoSpaceFound { point })?;

        self.settle(cell, color)?;
        self.relink_neighbors(cell);
        self.relink_around(cell);
        debug!("Placed {:?} ball at {}", color, cell);
        Ok(cell)
    }

    /// Take the ball out of `cell` and relink its former neighbors.
    ///
    /// The ball is handed back; whatever happens to it next is the caller's
    /// business.
    pub fn remove(&mut self, cell: Cell) -> Option<Ball> {
        let ball = self.slot_mut(cell)?.take()?;
        self.roots.remove(&cell);
        self.relink_around(cell);
        Some(ball)
    }

    /// Remove a specific ball, but only if its slot still holds it.
    pub fn remove_ball(&mut self, handle: BallHandle) -> Option<Ball> {
        match self.get(handle.cell) {
            Some(ball) if ball.id() == handle.id => self.remove(handle.cell),
            _ => None,
        }
    }

    /// Detach an orphan so it can fall: off the board, unpinned, falling.
    pub fn drop_ball(&mut self, cell: Cell) -> Option<Ball> {
        let mut ball = self.remove(cell)?;
        ball.flags.remove(BallFlags::PINNED | BallFlags::ROOT);
        ball.flags.insert(BallFlags::FALLING);
        Some(ball)
    }

    /// Recompute the cached neighbor links of the ball at `cell`.
    pub fn relink_neighbors(&mut self, cell: Cell) {
        let links = hex::neighbor_cells(cell, self.max_rows())
            .map(|neighbor| neighbor.filter(|&neighbor| self.is_occupied(neighbor)));
        if let Some(ball) = self.get_mut(cell) {
            ball.neighbors = links;
        }
    }

    /// Relink every occupied cell adjacent to `cell`.
    fn relink_around(&mut self, cell: Cell) {
        for neighbor in hex::neighbor_cells(cell, self.max_rows())
            .into_iter()
            .flatten()
        {
            if self.is_occupied(neighbor) {
                self.relink_neighbors(neighbor);
            }
        }
    }

    /// Relink every ball once. Use after bulk spawning.
    pub fn finalize(&mut self) {
        let cells: Vec<Cell> = self.cells().collect();
        for cell in cells {
            self.relink_neighbors(cell);
        }
    }

    /// Clear the traversal marks on every ball.
    pub fn clear_transient_marks(&mut self) {
        for ball in self.rows.iter_mut().flatten().flatten() {
            ball.flags.remove(BallFlags::TRANSIENT);
        }
    }

    /// Set or clear `ROOT` on the ball at `cell`, keeping the root set in step.
    ///
    /// Rooting a ball also pins it. Returns false if the cell is empty.
    pub fn set_root_flag(&mut self, cell: Cell, root: bool) -> bool {
        let Some(ball) = self.get_mut(cell) else {
            return false;
        };
        if root {
            ball.flags.insert(BallFlags::ROOT | BallFlags::PINNED);
            self.roots.insert(cell);
        } else {
            ball.flags.remove(BallFlags::ROOT);
            self.roots.remove(&cell);
        }
        true
    }

    /// Cells currently anchored to the ceiling.
    pub fn roots(&self) -> impl Iterator<Item = Cell> + '_ {
        self.roots.iter().copied()
    }

    pub fn root_count(&self) -> usize {
        self.roots.len()
    }

    /// Unroot everything.
    pub fn clear_roots(&mut self) {
        let roots: Vec<Cell> = self.roots().collect();
        for cell in roots {
            self.set_root_flag(cell, false);
        }
    }

    /// Set flags on the ball at `cell`. `ROOT` goes through the root set.
    pub fn mark(&mut self, cell: Cell, flags: BallFlags) -> bool {
        if flags.contains(BallFlags::ROOT) {
            self.set_root_flag(cell, true);
        }
        let Some(ball) = self.get_mut(cell) else {
            return false;
        };
        ball.flags.insert(flags);
        true
    }

    /// Clear flags on the ball at `cell`. Unpinning a ball also unroots it.
    pub fn unmark(&mut self, cell: Cell, flags: BallFlags) -> bool {
        if flags.intersects(BallFlags::ROOT | BallFlags::PINNED) {
            self.set_root_flag(cell, false);
        }
        let Some(ball) = self.get_mut(cell) else {
            return false;
        };
        ball.flags.remove(flags);
        true
    }

    /// Every ball, row by row, left to right.
    pub fn iter(&self) -> impl Iterator<Item = &Ball> {
        self.rows.iter().flatten().flatten()
    }

    /// Every occupied cell, in [`Board::iter`] order.
    pub fn cells(&self) -> impl Iterator<Item = Cell> + '_ {
        self.iter().map(Ball::cell)
    }

    /// Occupied cells of one row.
    pub fn row_cells(&self, row: i32) -> impl Iterator<Item = Cell> + '_ {
        usize::try_from(row)
            .ok()
            .and_then(|index| self.rows.get(index))
            .into_iter()
            .flatten()
            .flatten()
            .map(Ball::cell)
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    /// Largest row index holding a ball.
    pub fn highest_occupied_row(&self) -> Option<i32> {
        self.rows
            .iter()
            .rposition(|row| row.iter().any(Option::is_some))
            .map(|row| row as i32)
    }

    /// Smallest row index holding a ball.
    pub fn lowest_occupied_row(&self) -> Option<i32> {
        self.rows
            .iter()
            .position(|row| row.iter().any(Option::is_some))
            .map(|row| row as i32)
    }
}
