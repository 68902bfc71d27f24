//! Seeded level generation.
//!
//! Fills a band of rows at random, anchors the highest filled row to the
//! ceiling and optionally strips balls that would hang from nothing. The same
//! seed and parameters on the same board size always give the same layout.

use bevy::prelude::*;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::ball::BallColor;
use super::grid::{Board, BoardError};
use super::hex::{self, Cell};
use super::orphans::find_orphans;

/// Inputs to [`generate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelParams {
    pub seed: u64,
    /// First row to fill.
    pub start_row: i32,
    /// Number of rows to fill, starting at `start_row`.
    pub row_count: i32,
    /// Chance in `[0, 1]` that a cell gets a ball.
    pub fill_probability: f32,
    /// Remove balls not connected to the ceiling after filling.
    pub remove_orphans: bool,
}

impl Default for LevelParams {
    fn default() -> Self {
        Self {
            seed: 0,
            start_row: 4,
            row_count: 60,
            fill_probability: 0.8,
            remove_orphans: true,
        }
    }
}

impl LevelParams {
    pub fn with_seed(self, seed: u64) -> Self {
        Self { seed, ..self }
    }

    /// The row band requested, whether or not it fits the board.
    pub fn rows(&self) -> std::ops::Range<i32> {
        self.start_row..self.start_row.saturating_add(self.row_count.max(0))
    }
}

/// What [`generate`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GenerationReport {
    pub spawned: usize,
    /// Orphans stripped after filling.
    pub removed: usize,
    /// Row anchored to the ceiling, if anything was spawned.
    pub ceiling_row: Option<i32>,
}

/// Fill `board` from `params`. Existing balls are kept.
pub fn generate(board: &mut Board, params: &LevelParams) -> Result<GenerationReport, BoardError> {
    let mut rng = Pcg32::seed_from_u64(params.seed);
    let fill = params.fill_probability.clamp(0.0, 1.0);
    let mut report = GenerationReport::default();

    for row in params.rows() {
        if row < 0 || row >= board.max_rows() {
            warn!("Skipping level row {} outside the board", row);
            continue;
        }
        for col in 0..hex::max_columns(row) {
            if rng.random::<f32>() < fill {
                let cell = Cell::new(col, row);
                let color = BallColor::random(&mut rng);
                if board.is_occupied(cell) {
                    continue;
                }
                board.spawn(cell, color)?;
                report.spawned += 1;
            }
        }
    }

    board.finalize();

    board.clear_roots();
    report.ceiling_row = board.highest_occupied_row();
    if let Some(row) = report.ceiling_row {
        let cells: Vec<Cell> = board.row_cells(row).collect();
        for cell in cells {
            board.set_root_flag(cell, true);
        }
    }

    if params.remove_orphans {
        for cell in find_orphans(board) {
            board.remove(cell);
            report.removed += 1;
        }
    }
    board.clear_transient_marks();

    info!(
        "Generated level from seed {}: {} balls, {} orphans removed",
        params.seed, report.spawned, report.removed
    );
    Ok(report)
}
