//! Board conditions - cleared board, death line, grid scrolling.
//!
//! Checked every time the board settles.
//! Win: no ball left.
//! Lose: the lowest ball reaches the death line.

use bevy::prelude::*;

use super::config::GridConfig;
use super::grid::Board;
use super::sequencer::BoardEvent;

pub(super) fn plugin(app: &mut App) {
    app.init_resource::<BoardConditions>();
    app.register_type::<BoardConditions>();
}

/// Tracks the lowest occupied row between evaluations.
#[derive(Resource, Debug, Default, Reflect)]
#[reflect(Resource)]
pub struct BoardConditions {
    lowest_row: Option<i32>,
}

impl BoardConditions {
    /// Forget the last seen row, e.g. after a new level.
    pub fn reset(&mut self) {
        self.lowest_row = None;
    }

    pub fn lowest_row(&self) -> Option<i32> {
        self.lowest_row
    }

    /// Compare the board against the last evaluation.
    pub fn evaluate(&mut self, board: &Board, config: &GridConfig) -> Vec<BoardEvent> {
        let mut events = Vec::new();

        let Some(lowest) = board.lowest_occupied_row() else {
            info!("Board cleared");
            self.lowest_row = None;
            events.push(BoardEvent::BoardCleared);
            return events;
        };

        // The game is over; the scroll baseline stays where it was.
        if lowest <= config.death_line_row {
            info!("Ball reached the death line at row {}", lowest);
            events.push(BoardEvent::DeathLineReached { row: lowest });
            return events;
        }

        if let Some(previous) = self.lowest_row
            && lowest > previous
        {
            let rows = lowest - previous;
            debug!("Grid scrolls by {} rows", rows);
            events.push(BoardEvent::GridScrolled { rows });
        }
        self.lowest_row = Some(lowest);

        events
    }
}
