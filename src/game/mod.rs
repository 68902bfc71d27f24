//! The grid core of the bubble shooter.
//!
//! This module contains everything that decides where balls sit and when they
//! leave:
//! - Offset hex coordinates and world mapping
//! - The board and its ceiling roots
//! - Match and orphan detection
//! - Seeded level generation
//! - The sequencer that serializes run-time changes
//! - Board conditions (cleared, death line, scrolling)

pub mod ball;
pub mod cluster;
pub mod config;
pub mod grid;
pub mod hex;
pub mod level;
pub mod orphans;
pub mod sequencer;
pub mod state;

use bevy::prelude::*;

pub(super) fn plugin(app: &mut App) {
    app.add_plugins((
        config::plugin,
        hex::plugin,
        ball::plugin,
        grid::plugin,
        sequencer::plugin,
        state::plugin,
    ));
}
