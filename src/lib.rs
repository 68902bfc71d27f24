//! Grid core for a hexagonal bubble shooter.
//!
//! Add [`GridPlugin`] to an app, send [`LaunchLanded`] and [`GenerateLevel`]
//! messages, and read the outbound messages to drive presentation.

pub mod game;

use bevy::prelude::*;

pub use game::ball::{Ball, BallColor, BallFlags};
pub use game::config::GridConfig;
pub use game::grid::{Board, BoardError};
pub use game::hex::{Cell, GridGeometry};
pub use game::level::{GenerationReport, LevelParams};
pub use game::sequencer::{
    BallDestroyed, BallLanded, BoardCleared, BoardSettled, BoardSystems, CeilingMarked,
    DeathLineReached, GenerateLevel, GridScrolled, LandingRejected, LaunchLanded,
    LevelGenerated, MatchFound, OrphansFound,
};

pub struct GridPlugin;

impl Plugin for GridPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins(game::plugin);
    }
}
