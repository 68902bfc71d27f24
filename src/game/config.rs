//! Grid configuration.
//!
//! Geometry, board size and gameplay constants, persisted as JSON in the
//! user's config directory. A missing or unreadable file falls back to
//! defaults.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use super::hex::GridGeometry;
use super::level::LevelParams;

pub(super) fn plugin(app: &mut App) {
    app.register_type::<GridConfig>();

    // An embedding app may supply its own config before adding the plugin.
    if !app.world().contains_resource::<GridConfig>() {
        app.insert_resource(GridConfig::load());
    }
}

/// Default number of rows on the board.
pub const DEFAULT_MAX_ROWS: i32 = 66;

/// Minimum group size that gets destroyed.
pub const MIN_MATCH_COUNT: usize = 3;

/// How many orphan waves a single landing may cascade through.
pub const MAX_ORPHAN_ITERATIONS: u32 = 5;

/// Resource holding every tunable the grid core reads.
#[derive(Resource, Debug, Clone, PartialEq, Reflect, Serialize, Deserialize)]
#[reflect(Resource)]
#[serde(default)]
pub struct GridConfig {
    /// World-space layout supplied by the presentation layer.
    pub geometry: GridGeometry,
    /// Total rows on the board.
    pub max_rows: i32,
    /// Balls spawned or landed on this row are anchored to the ceiling.
    pub ceiling_row: Option<i32>,
    /// Minimum group size that gets destroyed.
    pub min_match: usize,
    /// Cap on cascading orphan waves per landing.
    pub max_orphan_iterations: u32,
    /// Seconds between two destroyed balls of one match.
    pub destroy_delay: f32,
    /// Seconds between two falling balls of one orphan wave.
    pub fall_delay: f32,
    /// Seconds between orphan waves.
    pub fall_wave_delay: f32,
    /// A ball at or below this row ends the game.
    pub death_line_row: i32,
    /// Default level layout. The seed is replaced per game.
    #[reflect(ignore)]
    pub level: LevelParams,
}

impl Default for GridConfig {
    fn default() -> Self {
        let level = LevelParams::default();
        Self {
            geometry: GridGeometry::default(),
            max_rows: DEFAULT_MAX_ROWS,
            ceiling_row: Some(level.start_row + level.row_count - 1),
            min_match: MIN_MATCH_COUNT,
            max_orphan_iterations: MAX_ORPHAN_ITERATIONS,
            destroy_delay: 0.05,
            fall_delay: 0.05,
            fall_wave_delay: 0.2,
            death_line_row: 0,
            level,
        }
    }
}

impl GridConfig {
    /// A config with every delay zeroed, so queued work finishes in one step.
    pub fn instant() -> Self {
        Self {
            destroy_delay: 0.0,
            fall_delay: 0.0,
            fall_wave_delay: 0.0,
            ..Self::default()
        }
    }

    /// Clamp out-of-range values back into something usable.
    pub fn sanitized(mut self) -> Self {
        if self.max_rows < 1 {
            warn!("max_rows {} is too small, using {}", self.max_rows, DEFAULT_MAX_ROWS);
            self.max_rows = DEFAULT_MAX_ROWS;
        }
        if self.min_match < 1 {
            warn!("min_match must be at least 1, using {}", MIN_MATCH_COUNT);
            self.min_match = MIN_MATCH_COUNT;
        }
        if !(self.geometry.cell_width > 0.0 && self.geometry.cell_height > 0.0) {
            warn!("Cell size must be positive, using default geometry");
            self.geometry = GridGeometry::default();
        }
        if self.geometry.row_axis != 1.0 && self.geometry.row_axis != -1.0 {
            self.geometry.row_axis = self.geometry.row_axis.signum();
            if self.geometry.row_axis == 0.0 || self.geometry.row_axis.is_nan() {
                self.geometry.row_axis = 1.0;
            }
        }
        self.level.fill_probability = self.level.fill_probability.clamp(0.0, 1.0);
        self.destroy_delay = self.destroy_delay.max(0.0);
        self.fall_delay = self.fall_delay.max(0.0);
        self.fall_wave_delay = self.fall_wave_delay.max(0.0);
        self
    }

    /// Default location of the config file.
    pub fn file_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("bubble_grid").join("grid.json"))
    }

    /// Load from the default location.
    pub fn load() -> Self {
        let Some(path) = Self::file_path() else {
            warn!("Could not determine config directory, using default grid config");
            return Self::default();
        };
        Self::load_from(&path)
    }

    /// Load from `path`, falling back to defaults on any failure.
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            info!("No grid config at {:?}, using defaults", path);
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str::<GridConfig>(&contents) {
                Ok(config) => {
                    info!("Loaded grid config from {:?}", path);
                    config.sanitized()
                }
                Err(e) => {
                    warn!("Failed to parse grid config: {}", e);
                    Self::default()
                }
            },
            Err(e) => {
                warn!("Failed to read grid config: {}", e);
                Self::default()
            }
        }
    }

    /// Save to `path`, creating parent directories as needed.
    pub fn save_to(&self, path: &Path) {
        if let Some(parent) = path.parent()
            && let Err(e) = fs::create_dir_all(parent)
        {
            warn!("Failed to create config directory: {}", e);
            return;
        }

        match serde_json::to_string_pretty(self) {
            Ok(json) => match fs::write(path, json) {
                Ok(()) => info!("Saved grid config to {:?}", path),
                Err(e) => warn!("Failed to write grid config: {}", e),
            },
            Err(e) => warn!("Failed to serialize grid config: {}", e),
        }
    }

    /// Save to the default location.
    pub fn save(&self) {
        let Some(path) = Self::file_path() else {
            warn!("Could not determine config directory for saving grid config");
            return;
        };
        self.save_to(&path);
    }
}
