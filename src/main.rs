//! Headless demo: generate a seeded level, then fire random shots at the
//! bottom of the grid until the board is cleared, the death line is reached or
//! the shots run out.
//!
//! Usage: `bubble_grid [seed] [shots]`

use std::time::Duration;

use bevy::{app::ScheduleRunnerPlugin, log::LogPlugin, prelude::*};
use bubble_grid::{
    BallColor, Board, BoardCleared, BoardSettled, BoardSystems, Cell, DeathLineReached,
    GenerateLevel, GridConfig, GridPlugin, GridScrolled, LandingRejected, LaunchLanded,
    LevelGenerated, MatchFound, OrphansFound, game::hex,
};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

const DEFAULT_SEED: u64 = 42;
const DEFAULT_SHOTS: u32 = 40;

fn main() -> AppExit {
    let mut args = std::env::args().skip(1);
    let seed = args
        .next()
        .and_then(|arg| arg.parse().ok())
        .unwrap_or(DEFAULT_SEED);
    let shots = args
        .next()
        .and_then(|arg| arg.parse().ok())
        .unwrap_or(DEFAULT_SHOTS);

    App::new()
        .add_plugins((
            MinimalPlugins.set(ScheduleRunnerPlugin::run_loop(Duration::from_secs_f64(
                1.0 / 60.0,
            ))),
            LogPlugin::default(),
            GridPlugin,
        ))
        .insert_resource(Shooter {
            seed,
            rng: Pcg32::seed_from_u64(seed),
            shots_left: shots,
        })
        .add_systems(Startup, (write_default_config, start_level))
        .add_systems(
            Update,
            (log_outcomes, fire_when_settled)
                .chain()
                .after(BoardSystems),
        )
        .run()
}

/// Stand-in for the launcher: picks colors and targets.
#[derive(Resource)]
struct Shooter {
    seed: u64,
    rng: Pcg32,
    shots_left: u32,
}

/// First run: leave the defaults on disk so they can be tuned.
fn write_default_config(config: Res<GridConfig>) {
    if GridConfig::file_path().is_some_and(|path| !path.exists()) {
        config.save();
    }
}

fn start_level(config: Res<GridConfig>, shooter: Res<Shooter>, mut levels: MessageWriter<GenerateLevel>) {
    info!("Starting level with seed {}", shooter.seed);
    levels.write(GenerateLevel(config.level.clone().with_seed(shooter.seed)));
}

fn log_outcomes(
    mut generated: MessageReader<LevelGenerated>,
    mut matches: MessageReader<MatchFound>,
    mut orphans: MessageReader<OrphansFound>,
    mut scrolls: MessageReader<GridScrolled>,
    mut rejected: MessageReader<LandingRejected>,
    mut cleared: MessageReader<BoardCleared>,
    mut death: MessageReader<DeathLineReached>,
    mut exit: MessageWriter<AppExit>,
) {
    for level in generated.read() {
        info!(
            "Level ready: {} balls, {} orphans stripped, ceiling at row {:?}",
            level.report.spawned, level.report.removed, level.report.ceiling_row
        );
    }
    for group in matches.read() {
        info!("Popped {} {:?} balls", group.cells.len(), group.color);
    }
    for wave in orphans.read() {
        info!("{} balls fell", wave.cells.len());
    }
    for scroll in scrolls.read() {
        info!("Grid scrolled by {} rows", scroll.rows);
    }
    for rejection in rejected.read() {
        warn!("Shot rejected: {}", rejection.reason);
    }
    if cleared.read().count() > 0 {
        info!("Board cleared!");
        exit.write(AppExit::Success);
    }
    if let Some(line) = death.read().last() {
        info!("Game over: ball reached row {}", line.row);
        exit.write(AppExit::Success);
    }
}

/// Fire the next shot once the board has come to rest.
fn fire_when_settled(
    board: Res<Board>,
    mut shooter: ResMut<Shooter>,
    mut settled: MessageReader<BoardSettled>,
    mut launches: MessageWriter<LaunchLanded>,
    mut exit: MessageWriter<AppExit>,
) {
    if settled.read().count() == 0 {
        return;
    }
    if shooter.shots_left == 0 {
        info!("Out of shots, {} balls left", board.len());
        exit.write(AppExit::Success);
        return;
    }
    let Some(lowest) = board.lowest_occupied_row() else {
        return;
    };

    // Aim one row under the current bottom of the grid.
    let row = (lowest - 1).max(0);
    let col = shooter.rng.random_range(0..hex::max_columns(row));
    let color = BallColor::random(&mut shooter.rng);
    let point = board.geometry().cell_to_world(Cell::new(col, row));

    shooter.shots_left -= 1;
    debug!("Shooting {:?} at {}", color, Cell::new(col, row));
    launches.write(LaunchLanded { color, point });
}
