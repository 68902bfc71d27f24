//! Serialized execution of everything that changes the board at run time.
//!
//! Landings and level generation are queued and run one at a time. A landing
//! that makes a match keeps the sequencer busy while the group is destroyed
//! ball by ball and the orphan waves fall; nothing else touches the board
//! until it is idle again.

use bevy::{ecs::system::SystemParam, prelude::*};
use std::collections::VecDeque;

use super::ball::{BallColor, BallFlags};
use super::cluster::{find_match, order_by_centroid};
use super::config::GridConfig;
use super::grid::{Board, BoardError};
use super::hex::Cell;
use super::level::{self, GenerationReport, LevelParams};
use super::orphans::OrphanSweep;
use super::state::BoardConditions;

pub(super) fn plugin(app: &mut App) {
    app.init_resource::<Sequencer>();

    app.add_message::<LaunchLanded>();
    app.add_message::<GenerateLevel>();
    app.add_message::<BallLanded>();
    app.add_message::<LandingRejected>();
    app.add_message::<MatchFound>();
    app.add_message::<BallDestroyed>();
    app.add_message::<OrphansFound>();
    app.add_message::<LevelGenerated>();
    app.add_message::<CeilingMarked>();
    app.add_message::<BoardSettled>();
    app.add_message::<BoardCleared>();
    app.add_message::<DeathLineReached>();
    app.add_message::<GridScrolled>();

    app.add_systems(
        Update,
        (enqueue_commands, run_sequencer)
            .chain()
            .in_set(BoardSystems),
    );
}

/// System set for everything that reads inbound board messages and mutates
/// the board. Order presentation systems after it.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub struct BoardSystems;

/// Inbound: a launched ball stopped at `point` and should join the grid.
#[derive(Message, Debug, Clone)]
pub struct LaunchLanded {
    pub color: BallColor,
    pub point: Vec2,
}

/// Inbound: start a new level.
#[derive(Message, Debug, Clone)]
pub struct GenerateLevel(pub LevelParams);

/// Message sent when a ball snaps into the grid.
#[derive(Message, Debug, Clone)]
pub struct BallLanded {
    pub cell: Cell,
    pub color: BallColor,
}

/// Message sent when a landing found no room.
#[derive(Message, Debug, Clone)]
pub struct LandingRejected {
    pub reason: BoardError,
}

/// Message sent when a landing completes a destroyable group.
#[derive(Message, Debug, Clone)]
pub struct MatchFound {
    pub origin: Cell,
    pub color: BallColor,
    pub cells: Vec<Cell>,
}

/// Message sent for each matched ball as it leaves the board.
#[derive(Message, Debug, Clone)]
pub struct BallDestroyed {
    pub cell: Cell,
    pub color: BallColor,
}

/// Message sent for each wave of falling orphans, bottom row first.
#[derive(Message, Debug, Clone)]
pub struct OrphansFound {
    pub cells: Vec<Cell>,
}

#[derive(Message, Debug, Clone)]
pub struct LevelGenerated {
    pub report: GenerationReport,
}

/// Message sent when a row becomes the ceiling.
#[derive(Message, Debug, Clone)]
pub struct CeilingMarked {
    pub row: i32,
}

/// Message sent when the board is at rest and ready for the next shot.
#[derive(Message, Debug, Clone)]
pub struct BoardSettled;

#[derive(Message, Debug, Clone)]
pub struct BoardCleared;

#[derive(Message, Debug, Clone)]
pub struct DeathLineReached {
    pub row: i32,
}

/// Message sent when the bottom of the grid moved up. The presentation layer
/// shifts the grid by `rows * cell_height`.
#[derive(Message, Debug, Clone)]
pub struct GridScrolled {
    pub rows: i32,
}

/// A queued board operation.
#[derive(Debug, Clone, PartialEq)]
pub enum BoardCommand {
    /// A launched ball came to rest near `point`.
    Land { color: BallColor, point: Vec2 },
    /// Clear the board and build a new level.
    Generate(LevelParams),
}

/// Something that happened to the board.
#[derive(Debug, Clone, PartialEq)]
pub enum BoardEvent {
    BallLanded { cell: Cell, color: BallColor },
    LandingRejected { reason: BoardError },
    MatchFound { origin: Cell, color: BallColor, cells: Vec<Cell> },
    BallDestroyed { cell: Cell, color: BallColor },
    /// One wave of orphans, already off the board, bottom row first.
    OrphansFound { cells: Vec<Cell> },
    LevelGenerated(GenerationReport),
    CeilingMarked { row: i32 },
    /// The current operation has finished and the board is at rest.
    Settled,
    BoardCleared,
    DeathLineReached { row: i32 },
    GridScrolled { rows: i32 },
}

#[derive(Debug, Clone, Default)]
enum Phase {
    #[default]
    Idle,
    Destroying {
        queue: VecDeque<Cell>,
        wait: f32,
    },
    Falling {
        sweep: OrphanSweep,
        wait: f32,
    },
}

/// The single queue all run-time board mutations go through.
#[derive(Resource, Debug, Default)]
pub struct Sequencer {
    commands: VecDeque<BoardCommand>,
    phase: Phase,
    /// Time banked towards the next timed step.
    clock: f32,
}

impl Sequencer {
    pub fn enqueue(&mut self, command: BoardCommand) {
        self.commands.push_back(command);
    }

    pub fn pending(&self) -> usize {
        self.commands.len()
    }

    /// Nothing running and nothing queued.
    pub fn is_idle(&self) -> bool {
        matches!(self.phase, Phase::Idle) && self.commands.is_empty()
    }

    /// Let `dt` seconds pass, running every step that becomes due.
    ///
    /// A call finishes at most one command: it returns right after `Settled`,
    /// and the next queued command waits for the next call. With zero delays a
    /// whole landing, cascade included, completes in one call.
    pub fn advance(&mut self, board: &mut Board, config: &GridConfig, dt: f32) -> Vec<BoardEvent> {
        let mut events = Vec::new();
        self.clock += dt.max(0.0);

        while self.step(board, config, &mut events) {
            if matches!(events.last(), Some(BoardEvent::Settled)) {
                break;
            }
        }

        if self.is_idle() {
            self.clock = 0.0;
        }
        events
    }

    /// Run one step if it is due. Returns false when nothing could run.
    fn step(&mut self, board: &mut Board, config: &GridConfig, events: &mut Vec<BoardEvent>) -> bool {
        match &mut self.phase {
            Phase::Idle => {
                let Some(command) = self.commands.pop_front() else {
                    return false;
                };
                self.phase = match command {
                    BoardCommand::Land { color, point } => land(board, config, color, point, events),
                    BoardCommand::Generate(params) => {
                        regenerate(board, &params, events);
                        Phase::Idle
                    }
                };
                true
            }
            Phase::Destroying { queue, wait } => {
                if self.clock < *wait {
                    return false;
                }
                self.clock -= *wait;

                let Some(cell) = queue.pop_front() else {
                    self.phase = Phase::Falling {
                        sweep: OrphanSweep::new(config.max_orphan_iterations),
                        wait: 0.0,
                    };
                    return true;
                };
                if let Some(ball) = board.remove(cell) {
                    events.push(BoardEvent::BallDestroyed {
                        cell,
                        color: ball.color(),
                    });
                }
                *wait = if queue.is_empty() { 0.0 } else { config.destroy_delay };
                true
            }
            Phase::Falling { sweep, wait } => {
                if self.clock < *wait {
                    return false;
                }
                self.clock -= *wait;

                let wave = sweep.next_wave(board);
                if !wave.is_empty() {
                    let cells: Vec<Cell> = wave.iter().map(|ball| ball.cell()).collect();
                    info!("{} orphans falling", cells.len());
                    events.push(BoardEvent::OrphansFound { cells });
                }
                if sweep.is_done() {
                    events.push(BoardEvent::Settled);
                    self.phase = Phase::Idle;
                } else {
                    let staggered = config.fall_delay * wave.len().saturating_sub(1) as f32;
                    *wait = staggered + config.fall_wave_delay;
                }
                true
            }
        }
    }
}

/// Snap the ball in and decide what comes next.
fn land(
    board: &mut Board,
    config: &GridConfig,
    color: BallColor,
    point: Vec2,
    events: &mut Vec<BoardEvent>,
) -> Phase {
    let cell = match board.place(color, point) {
        Ok(cell) => cell,
        Err(reason) => {
            warn!("Landing rejected: {}", reason);
            events.push(BoardEvent::LandingRejected { reason });
            events.push(BoardEvent::Settled);
            return Phase::Idle;
        }
    };
    events.push(BoardEvent::BallLanded { cell, color });

    let group = match find_match(board, cell) {
        Some(group) if group.is_destroyable(config.min_match) => group,
        // Nothing pops, but the new ball may still be hanging from nothing.
        _ => {
            return Phase::Falling {
                sweep: OrphanSweep::new(config.max_orphan_iterations),
                wait: 0.0,
            };
        }
    };

    info!("Match of {} {:?} balls at {}", group.len(), group.color, cell);
    for &member in &group.cells {
        board.mark(member, BallFlags::MARKED_FOR_DESTROY | BallFlags::DESTROYING);
    }
    let queue = order_by_centroid(board, &group.cells).into();
    events.push(BoardEvent::MatchFound {
        origin: group.origin,
        color: group.color,
        cells: group.cells,
    });
    Phase::Destroying { queue, wait: 0.0 }
}

fn regenerate(board: &mut Board, params: &LevelParams, events: &mut Vec<BoardEvent>) {
    board.clear();
    match level::generate(board, params) {
        Ok(report) => {
            board.set_ceiling_row(report.ceiling_row);
            events.push(BoardEvent::LevelGenerated(report));
            if let Some(row) = report.ceiling_row {
                events.push(BoardEvent::CeilingMarked { row });
            }
        }
        Err(e) => {
            error!("Level generation failed: {}", e);
        }
    }
    events.push(BoardEvent::Settled);
}

/// Queue inbound messages in arrival order.
fn enqueue_commands(
    mut sequencer: ResMut<Sequencer>,
    mut levels: MessageReader<GenerateLevel>,
    mut launches: MessageReader<LaunchLanded>,
) {
    for GenerateLevel(params) in levels.read() {
        sequencer.enqueue(BoardCommand::Generate(params.clone()));
    }
    for launch in launches.read() {
        sequencer.enqueue(BoardCommand::Land {
            color: launch.color,
            point: launch.point,
        });
    }
}

/// Advance the queue by the frame time and publish what happened.
fn run_sequencer(
    time: Res<Time>,
    config: Res<GridConfig>,
    mut board: ResMut<Board>,
    mut sequencer: ResMut<Sequencer>,
    mut conditions: ResMut<BoardConditions>,
    mut outbound: BoardWriters,
) {
    if sequencer.is_idle() {
        return;
    }

    for event in sequencer.advance(&mut board, &config, time.delta_secs()) {
        match &event {
            BoardEvent::LevelGenerated(_) => conditions.reset(),
            BoardEvent::Settled => {
                for condition in conditions.evaluate(&board, &config) {
                    outbound.publish(condition);
                }
            }
            _ => {}
        }
        outbound.publish(event);
    }
}

/// One writer per outbound message.
#[derive(SystemParam)]
struct BoardWriters<'w> {
    landed: MessageWriter<'w, BallLanded>,
    rejected: MessageWriter<'w, LandingRejected>,
    matched: MessageWriter<'w, MatchFound>,
    destroyed: MessageWriter<'w, BallDestroyed>,
    orphans: MessageWriter<'w, OrphansFound>,
    generated: MessageWriter<'w, LevelGenerated>,
    ceiling: MessageWriter<'w, CeilingMarked>,
    settled: MessageWriter<'w, BoardSettled>,
    cleared: MessageWriter<'w, BoardCleared>,
    death: MessageWriter<'w, DeathLineReached>,
    scrolled: MessageWriter<'w, GridScrolled>,
}

impl BoardWriters<'_> {
    fn publish(&mut self, event: BoardEvent) {
        match event {
            BoardEvent::BallLanded { cell, color } => {
                self.landed.write(BallLanded { cell, color });
            }
            BoardEvent::LandingRejected { reason } => {
                self.rejected.write(LandingRejected { reason });
            }
            BoardEvent::MatchFound {
                origin,
                color,
                cells,
            } => {
                self.matched.write(MatchFound {
                    origin,
                    color,
                    cells,
                });
            }
            BoardEvent::BallDestroyed { cell, color } => {
                self.destroyed.write(BallDestroyed { cell, color });
            }
            BoardEvent::OrphansFound { cells } => {
                self.orphans.write(OrphansFound { cells });
            }
            BoardEvent::LevelGenerated(report) => {
                self.generated.write(LevelGenerated { report });
            }
            BoardEvent::CeilingMarked { row } => {
                self.ceiling.write(CeilingMarked { row });
            }
            BoardEvent::Settled => {
                self.settled.write(BoardSettled);
            }
            BoardEvent::BoardCleared => {
                self.cleared.write(BoardCleared);
            }
            BoardEvent::DeathLineReached { row } => {
                self.death.write(DeathLineReached { row });
            }
            BoardEvent::GridScrolled { rows } => {
                self.scrolled.write(GridScrolled { rows });
            }
        }
    }
}
