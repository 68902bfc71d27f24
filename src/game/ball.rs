//! Balls - the entities that occupy grid cells.
//!
//! A ball carries its color, a small set of state flags and a cached view of
//! its six neighbors. The [`Board`](super::grid::Board) owns every ball and is
//! the only place that rewrites positions, neighbor links and the root flag.

use bevy::prelude::*;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::hex::Cell;

pub(super) fn plugin(app: &mut App) {
    app.register_type::<BallColor>();
}

/// The six ball colors.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Reflect, Default, Serialize, Deserialize,
)]
pub enum BallColor {
    #[default]
    Yellow,
    Blue,
    Red,
    Green,
    Purple,
    Pink,
}

impl BallColor {
    /// Every color, in index order.
    pub const ALL: [BallColor; 6] = [
        BallColor::Yellow,
        BallColor::Blue,
        BallColor::Red,
        BallColor::Green,
        BallColor::Purple,
        BallColor::Pink,
    ];

    /// Color for an index in `0..6`.
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Pick a color uniformly at random.
    pub fn random(rng: &mut impl Rng) -> Self {
        Self::ALL[rng.random_range(0..Self::ALL.len())]
    }
}

/// Ball state bits.
///
/// `PINNED` and `FALLING` are never both set on a live ball, and `ROOT`
/// implies `PINNED`. The three `MARK*` bits are transient traversal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BallFlags(u8);

impl BallFlags {
    pub const NONE: Self = Self(0);
    /// Resting on the grid.
    pub const PINNED: Self = Self(1 << 0);
    /// Detached and dropping off the board.
    pub const FALLING: Self = Self(1 << 1);
    /// Destruction in progress.
    pub const DESTROYING: Self = Self(1 << 2);
    /// Queued for destruction.
    pub const MARKED_FOR_DESTROY: Self = Self(1 << 3);
    /// Visited by a match search.
    pub const MARKED_FOR_MATCH: Self = Self(1 << 4);
    /// Reached from a root during orphan analysis.
    pub const MARK_CONNECTED: Self = Self(1 << 5);
    /// Anchored to the ceiling.
    pub const ROOT: Self = Self(1 << 6);

    /// The marks cleared before each traversal.
    pub const TRANSIENT: Self = Self(
        Self::MARK_CONNECTED.0 | Self::MARKED_FOR_MATCH.0 | Self::MARKED_FOR_DESTROY.0,
    );

    /// True if every bit of `other` is set.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// True if any bit of `other` is set.
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: Self) {
        self.0 &= !other.0;
    }
}

impl std::ops::BitOr for BallFlags {
    type Output = Self;

    fn bitor(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

impl std::ops::BitOrAssign for BallFlags {
    fn bitor_assign(&mut self, other: Self) {
        self.0 |= other.0;
    }
}

impl std::ops::BitAnd for BallFlags {
    type Output = Self;

    fn bitand(self, other: Self) -> Self {
        Self(self.0 & other.0)
    }
}

impl std::ops::Not for BallFlags {
    type Output = Self;

    fn not(self) -> Self {
        Self(!self.0)
    }
}

/// Board-unique identifier, never reused within one board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BallId(pub u64);

/// Enough to find a specific ball again: where it was and who it was.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BallHandle {
    pub id: BallId,
    pub cell: Cell,
}

/// A ball sitting in (or just taken out of) a grid cell.
#[derive(Debug, Clone, PartialEq)]
pub struct Ball {
    id: BallId,
    color: BallColor,
    cell: Cell,
    world: Vec2,
    pub(super) flags: BallFlags,
    pub(super) neighbors: [Option<Cell>; 6],
}

impl Ball {
    pub(super) fn new(id: BallId, color: BallColor, cell: Cell, world: Vec2) -> Self {
        Self {
            id,
            color,
            cell,
            world,
            flags: BallFlags::NONE,
            neighbors: [None; 6],
        }
    }

    pub fn id(&self) -> BallId {
        self.id
    }

    pub fn handle(&self) -> BallHandle {
        BallHandle {
            id: self.id,
            cell: self.cell,
        }
    }

    pub fn color(&self) -> BallColor {
        self.color
    }

    /// The cell this ball occupies (or last occupied, once removed).
    pub fn cell(&self) -> Cell {
        self.cell
    }

    /// World position of the cell center.
    pub fn world(&self) -> Vec2 {
        self.world
    }

    pub fn flags(&self) -> BallFlags {
        self.flags
    }

    pub fn has(&self, flags: BallFlags) -> bool {
        self.flags.contains(flags)
    }

    /// Occupied neighbor cells, in direction order. Absent entries are `None`.
    pub fn neighbors(&self) -> &[Option<Cell>; 6] {
        &self.neighbors
    }

    /// Occupied neighbor cells, skipping gaps.
    pub fn neighbor_iter(&self) -> impl Iterator<Item = Cell> + '_ {
        self.neighbors.iter().flatten().copied()
    }

    /// Whether this ball rests on the grid and is not being destroyed.
    ///
    /// Both flood fills only ever walk through balls like this.
    pub fn is_settled(&self) -> bool {
        self.has(BallFlags::PINNED) && !self.has(BallFlags::DESTROYING)
    }

    pub fn matches_color(&self, other: &Ball) -> bool {
        self.color == other.color
    }
}
