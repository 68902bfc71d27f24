//! Match detection - finding groups of same-colored balls.
//!
//! A depth-first walk over the cached neighbor links, collecting every settled
//! ball of the seed's color. The walk keeps its own visited set, so the board
//! is left exactly as it was found.

use bevy::prelude::*;
use std::collections::HashSet;

use super::ball::BallColor;
use super::grid::Board;
use super::hex::Cell;

/// A connected group of same-colored balls.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchGroup {
    pub color: BallColor,
    /// The cell the search started from.
    pub origin: Cell,
    /// Every member, origin first.
    pub cells: Vec<Cell>,
}

impl MatchGroup {
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn contains(&self, cell: Cell) -> bool {
        self.cells.contains(&cell)
    }

    /// Whether the group is large enough to pop.
    pub fn is_destroyable(&self, min_match: usize) -> bool {
        self.len() >= min_match
    }
}

/// Find every settled ball connected to `seed` through balls of its color.
///
/// Returns `None` when `seed` holds no settled ball.
pub fn find_match(board: &Board, seed: Cell) -> Option<MatchGroup> {
    let origin = board.get(seed).filter(|ball| ball.is_settled())?;
    let color = origin.color();

    let mut cells = Vec::new();
    let mut visited = HashSet::from([seed]);
    let mut stack = vec![seed];

    while let Some(cell) = stack.pop() {
        cells.push(cell);
        let Some(ball) = board.get(cell) else {
            continue;
        };
        for neighbor in ball.neighbor_iter() {
            if visited.contains(&neighbor) {
                continue;
            }
            let joins = board
                .get(neighbor)
                .is_some_and(|other| other.is_settled() && other.matches_color(origin));
            if joins {
                visited.insert(neighbor);
                stack.push(neighbor);
            }
        }
    }

    Some(MatchGroup {
        color,
        origin: seed,
        cells,
    })
}

/// Order cells for destruction: nearest to the group's center first.
///
/// Ties keep the input order.
pub fn order_by_centroid(board: &Board, cells: &[Cell]) -> Vec<Cell> {
    let positions: Vec<(Cell, Vec2)> = cells
        .iter()
        .filter_map(|&cell| board.get(cell).map(|ball| (cell, ball.world())))
        .collect();
    if positions.is_empty() {
        return Vec::new();
    }

    let centroid =
        positions.iter().map(|(_, world)| *world).sum::<Vec2>() / positions.len() as f32;

    let mut ordered = positions;
    ordered.sort_by(|(_, a), (_, b)| {
        a.distance_squared(centroid)
            .total_cmp(&b.distance_squared(centroid))
    });
    ordered.into_iter().map(|(cell, _)| cell).collect()
}
