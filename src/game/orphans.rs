//! Orphan detection - balls no longer hanging from the ceiling.
//!
//! Every root is a flood-fill source. Whatever the fill cannot reach through
//! settled balls is an orphan.

use bevy::prelude::*;

use super::ball::{Ball, BallFlags};
use super::grid::Board;
use super::hex::Cell;

/// Find every settled ball with no path to a root.
///
/// Leaves `MARK_CONNECTED` on every reachable ball; the next call clears it
/// first, so calling twice in a row gives the same answer. Orphans come back
/// bottom row first, then left to right.
pub fn find_orphans(board: &mut Board) -> Vec<Cell> {
    board.clear_transient_marks();

    let mut stack: Vec<Cell> = board
        .roots()
        .filter(|&root| board.get(root).is_some_and(Ball::is_settled))
        .collect();
    for &root in &stack {
        board.mark(root, BallFlags::MARK_CONNECTED);
    }

    while let Some(cell) = stack.pop() {
        let Some(ball) = board.get(cell) else {
            continue;
        };
        let next: Vec<Cell> = ball
            .neighbor_iter()
            .filter(|&neighbor| {
                board.get(neighbor).is_some_and(|other| {
                    other.is_settled() && !other.has(BallFlags::MARK_CONNECTED)
                })
            })
            .collect();
        for neighbor in next {
            board.mark(neighbor, BallFlags::MARK_CONNECTED);
            stack.push(neighbor);
        }
    }

    let mut orphans: Vec<Cell> = board
        .iter()
        .filter(|ball| {
            ball.is_settled()
                && !ball.has(BallFlags::MARKED_FOR_DESTROY)
                && !ball.has(BallFlags::MARK_CONNECTED)
        })
        .map(Ball::cell)
        .collect();
    orphans.sort_by(|a, b| b.row.cmp(&a.row).then(a.col.cmp(&b.col)));
    orphans
}

/// Cascading orphan removal after a match, one wave at a time.
#[derive(Debug, Clone, PartialEq)]
pub struct OrphanSweep {
    max_iterations: u32,
    iterations: u32,
    done: bool,
}

impl OrphanSweep {
    pub fn new(max_iterations: u32) -> Self {
        Self {
            max_iterations,
            iterations: 0,
            done: max_iterations == 0,
        }
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    /// Drop the current orphans off the board and return them.
    ///
    /// An empty wave, or reaching the iteration cap, ends the sweep.
    pub fn next_wave(&mut self, board: &mut Board) -> Vec<Ball> {
        if self.done {
            return Vec::new();
        }

        let orphans = find_orphans(board);
        self.iterations += 1;
        if orphans.is_empty() || self.iterations >= self.max_iterations {
            self.done = true;
        }

        let wave: Vec<Ball> = orphans
            .into_iter()
            .filter_map(|cell| board.drop_ball(cell))
            .collect();
        board.clear_transient_marks();
        if !wave.is_empty() {
            debug!("Orphan wave {} dropped {} balls", self.iterations, wave.len());
        }
        wave
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::ball::BallColor;
    use crate::game::grid::tests::{assert_consistent, board};
    use crate::game::hex;
    use proptest::prelude::*;

    /// Rows 0 and 1 full, row 1 is the ceiling.
    fn two_full_rows() -> Board {
        let mut board = Board::new(4, hex::GridGeometry::default(), Some(1));
        for row in 0..2 {
            for col in 0..hex::max_columns(row) {
                board.spawn(Cell::new(col, row), BallColor::Blue).unwrap();
            }
        }
        board.finalize();
        board
    }

    #[test]
    fn test_everything_hangs_from_full_ceiling() {
        let mut board = two_full_rows();
        assert_eq!(board.root_count(), 10);
        assert!(find_orphans(&mut board).is_empty());
    }

    #[test]
    fn test_removing_roots_orphans_the_rest() {
        let mut board = two_full_rows();
        for col in 0..10 {
            board.remove(Cell::new(col, 1));
        }
        let orphans = find_orphans(&mut board);
        assert_eq!(orphans.len(), 11);
        assert_eq!(orphans[0], Cell::new(0, 0));
        assert_eq!(orphans[10], Cell::new(10, 0));
    }

    #[test]
    fn test_losing_the_only_root() {
        let mut board = Board::new(2, hex::GridGeometry::default(), Some(1));
        board.spawn(Cell::new(0, 1), BallColor::Red).unwrap();
        board.spawn(Cell::new(0, 0), BallColor::Blue).unwrap();
        board.finalize();
        assert!(find_orphans(&mut board).is_empty());

        board.remove(Cell::new(0, 1));
        assert_eq!(find_orphans(&mut board), vec![Cell::new(0, 0)]);
    }

    #[test]
    fn test_single_root_holds_its_neighborhood() {
        let mut board = two_full_rows();
        for col in 1..10 {
            board.remove(Cell::new(col, 1));
        }
        // (0, 1) touches (0, 0) and (1, 0); the fill walks the whole of row 0.
        assert!(find_orphans(&mut board).is_empty());

        board.remove(Cell::new(5, 0));
        let orphans = find_orphans(&mut board);
        assert_eq!(
            orphans,
            (6..11).map(|col| Cell::new(col, 0)).collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_orders_bottom_row_first() {
        let mut board = board(6);
        board.spawn(Cell::new(3, 1), BallColor::Red).unwrap();
        board.spawn(Cell::new(0, 4), BallColor::Red).unwrap();
        board.spawn(Cell::new(2, 4), BallColor::Red).unwrap();
        board.finalize();

        assert_eq!(
            find_orphans(&mut board),
            vec![Cell::new(0, 4), Cell::new(2, 4), Cell::new(3, 1)]
        );
    }

    #[test]
    fn test_destroying_balls_are_neither_paths_nor_orphans() {
        let mut board = Board::new(6, hex::GridGeometry::default(), Some(3));
        board.spawn(Cell::new(4, 3), BallColor::Red).unwrap();
        board.spawn(Cell::new(4, 2), BallColor::Red).unwrap();
        board.spawn(Cell::new(4, 1), BallColor::Red).unwrap();
        board.finalize();
        assert!(find_orphans(&mut board).is_empty());

        board.mark(Cell::new(4, 2), BallFlags::DESTROYING);
        assert_eq!(find_orphans(&mut board), vec![Cell::new(4, 1)]);
    }

    #[test]
    fn test_sweep_drops_and_stops() {
        let mut board = two_full_rows();
        for col in 0..10 {
            board.remove(Cell::new(col, 1));
        }

        let mut sweep = OrphanSweep::new(5);
        let wave = sweep.next_wave(&mut board);
        assert_eq!(wave.len(), 11);
        assert!(wave.iter().all(|ball| ball.has(BallFlags::FALLING)));
        assert!(board.is_empty());
        assert!(!sweep.is_done());

        assert!(sweep.next_wave(&mut board).is_empty());
        assert!(sweep.is_done());
        assert_eq!(sweep.iterations(), 2);
    }

    #[test]
    fn test_sweep_respects_cap() {
        let mut board = board(4);
        board.spawn(Cell::new(0, 0), BallColor::Red).unwrap();
        board.finalize();

        let mut sweep = OrphanSweep::new(1);
        assert_eq!(sweep.next_wave(&mut board).len(), 1);
        assert!(sweep.is_done());

        let mut idle = OrphanSweep::new(0);
        assert!(idle.is_done());
        assert!(idle.next_wave(&mut board).is_empty());
    }

    proptest! {
        #[test]
        fn prop_orphans_idempotent(
            occupied in prop::collection::vec(any::<bool>(), 6 * 11),
            ceiling in 0i32..6,
        ) {
            let mut board = Board::new(6, hex::GridGeometry::default(), Some(ceiling));
            let mut index = 0;
            for row in 0..6 {
                for col in 0..hex::max_columns(row) {
                    if occupied[index] {
                        board.spawn(Cell::new(col, row), BallColor::Red).unwrap();
                    }
                    index += 1;
                }
            }
            board.finalize();

            let first = find_orphans(&mut board);
            let second = find_orphans(&mut board);
            prop_assert_eq!(&first, &second);

            for cell in first {
                board.drop_ball(cell);
            }
            prop_assert!(find_orphans(&mut board).is_empty());
            board.clear_transient_marks();
            assert_consistent(&board);
        }
    }
}
