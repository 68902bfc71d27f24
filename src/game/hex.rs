//! Hexagonal grid addressing using staggered offset coordinates.
//!
//! Rows alternate between 11 columns (even rows) and 10 columns (odd rows).
//! Odd rows sit half a cell to the right of even rows, so every odd-row cell
//! nests between two even-row cells. This is the classic bubble shooter layout.
//!
//! All functions here are pure: the grid geometry is handed in by the caller.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

pub(super) fn plugin(app: &mut App) {
    app.register_type::<Cell>();
    app.register_type::<GridGeometry>();
}

/// Columns in an even row.
pub const EVEN_ROW_COLUMNS: i32 = 11;

/// Columns in an odd row.
pub const ODD_ROW_COLUMNS: i32 = 10;

/// How many rings `nearest_empty_cell` expands before giving up.
pub const SEARCH_RADIUS_CAP: i32 = 10;

/// The six hex directions, in the order used by every neighbor table.
///
/// "Up" means toward `row - 1`, whatever way that points on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    UpLeft,
    UpRight,
    Right,
    DownRight,
    DownLeft,
    Left,
}

impl Direction {
    /// All directions in table order.
    pub const ALL: [Direction; 6] = [
        Direction::UpLeft,
        Direction::UpRight,
        Direction::Right,
        Direction::DownRight,
        Direction::DownLeft,
        Direction::Left,
    ];

    /// The direction pointing back the other way.
    pub const fn opposite(self) -> Self {
        match self {
            Direction::UpLeft => Direction::DownRight,
            Direction::UpRight => Direction::DownLeft,
            Direction::Right => Direction::Left,
            Direction::DownRight => Direction::UpLeft,
            Direction::DownLeft => Direction::UpRight,
            Direction::Left => Direction::Right,
        }
    }
}

/// `(d_col, d_row)` for cells in even rows, indexed by [`Direction`].
///
/// Even rows are the wide ones, so their diagonal neighbors in the odd rows
/// above and below are at columns `col - 1` and `col`.
pub const EVEN_ROW_OFFSETS: [(i32, i32); 6] = [
    (-1, -1), // UpLeft
    (0, -1),  // UpRight
    (1, 0),   // Right
    (0, 1),   // DownRight
    (-1, 1),  // DownLeft
    (-1, 0),  // Left
];

/// `(d_col, d_row)` for cells in odd rows, indexed by [`Direction`].
///
/// Odd rows are shifted right by half a cell, so their diagonal neighbors in
/// the even rows are at columns `col` and `col + 1`.
pub const ODD_ROW_OFFSETS: [(i32, i32); 6] = [
    (0, -1), // UpLeft
    (1, -1), // UpRight
    (1, 0),  // Right
    (1, 1),  // DownRight
    (0, 1),  // DownLeft
    (-1, 0), // Left
];

/// A grid cell in offset coordinates.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Reflect, Serialize, Deserialize,
)]
pub struct Cell {
    /// Column, 0 at the left edge of the row.
    pub col: i32,
    /// Row, 0 at the grid origin.
    pub row: i32,
}

impl Cell {
    pub const fn new(col: i32, row: i32) -> Self {
        Self { col, row }
    }

    /// Whether this cell sits in an odd (narrow, shifted) row.
    #[inline]
    pub const fn is_odd_row(&self) -> bool {
        self.row.rem_euclid(2) == 1
    }

    /// The offset table for this cell's row parity.
    #[inline]
    pub const fn offsets(&self) -> &'static [(i32, i32); 6] {
        if self.is_odd_row() {
            &ODD_ROW_OFFSETS
        } else {
            &EVEN_ROW_OFFSETS
        }
    }

    /// The adjacent cell in `direction`, without any bounds check.
    pub const fn step(&self, direction: Direction) -> Self {
        let (d_col, d_row) = self.offsets()[direction as usize];
        Self::new(self.col + d_col, self.row + d_row)
    }
}

impl std::fmt::Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.col, self.row)
    }
}

/// Number of columns in `row`.
#[inline]
pub const fn max_columns(row: i32) -> i32 {
    if row.rem_euclid(2) == 0 {
        EVEN_ROW_COLUMNS
    } else {
        ODD_ROW_COLUMNS
    }
}

/// Whether `cell` lies inside a grid of `max_rows` rows.
#[inline]
pub const fn is_valid(cell: Cell, max_rows: i32) -> bool {
    cell.row >= 0 && cell.row < max_rows && cell.col >= 0 && cell.col < max_columns(cell.row)
}

/// The six neighbors of `cell`, in [`Direction`] order.
///
/// Entries falling outside the grid are `None`.
pub fn neighbor_cells(cell: Cell, max_rows: i32) -> [Option<Cell>; 6] {
    Direction::ALL.map(|direction| {
        let neighbor = cell.step(direction);
        is_valid(neighbor, max_rows).then_some(neighbor)
    })
}

/// World-space layout of the grid, supplied by the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Reflect, Serialize, Deserialize)]
pub struct GridGeometry {
    /// Horizontal distance between neighboring cell centers in a row.
    pub cell_width: f32,
    /// Vertical distance between row centers.
    pub cell_height: f32,
    /// World position of the grid origin.
    pub origin: Vec2,
    /// `1.0` if rows grow along +Y, `-1.0` if they grow along -Y.
    pub row_axis: f32,
}

impl Default for GridGeometry {
    fn default() -> Self {
        Self {
            cell_width: 1.0,
            cell_height: 0.87,
            origin: Vec2::ZERO,
            row_axis: 1.0,
        }
    }
}

impl GridGeometry {
    /// Half the width of `row`, measured in cells.
    #[inline]
    fn half_row(row: i32) -> f32 {
        max_columns(row) as f32 / 2.0
    }

    /// World position of a cell's center.
    pub fn cell_to_world(&self, cell: Cell) -> Vec2 {
        let x = cell.col as f32 * self.cell_width - Self::half_row(cell.row) * self.cell_width;
        let y = self.row_axis * cell.row as f32 * self.cell_height;
        self.origin + Vec2::new(x, y)
    }

    /// The cell whose center is nearest to `point`.
    ///
    /// The row is not clamped, so points above or below the grid map to
    /// out-of-range rows. The column is clamped into the row's width.
    pub fn world_to_cell(&self, point: Vec2) -> Cell {
        let local = point - self.origin;
        let row = (local.y * self.row_axis / self.cell_height).round() as i32;
        let offset_x = local.x + Self::half_row(row) * self.cell_width;
        let col = (offset_x / self.cell_width).round() as i32;
        Cell::new(col.clamp(0, max_columns(row) - 1), row)
    }
}

/// Find the empty cell closest to `point`.
///
/// Starting from the cell under `point`, rings of increasing radius are
/// searched (boundary cells only, radius 0 through [`SEARCH_RADIUS_CAP`]). The
/// first ring holding any valid empty cell wins, and within that ring the cell
/// with the smallest world distance to `point` is chosen.
pub fn nearest_empty_cell(
    point: Vec2,
    geometry: &GridGeometry,
    max_rows: i32,
    is_empty: impl Fn(Cell) -> bool,
) -> Option<Cell> {
    let center = geometry.world_to_cell(point);

    for radius in 0..=SEARCH_RADIUS_CAP {
        let mut best: Option<(f32, Cell)> = None;

        for cell in ring(center, radius) {
            if !is_valid(cell, max_rows) || !is_empty(cell) {
                continue;
            }
            let distance = geometry.cell_to_world(cell).distance_squared(point);
            let closer = match best {
                None => true,
                Some((best_distance, best_cell)) => {
                    distance < best_distance
                        || (distance == best_distance
                            && (cell.row, cell.col) < (best_cell.row, best_cell.col))
                }
            };
            if closer {
                best = Some((distance, cell));
            }
        }

        if let Some((_, cell)) = best {
            return Some(cell);
        }
    }

    None
}

/// Cells on the boundary of the square ring of `radius` around `center`.
fn ring(center: Cell, radius: i32) -> impl Iterator<Item = Cell> {
    (-radius..=radius).flat_map(move |d_row| {
        (-radius..=radius)
            .filter(move |d_col| d_row.abs() == radius || d_col.abs() == radius)
            .map(move |d_col| Cell::new(center.col + d_col, center.row + d_row))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const ROWS: i32 = 20;

    fn geometry() -> GridGeometry {
        GridGeometry {
            cell_width: 1.0,
            cell_height: 0.87,
            origin: Vec2::new(3.0, -2.0),
            row_axis: -1.0,
        }
    }

    #[test]
    fn test_stagger_table() {
        for row in 0..100 {
            let expected = if row % 2 == 0 { 11 } else { 10 };
            assert_eq!(max_columns(row), expected);
        }
    }

    #[test]
    fn test_interior_cell_has_six_neighbors() {
        let even = neighbor_cells(Cell::new(5, 4), ROWS);
        let odd = neighbor_cells(Cell::new(5, 5), ROWS);
        assert!(even.iter().all(Option::is_some));
        assert!(odd.iter().all(Option::is_some));
    }

    #[test]
    fn test_corner_neighbors_are_clipped() {
        let corner = neighbor_cells(Cell::new(0, 0), ROWS);
        let present: Vec<Cell> = corner.iter().flatten().copied().collect();
        assert_eq!(present, vec![Cell::new(1, 0), Cell::new(0, 1)]);

        // Last column of an odd row has no right-hand neighbor.
        let edge = neighbor_cells(Cell::new(9, 1), ROWS);
        assert_eq!(edge[Direction::Right as usize], None);
        assert_eq!(edge[Direction::DownRight as usize], Some(Cell::new(10, 2)));
    }

    #[test]
    fn test_neighbors_are_geometrically_adjacent() {
        let geometry = GridGeometry::default();
        let cell = Cell::new(4, 3);
        let center = geometry.cell_to_world(cell);
        for neighbor in neighbor_cells(cell, ROWS).into_iter().flatten() {
            let distance = geometry.cell_to_world(neighbor).distance(center);
            assert!(distance < 1.2, "{neighbor} is {distance} away from {cell}");
        }
    }

    #[test]
    fn test_direction_opposite_steps_back() {
        let cell = Cell::new(4, 7);
        for direction in Direction::ALL {
            assert_eq!(cell.step(direction).step(direction.opposite()), cell);
        }
    }

    #[test]
    fn test_world_to_cell_clamps_column() {
        let geometry = GridGeometry::default();
        let far_right = geometry.cell_to_world(Cell::new(10, 0)) + Vec2::new(25.0, 0.0);
        assert_eq!(geometry.world_to_cell(far_right), Cell::new(10, 0));
        let far_left = geometry.cell_to_world(Cell::new(0, 1)) - Vec2::new(25.0, 0.0);
        assert_eq!(geometry.world_to_cell(far_left), Cell::new(0, 1));
    }

    #[test]
    fn test_nearest_empty_prefers_own_cell() {
        let geometry = geometry();
        let target = Cell::new(3, 3);
        let point = geometry.cell_to_world(target);
        assert_eq!(
            nearest_empty_cell(point, &geometry, ROWS, |_| true),
            Some(target)
        );
    }

    #[test]
    fn test_nearest_empty_finds_ring_one_cell() {
        let geometry = geometry();
        let occupied = Cell::new(3, 3);
        let free = Cell::new(4, 4);
        // Everything is occupied except one cell next to the target; a cell
        // far away is also free but must not be picked.
        let far = Cell::new(3, 9);
        let point = geometry.cell_to_world(occupied);
        let found = nearest_empty_cell(point, &geometry, ROWS, |cell| cell == free || cell == far);
        assert_eq!(found, Some(free));
    }

    #[test]
    fn test_nearest_empty_picks_closest_in_ring() {
        let geometry = geometry();
        let occupied = Cell::new(5, 2);
        let point = geometry.cell_to_world(occupied) + Vec2::new(0.4, 0.0);
        let left = Cell::new(4, 2);
        let right = Cell::new(6, 2);
        let found =
            nearest_empty_cell(point, &geometry, ROWS, |cell| cell == left || cell == right);
        assert_eq!(found, Some(right));
    }

    #[test]
    fn test_nearest_empty_gives_up_past_cap() {
        let geometry = geometry();
        let point = geometry.cell_to_world(Cell::new(0, 0));
        let unreachable = Cell::new(0, SEARCH_RADIUS_CAP + 1);
        let found = nearest_empty_cell(point, &geometry, 40, |cell| cell == unreachable);
        assert_eq!(found, None);
    }

    #[test]
    fn test_nearest_empty_ignores_rows_outside_grid() {
        let geometry = geometry();
        // A point above the grid maps to row -2; the search must land in row 0.
        let above = 2.0 * geometry.row_axis * geometry.cell_height;
        let point = geometry.cell_to_world(Cell::new(4, 0)) - Vec2::new(0.0, above);
        let found = nearest_empty_cell(point, &geometry, ROWS, |_| true);
        assert_eq!(found.map(|cell| cell.row), Some(0));
    }

    fn any_cell() -> impl Strategy<Value = Cell> {
        (0..ROWS).prop_flat_map(|row| (0..max_columns(row)).prop_map(move |col| Cell::new(col, row)))
    }

    proptest! {
        #[test]
        fn prop_world_round_trip(cell in any_cell()) {
            let geometry = geometry();
            prop_assert_eq!(geometry.world_to_cell(geometry.cell_to_world(cell)), cell);
        }

        #[test]
        fn prop_neighbors_valid_and_symmetric(cell in any_cell()) {
            let neighbors = neighbor_cells(cell, ROWS);
            for neighbor in neighbors.into_iter().flatten() {
                prop_assert!(is_valid(neighbor, ROWS));
                prop_assert!(neighbor_cells(neighbor, ROWS).contains(&Some(cell)));
            }
        }
    }
}
