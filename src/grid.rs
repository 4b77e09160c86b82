//! Metric grid construction over a lat/lon rectangle.
//!
//! Partitions a bounding rectangle into near-square metric cells and maps any
//! point inside it to a discrete (row, column) cell coordinate. Rows count
//! south from the rectangle's northern edge, columns count east from its
//! western edge, so cell (0, 0) sits in the north-western corner.
//!
//! A degree of longitude covers fewer meters away from the equator, so a grid
//! spanning a long north-south distance legitimately fits more cells along its
//! southern rows than its northern ones (in the northern hemisphere). To keep
//! cell coordinates comparable across rows of one grid instance, the row count
//! is fixed along the rectangle's western meridian while the east-west span is
//! recomputed at each point's own latitude when resolving its column. Two
//! points at the same nominal column index can therefore occupy cells of
//! slightly different absolute width.

use std::collections::HashMap;

use crate::geo_utils::geo_distance;
use crate::{GeoPoint, GeoRect};

/// Grid coordinate: (row, column) within one [`MetricGrid`] instance.
///
/// Row index runs along the north-south axis, column index along the east-west
/// axis; both are non-negative. Coordinates from two different grid instances
/// are not comparable.
pub type CellCoord = (u32, u32);

/// A rectangle partitioned into cells of a requested metric size.
///
/// The grid is stateless with respect to any particular point set: the same
/// instance can classify many independent point sequences, and the mapping is
/// deterministic and reproducible. Constructed on demand per comparison and
/// discarded afterwards.
///
/// # Example
///
/// ```rust
/// use track_cluster::{GeoPoint, MetricGrid, geo_utils};
///
/// let track = vec![
///     GeoPoint::new(42.365592, -71.103875),
///     GeoPoint::new(42.364237, -71.116022),
///     GeoPoint::new(42.361439, -71.115968),
/// ];
///
/// let grid = MetricGrid::new(7.0, 7.0, geo_utils::path_boundary(&[&track]));
/// let coords = grid.map_path(&track);
/// assert_eq!(coords.len(), track.len());
/// assert_eq!(coords[0].0, 0); // northern edge lands in row 0
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MetricGrid {
    /// Rectangle the grid partitions
    pub boundary: GeoRect,
    /// East-west cell size in meters
    pub cell_width: f64,
    /// North-south cell size in meters
    pub cell_height: f64,
}

impl MetricGrid {
    /// Create a grid over `boundary` with cells of the given metric size.
    ///
    /// Cell sizes must be positive and finite.
    pub fn new(cell_width: f64, cell_height: f64, boundary: GeoRect) -> Self {
        debug_assert!(cell_width > 0.0 && cell_width.is_finite());
        debug_assert!(cell_height > 0.0 && cell_height.is_finite());
        Self {
            boundary,
            cell_width,
            cell_height,
        }
    }

    /// Map a point to the (row, column) cell it falls in.
    ///
    /// The row is found from the point's offset south of the rectangle's
    /// northern edge, measured along the western meridian; the column from its
    /// offset east of the western edge, measured along the point's own
    /// parallel. Repeated calls with the same grid and point always return the
    /// same coordinate.
    pub fn map_point(&self, point: &GeoPoint) -> CellCoord {
        let b = &self.boundary;
        let north_west = GeoPoint::new(b.max_lat, b.min_lon);
        let south_west = GeoPoint::new(b.min_lat, b.min_lon);

        // distance along a meridian is a change in latitude
        let meridian_extent = geo_distance(&north_west, &south_west);
        let row_offset = geo_distance(&north_west, &GeoPoint::new(point.latitude, b.min_lon));
        let row = cell_search(0.0, meridian_extent, self.cell_height, row_offset, 0);

        // distance along a parallel is a change in longitude, measured at the
        // point's own latitude since the span shrinks toward the poles
        let west = GeoPoint::new(point.latitude, b.min_lon);
        let east = GeoPoint::new(point.latitude, b.max_lon);
        let parallel_extent = geo_distance(&west, &east);
        let col_offset = geo_distance(&west, point);
        let col = cell_search(0.0, parallel_extent, self.cell_width, col_offset, 0);

        (row, col)
    }

    /// Map every point of a path to its cell, preserving input order.
    ///
    /// Output length always equals input length.
    pub fn map_path(&self, path: &[GeoPoint]) -> Vec<CellCoord> {
        path.iter().map(|pt| self.map_point(pt)).collect()
    }
}

/// Locate a position within a half-open metric range `[min, max)` divided into
/// cells of `cell_size`, returning the index of the cell it falls in, offset by
/// `index`.
///
/// Recursive interval bisection: the range is split so the left half always
/// contains a whole number of cells, and the search descends into whichever
/// half holds `location`. A location exactly on the split line resolves to the
/// cell immediately below it, so cell boundaries are half-open toward the
/// lower index. Equivalent in result to direct integer division, and the
/// tie-break must stay put either way: the similarity scorer depends on
/// reproducible cell identifiers.
fn cell_search(min: f64, max: f64, cell_size: f64, location: f64, index: u32) -> u32 {
    // the remaining range is a single cell
    if max - min <= cell_size {
        return index;
    }

    let left_cells = (((max - min) / cell_size).ceil() / 2.0).floor();
    let mid = min + left_cells * cell_size;

    if location == mid {
        index + left_cells as u32 - 1
    } else if location > mid {
        cell_search(mid, max, cell_size, location, index + left_cells as u32)
    } else {
        cell_search(min, mid, cell_size, location, index)
    }
}

/// A [`MetricGrid`] together with a cell-membership index.
///
/// Records which points fell into each cell, for queries about cell contents
/// rather than just occupancy. The index is owned by this instance and scoped
/// to it; nothing is shared or global.
#[derive(Debug, Clone)]
pub struct CellIndex {
    grid: MetricGrid,
    cells: HashMap<CellCoord, Vec<GeoPoint>>,
}

impl CellIndex {
    /// Create an empty index over the given grid.
    pub fn new(grid: MetricGrid) -> Self {
        Self {
            grid,
            cells: HashMap::new(),
        }
    }

    /// Classify a point and record it under its cell. Returns the coordinate
    /// the point was filed under.
    pub fn insert(&mut self, point: GeoPoint) -> CellCoord {
        let coord = self.grid.map_point(&point);
        self.cells.entry(coord).or_default().push(point);
        coord
    }

    /// Insert every point of a path.
    pub fn insert_path(&mut self, path: &[GeoPoint]) {
        for pt in path {
            self.insert(*pt);
        }
    }

    /// All points recorded in the given cell, in insertion order.
    pub fn points_at(&self, coord: CellCoord) -> &[GeoPoint] {
        self.cells.get(&coord).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Coordinates of every cell at least one point fell into.
    pub fn occupied_cells(&self) -> impl Iterator<Item = CellCoord> + '_ {
        self.cells.keys().copied()
    }

    /// The grid this index classifies against.
    pub fn grid(&self) -> &MetricGrid {
        &self.grid
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo_utils::path_boundary;

    fn path1() -> Vec<GeoPoint> {
        vec![
            GeoPoint::new(42.365592, -71.103875),
            GeoPoint::new(42.364776, -71.110749),
            GeoPoint::new(42.364237, -71.116022),
            GeoPoint::new(42.361439, -71.115968),
            GeoPoint::new(42.362285, -71.113515),
            GeoPoint::new(42.365115, -71.104975),
        ]
    }

    #[test]
    fn test_make_grid_keeps_inputs() {
        let boundary = GeoRect {
            min_lat: 42.361439,
            max_lat: 42.365592,
            min_lon: -71.116022,
            max_lon: -71.103875,
        };
        let grid = MetricGrid::new(7.0, 7.0, boundary);

        assert_eq!(grid.cell_width, 7.0);
        assert_eq!(grid.cell_height, 7.0);
        assert_eq!(grid.boundary, boundary);
    }

    #[test]
    fn test_map_point_known_cells() {
        let path = path1();
        let grid = MetricGrid::new(7.0, 7.0, path_boundary(&[&path]));

        // north-eastern corner point: row 0, far-east column
        assert_eq!(grid.map_point(&path[0]), (0, 142));
        // western edge point
        assert_eq!(grid.map_point(&path[2]), (21, 0));
        // interior point
        assert_eq!(grid.map_point(&path[4]), (52, 29));
    }

    #[test]
    fn test_map_point_idempotent() {
        let path = path1();
        let grid = MetricGrid::new(7.0, 7.0, path_boundary(&[&path]));

        for pt in &path {
            assert_eq!(grid.map_point(pt), grid.map_point(pt));
        }
    }

    #[test]
    fn test_map_path_preserves_length_and_order() {
        let path = path1();
        let grid = MetricGrid::new(7.0, 7.0, path_boundary(&[&path]));

        let coords = grid.map_path(&path);
        assert_eq!(coords.len(), path.len());
        for (i, pt) in path.iter().enumerate() {
            assert_eq!(coords[i], grid.map_point(pt));
        }
    }

    #[test]
    fn test_map_path_stays_within_grid() {
        let path = path1();
        let grid = MetricGrid::new(7.0, 7.0, path_boundary(&[&path]));
        let b = grid.boundary;

        let meridian_extent = geo_distance(
            &GeoPoint::new(b.max_lat, b.min_lon),
            &GeoPoint::new(b.min_lat, b.min_lon),
        );
        let parallel_extent = geo_distance(
            &GeoPoint::new(b.min_lat, b.min_lon),
            &GeoPoint::new(b.min_lat, b.max_lon),
        );

        let max_row = (meridian_extent / grid.cell_height).floor() as u32;
        let max_col = (parallel_extent / grid.cell_width).floor() as u32;

        for (row, col) in grid.map_path(&path) {
            assert!(row <= max_row);
            assert!(col <= max_col);
        }
    }

    #[test]
    fn test_cell_search_matches_direct_division() {
        // 10 cells of 7m over [0, 70)
        for (location, expected) in [(0.0, 0), (3.5, 0), (7.5, 1), (36.0, 5), (69.9, 9)] {
            assert_eq!(cell_search(0.0, 70.0, 7.0, location, 0), expected);
        }
    }

    #[test]
    fn test_cell_search_midpoint_resolves_down() {
        // 35.0 is exactly on the split between cells 4 and 5
        assert_eq!(cell_search(0.0, 70.0, 7.0, 35.0, 0), 4);
        // a hair to the east belongs to cell 5
        assert_eq!(cell_search(0.0, 70.0, 7.0, 35.000001, 0), 5);
    }

    #[test]
    fn test_cell_search_degenerate_range() {
        // a range no larger than one cell is a single cell
        assert_eq!(cell_search(0.0, 0.0, 7.0, 0.0, 0), 0);
        assert_eq!(cell_search(0.0, 6.0, 7.0, 5.0, 0), 0);
    }

    #[test]
    fn test_cell_index_membership() {
        let path = path1();
        let grid = MetricGrid::new(7.0, 7.0, path_boundary(&[&path]));

        let mut index = CellIndex::new(grid.clone());
        index.insert_path(&path);

        assert_eq!(index.occupied_cells().count(), 6);
        for pt in &path {
            let coord = grid.map_point(pt);
            assert!(index.points_at(coord).contains(pt));
        }
        assert!(index.points_at((999, 999)).is_empty());
    }
}
