//! # Geographic Utilities
//!
//! Core geographic computation utilities for GPS track analysis.
//!
//! ## Overview
//!
//! | Function | Description |
//! |----------|-------------|
//! | [`geo_distance`] | Approximate planar distance between two GPS points |
//! | [`path_length`] | Total length of a GPS track in meters |
//! | [`path_boundary`] | Minimal bounding rectangle of one or more tracks |
//! | [`merge_rects`] | Minimal rectangle covering a union of rectangles |
//!
//! ## Algorithm Notes
//!
//! ### Equirectangular Approximation
//!
//! [`geo_distance`] is a first-order equirectangular approximation: the
//! longitude delta is scaled by the cosine of the mean latitude to correct for
//! meridian convergence, and the two deltas are then treated as orthogonal
//! planar displacements on a sphere of mean radius 6,371.0088 km. Accurate to
//! within a few meters at separations up to tens of kilometers, which covers
//! GPS sampling intervals and bounding rectangles of ordinary activities. It is
//! not valid for long-range or antipodal pairs.
//!
//! ### Coordinate System
//!
//! All functions expect WGS84 coordinates (latitude/longitude in degrees), the
//! standard produced by GPS receivers.

use crate::{GeoPoint, GeoRect};

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_METERS: f64 = 6_371.0088 * 1000.0;

// =============================================================================
// Distance Functions
// =============================================================================

/// Calculate the approximate distance between two GPS points in meters.
///
/// Always non-negative and symmetric; exactly zero for two identical points.
/// Accurate assuming the points are no more than a few tens of kilometers
/// apart; see the module docs for the approximation used.
///
/// # Example
///
/// ```rust
/// use track_cluster::{GeoPoint, geo_utils};
///
/// let a = GeoPoint::new(42.3533, -71.1071);
/// let b = GeoPoint::new(42.3569, -71.0926);
///
/// let d = geo_utils::geo_distance(&a, &b);
/// assert!((d - 1250.0).abs() < 10.0); // about half a mile
/// ```
#[inline]
pub fn geo_distance(p1: &GeoPoint, p2: &GeoPoint) -> f64 {
    let d_lat = (p1.latitude - p2.latitude).to_radians();
    let mut d_lon = (p1.longitude - p2.longitude).to_radians();

    // shorten the longitude circle by the average latitude of the two points
    let avg_lat = ((p1.latitude + p2.latitude) / 2.0).to_radians();
    d_lon *= avg_lat.cos();

    EARTH_RADIUS_METERS * (d_lat * d_lat + d_lon * d_lon).sqrt()
}

/// Calculate the total length of a GPS track in meters.
///
/// Sums [`geo_distance`] over consecutive points. Empty or single-point tracks
/// return 0.0. Note that source devices often report a more accurate odometer
/// distance than raw GPS sampling implies, so this is not necessarily equal to
/// a track's recorded distance.
pub fn path_length(points: &[GeoPoint]) -> f64 {
    points
        .windows(2)
        .map(|w| geo_distance(&w[0], &w[1]))
        .sum()
}

// =============================================================================
// Bounding Rectangle Functions
// =============================================================================

/// Compute the minimal bounding rectangle of one or more point sequences.
///
/// Scans every point of every supplied sequence, tracking running min/max
/// latitude and longitude. With no points at all the result is
/// [`GeoRect::EMPTY`], the inverted sentinel rectangle; callers must check
/// [`GeoRect::is_empty`] before treating the result as a real area.
///
/// # Example
///
/// ```rust
/// use track_cluster::{GeoPoint, geo_utils};
///
/// let track = vec![
///     GeoPoint::new(42.3656, -71.1039),
///     GeoPoint::new(42.3614, -71.1160),
/// ];
///
/// let rect = geo_utils::path_boundary(&[&track]);
/// assert_eq!(rect.min_lat, 42.3614);
/// assert_eq!(rect.max_lon, -71.1039);
/// ```
pub fn path_boundary(paths: &[&[GeoPoint]]) -> GeoRect {
    let mut rect = GeoRect::EMPTY;

    for path in paths {
        for pt in *path {
            if pt.latitude < rect.min_lat {
                rect.min_lat = pt.latitude;
            }
            if pt.latitude > rect.max_lat {
                rect.max_lat = pt.latitude;
            }
            if pt.longitude < rect.min_lon {
                rect.min_lon = pt.longitude;
            }
            if pt.longitude > rect.max_lon {
                rect.max_lon = pt.longitude;
            }
        }
    }
    rect
}

/// Compute the minimal rectangle covering the union of the given rectangles.
///
/// Uses the same sentinel-seeded scan as [`path_boundary`]: merging nothing
/// yields [`GeoRect::EMPTY`], and merging anything with the sentinel yields the
/// other rectangle unchanged.
pub fn merge_rects(rects: &[GeoRect]) -> GeoRect {
    rects.iter().fold(GeoRect::EMPTY, |acc, r| acc.merge(r))
}

// =============================================================================
// Unit Tests
// =============================================================================
