//! # Track Cluster
//!
//! Spatial-grid clustering of GPS activity tracks.
//!
//! This library groups recorded activities that follow substantially the same
//! route, using a grid-overlap heuristic rather than exact geometric matching.
//! Each pair of tracks is scored by laying a shared metric grid over their
//! merged bounding rectangle and taking the Jaccard index of the cell sets the
//! two tracks occupy; tracks are then assigned to clusters in a single greedy
//! forward pass.
//!
//! ## Features
//!
//! - **`parallel`** - Parallel similarity scoring in the cluster engine (rayon)
//! - **`serde`** - Serde derives on the public value types
//!
//! ## Quick Start
//!
//! ```rust
//! use track_cluster::{GeoPoint, TraveledPath, cluster_paths, geo_utils};
//!
//! let loop_a = vec![
//!     GeoPoint::new(42.3655, -71.1038),
//!     GeoPoint::new(42.3647, -71.1107),
//!     GeoPoint::new(42.3614, -71.1159),
//! ];
//! let loop_b = loop_a.clone(); // the same run, recorded again
//! let elsewhere = vec![
//!     GeoPoint::new(40.7128, -74.0060),
//!     GeoPoint::new(40.7140, -74.0080),
//! ];
//!
//! let tracks = vec![
//!     TraveledPath::new(loop_a.clone(), 1_700_000_000, geo_utils::path_length(&loop_a)),
//!     TraveledPath::new(elsewhere.clone(), 1_700_086_400, geo_utils::path_length(&elsewhere)),
//!     TraveledPath::new(loop_b.clone(), 1_700_172_800, geo_utils::path_length(&loop_b)),
//! ];
//!
//! let clusters = cluster_paths(7.0, tracks);
//! assert_eq!(clusters.len(), 2);
//! assert_eq!(clusters[0].contained_paths.len(), 2);
//! ```
//!
//! ## Limitations
//!
//! All distance math is a planar small-angle approximation, valid only for
//! points within tens of kilometers of each other. Tracks crossing the
//! antimeridian or recorded near the poles will produce wrong results; this is
//! an accepted limitation of the model, not a defect.

use std::collections::HashSet;

use log::{debug, info};

pub mod geo_utils;
pub mod grid;

pub use grid::{CellCoord, CellIndex, MetricGrid};

use geo_utils::{merge_rects, path_boundary};

// ============================================================================
// Core Types
// ============================================================================

/// A GPS coordinate with latitude and longitude in degrees.
///
/// No normalization beyond the standard ranges is assumed or enforced.
///
/// # Example
/// ```
/// use track_cluster::GeoPoint;
/// let point = GeoPoint::new(42.3656, -71.1039); // Cambridge, MA
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    /// Create a new GPS point.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// A minimal bounding rectangle over a set of points, as min/max latitude and
/// longitude.
///
/// Invariant for any real (non-empty) rectangle: `min_lat <= max_lat` and
/// `min_lon <= max_lon`, under the assumption the data does not cross the
/// antimeridian. Created fresh per computation and immutable once returned.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GeoRect {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl GeoRect {
    /// The inverted sentinel rectangle produced by scanning no points.
    ///
    /// Never a valid zero-area rectangle at the origin; check [`is_empty`]
    /// before using a computed boundary as a real area.
    ///
    /// [`is_empty`]: GeoRect::is_empty
    pub const EMPTY: GeoRect = GeoRect {
        min_lat: 91.0,
        max_lat: -91.0,
        min_lon: 181.0,
        max_lon: -181.0,
    };

    /// True for the sentinel produced by an empty scan (min exceeds max).
    pub fn is_empty(&self) -> bool {
        self.min_lat > self.max_lat || self.min_lon > self.max_lon
    }

    /// Whether this rectangle overlaps another.
    ///
    /// Strict inequalities at shared edges: two rectangles that merely touch
    /// do NOT overlap. That edge policy is deliberate and load-bearing for the
    /// similarity short-circuit.
    pub fn overlaps(&self, other: &GeoRect) -> bool {
        // longitude always decreases to the west, until the antimeridian; data
        // from around there will simply be wrong
        if self.min_lon >= other.max_lon || other.min_lon >= self.max_lon {
            return false;
        }

        // latitude gets weird around the poles; the formula still holds but
        // the rectangle may be totally misrepresented
        if self.min_lat >= other.max_lat || other.min_lat >= self.max_lat {
            return false;
        }

        true
    }

    /// The minimal rectangle covering this one and another.
    pub fn merge(&self, other: &GeoRect) -> GeoRect {
        GeoRect {
            min_lat: self.min_lat.min(other.min_lat),
            max_lat: self.max_lat.max(other.max_lat),
            min_lon: self.min_lon.min(other.min_lon),
            max_lon: self.max_lon.max(other.max_lon),
        }
    }

    /// Whether a point lies within the rectangle, bounds inclusive.
    pub fn contains(&self, point: &GeoPoint) -> bool {
        point.latitude >= self.min_lat
            && point.latitude <= self.max_lat
            && point.longitude >= self.min_lon
            && point.longitude <= self.max_lon
    }
}

/// One recorded activity: an ordered GPS point sequence plus metadata.
///
/// The distance is supplied externally and is not necessarily equal to the sum
/// of consecutive-point distances, since source devices often report a more
/// accurate odometer distance than raw GPS sampling implies.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TraveledPath {
    /// Ordered GPS trace, already flattened of any lap/segment structure
    pub points: Vec<GeoPoint>,
    /// Recording time as a Unix timestamp (seconds)
    pub timestamp: i64,
    /// Total recorded distance in meters
    pub distance_meters: f64,
}

impl TraveledPath {
    /// Create a traveled path from a point sequence, a recording timestamp and
    /// an externally supplied total distance.
    pub fn new(points: Vec<GeoPoint>, timestamp: i64, distance_meters: f64) -> Self {
        Self {
            points,
            timestamp,
            distance_meters,
        }
    }
}

/// A group of tracks judged to follow the same route.
///
/// The reference path is the first track assigned to the cluster and defines
/// the comparison baseline for all later candidates; it is never replaced.
/// `contained_paths` lists every assigned track, reference included, in
/// assignment order.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PathCluster {
    /// The track that established this cluster
    pub reference_path: TraveledPath,
    /// All tracks assigned to the cluster, in assignment order
    pub contained_paths: Vec<TraveledPath>,
    /// The reference track's recorded distance in meters
    pub distance_meters: f64,
}

/// Configuration for the cluster engine.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ClusterConfig {
    /// Grid cell size in meters, used as both cell width and height.
    /// Default: 7.0
    pub cell_resolution: f64,

    /// Minimum similarity score for a candidate to join a cluster.
    /// Default: 0.35
    pub similarity_threshold: f64,

    /// Maximum relative delta between a candidate's recorded distance and the
    /// cluster reference's, as a fraction of their mean. Default: 0.05
    pub max_distance_delta: f64,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            cell_resolution: 7.0,
            similarity_threshold: 0.35,
            max_distance_delta: 0.05,
        }
    }
}

// ============================================================================
// Similarity Scoring
// ============================================================================

/// Score how closely two point sequences trace the same route, in `[0, 1]`.
///
/// If the two paths' bounding rectangles do not overlap the score is exactly 0;
/// this is an exact short-circuit, not an approximation. Otherwise one
/// [`MetricGrid`] is built over the merged rectangle, both paths are mapped
/// onto it so cell coordinates are comparable, and the score is the Jaccard
/// index of the two occupied-cell sets: shared cells over total distinct
/// cells. Identical paths score exactly 1.
///
/// # Example
/// ```
/// use track_cluster::{GeoPoint, path_similarity};
///
/// let path = vec![
///     GeoPoint::new(42.3655, -71.1038),
///     GeoPoint::new(42.3614, -71.1159),
/// ];
/// assert_eq!(path_similarity(10.0, 10.0, &path, &path), 1.0);
/// ```
pub fn path_similarity(
    cell_width: f64,
    cell_height: f64,
    path1: &[GeoPoint],
    path2: &[GeoPoint],
) -> f64 {
    let boundary1 = path_boundary(&[path1]);
    let boundary2 = path_boundary(&[path2]);

    // paths that share no area cannot be similar
    if !boundary1.overlaps(&boundary2) {
        return 0.0;
    }

    let shared = merge_rects(&[boundary1, boundary2]);
    let grid = MetricGrid::new(cell_width, cell_height, shared);

    let cells1: HashSet<CellCoord> = grid.map_path(path1).into_iter().collect();
    let cells2: HashSet<CellCoord> = grid.map_path(path2).into_iter().collect();

    let match_count = cells1.intersection(&cells2).count();
    let union_count = cells1.union(&cells2).count();

    match_count as f64 / union_count as f64
}

// ============================================================================
// Cluster Engine
// ============================================================================

/// Greedily cluster tracks that trace the same route.
///
/// `resolution` is the grid cell size in meters, used uniformly as both cell
/// width and height for every comparison in the run; the remaining thresholds
/// are the [`ClusterConfig`] defaults.
///
/// Single forward pass, order-sensitive by design: each track is compared
/// against every existing cluster's reference track in cluster-creation order
/// and joins the first match, or starts a new cluster. Clusters are returned
/// in creation order. See [`cluster_paths_with_config`] for the match
/// criteria.
pub fn cluster_paths(resolution: f64, paths: Vec<TraveledPath>) -> Vec<PathCluster> {
    cluster_paths_with_config(
        paths,
        &ClusterConfig {
            cell_resolution: resolution,
            ..ClusterConfig::default()
        },
    )
}

/// [`cluster_paths`] with explicit thresholds.
///
/// A candidate matches a cluster when its similarity to the cluster's
/// reference exceeds `similarity_threshold` AND the relative delta between the
/// candidate's recorded distance and the reference's recorded distance stays
/// below `max_distance_delta`. The first track establishes each cluster's
/// shape; later tracks either join or spawn new clusters, and no rebalancing
/// or merging happens after the fact.
pub fn cluster_paths_with_config(
    paths: Vec<TraveledPath>,
    config: &ClusterConfig,
) -> Vec<PathCluster> {
    let total = paths.len();
    let mut clusters: Vec<PathCluster> = Vec::new();

    for path in paths {
        let slot = clusters
            .iter()
            .position(|cluster| matches_cluster(cluster, &path, config));

        match slot {
            Some(j) => {
                debug!(
                    "path at {} joins cluster {} ({:.0}m reference)",
                    path.timestamp, j, clusters[j].distance_meters
                );
                clusters[j].contained_paths.push(path);
            }
            None => {
                debug!(
                    "path at {} starts cluster {} ({:.0}m)",
                    path.timestamp,
                    clusters.len(),
                    path.distance_meters
                );
                let distance_meters = path.distance_meters;
                clusters.push(PathCluster {
                    reference_path: path.clone(),
                    contained_paths: vec![path],
                    distance_meters,
                });
            }
        }
    }

    info!("clustered {} paths into {} clusters", total, clusters.len());
    clusters
}

/// As [`cluster_paths_with_config`], scoring each track against the existing
/// cluster references in parallel.
///
/// The match-or-create decision per track remains sequential and ordered, and
/// the first matching cluster in creation order still wins, so the result is
/// identical to the sequential engine. Only the per-cluster similarity
/// comparisons inside one track's scan run on the rayon pool.
#[cfg(feature = "parallel")]
pub fn cluster_paths_parallel(
    paths: Vec<TraveledPath>,
    config: &ClusterConfig,
) -> Vec<PathCluster> {
    use rayon::prelude::*;

    let total = paths.len();
    let mut clusters: Vec<PathCluster> = Vec::new();

    for path in paths {
        let slot = clusters
            .par_iter()
            .position_first(|cluster| matches_cluster(cluster, &path, config));

        match slot {
            Some(j) => clusters[j].contained_paths.push(path),
            None => {
                let distance_meters = path.distance_meters;
                clusters.push(PathCluster {
                    reference_path: path.clone(),
                    contained_paths: vec![path],
                    distance_meters,
                });
            }
        }
    }

    info!(
        "clustered {} paths into {} clusters (parallel scoring)",
        total,
        clusters.len()
    );
    clusters
}

/// Whether a candidate track belongs with an existing cluster: similar enough
/// in shape to the cluster's reference track, and close enough in recorded
/// distance.
fn matches_cluster(cluster: &PathCluster, candidate: &TraveledPath, config: &ClusterConfig) -> bool {
    let similarity = path_similarity(
        config.cell_resolution,
        config.cell_resolution,
        &cluster.reference_path.points,
        &candidate.points,
    );

    let avg_distance = (candidate.distance_meters + cluster.distance_meters) / 2.0;
    let distance_delta = (candidate.distance_meters - cluster.distance_meters).abs() / avg_distance;

    similarity > config.similarity_threshold && distance_delta < config.max_distance_delta
}

// ============================================================================
// Tests
// ============================================================================
