//! Leaf detection and sensor trajectory planning for a plant phenotyping robot.
//!
//! The member crates are re-exported under short names. The two functions
//! here cover the usual end-to-end runs: point cloud file to leaves, and leaf
//! selection file to a waypoint path.

pub use pheno_core as core;
pub use pheno_io as io;
pub use pheno_planning as planning;
pub use pheno_point_cloud as point_cloud;
pub use pheno_scientific as scientific;
pub use pheno_segmentation as segmentation;

pub use pheno_core::{Error, LeafRecord, LeafTarget, PointCloud, Result};
pub use pheno_planning::{Path, PlannerConfig, TrajectoryPlanner, Waypoint, WaypointKind};
pub use pheno_segmentation::{Detection, DetectorConfig, LeafDetector, StageCounts};

use nalgebra::Point3;

/// Initialize a single global Rayon thread pool for all CPU-parallel stages.
///
/// Priority order:
/// 1. explicit `num_threads`
/// 2. `PHENOBOT_CPU_THREADS` env var
/// 3. Rayon default
pub fn init_thread_pool(num_threads: Option<usize>) -> std::result::Result<(), String> {
    pheno_core::init_global_thread_pool(num_threads)
}

/// Load a PLY/PCD cloud, scale it to metres and detect leaves.
///
/// The file is read and validated before any stage runs, so unreadable input
/// fails without partial results.
pub fn detect_leaves_from_file<P: AsRef<std::path::Path>>(
    path: P,
    scale_factor: f64,
    config: &DetectorConfig,
) -> Result<Detection> {
    let detector = LeafDetector::new(config.clone())?;
    let cloud = pheno_io::load_point_cloud(path, scale_factor)?;
    detector.detect(&cloud)
}

/// Plan a path through the leaves listed in a `{"leaves": [...]}` file.
pub fn plan_from_leaf_file<P: AsRef<std::path::Path>>(
    path: P,
    start: Point3<f64>,
    config: &PlannerConfig,
) -> Result<Path> {
    let planner = TrajectoryPlanner::new(config.clone())?;
    let targets = pheno_io::load_leaf_targets(path)?;
    planner.plan(&targets, start)
}
