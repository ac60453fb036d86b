//! Per-cluster centroid (medoid) and surface normal.

use crate::config::NormalStrategy;
use nalgebra::{Point3, Vector3};
use pheno_core::ClusterLabeling;
use pheno_point_cloud::{canonicalize_up, medoid, pca_normal, segment_plane};
use rayon::prelude::*;

/// Centroid and provisionally signed normal of one cluster.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClusterPose {
    /// Medoid: a member point, not the mean.
    pub centroid: Point3<f64>,
    /// Unit length, `z ≥ 0` until oriented outward.
    pub normal: Vector3<f64>,
    pub inlier_ratio: f64,
}

/// Pose of one cluster; `None` for an empty cluster.
pub fn estimate_pose(points: &[Point3<f64>], strategy: &NormalStrategy) -> Option<ClusterPose> {
    let centroid = points[medoid(points)?];
    let pca = || ClusterPose {
        centroid,
        normal: pca_normal(points, &centroid),
        inlier_ratio: 1.0,
    };

    match *strategy {
        NormalStrategy::Pca => Some(pca()),
        NormalStrategy::Ransac {
            distance_threshold,
            iterations,
            seed,
        } => match segment_plane(points, distance_threshold, iterations, seed) {
            Some(fit) => Some(ClusterPose {
                centroid,
                normal: canonicalize_up(fit.normal()),
                inlier_ratio: fit.inlier_ratio(points.len()),
            }),
            None => Some(pca()),
        },
    }
}

/// Poses of every cluster in `labeling`, indexed by cluster id.
pub fn estimate_poses(
    points: &[Point3<f64>],
    labeling: &ClusterLabeling,
    strategy: &NormalStrategy,
) -> Vec<ClusterPose> {
    labeling
        .groups()
        .par_iter()
        .filter_map(|members| {
            let cluster: Vec<Point3<f64>> = members.iter().map(|&i| points[i]).collect();
            estimate_pose(&cluster, strategy)
        })
        .collect()
}
