//! Merge proximate, near-parallel clusters to repair over-segmentation.

use crate::config::{MergeConfig, NormalStrategy};
use crate::pose::{estimate_poses, ClusterPose};
use crate::union_find::UnionFind;
use nalgebra::Point3;
use pheno_core::ClusterLabeling;

#[derive(Debug, Clone, Default)]
pub struct MergedClusters {
    pub labeling: ClusterLabeling,
    pub poses: Vec<ClusterPose>,
    pub passes: usize,
}

/// Two clusters merge when their medoids are within the distance threshold and
/// their normals are parallel up to sign within the angle threshold.
pub fn should_merge(a: &ClusterPose, b: &ClusterPose, config: &MergeConfig) -> bool {
    (a.centroid - b.centroid).norm() <= config.distance_threshold
        && a.normal.dot(&b.normal).abs() >= config.cos_threshold()
}

/// One union pass over all cluster pairs.
///
/// Returns the group of each cluster, contiguous in first-seen cluster order,
/// or `None` when no pair qualified.
pub fn merge_pass(poses: &[ClusterPose], config: &MergeConfig) -> Option<Vec<usize>> {
    let mut uf = UnionFind::new(poses.len());
    let mut merged = false;
    for i in 0..poses.len() {
        for j in i + 1..poses.len() {
            if should_merge(&poses[i], &poses[j], config) {
                merged |= uf.union(i, j);
            }
        }
    }
    merged.then(|| uf.labels())
}

/// Merge clusters until no pair qualifies, recomputing poses from pooled
/// points after every pass.
///
/// Running this again on its own output with the same thresholds leaves the
/// cluster count unchanged.
pub fn merge_clusters(
    points: &[Point3<f64>],
    labeling: &ClusterLabeling,
    poses: &[ClusterPose],
    config: &MergeConfig,
    strategy: &NormalStrategy,
) -> MergedClusters {
    let before = labeling.num_clusters();
    let mut labeling = labeling.clone();
    let mut poses = poses.to_vec();
    let mut passes = 0;

    // A pass yields groups only after a real union, so each one removes at least one cluster.
    while let Some(groups) = merge_pass(&poses, config) {
        passes += 1;
        let raw = labeling
            .labels()
            .iter()
            .map(|&l| if l < 0 { l } else { groups[l as usize] as i32 })
            .collect();
        labeling = ClusterLabeling::new(raw);
        poses = estimate_poses(points, &labeling, strategy);
    }

    tracing::info!(
        "After merge: {} clusters (was {}, {} passes)",
        labeling.num_clusters(),
        before,
        passes
    );
    MergedClusters {
        labeling,
        poses,
        passes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector3;

    fn pose(x: f64, normal: Vector3<f64>) -> ClusterPose {
        ClusterPose {
            centroid: Point3::new(x, 0.0, 0.0),
            normal: normal.normalize(),
            inlier_ratio: 1.0,
        }
    }

    #[test]
    fn test_sign_insensitive_angle() {
        let config = MergeConfig::default();
        let a = pose(0.0, Vector3::z());
        let b = pose(0.01, -Vector3::z());
        assert!(should_merge(&a, &b, &config));
        let c = pose(0.01, Vector3::x());
        assert!(!should_merge(&a, &c, &config));
        let d = pose(0.02, Vector3::z());
        assert!(!should_merge(&a, &d, &config));
    }

    #[test]
    fn test_pass_groups_transitively() {
        let config = MergeConfig::default();
        let poses = vec![
            pose(0.0, Vector3::z()),
            pose(1.0, Vector3::z()),
            pose(0.012, Vector3::z()),
            pose(0.024, Vector3::z()),
        ];
        assert_eq!(merge_pass(&poses, &config), Some(vec![0, 1, 0, 0]));
        assert_eq!(merge_pass(&poses[..2], &config), None);
    }
}
