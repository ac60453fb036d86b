//! Leaf record construction: outward orientation, plane and target point.

use crate::config::LeafConfig;
use crate::pose::ClusterPose;
use nalgebra::{Point3, Vector3};
use pheno_core::{ClusterLabeling, LeafRecord};

/// Estimated plant base: the mean of `reference` with z set to its minimum z.
pub fn plant_base(reference: &[Point3<f64>]) -> Option<Point3<f64>> {
    if reference.is_empty() {
        return None;
    }
    let sum = reference.iter().fold(Vector3::zeros(), |acc, p| acc + p.coords);
    let mut base = Point3::from(sum / reference.len() as f64);
    base.z = reference.iter().map(|p| p.z).fold(f64::INFINITY, f64::min);
    Some(base)
}

/// Flip `normal` if it points toward `base`, so `dot(normal, base − centroid) ≤ 0`.
pub fn orient_outward(normal: Vector3<f64>, centroid: &Point3<f64>, base: &Point3<f64>) -> Vector3<f64> {
    if normal.dot(&(base - centroid)) > 0.0 {
        -normal
    } else {
        normal
    }
}

/// `[a, b, c, d]` of the plane through `point` with unit `normal`.
pub fn plane_equation(normal: &Vector3<f64>, point: &Point3<f64>) -> [f64; 4] {
    [normal.x, normal.y, normal.z, -normal.dot(&point.coords)]
}

/// One record per cluster, ids from 1 in cluster order.
///
/// `points` is the clustered cloud, `source_indices[i]` the detector-input
/// index of `points[i]`, and `reference` the cloud used for the base point.
pub fn build_leaf_records(
    points: &[Point3<f64>],
    labeling: &ClusterLabeling,
    poses: &[ClusterPose],
    source_indices: &[usize],
    reference: &[Point3<f64>],
    config: &LeafConfig,
) -> Vec<LeafRecord> {
    let Some(base) = plant_base(reference) else {
        return Vec::new();
    };
    tracing::info!(
        "Building leaf data: {} leaves, target distance {:.1} cm",
        poses.len(),
        config.target_distance * 100.0
    );

    labeling
        .groups()
        .into_iter()
        .zip(poses)
        .enumerate()
        .map(|(i, (members, pose))| {
            let unit = pose.normal.try_normalize(1e-12).unwrap_or_else(Vector3::z);
            let normal = orient_outward(unit, &pose.centroid, &base);
            let leaf = LeafRecord {
                id: i as u32 + 1,
                centroid: pose.centroid,
                normal,
                plane_equation: plane_equation(&normal, &pose.centroid),
                inlier_ratio: pose.inlier_ratio,
                points_indices: members.iter().map(|&m| source_indices[m]).collect(),
                points: members.iter().map(|&m| points[m]).collect(),
                target_point: pose.centroid + normal * config.target_distance,
            };
            tracing::debug!(
                "Leaf {:2}: {:5} pts | centroid ({:.3}, {:.3}, {:.3}) | normal ({:.3}, {:.3}, {:.3})",
                leaf.id,
                members.len(),
                leaf.centroid.x,
                leaf.centroid.y,
                leaf.centroid.z,
                normal.x,
                normal.y,
                normal.z
            );
            leaf
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_uses_min_z() {
        let pts = vec![Point3::new(0.0, 0.0, 1.0), Point3::new(2.0, 2.0, -1.0)];
        assert_eq!(plant_base(&pts), Some(Point3::new(1.0, 1.0, -1.0)));
        assert_eq!(plant_base(&[]), None);
    }

    #[test]
    fn test_orientation_points_away_from_base() {
        let base = Point3::new(0.0, 0.0, 0.0);
        let centroid = Point3::new(0.0, 0.0, 1.0);
        assert_eq!(orient_outward(-Vector3::z(), &centroid, &base), Vector3::z());
        assert_eq!(orient_outward(Vector3::z(), &centroid, &base), Vector3::z());
        // Perpendicular normals are kept as is.
        assert_eq!(orient_outward(Vector3::x(), &centroid, &base), Vector3::x());
    }

    #[test]
    fn test_records() {
        let points = vec![
            Point3::new(0.0, 0.0, 0.1),
            Point3::new(1.0, 0.0, 0.1),
            Point3::new(0.001, 0.0, 0.1),
        ];
        let labeling = ClusterLabeling::new(vec![0, 1, 0]);
        let poses = vec![
            ClusterPose {
                centroid: points[0],
                normal: -Vector3::z(),
                inlier_ratio: 1.0,
            },
            ClusterPose {
                centroid: points[1],
                normal: Vector3::new(0.0, 0.0, 2.0),
                inlier_ratio: 0.5,
            },
        ];
        let reference = vec![Point3::new(0.5, 0.0, -0.2), Point3::new(0.5, 0.0, 0.1)];
        let leaves = build_leaf_records(
            &points,
            &labeling,
            &poses,
            &[10, 20, 30],
            &reference,
            &LeafConfig { target_distance: 0.1 },
        );

        assert_eq!(leaves.len(), 2);
        assert_eq!(leaves[0].id, 1);
        assert_eq!(leaves[1].id, 2);
        assert_eq!(leaves[0].points_indices, vec![10, 30]);
        assert_eq!(leaves[0].normal, Vector3::z());
        assert!((leaves[1].normal.norm() - 1.0).abs() < 1e-12);
        assert!(leaves[0].signed_distance(&leaves[0].centroid).abs() < 1e-12);
        assert!(((leaves[0].target_point - leaves[0].centroid).norm() - 0.1).abs() < 1e-12);
        assert_eq!(leaves[1].inlier_ratio, 0.5);
    }
}
