//! Multi-scale eigenvalue features.
//!
//! For each point and each radius, the ascending eigenvalues of the local
//! covariance are divided by their sum. The three radii give a 9-D descriptor
//! separating flat, linear and volumetric local geometry.

use crate::spatial::KdTree;
use nalgebra::{Matrix3, Point3, SymmetricEigen};
use rayon::prelude::*;

/// Small, medium and large neighbourhood radii in metres.
pub const DEFAULT_EIGEN_RADII: [f64; 3] = [0.0015, 0.003, 0.006];

pub type EigenFeature = [f64; 9];

/// Unbiased covariance of the given points about their mean.
///
/// `None` for fewer than two points.
pub fn covariance(points: impl Iterator<Item = Point3<f64>> + Clone) -> Option<Matrix3<f64>> {
    let n = points.clone().count();
    if n < 2 {
        return None;
    }
    let mean = points.clone().fold(nalgebra::Vector3::zeros(), |acc, p| acc + p.coords) / n as f64;
    let mut cov = Matrix3::zeros();
    for p in points {
        let d = p.coords - mean;
        cov += d * d.transpose();
    }
    Some(cov / (n - 1) as f64)
}

/// Ascending eigenvalues of a neighbourhood, normalised to sum to one.
///
/// Neighbourhoods with fewer than 3 points, or with a zero eigenvalue sum,
/// give all zeros.
pub fn normalized_eigenvalues(points: &[Point3<f64>], neighbors: &[usize]) -> [f64; 3] {
    if neighbors.len() < 3 {
        return [0.0; 3];
    }
    let Some(cov) = covariance(neighbors.iter().map(|&i| points[i])) else {
        return [0.0; 3];
    };
    let eigen = SymmetricEigen::new(cov);
    let mut values = [
        eigen.eigenvalues[0].max(0.0),
        eigen.eigenvalues[1].max(0.0),
        eigen.eigenvalues[2].max(0.0),
    ];
    values.sort_by(|a, b| a.total_cmp(b));
    let sum: f64 = values.iter().sum();
    if sum <= 0.0 || !sum.is_finite() {
        return [0.0; 3];
    }
    values.map(|v| v / sum)
}

/// Eigen features for every point, one row per point in input order.
pub fn compute_eigen_features(points: &[Point3<f64>], radii: &[f64; 3]) -> Vec<EigenFeature> {
    let tree = KdTree::build(points);
    compute_eigen_features_with_tree(&tree, radii)
}

pub fn compute_eigen_features_with_tree(tree: &KdTree, radii: &[f64; 3]) -> Vec<EigenFeature> {
    let points: Vec<Point3<f64>> = (0..tree.len()).map(|i| *tree.point(i)).collect();
    points
        .par_iter()
        .map(|p| {
            let mut feature = [0.0; 9];
            for (s, &r) in radii.iter().enumerate() {
                let neighbors = tree.search_radius(p, r);
                let values = normalized_eigenvalues(&points, &neighbors);
                feature[s * 3..s * 3 + 3].copy_from_slice(&values);
            }
            feature
        })
        .collect()
}
