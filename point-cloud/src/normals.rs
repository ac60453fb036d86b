//! Surface pose primitives for point clusters: medoid, centred covariance,
//! least-variance normal and RANSAC plane fitting.

use nalgebra::{Matrix3, Point3, SymmetricEigen, Vector3};
use pheno_core::{Ransac, RobustConfig, RobustModel};

/// Normal reported for clusters too small to fit.
pub const DEGENERATE_NORMAL: Vector3<f64> = Vector3::new(0.0, 0.0, 1.0);

/// Position in `points` of the point closest to their arithmetic mean.
/// Ties resolve to the lowest position.
pub fn medoid(points: &[Point3<f64>]) -> Option<usize> {
    if points.is_empty() {
        return None;
    }
    let mean = points.iter().fold(Vector3::zeros(), |acc, p| acc + p.coords) / points.len() as f64;
    let mut best = 0;
    let mut best_d = f64::INFINITY;
    for (i, p) in points.iter().enumerate() {
        let d = (p.coords - mean).norm_squared();
        if d < best_d {
            best_d = d;
            best = i;
        }
    }
    Some(best)
}

/// Covariance of `points` about `center` rather than about their mean.
pub fn covariance_about(points: &[Point3<f64>], center: &Point3<f64>) -> Matrix3<f64> {
    let mut cov = Matrix3::zeros();
    for p in points {
        let d = p - center;
        cov += d * d.transpose();
    }
    if points.len() > 1 {
        cov / (points.len() - 1) as f64
    } else {
        cov
    }
}

/// Flip `n` so its z component is non-negative.
pub fn canonicalize_up(n: Vector3<f64>) -> Vector3<f64> {
    if n.z < 0.0 {
        -n
    } else {
        n
    }
}

/// Eigenvector of the smallest eigenvalue, unit length and z-canonicalised.
pub fn smallest_eigenvector(cov: &Matrix3<f64>) -> Vector3<f64> {
    let eigen = SymmetricEigen::new(*cov);
    let mut min_idx = 0;
    for i in 1..3 {
        if eigen.eigenvalues[i] < eigen.eigenvalues[min_idx] {
            min_idx = i;
        }
    }
    let v: Vector3<f64> = eigen.eigenvectors.column(min_idx).into_owned();
    match v.try_normalize(1e-12) {
        Some(n) => canonicalize_up(n),
        None => DEGENERATE_NORMAL,
    }
}

/// PCA normal of `points` with covariance centred on `center`.
///
/// Fewer than 3 points give [`DEGENERATE_NORMAL`].
pub fn pca_normal(points: &[Point3<f64>], center: &Point3<f64>) -> Vector3<f64> {
    if points.len() < 3 {
        return DEGENERATE_NORMAL;
    }
    smallest_eigenvector(&covariance_about(points, center))
}

/// Three-point plane hypothesis `[a, b, c, d]` with a unit normal.
pub struct PlaneEstimator;

impl RobustModel<Point3<f64>> for PlaneEstimator {
    type Model = [f64; 4];

    fn min_sample_size(&self) -> usize {
        3
    }

    fn estimate(&self, data: &[&Point3<f64>]) -> Option<Self::Model> {
        let (p1, p2, p3) = (data[0], data[1], data[2]);
        let normal = (p2 - p1).cross(&(p3 - p1)).try_normalize(1e-12)?;
        let d = -normal.dot(&p1.coords);
        Some([normal.x, normal.y, normal.z, d])
    }

    fn compute_error(&self, model: &Self::Model, data: &Point3<f64>) -> f64 {
        let [a, b, c, d] = *model;
        (a * data.x + b * data.y + c * data.z + d).abs()
    }
}

/// A RANSAC plane and the positions of its inliers.
#[derive(Debug, Clone)]
pub struct PlaneFit {
    pub plane: [f64; 4],
    pub inliers: Vec<usize>,
}

impl PlaneFit {
    pub fn normal(&self) -> Vector3<f64> {
        Vector3::new(self.plane[0], self.plane[1], self.plane[2])
    }

    pub fn inlier_ratio(&self, total: usize) -> f64 {
        if total == 0 {
            0.0
        } else {
            self.inliers.len() as f64 / total as f64
        }
    }
}

/// Segment a plane using RANSAC.
/// Plane equation: ax + by + cz + d = 0.
pub fn segment_plane(
    points: &[Point3<f64>],
    distance_threshold: f64,
    num_iterations: usize,
    seed: u64,
) -> Option<PlaneFit> {
    if points.len() < 3 {
        return None;
    }

    let config = RobustConfig {
        threshold: distance_threshold,
        max_iterations: num_iterations,
        confidence: 0.99,
        seed,
    };
    let res = Ransac::new(config).run(&PlaneEstimator, points);
    let plane = res.model?;
    let inliers = res.inliers;

    Some(PlaneFit { plane, inliers })
}
