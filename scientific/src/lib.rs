//! Scientific Computing
//!
//! Numerical building blocks for segmentation and planning:
//! - [`pca`]: linear principal component analysis
//! - [`kmeans`]: k-means++ with seeded parallel restarts
//! - [`spline`]: natural cubic splines and arc-length 3-D curves
//!
//! ## Example: Spline Through Waypoints
//!
//! ```rust
//! use nalgebra::Point3;
//! use pheno_scientific::spline::SplineCurve3;
//!
//! let controls = [Point3::new(0.0, 0.0, 0.0), Point3::new(0.1, 0.1, 0.0), Point3::new(0.2, 0.0, 0.0)];
//! let curve = SplineCurve3::through(&controls, 1e-9).unwrap();
//! let path = curve.sample(20);
//! assert_eq!(path.len(), 20);
//! ```

pub mod kmeans;
pub mod pca;
pub mod spline;

pub type Error = pheno_core::Error;
pub type Result<T> = pheno_core::Result<T>;

pub use kmeans::{kmeans, KMeansConfig, KMeansResult};
pub use pca::Pca;
pub use spline::{cumulative_arc_length, CubicSpline, SplineCurve3};

pub fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a * (1.0 - t) + b * t
}

/// Shortest signed angular difference `to − from`, in `(−π, π]`.
pub fn wrap_angle_diff(from: f64, to: f64) -> f64 {
    let two_pi = std::f64::consts::TAU;
    let mut d = (to - from) % two_pi;
    if d <= -std::f64::consts::PI {
        d += two_pi;
    } else if d > std::f64::consts::PI {
        d -= two_pi;
    }
    d
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_lerp() {
        assert_eq!(lerp(2.0, 4.0, 0.5), 3.0);
        assert_eq!(lerp(2.0, 4.0, 0.0), 2.0);
    }

    #[test]
    fn test_wrap_angle_diff() {
        assert!((wrap_angle_diff(0.9 * PI, -0.9 * PI) - 0.2 * PI).abs() < 1e-12);
        assert!((wrap_angle_diff(-0.9 * PI, 0.9 * PI) + 0.2 * PI).abs() < 1e-12);
        assert!((wrap_angle_diff(0.0, PI) - PI).abs() < 1e-12);
    }
}
