//! Preprocessing filters: height cropping and density-derived radii.

use crate::spatial::KdTree;
use nalgebra::{Point3, Vector2};
use rand::rngs::StdRng;
use rand::seq::index::sample;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

/// How to choose the z threshold below which points are dropped.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CropMethod {
    /// Keep everything.
    #[default]
    None,
    /// Keep the top fraction of the z-range, `0 < f ≤ 1`.
    TopFraction(f64),
    /// Threshold at the z of the point furthest from the xy-mean, lowered by
    /// `z_offset`. Leaf tips reach furthest out, so this drops the pot.
    SingleFurthest { z_offset: f64 },
}

/// The z threshold `method` selects; `None` for an empty cloud.
pub fn height_threshold(points: &[Point3<f64>], method: CropMethod) -> Option<f64> {
    let min_z = points.iter().map(|p| p.z).reduce(f64::min)?;
    let max_z = points.iter().map(|p| p.z).reduce(f64::max)?;
    Some(match method {
        CropMethod::None => min_z,
        CropMethod::TopFraction(f) => max_z - (max_z - min_z) * f.clamp(0.0, 1.0),
        CropMethod::SingleFurthest { z_offset } => {
            let n = points.len() as f64;
            let center = points
                .iter()
                .fold(Vector2::zeros(), |acc, p| acc + Vector2::new(p.x, p.y))
                / n;
            let mut furthest = 0;
            let mut best = f64::NEG_INFINITY;
            for (i, p) in points.iter().enumerate() {
                let d = (Vector2::new(p.x, p.y) - center).norm_squared();
                if d > best {
                    best = d;
                    furthest = i;
                }
            }
            points[furthest].z - z_offset
        }
    })
}

/// Points with `z ≥ threshold`, plus their positions in `points`.
pub fn crop_by_height(points: &[Point3<f64>], method: CropMethod) -> (Vec<Point3<f64>>, Vec<usize>) {
    let Some(threshold) = height_threshold(points, method) else {
        return (Vec::new(), Vec::new());
    };
    let kept: Vec<usize> = (0..points.len()).filter(|&i| points[i].z >= threshold).collect();
    tracing::info!(
        "Height crop at z = {:.4} m keeps {}/{} points",
        threshold,
        kept.len(),
        points.len()
    );
    (kept.iter().map(|&i| points[i]).collect(), kept)
}

/// Radius used when a cloud is too small to estimate density.
pub const FALLBACK_RADIUS: f64 = 0.01;

/// `multiplier` × the mean nearest-neighbour distance over a seeded sample of
/// at most `sample_size` points.
pub fn adaptive_radius(points: &[Point3<f64>], sample_size: usize, multiplier: f64, seed: u64) -> f64 {
    if points.len() < 10 || sample_size == 0 {
        return FALLBACK_RADIUS;
    }
    let tree = KdTree::build(points);
    let mut rng = StdRng::seed_from_u64(seed);
    let picks = sample(&mut rng, points.len(), sample_size.min(points.len()));

    let mut total = 0.0;
    let mut count = 0usize;
    for i in picks.iter() {
        // First hit is the point itself.
        if let Some(&(_, d)) = tree.k_nearest(&points[i], 2).get(1) {
            total += d;
            count += 1;
        }
    }
    if count == 0 {
        return FALLBACK_RADIUS;
    }
    let mean_1nn = total / count as f64;
    let radius = mean_1nn * multiplier;
    tracing::debug!(
        "Mean 1-NN distance {:.2} mm, adaptive radius {:.2} mm",
        mean_1nn * 1000.0,
        radius * 1000.0
    );
    radius
}
