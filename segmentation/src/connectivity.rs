//! Fixed-radius neighbour graph and its connected components.

use crate::config::{ConnectivityConfig, RadiusPolicy};
use nalgebra::Point3;
use pheno_core::ClusterLabeling;
use pheno_point_cloud::{adaptive_radius, KdTree};
use rayon::prelude::*;
use std::collections::VecDeque;

/// Radius the config selects for `points`.
pub fn resolve_radius(points: &[Point3<f64>], config: &ConnectivityConfig) -> f64 {
    match config.radius {
        RadiusPolicy::Fixed(r) => r,
        RadiusPolicy::Adaptive { multiplier } => {
            adaptive_radius(points, config.adaptive_sample_size, multiplier, config.seed)
        }
    }
}

/// Symmetric adjacency lists: `j ∈ adj[i]` iff `i ≠ j` and `‖pᵢ − pⱼ‖ ≤ radius`.
pub fn radius_adjacency(points: &[Point3<f64>], radius: f64) -> Vec<Vec<usize>> {
    let tree = KdTree::build(points);
    points
        .par_iter()
        .enumerate()
        .map(|(i, p)| {
            let mut neighbors = tree.search_radius(p, radius);
            neighbors.retain(|&j| j != i);
            neighbors
        })
        .collect()
}

/// Connected components of the radius graph.
///
/// Component ids follow the lowest point index they contain, so the result
/// does not depend on how the neighbour queries were scheduled.
pub fn connected_components(points: &[Point3<f64>], radius: f64) -> ClusterLabeling {
    let adjacency = radius_adjacency(points, radius);
    let labels = label_components(&adjacency);
    let labeling = ClusterLabeling::new(labels);

    let mut sizes = labeling.sizes();
    sizes.sort_unstable_by(|a, b| b.cmp(a));
    tracing::info!(
        "{} components at radius {:.1} mm; largest {:?}",
        labeling.num_clusters(),
        radius * 1000.0,
        &sizes[..sizes.len().min(10)]
    );
    labeling
}

fn label_components(adjacency: &[Vec<usize>]) -> Vec<i32> {
    let n = adjacency.len();
    let mut labels = vec![-1i32; n];
    let mut next = 0;
    let mut queue = VecDeque::new();

    for start in 0..n {
        if labels[start] >= 0 {
            continue;
        }
        labels[start] = next;
        queue.push_back(start);
        while let Some(i) = queue.pop_front() {
            for &j in &adjacency[i] {
                if labels[j] < 0 {
                    labels[j] = next;
                    queue.push_back(j);
                }
            }
        }
        next += 1;
    }
    labels
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_and_isolated_point() {
        let pts = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(5.0, 0.0, 0.0),
            Point3::new(0.001, 0.0, 0.0),
            Point3::new(0.002, 0.0, 0.0),
        ];
        let labeling = connected_components(&pts, 0.001);
        assert_eq!(labeling.labels(), &[0, 1, 0, 0]);
        assert_eq!(labeling.num_clusters(), 2);
    }

    #[test]
    fn test_adjacency_is_symmetric_without_self_loops() {
        let pts: Vec<Point3<f64>> = (0..50)
            .map(|i| Point3::new((i % 7) as f64 * 0.001, (i / 7) as f64 * 0.001, 0.0))
            .collect();
        let adj = radius_adjacency(&pts, 0.0015);
        for (i, list) in adj.iter().enumerate() {
            assert!(!list.contains(&i));
            for &j in list {
                assert!(adj[j].contains(&i));
            }
        }
    }

    #[test]
    fn test_fixed_radius_resolves_directly() {
        let config = ConnectivityConfig::default();
        assert_eq!(resolve_radius(&[], &config), 0.002);
    }
}
