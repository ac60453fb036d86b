//! Background separation: eigen features, PCA, k-means, keep the largest cluster.

use crate::config::{BackgroundConfig, BackgroundStrategy};
use nalgebra::Point3;
use pheno_core::Result;
use pheno_point_cloud::compute_eigen_features;
use pheno_scientific::{kmeans, KMeansConfig, Pca};

/// Outcome of background separation.
#[derive(Debug, Clone, Default)]
pub struct BackgroundSplit {
    /// Positions of plant points in the input, ascending.
    pub plant_indices: Vec<usize>,
    /// Point count of every k-means cluster.
    pub cluster_sizes: Vec<usize>,
    pub plant_label: usize,
}

impl BackgroundSplit {
    fn everything(n: usize) -> Self {
        Self {
            plant_indices: (0..n).collect(),
            cluster_sizes: vec![n],
            plant_label: 0,
        }
    }

    pub fn background_count(&self) -> usize {
        self.cluster_sizes.iter().sum::<usize>() - self.plant_indices.len()
    }
}

/// Split `points` into plant and background.
///
/// The largest cluster is assumed to be the plant. When the pot dominates the
/// scan this picks the wrong cluster; nothing here detects that.
pub fn separate_background(points: &[Point3<f64>], config: &BackgroundConfig) -> Result<BackgroundSplit> {
    if points.is_empty() {
        return Ok(BackgroundSplit::default());
    }
    if config.strategy == BackgroundStrategy::Disabled {
        return Ok(BackgroundSplit::everything(points.len()));
    }
    if points.len() < config.k {
        tracing::warn!(
            "Only {} points for k = {}; keeping all as plant",
            points.len(),
            config.k
        );
        return Ok(BackgroundSplit::everything(points.len()));
    }

    tracing::info!(
        "Separating plant from background ({} points, k = {})",
        points.len(),
        config.k
    );
    let features = compute_eigen_features(points, &config.radii);
    let (_, projected) = Pca::fit_transform(&features, 3)?;

    let kmeans_config = KMeansConfig {
        k: config.k,
        restarts: config.restarts,
        max_iterations: config.max_iterations,
        seed: config.seed,
        ..KMeansConfig::default()
    };
    let clustering = kmeans(&projected, &kmeans_config)?;
    let cluster_sizes = clustering.cluster_sizes();
    let plant_label = clustering.largest_cluster().unwrap_or(0);

    let plant_indices: Vec<usize> = clustering
        .labels
        .iter()
        .enumerate()
        .filter(|(_, &l)| l == plant_label)
        .map(|(i, _)| i)
        .collect();

    tracing::info!(
        "Cluster sizes {:?}; keeping cluster {} as plant ({} points)",
        cluster_sizes,
        plant_label,
        plant_indices.len()
    );

    Ok(BackgroundSplit {
        plant_indices,
        cluster_sizes,
        plant_label,
    })
}
