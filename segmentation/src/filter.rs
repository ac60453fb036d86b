//! Drop clusters below a minimum size.

use pheno_core::ClusterLabeling;

/// Clusters that survived filtering.
#[derive(Debug, Clone, Default)]
pub struct FilteredClusters {
    /// Positions (in the labeled cloud) of kept points, ascending.
    pub kept: Vec<usize>,
    /// Labels of the kept points, contiguous from 0 in first-seen order.
    pub labeling: ClusterLabeling,
    pub discarded: usize,
}

impl FilteredClusters {
    pub fn is_empty(&self) -> bool {
        self.kept.is_empty()
    }
}

/// Keep points whose cluster has at least `min_size` members.
///
/// `kept.len() + discarded` always equals the input length; unassigned points
/// count as discarded.
pub fn filter_small_clusters(labeling: &ClusterLabeling, min_size: usize) -> FilteredClusters {
    let sizes = labeling.sizes();
    let large: Vec<bool> = sizes.iter().map(|&s| s >= min_size).collect();

    let mut kept = Vec::new();
    let mut raw = Vec::new();
    for i in 0..labeling.len() {
        if let Some(c) = labeling.cluster_of(i) {
            if large[c] {
                kept.push(i);
                raw.push(c as i32);
            }
        }
    }

    let filtered = ClusterLabeling::new(raw);
    let discarded = labeling.len() - kept.len();
    tracing::info!(
        "Clusters >= {} pts: {} (discarding {}); {} pts kept",
        min_size,
        filtered.num_clusters(),
        sizes.len() - filtered.num_clusters(),
        kept.len()
    );
    if kept.is_empty() && !labeling.is_empty() {
        tracing::warn!("No clusters survive filtering; consider reducing min_cluster_size");
    }

    FilteredClusters {
        kept,
        labeling: filtered,
        discarded,
    }
}
