use std::collections::HashMap;

/// Label value for points that belong to no cluster.
pub const UNASSIGNED: i32 = -1;

/// Per-point cluster assignment.
///
/// `labels[i]` is the cluster id of point `i`, or [`UNASSIGNED`]. Cluster ids
/// are contiguous in `0..num_clusters`. Stages never mutate a labeling in
/// place; each returns a new one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClusterLabeling {
    labels: Vec<i32>,
    num_clusters: usize,
}

impl ClusterLabeling {
    /// Wrap raw labels. Ids are compacted to a contiguous range in first-seen
    /// order; negative values become [`UNASSIGNED`].
    pub fn new(raw: Vec<i32>) -> Self {
        let mut remap: HashMap<i32, i32> = HashMap::new();
        let mut labels = Vec::with_capacity(raw.len());
        for l in raw {
            if l < 0 {
                labels.push(UNASSIGNED);
                continue;
            }
            let next = remap.len() as i32;
            labels.push(*remap.entry(l).or_insert(next));
        }
        Self {
            labels,
            num_clusters: remap.len(),
        }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn num_clusters(&self) -> usize {
        self.num_clusters
    }

    pub fn labels(&self) -> &[i32] {
        &self.labels
    }

    /// Cluster of point `i`, `None` when unassigned or out of range.
    pub fn cluster_of(&self, i: usize) -> Option<usize> {
        match self.labels.get(i) {
            Some(&l) if l >= 0 => Some(l as usize),
            _ => None,
        }
    }

    pub fn sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.num_clusters];
        for &l in &self.labels {
            if l >= 0 {
                sizes[l as usize] += 1;
            }
        }
        sizes
    }

    /// Point indices of every cluster, each list in ascending order.
    pub fn groups(&self) -> Vec<Vec<usize>> {
        let mut groups = vec![Vec::new(); self.num_clusters];
        for (i, &l) in self.labels.iter().enumerate() {
            if l >= 0 {
                groups[l as usize].push(i);
            }
        }
        groups
    }

    pub fn num_unassigned(&self) -> usize {
        self.labels.iter().filter(|&&l| l < 0).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_compacts_in_first_seen_order() {
        let labeling = ClusterLabeling::new(vec![7, 7, 2, -5, 9, 2]);
        assert_eq!(labeling.labels(), &[0, 0, 1, UNASSIGNED, 2, 1]);
        assert_eq!(labeling.num_clusters(), 3);
        assert_eq!(labeling.sizes(), vec![2, 2, 1]);
        assert_eq!(labeling.num_unassigned(), 1);
    }

    #[test]
    fn test_groups_and_lookup() {
        let labeling = ClusterLabeling::new(vec![0, 1, 0, 1, UNASSIGNED]);
        assert_eq!(labeling.groups(), vec![vec![0, 2], vec![1, 3]]);
        assert_eq!(labeling.cluster_of(3), Some(1));
        assert_eq!(labeling.cluster_of(4), None);
        assert_eq!(labeling.cluster_of(99), None);
    }

    #[test]
    fn test_empty() {
        let labeling = ClusterLabeling::new(Vec::new());
        assert!(labeling.is_empty());
        assert_eq!(labeling.num_clusters(), 0);
        assert!(labeling.groups().is_empty());
    }
}
