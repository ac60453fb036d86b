//! K-means clustering with k-means++ seeding and parallel restarts.

use pheno_core::{Error, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

#[derive(Debug, Clone)]
pub struct KMeansConfig {
    pub k: usize,
    /// Independent k-means++ initialisations; the lowest inertia wins.
    pub restarts: usize,
    pub max_iterations: usize,
    /// Converged once no centroid moves further than this.
    pub tolerance: f64,
    pub seed: u64,
}

impl Default for KMeansConfig {
    fn default() -> Self {
        Self {
            k: 3,
            restarts: 100,
            max_iterations: 300,
            tolerance: 1e-4,
            seed: 42,
        }
    }
}

impl KMeansConfig {
    pub fn new(k: usize) -> Self {
        Self {
            k,
            ..Default::default()
        }
    }

    /// Few restarts, for tests and previews.
    pub fn fast(k: usize) -> Self {
        Self {
            k,
            restarts: 5,
            max_iterations: 100,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct KMeansResult {
    pub labels: Vec<usize>,
    pub centroids: Vec<Vec<f64>>,
    /// Sum of squared distances to the assigned centroid.
    pub inertia: f64,
}

impl KMeansResult {
    pub fn cluster_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.centroids.len()];
        for &l in &self.labels {
            sizes[l] += 1;
        }
        sizes
    }

    /// Label of the most populated cluster, lowest label on ties.
    pub fn largest_cluster(&self) -> Option<usize> {
        let sizes = self.cluster_sizes();
        let mut best: Option<(usize, usize)> = None;
        for (label, &size) in sizes.iter().enumerate() {
            if best.map_or(true, |(_, s)| size > s) {
                best = Some((label, size));
            }
        }
        best.map(|(label, _)| label)
    }
}

/// Seed for one restart, derived from the run seed and the restart index.
pub fn restart_seed(seed: u64, restart: usize) -> u64 {
    seed ^ (restart as u64 + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15)
}

fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// Nearest centroid, lowest index on ties.
fn nearest(row: &[f64], centroids: &[Vec<f64>]) -> (usize, f64) {
    let mut best = (0, f64::INFINITY);
    for (c, centroid) in centroids.iter().enumerate() {
        let d = squared_distance(row, centroid);
        if d < best.1 {
            best = (c, d);
        }
    }
    best
}

fn kmeans_plus_plus<R: AsRef<[f64]>>(rows: &[R], k: usize, rng: &mut StdRng) -> Vec<Vec<f64>> {
    let n = rows.len();
    let mut centroids: Vec<Vec<f64>> = Vec::with_capacity(k);
    centroids.push(rows[rng.gen_range(0..n)].as_ref().to_vec());

    let mut distances: Vec<f64> = rows
        .iter()
        .map(|r| squared_distance(r.as_ref(), &centroids[0]))
        .collect();

    while centroids.len() < k {
        let total: f64 = distances.iter().sum();
        let pick = if total > 0.0 {
            let mut target = rng.gen::<f64>() * total;
            let mut chosen = n - 1;
            for (i, &d) in distances.iter().enumerate() {
                target -= d;
                if target <= 0.0 && d > 0.0 {
                    chosen = i;
                    break;
                }
            }
            chosen
        } else {
            rng.gen_range(0..n)
        };

        let centroid = rows[pick].as_ref().to_vec();
        for (d, r) in distances.iter_mut().zip(rows) {
            *d = d.min(squared_distance(r.as_ref(), &centroid));
        }
        centroids.push(centroid);
    }
    centroids
}

fn lloyd<R: AsRef<[f64]>>(rows: &[R], config: &KMeansConfig, seed: u64) -> KMeansResult {
    let mut rng = StdRng::seed_from_u64(seed);
    let dim = rows[0].as_ref().len();
    let mut centroids = kmeans_plus_plus(rows, config.k, &mut rng);
    let mut labels = vec![0usize; rows.len()];

    for _ in 0..config.max_iterations {
        for (label, r) in labels.iter_mut().zip(rows) {
            *label = nearest(r.as_ref(), &centroids).0;
        }

        let mut sums = vec![vec![0.0; dim]; config.k];
        let mut counts = vec![0usize; config.k];
        for (&label, r) in labels.iter().zip(rows) {
            counts[label] += 1;
            for (s, v) in sums[label].iter_mut().zip(r.as_ref()) {
                *s += v;
            }
        }

        let mut shift = 0.0f64;
        for c in 0..config.k {
            // Empty clusters keep their previous centroid.
            if counts[c] == 0 {
                continue;
            }
            let updated: Vec<f64> = sums[c].iter().map(|s| s / counts[c] as f64).collect();
            shift = shift.max(squared_distance(&updated, &centroids[c]).sqrt());
            centroids[c] = updated;
        }
        if shift <= config.tolerance {
            break;
        }
    }

    let mut inertia = 0.0;
    for (label, r) in labels.iter_mut().zip(rows) {
        let (c, d) = nearest(r.as_ref(), &centroids);
        *label = c;
        inertia += d;
    }

    KMeansResult {
        labels,
        centroids,
        inertia,
    }
}

/// Lower inertia wins, then the earlier restart.
fn keep_better(
    a: (usize, KMeansResult),
    b: (usize, KMeansResult),
) -> (usize, KMeansResult) {
    let b_wins = b.1.inertia < a.1.inertia || (b.1.inertia == a.1.inertia && b.0 < a.0);
    if b_wins {
        b
    } else {
        a
    }
}

/// Cluster `rows` into `config.k` groups.
///
/// Restarts run in parallel; the result depends only on the data and
/// `config.seed`. Equal inertia resolves to the lowest restart index.
pub fn kmeans<R: AsRef<[f64]> + Sync>(rows: &[R], config: &KMeansConfig) -> Result<KMeansResult> {
    if config.k == 0 {
        return Err(Error::InvalidInput("k-means needs k ≥ 1".to_string()));
    }
    if rows.len() < config.k {
        return Err(Error::InvalidInput(format!(
            "k-means with k = {} needs at least {} rows, got {}",
            config.k,
            config.k,
            rows.len()
        )));
    }
    let dim = rows[0].as_ref().len();
    if rows.iter().any(|r| r.as_ref().len() != dim) {
        return Err(Error::InvalidInput("k-means rows differ in length".to_string()));
    }

    let restarts = config.restarts.max(1);
    let (_, best) = (0..restarts)
        .into_par_iter()
        .map(|r| (r, lloyd(rows, config, restart_seed(config.seed, r))))
        .reduce_with(keep_better)
        .ok_or_else(|| Error::InvalidInput("k-means produced no runs".to_string()))?;
    tracing::debug!(
        "k-means: k = {}, {} restarts, best inertia {:.6}",
        config.k,
        restarts,
        best.inertia
    );
    Ok(best)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn three_groups() -> Vec<[f64; 2]> {
        let mut rows = Vec::new();
        for i in 0..30 {
            let e = (i % 5) as f64 * 0.01;
            rows.push([0.0 + e, 0.0]);
            rows.push([10.0, 10.0 + e]);
            if i < 10 {
                rows.push([-10.0 + e, 5.0]);
            }
        }
        rows
    }

    #[test]
    fn test_separates_groups() {
        let rows = three_groups();
        let res = kmeans(&rows, &KMeansConfig::fast(3)).unwrap();
        let mut sizes = res.cluster_sizes();
        sizes.sort_unstable();
        assert_eq!(sizes, vec![10, 30, 30]);
        assert_eq!(res.labels[0], res.labels[3]);
        assert_ne!(res.labels[0], res.labels[1]);
    }

    #[test]
    fn test_same_seed_same_labels() {
        let rows = three_groups();
        let a = kmeans(&rows, &KMeansConfig::fast(3)).unwrap();
        let b = kmeans(&rows, &KMeansConfig::fast(3)).unwrap();
        assert_eq!(a.labels, b.labels);
        assert_eq!(a.inertia, b.inertia);
    }

    #[test]
    fn test_best_restart_matches_sequential_scan() {
        let rows = three_groups();
        let config = KMeansConfig {
            restarts: 12,
            ..KMeansConfig::fast(4)
        };
        let res = kmeans(&rows, &config).unwrap();

        let mut best: Option<KMeansResult> = None;
        for r in 0..config.restarts {
            let run = lloyd(&rows, &config, restart_seed(config.seed, r));
            if best.as_ref().map_or(true, |b| run.inertia < b.inertia) {
                best = Some(run);
            }
        }
        let best = best.unwrap();
        assert_eq!(res.inertia, best.inertia);
        assert_eq!(res.labels, best.labels);
    }

    #[test]
    fn test_equal_inertia_keeps_earlier_restart() {
        let run = |inertia: f64, label: usize| KMeansResult {
            labels: vec![label],
            centroids: vec![vec![0.0]],
            inertia,
        };
        let (idx, kept) = keep_better((3, run(1.0, 3)), (1, run(1.0, 1)));
        assert_eq!((idx, kept.labels[0]), (1, 1));
        let (idx, _) = keep_better((1, run(1.0, 1)), (3, run(1.0, 3)));
        assert_eq!(idx, 1);
        let (idx, _) = keep_better((0, run(2.0, 0)), (5, run(0.5, 5)));
        assert_eq!(idx, 5);
    }

    #[test]
    fn test_largest_cluster_tie_picks_lowest() {
        let res = KMeansResult {
            labels: vec![1, 0, 1, 0, 2],
            centroids: vec![vec![0.0]; 3],
            inertia: 0.0,
        };
        assert_eq!(res.largest_cluster(), Some(0));
    }

    #[test]
    fn test_identical_rows() {
        let rows = vec![[1.0, 1.0]; 6];
        let res = kmeans(&rows, &KMeansConfig::fast(3)).unwrap();
        assert_eq!(res.labels.len(), 6);
        assert_eq!(res.inertia, 0.0);
    }

    #[test]
    fn test_rejects_too_few_rows() {
        assert!(kmeans(&[[0.0]], &KMeansConfig::new(3)).is_err());
    }
}
