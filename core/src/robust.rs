//! Seeded RANSAC.
//!
//! Models plug in through [`RobustModel`]; the plane fit used for leaf normals
//! is one of them. Given the same seed and data, [`Ransac::run`] returns the
//! same hypothesis.

use rand::rngs::StdRng;
use rand::seq::index::sample;
use rand::SeedableRng;
use std::marker::PhantomData;

#[derive(Debug, Clone, PartialEq)]
pub struct RobustConfig {
    /// Largest residual of an inlier.
    pub threshold: f64,
    pub max_iterations: usize,
    /// Probability of having drawn one all-inlier sample; bounds the number
    /// of hypotheses once a good one is known.
    pub confidence: f64,
    pub seed: u64,
}

impl Default for RobustConfig {
    fn default() -> Self {
        Self {
            threshold: 0.005,
            max_iterations: 1000,
            confidence: 0.99,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RobustResult<M> {
    pub model: Option<M>,
    /// Ascending indices of the inliers of `model`.
    pub inliers: Vec<usize>,
    /// Mean inlier residual.
    pub residual: f64,
    /// Hypotheses drawn.
    pub iterations: usize,
    total: usize,
}

impl<M> RobustResult<M> {
    fn empty(total: usize) -> Self {
        Self {
            model: None,
            inliers: Vec::new(),
            residual: f64::INFINITY,
            iterations: 0,
            total,
        }
    }

    pub fn num_inliers(&self) -> usize {
        self.inliers.len()
    }

    pub fn inlier_ratio(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.inliers.len() as f64 / self.total as f64
        }
    }
}

pub trait RobustModel<D> {
    type Model: Clone;

    /// Points per hypothesis.
    fn min_sample_size(&self) -> usize;

    /// `None` for a degenerate sample.
    fn estimate(&self, data: &[&D]) -> Option<Self::Model>;

    fn compute_error(&self, model: &Self::Model, data: &D) -> f64;
}

/// Hypotheses needed to draw one all-inlier sample of size `k` with
/// probability `confidence` when a fraction `ratio` of the data are inliers.
pub fn required_iterations(confidence: f64, ratio: f64, k: usize) -> usize {
    if ratio >= 1.0 {
        return 1;
    }
    let all_inlier = ratio.powi(k as i32);
    if all_inlier <= f64::EPSILON {
        return usize::MAX;
    }
    let n = (1.0 - confidence).ln() / (1.0 - all_inlier).ln();
    if n.is_finite() {
        n.ceil().max(1.0) as usize
    } else {
        usize::MAX
    }
}

pub struct Ransac<D, M: RobustModel<D>> {
    config: RobustConfig,
    _phantom: PhantomData<(D, M)>,
}

impl<D, M: RobustModel<D>> Ransac<D, M> {
    pub fn new(config: RobustConfig) -> Self {
        Self {
            config,
            _phantom: PhantomData,
        }
    }

    /// Best hypothesis by inlier count, ties broken by mean residual.
    pub fn run(&self, estimator: &M, data: &[D]) -> RobustResult<M::Model> {
        let n = data.len();
        let k = estimator.min_sample_size();
        let mut best = RobustResult::empty(n);
        if k == 0 || n < k {
            return best;
        }

        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let mut budget = self.config.max_iterations;
        let mut drawn = 0;
        while drawn < budget {
            drawn += 1;
            let picked: Vec<&D> = sample(&mut rng, n, k).iter().map(|i| &data[i]).collect();
            let Some(model) = estimator.estimate(&picked) else {
                continue;
            };

            let mut inliers = Vec::new();
            let mut total_error = 0.0;
            for (i, d) in data.iter().enumerate() {
                let err = estimator.compute_error(&model, d);
                if err < self.config.threshold {
                    inliers.push(i);
                    total_error += err;
                }
            }
            if inliers.is_empty() {
                continue;
            }
            let residual = total_error / inliers.len() as f64;

            let better = inliers.len() > best.inliers.len()
                || (inliers.len() == best.inliers.len() && residual < best.residual);
            if better {
                let ratio = inliers.len() as f64 / n as f64;
                budget = budget.min(required_iterations(self.config.confidence, ratio, k));
                best.model = Some(model);
                best.inliers = inliers;
                best.residual = residual;
            }
        }
        best.iterations = drawn;
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 1-D constant: the hypothesis is the sampled value.
    struct Constant;

    impl RobustModel<f64> for Constant {
        type Model = f64;

        fn min_sample_size(&self) -> usize {
            1
        }

        fn estimate(&self, data: &[&f64]) -> Option<f64> {
            Some(*data[0])
        }

        fn compute_error(&self, model: &f64, data: &f64) -> f64 {
            (model - data).abs()
        }
    }

    #[test]
    fn test_finds_majority_value() {
        let mut data = vec![5.0; 20];
        data.extend([100.0, -40.0, 17.0]);
        let config = RobustConfig {
            threshold: 0.1,
            max_iterations: 50,
            ..Default::default()
        };
        let res = Ransac::new(config).run(&Constant, &data);
        assert_eq!(res.model, Some(5.0));
        assert_eq!(res.num_inliers(), 20);
        assert_eq!(res.inliers, (0..20).collect::<Vec<_>>());
        assert!((res.inlier_ratio() - 20.0 / 23.0).abs() < 1e-12);
    }

    #[test]
    fn test_same_seed_same_result() {
        let data: Vec<f64> = (0..30).map(|i| (i % 7) as f64).collect();
        let config = RobustConfig {
            threshold: 0.5,
            max_iterations: 5,
            confidence: 0.999,
            seed: 9,
        };
        let a = Ransac::new(config.clone()).run(&Constant, &data);
        let b = Ransac::new(config).run(&Constant, &data);
        assert_eq!(a.model, b.model);
        assert_eq!(a.inliers, b.inliers);
    }

    #[test]
    fn test_perfect_data_stops_after_one_hypothesis() {
        let data = vec![1.0; 10];
        let res = Ransac::new(RobustConfig::default()).run(&Constant, &data);
        assert_eq!(res.iterations, 1);
        assert_eq!(res.inlier_ratio(), 1.0);
    }

    #[test]
    fn test_iteration_bound() {
        assert_eq!(required_iterations(0.99, 1.0, 3), 1);
        // 50 % inliers, 3-point samples: log(0.01) / log(0.875) ≈ 34.5
        assert_eq!(required_iterations(0.99, 0.5, 3), 35);
        assert_eq!(required_iterations(0.99, 0.0, 3), usize::MAX);
    }

    #[test]
    fn test_too_little_data() {
        let res = Ransac::new(RobustConfig::default()).run(&Constant, &[]);
        assert!(res.model.is_none());
        assert_eq!(res.inlier_ratio(), 0.0);
    }
}
