//! Configuration for every segmentation stage.
//!
//! All structs deserialize with per-field defaults, so a JSON file only needs
//! the values it overrides.

use pheno_core::{Error, Result};
use pheno_point_cloud::{CropMethod, DEFAULT_EIGEN_RADII};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// How plant points are told apart from pot and background.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BackgroundStrategy {
    /// Multi-scale eigen features, PCA to 3-D, k-means; largest cluster is plant.
    #[default]
    EigenKMeans,
    /// Every point is plant. For clouds that were segmented upstream.
    Disabled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackgroundConfig {
    pub strategy: BackgroundStrategy,
    /// Neighbourhood radii in metres, small to large.
    pub radii: [f64; 3],
    pub k: usize,
    pub restarts: usize,
    pub max_iterations: usize,
    pub seed: u64,
}

impl Default for BackgroundConfig {
    fn default() -> Self {
        Self {
            strategy: BackgroundStrategy::EigenKMeans,
            radii: DEFAULT_EIGEN_RADII,
            k: 3,
            restarts: 100,
            max_iterations: 300,
            seed: 42,
        }
    }
}

impl BackgroundConfig {
    pub fn validate(&self) -> Result<()> {
        if self.radii.iter().any(|r| !r.is_finite() || *r <= 0.0) {
            return Err(Error::InvalidInput(format!(
                "Eigen feature radii must be positive, got {:?}",
                self.radii
            )));
        }
        if self.k == 0 {
            return Err(Error::InvalidInput("Background k must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// Neighbour radius for the connectivity graph.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RadiusPolicy {
    Fixed(f64),
    /// `multiplier` × mean nearest-neighbour distance of the plant cloud.
    Adaptive { multiplier: f64 },
}

impl Default for RadiusPolicy {
    fn default() -> Self {
        RadiusPolicy::Fixed(0.002)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectivityConfig {
    pub radius: RadiusPolicy,
    /// Points sampled when estimating an adaptive radius.
    pub adaptive_sample_size: usize,
    pub seed: u64,
}

impl Default for ConnectivityConfig {
    fn default() -> Self {
        Self {
            radius: RadiusPolicy::default(),
            adaptive_sample_size: 1000,
            seed: 42,
        }
    }
}

impl ConnectivityConfig {
    pub fn validate(&self) -> Result<()> {
        let value = match self.radius {
            RadiusPolicy::Fixed(r) => r,
            RadiusPolicy::Adaptive { multiplier } => multiplier,
        };
        if !value.is_finite() || value <= 0.0 {
            return Err(Error::InvalidInput(format!(
                "Connectivity radius must be positive, got {:?}",
                self.radius
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub min_cluster_size: usize,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            min_cluster_size: 1000,
        }
    }
}

/// How a cluster's surface normal is estimated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum NormalStrategy {
    /// Least-variance axis of the covariance centred on the medoid.
    #[default]
    Pca,
    /// RANSAC plane; falls back to PCA when no plane is found.
    Ransac {
        distance_threshold: f64,
        iterations: usize,
        seed: u64,
    },
}

impl NormalStrategy {
    pub fn ransac() -> Self {
        NormalStrategy::Ransac {
            distance_threshold: 0.002,
            iterations: 1000,
            seed: 42,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if let NormalStrategy::Ransac {
            distance_threshold,
            iterations,
            ..
        } = *self
        {
            if !distance_threshold.is_finite() || distance_threshold <= 0.0 || iterations == 0 {
                return Err(Error::InvalidInput(format!(
                    "RANSAC needs a positive threshold and iteration count, got {} / {}",
                    distance_threshold, iterations
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeConfig {
    pub angle_threshold_deg: f64,
    /// Maximum medoid-to-medoid distance in metres.
    pub distance_threshold: f64,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            angle_threshold_deg: 15.0,
            distance_threshold: 0.015,
        }
    }
}

impl MergeConfig {
    pub fn cos_threshold(&self) -> f64 {
        self.angle_threshold_deg.to_radians().cos()
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=90.0).contains(&self.angle_threshold_deg) {
            return Err(Error::InvalidInput(format!(
                "Merge angle must be within [0, 90] degrees, got {}",
                self.angle_threshold_deg
            )));
        }
        if !self.distance_threshold.is_finite() || self.distance_threshold < 0.0 {
            return Err(Error::InvalidInput(format!(
                "Merge distance must be non-negative, got {}",
                self.distance_threshold
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LeafConfig {
    /// Standoff of `target_point` along the outward normal, metres.
    pub target_distance: f64,
}

impl Default for LeafConfig {
    fn default() -> Self {
        Self {
            target_distance: 0.1,
        }
    }
}

impl LeafConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.target_distance.is_finite() {
            return Err(Error::InvalidInput(format!(
                "Target distance must be finite, got {}",
                self.target_distance
            )));
        }
        Ok(())
    }
}

/// Full leaf detector configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DetectorConfig {
    pub crop: CropMethod,
    pub background: BackgroundConfig,
    pub connectivity: ConnectivityConfig,
    pub filter: FilterConfig,
    pub normals: NormalStrategy,
    pub merge: MergeConfig,
    pub leaf: LeafConfig,
}

impl DetectorConfig {
    /// Fewer k-means restarts; for previews and small test clouds.
    pub fn fast() -> Self {
        Self {
            background: BackgroundConfig {
                restarts: 10,
                max_iterations: 100,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Skip background separation, for clouds that contain only the plant.
    pub fn plant_only() -> Self {
        Self {
            background: BackgroundConfig {
                strategy: BackgroundStrategy::Disabled,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    pub fn with_min_cluster_size(mut self, min_cluster_size: usize) -> Self {
        self.filter.min_cluster_size = min_cluster_size;
        self
    }

    pub fn with_radius(mut self, radius: RadiusPolicy) -> Self {
        self.connectivity.radius = radius;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if let CropMethod::TopFraction(f) = self.crop {
            if !(f > 0.0 && f <= 1.0) {
                return Err(Error::InvalidInput(format!(
                    "Crop fraction must be in (0, 1], got {}",
                    f
                )));
            }
        }
        self.background.validate()?;
        self.connectivity.validate()?;
        self.normals.validate()?;
        self.merge.validate()?;
        self.leaf.validate()
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }
}
