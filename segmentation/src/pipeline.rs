//! End-to-end leaf detection over one point cloud.

use crate::background::separate_background;
use crate::config::DetectorConfig;
use crate::connectivity::{connected_components, resolve_radius};
use crate::filter::filter_small_clusters;
use crate::leaves::build_leaf_records;
use crate::merge::merge_clusters;
use crate::pose::estimate_poses;
use nalgebra::Point3;
use pheno_core::{LeafRecord, PointCloud, Result};
use pheno_point_cloud::crop_by_height;

/// Point and cluster counts after each stage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StageCounts {
    pub input_points: usize,
    pub cropped_points: usize,
    pub plant_points: usize,
    pub connectivity_radius: f64,
    pub components: usize,
    pub filtered_points: usize,
    pub discarded_points: usize,
    pub clusters_before_merge: usize,
    pub clusters_after_merge: usize,
}

/// Detected leaves plus bookkeeping from the intermediate stages.
#[derive(Debug, Clone, Default)]
pub struct Detection {
    pub leaves: Vec<LeafRecord>,
    /// Detector-input indices of the points classified as plant.
    pub plant_indices: Vec<usize>,
    pub counts: StageCounts,
}

impl Detection {
    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }
}

/// Runs crop, background separation, connectivity, filter, pose, merge and
/// leaf building in sequence.
#[derive(Debug, Clone)]
pub struct LeafDetector {
    config: DetectorConfig,
}

impl LeafDetector {
    pub fn new(config: DetectorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    pub fn detect(&self, cloud: &PointCloud) -> Result<Detection> {
        cloud.validate()?;
        self.detect_points(&cloud.points)
    }

    /// Detect leaves in `points` (metres).
    ///
    /// Empty intermediate results end the run early with an empty
    /// [`Detection`]; they are not errors.
    pub fn detect_points(&self, points: &[Point3<f64>]) -> Result<Detection> {
        let config = &self.config;
        let mut counts = StageCounts {
            input_points: points.len(),
            ..Default::default()
        };
        tracing::info!("Leaf detection on {} points", points.len());

        let (cropped, crop_indices) = crop_by_height(points, config.crop);
        counts.cropped_points = cropped.len();

        tracing::info!("[1/5] Background separation");
        let split = separate_background(&cropped, &config.background)?;
        let plant: Vec<Point3<f64>> = split.plant_indices.iter().map(|&i| cropped[i]).collect();
        let plant_indices: Vec<usize> = split.plant_indices.iter().map(|&i| crop_indices[i]).collect();
        counts.plant_points = plant.len();
        if plant.is_empty() {
            tracing::warn!("No plant points after background separation");
            return Ok(Detection {
                leaves: Vec::new(),
                plant_indices,
                counts,
            });
        }

        tracing::info!("[2/5] Graph-based instance clustering");
        let radius = resolve_radius(&plant, &config.connectivity);
        let components = connected_components(&plant, radius);
        counts.connectivity_radius = radius;
        counts.components = components.num_clusters();

        tracing::info!("[3/5] Filtering small clusters");
        let filtered = filter_small_clusters(&components, config.filter.min_cluster_size);
        counts.filtered_points = filtered.kept.len();
        counts.discarded_points = filtered.discarded;
        if filtered.is_empty() {
            return Ok(Detection {
                leaves: Vec::new(),
                plant_indices,
                counts,
            });
        }
        let clustered: Vec<Point3<f64>> = filtered.kept.iter().map(|&i| plant[i]).collect();
        let source: Vec<usize> = filtered.kept.iter().map(|&i| plant_indices[i]).collect();

        tracing::info!("[4/5] Computing centroids and normals");
        let poses = estimate_poses(&clustered, &filtered.labeling, &config.normals);
        counts.clusters_before_merge = poses.len();

        tracing::info!("[5/5] Merging parallel clusters");
        let merged = merge_clusters(
            &clustered,
            &filtered.labeling,
            &poses,
            &config.merge,
            &config.normals,
        );
        counts.clusters_after_merge = merged.poses.len();

        let leaves = build_leaf_records(
            &clustered,
            &merged.labeling,
            &merged.poses,
            &source,
            points,
            &config.leaf,
        );
        tracing::info!("Detection complete: {} leaves found", leaves.len());

        Ok(Detection {
            leaves,
            plant_indices,
            counts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RadiusPolicy;

    #[test]
    fn test_invalid_config_rejected() {
        let config = DetectorConfig::default().with_radius(RadiusPolicy::Fixed(0.0));
        assert!(LeafDetector::new(config).is_err());
    }

    #[test]
    fn test_non_finite_cloud_rejected() {
        let detector = LeafDetector::new(DetectorConfig::plant_only()).unwrap();
        let cloud = PointCloud::new(vec![Point3::new(f64::NAN, 0.0, 0.0)]);
        assert!(detector.detect(&cloud).is_err());
    }

    #[test]
    fn test_empty_cloud_is_empty_detection() {
        let detector = LeafDetector::new(DetectorConfig::default()).unwrap();
        let detection = detector.detect_points(&[]).unwrap();
        assert!(detection.is_empty());
        assert_eq!(detection.counts.plant_points, 0);
    }

    #[test]
    fn test_nothing_survives_filter() {
        let detector = LeafDetector::new(DetectorConfig::plant_only()).unwrap();
        let pts: Vec<Point3<f64>> = (0..20).map(|i| Point3::new(i as f64, 0.0, 0.0)).collect();
        let detection = detector.detect_points(&pts).unwrap();
        assert!(detection.is_empty());
        assert_eq!(detection.counts.components, 20);
        assert_eq!(detection.counts.discarded_points, 20);
    }
}
