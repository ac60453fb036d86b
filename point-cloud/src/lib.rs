//! Point cloud geometry for leaf segmentation.
//!
//! - [`spatial`]: balanced KDTree (radius, nearest, k-nearest)
//! - [`features`]: multi-scale eigenvalue features
//! - [`normals`]: medoid, centred covariance, PCA and RANSAC plane normals
//! - [`filtering`]: height cropping and adaptive connectivity radius

pub mod features;
pub mod filtering;
pub mod normals;
pub mod spatial;

pub use features::{
    compute_eigen_features, compute_eigen_features_with_tree, EigenFeature, DEFAULT_EIGEN_RADII,
};
pub use filtering::{adaptive_radius, crop_by_height, height_threshold, CropMethod};
pub use normals::{
    canonicalize_up, covariance_about, medoid, pca_normal, segment_plane, PlaneEstimator,
    PlaneFit, DEGENERATE_NORMAL,
};
pub use spatial::KdTree;
