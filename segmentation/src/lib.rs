//! Leaf instance segmentation.
//!
//! Stages, in pipeline order:
//! 1. [`background`]: eigen features + k-means; the largest cluster is plant
//! 2. [`connectivity`]: radius graph and its connected components
//! 3. [`filter`]: drop clusters below a minimum size
//! 4. [`pose`]: medoid centroid and PCA/RANSAC normal per cluster
//! 5. [`merge`]: Union-Find merge of close, near-parallel clusters
//! 6. [`leaves`]: outward normals, plane equations, target points
//!
//! [`LeafDetector`] chains them. Every stage returns fresh values; nothing is
//! mutated in place.

pub mod background;
pub mod config;
pub mod connectivity;
pub mod filter;
pub mod leaves;
pub mod merge;
pub mod pipeline;
pub mod pose;
pub mod union_find;

pub use background::{separate_background, BackgroundSplit};
pub use config::{
    BackgroundConfig, BackgroundStrategy, ConnectivityConfig, DetectorConfig, FilterConfig,
    LeafConfig, MergeConfig, NormalStrategy, RadiusPolicy,
};
pub use connectivity::{connected_components, radius_adjacency, resolve_radius};
pub use filter::{filter_small_clusters, FilteredClusters};
pub use leaves::{build_leaf_records, orient_outward, plane_equation, plant_base};
pub use merge::{merge_clusters, merge_pass, should_merge, MergedClusters};
pub use pipeline::{Detection, LeafDetector, StageCounts};
pub use pose::{estimate_pose, estimate_poses, ClusterPose};
pub use union_find::UnionFind;
