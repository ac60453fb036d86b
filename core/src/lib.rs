//! Core types shared by every phenobot crate.
//!
//! - [`point_cloud`]: metric point clouds and index bookkeeping
//! - [`labeling`]: per-point cluster labels
//! - [`leaf`]: leaf records produced by segmentation and consumed by planning
//! - [`robust`]: a seeded RANSAC engine
//! - [`runtime`]: global Rayon thread pool setup

pub mod labeling;
pub mod leaf;
pub mod point_cloud;
pub mod robust;
pub mod runtime;
pub mod serde_point;

pub use labeling::{ClusterLabeling, UNASSIGNED};
pub use leaf::{LeafDocument, LeafRecord, LeafTarget};
pub use point_cloud::{validate_point, validate_unit_vector, PointCloud};
pub use robust::{required_iterations, Ransac, RobustConfig, RobustModel, RobustResult};
pub use runtime::{current_cpu_threads, init_global_thread_pool};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
