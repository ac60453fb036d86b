//! Point cloud file I/O and result exports
//!
//! - PLY (ascii, binary little/big endian)
//! - PCD (ascii, binary)
//! - leaf JSON documents
//! - segmentation PLY + NumPy label array

pub mod leaves;
pub mod pcd;
pub mod ply;
pub mod segmentation;

pub use leaves::{load_leaf_targets, load_leaves_json, save_leaves_json};
pub use pcd::{read_pcd, write_pcd, PcdData};
pub use ply::{read_ply, write_ply};
pub use segmentation::{leaf_color, write_segmentation, SEGMENTATION_PALETTE};

pub use pheno_core::{Error, Result};

use pheno_core::PointCloud;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Upper bound on buffers sized from a file header; larger clouds grow as rows are read.
pub(crate) const MAX_PREALLOCATED_POINTS: usize = 1 << 20;

/// Scanner clouds are stored in millimetres.
pub const DEFAULT_SCALE_FACTOR: f64 = 0.001;

/// Load a `.ply` or `.pcd` cloud and multiply coordinates by `scale_factor`.
///
/// A missing file, unknown extension, malformed body, non-finite coordinate or
/// empty cloud is an error.
pub fn load_point_cloud<P: AsRef<Path>>(path: P, scale_factor: f64) -> Result<PointCloud> {
    let path = path.as_ref();
    if !scale_factor.is_finite() || scale_factor <= 0.0 {
        return Err(Error::InvalidInput(format!(
            "Scale factor must be positive, got {}",
            scale_factor
        )));
    }
    if !path.is_file() {
        return Err(Error::InvalidInput(format!(
            "Point cloud file not found: {}",
            path.display()
        )));
    }

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    let reader = BufReader::new(File::open(path)?);
    let cloud = match ext.as_str() {
        "ply" => read_ply(reader)?,
        "pcd" => read_pcd(reader)?,
        other => {
            return Err(Error::UnsupportedFormat(format!(
                "Unknown point cloud extension '{}'",
                other
            )));
        }
    };

    if cloud.is_empty() {
        return Err(Error::InvalidData(format!(
            "Point cloud {} has no points",
            path.display()
        )));
    }

    let cloud = cloud.scaled(scale_factor);
    cloud.validate()?;

    if let Some((min, max)) = cloud.bounds() {
        tracing::info!(
            "Loaded {} points from {} (scale {})",
            cloud.len(),
            path.display(),
            scale_factor
        );
        tracing::debug!(
            "Extents x [{:.3}, {:.3}] y [{:.3}, {:.3}] z [{:.3}, {:.3}] m",
            min.x,
            max.x,
            min.y,
            max.y,
            min.z,
            max.z
        );
    }
    Ok(cloud)
}
