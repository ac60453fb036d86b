//! Leaf JSON documents: `{"leaves": [...]}`.

use crate::{Error, Result};
use pheno_core::{LeafDocument, LeafRecord, LeafTarget};
use serde::Deserialize;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

/// Write leaves as a pretty-printed `{"leaves": [...]}` document.
///
/// With `include_points == false` the per-point fields are dropped, which is
/// what persisted session copies want.
pub fn save_leaves_json<P: AsRef<Path>>(
    leaves: &[LeafRecord],
    path: P,
    include_points: bool,
) -> Result<()> {
    let doc = LeafDocument {
        leaves: if include_points {
            leaves.to_vec()
        } else {
            leaves.iter().map(LeafRecord::without_points).collect()
        },
    };
    let mut writer = BufWriter::new(File::create(path.as_ref())?);
    serde_json::to_writer_pretty(&mut writer, &doc)?;
    writer.flush()?;
    tracing::info!(
        "Saved {} leaves to {}",
        doc.leaves.len(),
        path.as_ref().display()
    );
    Ok(())
}

/// Read a full leaf document. A missing `"leaves"` key is an error.
pub fn load_leaves_json<P: AsRef<Path>>(path: P) -> Result<Vec<LeafRecord>> {
    let reader = BufReader::new(open(path.as_ref())?);
    let doc: LeafDocument = serde_json::from_reader(reader)?;
    Ok(doc.leaves)
}

#[derive(Deserialize)]
struct TargetDocument {
    leaves: Vec<LeafTarget>,
}

/// Read only `id`, `centroid` and `normal` of each leaf, validating them.
pub fn load_leaf_targets<P: AsRef<Path>>(path: P) -> Result<Vec<LeafTarget>> {
    let reader = BufReader::new(open(path.as_ref())?);
    let doc: TargetDocument = serde_json::from_reader(reader)?;
    doc.leaves.iter().map(LeafTarget::validated).collect()
}

fn open(path: &Path) -> Result<File> {
    File::open(path).map_err(|e| {
        Error::InvalidInput(format!("Cannot open {}: {}", path.display(), e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{Point3, Vector3};

    fn leaf(id: u32) -> LeafRecord {
        LeafRecord {
            id,
            centroid: Point3::new(0.1, 0.2, -0.1),
            normal: Vector3::new(0.0, 0.0, 1.0),
            plane_equation: [0.0, 0.0, 1.0, 0.1],
            inlier_ratio: 1.0,
            points_indices: vec![4, 5],
            points: vec![Point3::new(0.1, 0.2, -0.1), Point3::new(0.1, 0.21, -0.1)],
            target_point: Point3::new(0.1, 0.2, 0.0),
        }
    }

    #[test]
    fn test_save_without_points() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("leaves.json");
        save_leaves_json(&[leaf(1), leaf(2)], &path, false).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(!text.contains("points_indices"));
        let back = load_leaves_json(&path).unwrap();
        assert_eq!(back.len(), 2);
        assert!(back[0].points.is_empty());
        assert_eq!(back[1].id, 2);
    }

    #[test]
    fn test_save_with_points() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("leaves.json");
        save_leaves_json(&[leaf(1)], &path, true).unwrap();
        let back = load_leaves_json(&path).unwrap();
        assert_eq!(back[0].points_indices, vec![4, 5]);
        assert_eq!(back[0].points.len(), 2);
        assert!((back[0].points[1] - leaf(1).points[1]).norm() < 1e-12);
    }

    #[test]
    fn test_targets_validate_normals() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("targets.json");
        std::fs::write(
            &path,
            r#"{"leaves": [{"id": 3, "centroid": [0.3, 0.3, -0.1], "normal": [0, 0, 0]}]}"#,
        )
        .unwrap();
        assert!(load_leaf_targets(&path).is_err());

        std::fs::write(
            &path,
            r#"{"leaves": [{"id": 3, "centroid": [0.3, 0.3, -0.1], "normal": [0, 3, 4], "extra": 1}]}"#,
        )
        .unwrap();
        let targets = load_leaf_targets(&path).unwrap();
        assert!((targets[0].normal.norm() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_missing_file() {
        assert!(load_leaves_json("/nonexistent/leaves.json").is_err());
    }
}
