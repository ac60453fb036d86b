//! Leaf records: the hand-off between segmentation and planning.

use crate::point_cloud::{validate_point, validate_unit_vector};
use crate::serde_point;
use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

/// One segmented leaf with its outward pose.
///
/// Built once by the leaf record builder and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeafRecord {
    /// 1-based, contiguous within one detection run.
    pub id: u32,
    /// Medoid of the leaf points; always a sampled surface point.
    #[serde(with = "serde_point::point")]
    pub centroid: Point3<f64>,
    /// Unit normal pointing away from the plant base.
    #[serde(with = "serde_point::vector")]
    pub normal: Vector3<f64>,
    /// `(a, b, c, d)` with `a² + b² + c² = 1` and `ax + by + cz + d = 0` on the plane.
    pub plane_equation: [f64; 4],
    pub inlier_ratio: f64,
    /// Indices into the cloud handed to the detector.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub points_indices: Vec<usize>,
    #[serde(default, skip_serializing_if = "Vec::is_empty", with = "serde_point::points")]
    pub points: Vec<Point3<f64>>,
    /// `centroid + normal * distance`.
    #[serde(with = "serde_point::point")]
    pub target_point: Point3<f64>,
}

impl LeafRecord {
    /// Signed distance from `p` to the leaf plane, positive on the normal side.
    pub fn signed_distance(&self, p: &Point3<f64>) -> f64 {
        let [a, b, c, d] = self.plane_equation;
        a * p.x + b * p.y + c * p.z + d
    }

    /// Copy without the bulky per-point fields.
    pub fn without_points(&self) -> LeafRecord {
        LeafRecord {
            points_indices: Vec::new(),
            points: Vec::new(),
            ..self.clone()
        }
    }
}

/// The subset of a leaf the trajectory planner needs.
///
/// Deserializes from any leaf dict that carries `id`, `centroid` and `normal`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LeafTarget {
    pub id: u32,
    #[serde(with = "serde_point::point")]
    pub centroid: Point3<f64>,
    #[serde(with = "serde_point::vector")]
    pub normal: Vector3<f64>,
}

impl LeafTarget {
    pub fn new(id: u32, centroid: Point3<f64>, normal: Vector3<f64>) -> Self {
        Self {
            id,
            centroid,
            normal,
        }
    }

    /// Check finiteness and return a copy with a unit normal.
    pub fn validated(&self) -> crate::Result<LeafTarget> {
        let centroid = validate_point(&format!("leaf {} centroid", self.id), &self.centroid)?;
        let normal = validate_unit_vector(&format!("leaf {} normal", self.id), &self.normal)?;
        Ok(LeafTarget {
            id: self.id,
            centroid,
            normal,
        })
    }
}

impl From<&LeafRecord> for LeafTarget {
    fn from(leaf: &LeafRecord) -> Self {
        LeafTarget {
            id: leaf.id,
            centroid: leaf.centroid,
            normal: leaf.normal,
        }
    }
}

/// `{"leaves": [...]}` document shared with the selection UI and viewer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LeafDocument {
    pub leaves: Vec<LeafRecord>,
}

impl LeafDocument {
    pub fn from_json_str(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json_string(&self) -> crate::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
