//! Serde adapters that write nalgebra points and vectors as plain `[x, y, z]` arrays.

use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub mod point {
    use super::*;

    pub fn serialize<S: Serializer>(p: &Point3<f64>, s: S) -> Result<S::Ok, S::Error> {
        [p.x, p.y, p.z].serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Point3<f64>, D::Error> {
        let [x, y, z] = <[f64; 3]>::deserialize(d)?;
        Ok(Point3::new(x, y, z))
    }
}

pub mod vector {
    use super::*;

    pub fn serialize<S: Serializer>(v: &Vector3<f64>, s: S) -> Result<S::Ok, S::Error> {
        [v.x, v.y, v.z].serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vector3<f64>, D::Error> {
        let [x, y, z] = <[f64; 3]>::deserialize(d)?;
        Ok(Vector3::new(x, y, z))
    }
}

pub mod points {
    use super::*;

    pub fn serialize<S: Serializer>(pts: &[Point3<f64>], s: S) -> Result<S::Ok, S::Error> {
        s.collect_seq(pts.iter().map(|p| [p.x, p.y, p.z]))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<Point3<f64>>, D::Error> {
        let raw = Vec::<[f64; 3]>::deserialize(d)?;
        Ok(raw.into_iter().map(|[x, y, z]| Point3::new(x, y, z)).collect())
    }
}
