use nalgebra::{Point3, Vector3};

/// An ordered set of 3-D points in metres.
///
/// The position of a point in `points` is its identity within a stage; stages
/// that subset a cloud return the original indices alongside the new cloud.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointCloud {
    pub points: Vec<Point3<f64>>,
    /// Optional per-point RGB in `[0, 1]`.
    pub colors: Option<Vec<Point3<f64>>>,
}

impl PointCloud {
    pub fn new(points: Vec<Point3<f64>>) -> Self {
        Self {
            points,
            colors: None,
        }
    }

    pub fn with_colors(mut self, colors: Vec<Point3<f64>>) -> crate::Result<Self> {
        if colors.len() == self.points.len() {
            self.colors = Some(colors);
            Ok(self)
        } else {
            Err(crate::Error::InvalidInput(format!(
                "Color count {} does not match point count {}",
                colors.len(),
                self.points.len()
            )))
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Build a new cloud from the points at `indices`, in the given order.
    pub fn select(&self, indices: &[usize]) -> PointCloud {
        let points = indices.iter().map(|&i| self.points[i]).collect();
        let colors = self
            .colors
            .as_ref()
            .map(|c| indices.iter().map(|&i| c[i]).collect());
        PointCloud { points, colors }
    }

    /// Multiply every coordinate by `factor` (e.g. `0.001` for mm to m).
    pub fn scaled(mut self, factor: f64) -> PointCloud {
        for p in &mut self.points {
            p.coords *= factor;
        }
        self
    }

    pub fn mean(&self) -> Option<Point3<f64>> {
        if self.points.is_empty() {
            return None;
        }
        let sum: Vector3<f64> = self.points.iter().map(|p| p.coords).sum();
        Some(Point3::from(sum / self.points.len() as f64))
    }

    /// Axis-aligned bounds as `(min, max)`.
    pub fn bounds(&self) -> Option<(Point3<f64>, Point3<f64>)> {
        let first = self.points.first()?;
        let mut min = *first;
        let mut max = *first;
        for p in &self.points[1..] {
            for k in 0..3 {
                min[k] = min[k].min(p[k]);
                max[k] = max[k].max(p[k]);
            }
        }
        Some((min, max))
    }

    /// Fail on the first non-finite coordinate.
    pub fn validate(&self) -> crate::Result<()> {
        for (i, p) in self.points.iter().enumerate() {
            if !is_finite(p) {
                return Err(crate::Error::InvalidInput(format!(
                    "Point {} has non-finite coordinates ({}, {}, {})",
                    i, p.x, p.y, p.z
                )));
            }
        }
        Ok(())
    }
}

impl From<Vec<Point3<f64>>> for PointCloud {
    fn from(points: Vec<Point3<f64>>) -> Self {
        PointCloud::new(points)
    }
}

fn is_finite(p: &Point3<f64>) -> bool {
    p.x.is_finite() && p.y.is_finite() && p.z.is_finite()
}

/// Validate a position received at a public boundary.
pub fn validate_point(name: &str, p: &Point3<f64>) -> crate::Result<Point3<f64>> {
    if is_finite(p) {
        Ok(*p)
    } else {
        Err(crate::Error::InvalidInput(format!(
            "{} has non-finite coordinates ({}, {}, {})",
            name, p.x, p.y, p.z
        )))
    }
}

/// Validate and normalize a direction received at a public boundary.
pub fn validate_unit_vector(name: &str, v: &Vector3<f64>) -> crate::Result<Vector3<f64>> {
    let norm = v.norm();
    if !norm.is_finite() || norm < 1e-12 {
        return Err(crate::Error::InvalidInput(format!(
            "{} must be a finite non-zero vector, got ({}, {}, {})",
            name, v.x, v.y, v.z
        )));
    }
    Ok(v / norm)
}
