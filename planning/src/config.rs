//! Planner configuration: keep-out zone, workspace limits and standoffs.

use nalgebra::{Point2, Point3};
use pheno_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Vertical keep-out cylinder around the pot and the base of the plant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CylinderZone {
    pub center: [f64; 2],
    pub radius: f64,
    pub z_min: f64,
    pub z_max: f64,
}

impl Default for CylinderZone {
    fn default() -> Self {
        Self {
            center: [0.375, 0.35],
            radius: 0.15,
            z_min: -0.315,
            z_max: 0.0,
        }
    }
}

impl CylinderZone {
    pub fn center(&self) -> Point2<f64> {
        Point2::new(self.center[0], self.center[1])
    }

    /// Distance from the cylinder axis in the xy-plane.
    pub fn radial_distance(&self, p: &Point3<f64>) -> f64 {
        (p.xy() - self.center()).norm()
    }

    /// Polar angle of `p` about the axis.
    pub fn angle_of(&self, p: &Point3<f64>) -> f64 {
        let d = p.xy() - self.center();
        d.y.atan2(d.x)
    }

    /// Closed containment: points on the surface count as inside.
    pub fn contains(&self, p: &Point3<f64>) -> bool {
        self.radial_distance(p) <= self.radius && p.z >= self.z_min && p.z <= self.z_max
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.radius.is_finite() && self.radius > 0.0) {
            return Err(Error::InvalidInput(format!(
                "Cylinder radius must be positive, got {}",
                self.radius
            )));
        }
        if !(self.center.iter().all(|c| c.is_finite()) && self.z_min <= self.z_max) {
            return Err(Error::InvalidInput(format!(
                "Invalid cylinder: center {:?}, z [{}, {}]",
                self.center, self.z_min, self.z_max
            )));
        }
        Ok(())
    }
}

/// Axis-aligned reachable volume of the gantry, metres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkspaceBounds {
    pub x: [f64; 2],
    pub y: [f64; 2],
    pub z: [f64; 2],
}

impl Default for WorkspaceBounds {
    fn default() -> Self {
        Self {
            x: [0.0, 0.8],
            y: [0.0, 0.8],
            z: [-0.35, 0.0],
        }
    }
}

impl WorkspaceBounds {
    fn ranges(&self) -> [[f64; 2]; 3] {
        [self.x, self.y, self.z]
    }

    pub fn contains(&self, p: &Point3<f64>) -> bool {
        self.ranges()
            .iter()
            .enumerate()
            .all(|(axis, [lo, hi])| p[axis] >= *lo && p[axis] <= *hi)
    }

    /// Clamp `p` into the bounds; the flag tells whether it moved.
    pub fn clamp(&self, p: &Point3<f64>) -> (Point3<f64>, bool) {
        let mut out = *p;
        for (axis, [lo, hi]) in self.ranges().iter().enumerate() {
            out[axis] = out[axis].clamp(*lo, *hi);
        }
        (out, out != *p)
    }

    pub fn validate(&self) -> Result<()> {
        for (name, [lo, hi]) in ["x", "y", "z"].iter().zip(self.ranges()) {
            if !(lo.is_finite() && hi.is_finite() && lo <= hi) {
                return Err(Error::InvalidInput(format!(
                    "Workspace {} range [{}, {}] is inverted or non-finite",
                    name, lo, hi
                )));
            }
        }
        Ok(())
    }
}

/// How a straight segment is tested against the keep-out cylinder.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntersectionTest {
    /// Test `samples` evenly spaced points, both endpoints included.
    Sampled { samples: usize },
    /// Exact segment/finite-cylinder test.
    Analytic,
}

impl Default for IntersectionTest {
    fn default() -> Self {
        IntersectionTest::Sampled { samples: 50 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    pub cylinder: CylinderZone,
    /// Radius of the detour circle, concentric with the cylinder.
    pub avoidance_radius: f64,
    pub workspace: WorkspaceBounds,
    /// Standoff of the photo point along the leaf normal.
    pub approach_distance: f64,
    /// Standoff of the fluorescence sensor along the leaf normal.
    pub sensor_distance: f64,
    /// Mount offset of the sensor from the camera axis.
    pub sensor_lateral_offset: f64,
    /// z lift of the midpoint on segments that need no detour.
    pub straight_lift: f64,
    pub samples_per_segment: usize,
    pub intersection: IntersectionTest,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            cylinder: CylinderZone::default(),
            avoidance_radius: 0.25,
            workspace: WorkspaceBounds::default(),
            approach_distance: 0.10,
            sensor_distance: 0.05,
            sensor_lateral_offset: 0.03,
            straight_lift: 0.02,
            samples_per_segment: 20,
            intersection: IntersectionTest::default(),
        }
    }
}

impl PlannerConfig {
    /// Exact intersection test and denser sampling, for offline planning.
    pub fn precise() -> Self {
        Self {
            samples_per_segment: 50,
            intersection: IntersectionTest::Analytic,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.cylinder.validate()?;
        self.workspace.validate()?;
        if !(self.avoidance_radius.is_finite() && self.avoidance_radius > self.cylinder.radius) {
            return Err(Error::InvalidInput(format!(
                "Avoidance radius {} must exceed the cylinder radius {}",
                self.avoidance_radius, self.cylinder.radius
            )));
        }
        let distances = [
            ("approach distance", self.approach_distance),
            ("sensor distance", self.sensor_distance),
            ("sensor lateral offset", self.sensor_lateral_offset),
            ("straight lift", self.straight_lift),
        ];
        for (name, value) in distances {
            if !value.is_finite() {
                return Err(Error::InvalidInput(format!("{} must be finite, got {}", name, value)));
            }
        }
        if self.samples_per_segment < 2 {
            return Err(Error::InvalidInput(format!(
                "Need at least 2 samples per segment, got {}",
                self.samples_per_segment
            )));
        }
        if let IntersectionTest::Sampled { samples } = self.intersection {
            if samples < 2 {
                return Err(Error::InvalidInput(format!(
                    "Need at least 2 intersection samples, got {}",
                    samples
                )));
            }
        }
        Ok(())
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
