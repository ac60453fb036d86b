//! Waypoints and the path handed to the robot executor.

use nalgebra::Point3;
use pheno_core::{serde_point, LeafTarget, Result};
use serde::{Deserialize, Serialize};

/// What the executor does on arrival at a waypoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaypointKind {
    Start,
    ViaPoint,
    /// Camera capture, then the sensor head turns 180°.
    PhotoPoint,
    /// Fluorescence measurement.
    FluoroPoint,
    /// Sensor head turns back.
    ReturnPhotoPoint,
    End,
}

impl WaypointKind {
    /// Kinds that trigger a device action.
    pub fn is_action(self) -> bool {
        matches!(
            self,
            WaypointKind::PhotoPoint | WaypointKind::FluoroPoint | WaypointKind::ReturnPhotoPoint
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    #[serde(with = "serde_point::point")]
    pub position: Point3<f64>,
    #[serde(rename = "type")]
    pub kind: WaypointKind,
    #[serde(default)]
    pub comment: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub leaf_data: Option<LeafTarget>,
}

impl Waypoint {
    pub fn new(position: Point3<f64>, kind: WaypointKind, comment: impl Into<String>) -> Self {
        Self {
            position,
            kind,
            comment: comment.into(),
            leaf_data: None,
        }
    }

    pub fn with_leaf(mut self, leaf: LeafTarget) -> Self {
        self.leaf_data = Some(leaf);
        self
    }
}

/// Ordered waypoints plus the ids of leaves the planner had to skip.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Path {
    pub waypoints: Vec<Waypoint>,
    pub skipped_leaves: Vec<u32>,
}

impl Path {
    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Waypoint> {
        self.waypoints.iter()
    }

    pub fn positions(&self) -> Vec<Point3<f64>> {
        self.waypoints.iter().map(|w| w.position).collect()
    }

    pub fn count(&self, kind: WaypointKind) -> usize {
        self.waypoints.iter().filter(|w| w.kind == kind).count()
    }

    /// Ids of the leaves that get a photo, in visiting order.
    pub fn visited_leaves(&self) -> Vec<u32> {
        self.waypoints
            .iter()
            .filter(|w| w.kind == WaypointKind::PhotoPoint)
            .filter_map(|w| w.leaf_data.map(|l| l.id))
            .collect()
    }

    /// Motion segments as the executor runs them.
    ///
    /// Each segment ends at an action waypoint and the next one starts there,
    /// so action waypoints appear in two segments. The tail after the last
    /// action forms a final segment when it has any moves. A path without
    /// actions is a single segment.
    pub fn action_segments(&self) -> Vec<&[Waypoint]> {
        let wps = &self.waypoints[..];
        let mut segments = Vec::new();
        let mut start = 0;
        for (i, wp) in wps.iter().enumerate() {
            if wp.kind.is_action() {
                segments.push(&wps[start..=i]);
                start = i;
            }
        }
        if segments.is_empty() {
            if !wps.is_empty() {
                segments.push(wps);
            }
        } else if start + 1 < wps.len() {
            segments.push(&wps[start..]);
        }
        segments
    }

    /// The executor's format: a JSON list of waypoint objects.
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.waypoints)?)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(Self {
            waypoints: serde_json::from_str(json)?,
            skipped_leaves: Vec::new(),
        })
    }
}

impl<'a> IntoIterator for &'a Path {
    type Item = &'a Waypoint;
    type IntoIter = std::slice::Iter<'a, Waypoint>;

    fn into_iter(self) -> Self::IntoIter {
        self.waypoints.iter()
    }
}
