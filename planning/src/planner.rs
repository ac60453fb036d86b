//! Spline trajectories through each selected leaf's photo and sensor poses.

use crate::config::PlannerConfig;
use crate::geometry::{camera_angles, control_points, photo_point, sensor_point, CameraAngles};
use crate::waypoint::{Path, Waypoint, WaypointKind};
use nalgebra::Point3;
use pheno_core::{validate_point, Error, LeafRecord, LeafTarget, Result};
use pheno_scientific::SplineCurve3;

/// Control points closer than this to their predecessor are dropped.
const MIN_CONTROL_SPACING: f64 = 1e-9;

/// Standoff poses for one leaf.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LeafPoses {
    pub photo: Point3<f64>,
    pub sensor: Point3<f64>,
    /// Camera aim from the photo point at the centroid.
    pub camera: CameraAngles,
}

#[derive(Debug, Clone)]
pub struct TrajectoryPlanner {
    config: PlannerConfig,
}

impl TrajectoryPlanner {
    pub fn new(config: PlannerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    pub fn leaf_poses(&self, leaf: &LeafTarget) -> LeafPoses {
        let c = &self.config;
        let photo = photo_point(&leaf.centroid, &leaf.normal, c.approach_distance);
        LeafPoses {
            photo,
            camera: camera_angles(&photo, &leaf.centroid),
            sensor: sensor_point(
                &leaf.centroid,
                &leaf.normal,
                c.sensor_distance,
                c.sensor_lateral_offset,
            ),
        }
    }

    /// Plan a round trip from `start` through every reachable leaf, in order.
    ///
    /// Leaves whose photo or sensor point lies outside the workspace are
    /// skipped and listed in [`Path::skipped_leaves`]. Non-finite input and a
    /// start outside the workspace are errors.
    pub fn plan(&self, leaves: &[LeafTarget], start: Point3<f64>) -> Result<Path> {
        let start = validate_point("start position", &start)?;
        if !self.config.workspace.contains(&start) {
            return Err(Error::InvalidInput(format!(
                "Start position ({:.3}, {:.3}, {:.3}) is outside the workspace",
                start.x, start.y, start.z
            )));
        }
        tracing::info!("Planning path through {} leaves", leaves.len());

        let mut path = Path::default();
        path.waypoints.push(Waypoint::new(start, WaypointKind::Start, "Start position"));
        let mut current = start;

        for leaf in leaves {
            let leaf = leaf.validated()?;
            let poses = self.leaf_poses(&leaf);
            let ws = &self.config.workspace;
            if let Some((label, p)) = [("photo", poses.photo), ("sensor", poses.sensor)]
                .into_iter()
                .find(|(_, p)| !ws.contains(p))
            {
                tracing::warn!(
                    "Skipping leaf {}: {} point ({:.3}, {:.3}, {:.3}) is outside the workspace",
                    leaf.id,
                    label,
                    p.x,
                    p.y,
                    p.z
                );
                path.skipped_leaves.push(leaf.id);
                continue;
            }

            tracing::debug!(
                "Leaf {}: pan {:.1}°, tilt {:.1}°",
                leaf.id,
                poses.camera.pan_deg,
                poses.camera.tilt_deg
            );
            self.append_move(&mut path, &current, &poses.photo, &format!("toward leaf {}", leaf.id));
            path.waypoints.push(
                Waypoint::new(poses.photo, WaypointKind::PhotoPoint, format!("Photo of leaf {}", leaf.id))
                    .with_leaf(leaf),
            );
            path.waypoints.push(
                Waypoint::new(
                    poses.sensor,
                    WaypointKind::FluoroPoint,
                    format!("Fluorescence on leaf {}", leaf.id),
                )
                .with_leaf(leaf),
            );
            path.waypoints.push(
                Waypoint::new(
                    poses.photo,
                    WaypointKind::ReturnPhotoPoint,
                    format!("Back to photo point of leaf {}", leaf.id),
                )
                .with_leaf(leaf),
            );
            current = poses.photo;
        }

        self.append_move(&mut path, &current, &start, "returning");
        path.waypoints.push(Waypoint::new(start, WaypointKind::End, "Return to start position"));

        tracing::info!(
            "Path planned: {} waypoints, {} leaves visited, {} skipped",
            path.len(),
            path.count(WaypointKind::PhotoPoint),
            path.skipped_leaves.len()
        );
        Ok(path)
    }

    /// [`plan`](Self::plan) for full leaf records.
    pub fn plan_leaves(&self, leaves: &[LeafRecord], start: Point3<f64>) -> Result<Path> {
        let targets: Vec<LeafTarget> = leaves.iter().map(LeafTarget::from).collect();
        self.plan(&targets, start)
    }

    /// Spline from `from` to `to`, appended as via points. The endpoints
    /// themselves are not repeated.
    fn append_move(&self, path: &mut Path, from: &Point3<f64>, to: &Point3<f64>, label: &str) {
        if (to - from).norm() < MIN_CONTROL_SPACING {
            return;
        }
        let (controls, detour) = control_points(&self.config, from, to);
        let Some(curve) = SplineCurve3::through(&controls, MIN_CONTROL_SPACING) else {
            return;
        };
        let samples = curve.sample(self.config.samples_per_segment);
        let interior = &samples[1..samples.len() - 1];

        let mut clamped = 0;
        for p in interior {
            let (q, moved) = self.config.workspace.clamp(p);
            clamped += usize::from(moved);
            let comment = if detour {
                format!("Detour {}", label)
            } else {
                format!("Via {}", label)
            };
            path.waypoints.push(Waypoint::new(q, WaypointKind::ViaPoint, comment));
        }
        if clamped > 0 {
            tracing::debug!("Clamped {} of {} spline samples {}", clamped, interior.len(), label);
        }
        if detour {
            let inside = interior
                .iter()
                .filter(|p| self.config.cylinder.contains(p))
                .count();
            tracing::debug!(
                "Detour {}: {:.3} m, {} samples inside the keep-out zone",
                label,
                curve.length(),
                inside
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector3;

    fn planner() -> TrajectoryPlanner {
        TrajectoryPlanner::new(PlannerConfig::default()).unwrap()
    }

    #[test]
    fn test_empty_selection_returns_home() {
        let start = Point3::new(0.1, 0.1, -0.05);
        let path = planner().plan(&[], start).unwrap();
        assert_eq!(path.waypoints.first().map(|w| w.kind), Some(WaypointKind::Start));
        assert_eq!(path.waypoints.last().map(|w| w.kind), Some(WaypointKind::End));
        assert_eq!(path.len(), 2);
    }

    #[test]
    fn test_start_outside_workspace_is_error() {
        assert!(planner().plan(&[], Point3::new(1.0, 0.1, -0.05)).is_err());
        assert!(planner().plan(&[], Point3::new(f64::NAN, 0.1, -0.05)).is_err());
    }

    #[test]
    fn test_camera_looks_back_along_normal() {
        let up = LeafTarget::new(1, Point3::new(0.3, 0.3, -0.1), Vector3::z());
        assert!((planner().leaf_poses(&up).camera.tilt_deg + 90.0).abs() < 1e-9);

        let facing_y = LeafTarget::new(2, Point3::new(0.3, 0.3, -0.1), Vector3::y());
        let camera = planner().leaf_poses(&facing_y).camera;
        assert!((camera.pan_deg.abs() - 180.0).abs() < 1e-9);
        assert!(camera.tilt_deg.abs() < 1e-9);
    }

    #[test]
    fn test_zero_normal_is_error() {
        let leaf = LeafTarget::new(1, Point3::new(0.3, 0.3, -0.1), Vector3::zeros());
        assert!(planner().plan(&[leaf], Point3::new(0.1, 0.1, -0.05)).is_err());
    }

    #[test]
    fn test_action_triplet_per_leaf() {
        let leaf = LeafTarget::new(7, Point3::new(0.1, 0.7, -0.2), Vector3::z());
        let path = planner().plan(&[leaf], Point3::new(0.1, 0.1, -0.05)).unwrap();
        let kinds: Vec<WaypointKind> = path
            .iter()
            .map(|w| w.kind)
            .filter(|k| *k != WaypointKind::ViaPoint)
            .collect();
        assert_eq!(
            kinds,
            vec![
                WaypointKind::Start,
                WaypointKind::PhotoPoint,
                WaypointKind::FluoroPoint,
                WaypointKind::ReturnPhotoPoint,
                WaypointKind::End
            ]
        );
        assert_eq!(path.count(WaypointKind::ViaPoint), 2 * 18);
        assert_eq!(path.visited_leaves(), vec![7]);
    }
}
