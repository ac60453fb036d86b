//! Collision-aware sensor trajectories around the plant.
//!
//! [`TrajectoryPlanner`] turns an ordered leaf selection into a [`Path`] of
//! typed waypoints. Moves are natural cubic splines; a move whose straight
//! line would cross the keep-out cylinder is routed over detour waypoints on
//! a larger concentric circle.

pub mod config;
pub mod geometry;
pub mod planner;
pub mod waypoint;

pub use config::{CylinderZone, IntersectionTest, PlannerConfig, WorkspaceBounds};
pub use geometry::{
    avoidance_waypoints, camera_angles, control_points, in_plane_up, photo_point,
    segment_intersects, sensor_point, CameraAngles,
};
pub use planner::{LeafPoses, TrajectoryPlanner};
pub use waypoint::{Path, Waypoint, WaypointKind};
