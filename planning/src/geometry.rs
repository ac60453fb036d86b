//! Standoff points, keep-out intersection tests and detour waypoints.

use crate::config::{CylinderZone, IntersectionTest, PlannerConfig};
use nalgebra::{Point3, Vector3};
use pheno_scientific::{lerp, wrap_angle_diff};
use std::f64::consts::FRAC_PI_2;

/// `centroid + normal × approach_distance`.
pub fn photo_point(centroid: &Point3<f64>, normal: &Vector3<f64>, approach_distance: f64) -> Point3<f64> {
    centroid + normal * approach_distance
}

/// Pan and tilt in degrees that aim a camera at a target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraAngles {
    /// Rotation about z from +y; positive turns toward -x.
    pub pan_deg: f64,
    /// Elevation above the horizontal plane; negative looks down.
    pub tilt_deg: f64,
}

/// Angles that point a camera at `position` toward `target`.
///
/// Coincident points give zero pan and tilt.
pub fn camera_angles(position: &Point3<f64>, target: &Point3<f64>) -> CameraAngles {
    let d = target - position;
    let horizontal = d.x.hypot(d.y);
    CameraAngles {
        pan_deg: -d.x.atan2(d.y).to_degrees(),
        tilt_deg: d.z.atan2(horizontal).to_degrees(),
    }
}

/// Unit direction in the plane perpendicular to `normal` that is closest to
/// world up. Falls back to world +x projected into the plane when the normal
/// is vertical.
pub fn in_plane_up(normal: &Vector3<f64>) -> Vector3<f64> {
    let project = |v: Vector3<f64>| v - normal * normal.dot(&v);
    project(Vector3::z())
        .try_normalize(1e-6)
        .or_else(|| project(Vector3::x()).try_normalize(1e-6))
        .unwrap_or_else(Vector3::x)
}

/// Fluorescence sensor position: `sensor_distance` along the normal, then
/// shifted by `lateral_offset` against the in-plane up direction to account
/// for the sensor sitting off the camera axis.
pub fn sensor_point(
    centroid: &Point3<f64>,
    normal: &Vector3<f64>,
    sensor_distance: f64,
    lateral_offset: f64,
) -> Point3<f64> {
    centroid + normal * sensor_distance - in_plane_up(normal) * lateral_offset
}

/// Whether the straight segment `start → end` enters the keep-out cylinder.
pub fn segment_intersects(
    zone: &CylinderZone,
    start: &Point3<f64>,
    end: &Point3<f64>,
    test: IntersectionTest,
) -> bool {
    match test {
        IntersectionTest::Sampled { samples } => sampled_intersection(zone, start, end, samples),
        IntersectionTest::Analytic => analytic_intersection(zone, start, end),
    }
}

fn sampled_intersection(zone: &CylinderZone, start: &Point3<f64>, end: &Point3<f64>, samples: usize) -> bool {
    let last = samples.max(2) - 1;
    (0..=last).any(|i| {
        let t = i as f64 / last as f64;
        zone.contains(&start.lerp(end, t))
    })
}

/// Parameter interval `[lo, hi] ⊂ [0, 1]` where the segment is within the
/// infinite cylinder and inside the z slab; the segment hits the zone when
/// the two overlap.
fn analytic_intersection(zone: &CylinderZone, start: &Point3<f64>, end: &Point3<f64>) -> bool {
    let f = start.xy() - zone.center();
    let d = end.xy() - start.xy();
    let a = d.norm_squared();
    let c = f.norm_squared() - zone.radius * zone.radius;

    let radial = if a < 1e-18 {
        (c <= 0.0).then_some((0.0, 1.0))
    } else {
        let b = 2.0 * f.dot(&d);
        let disc = b * b - 4.0 * a * c;
        if disc < 0.0 {
            None
        } else {
            let sq = disc.sqrt();
            Some(((-b - sq) / (2.0 * a), (-b + sq) / (2.0 * a)))
        }
    };

    let dz = end.z - start.z;
    let vertical = if dz.abs() < 1e-18 {
        (start.z >= zone.z_min && start.z <= zone.z_max).then_some((0.0, 1.0))
    } else {
        let t0 = (zone.z_min - start.z) / dz;
        let t1 = (zone.z_max - start.z) / dz;
        Some((t0.min(t1), t0.max(t1)))
    };

    match (radial, vertical) {
        (Some((r0, r1)), Some((v0, v1))) => {
            let lo = r0.max(v0).max(0.0);
            let hi = r1.min(v1).min(1.0);
            lo <= hi
        }
        _ => false,
    }
}

/// Detour waypoints on the avoidance circle between `start` and `end`.
///
/// Angles follow the shorter arc about the cylinder axis: one waypoint at the
/// middle of arcs up to 90°, two at 1/3 and 2/3 beyond that. z is linearly
/// interpolated between the endpoints.
pub fn avoidance_waypoints(
    zone: &CylinderZone,
    avoidance_radius: f64,
    start: &Point3<f64>,
    end: &Point3<f64>,
) -> Vec<Point3<f64>> {
    let from = zone.angle_of(start);
    let sweep = wrap_angle_diff(from, zone.angle_of(end));
    let fractions: &[f64] = if sweep.abs() <= FRAC_PI_2 {
        &[0.5]
    } else {
        &[1.0 / 3.0, 2.0 / 3.0]
    };
    let center = zone.center();
    fractions
        .iter()
        .map(|&s| {
            let angle = from + sweep * s;
            Point3::new(
                center.x + avoidance_radius * angle.cos(),
                center.y + avoidance_radius * angle.sin(),
                lerp(start.z, end.z, s),
            )
        })
        .collect()
}

/// Spline control points for one move: the endpoints plus either detour
/// waypoints or a lifted midpoint. The flag reports whether a detour was used.
pub fn control_points(config: &PlannerConfig, start: &Point3<f64>, end: &Point3<f64>) -> (Vec<Point3<f64>>, bool) {
    let detour = segment_intersects(&config.cylinder, start, end, config.intersection);
    let mut points = vec![*start];
    if detour {
        points.extend(avoidance_waypoints(
            &config.cylinder,
            config.avoidance_radius,
            start,
            end,
        ));
    } else {
        let mut mid = start.lerp(end, 0.5);
        mid.z += config.straight_lift;
        points.push(mid);
    }
    points.push(*end);
    (points, detour)
}
