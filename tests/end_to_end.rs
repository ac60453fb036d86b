use nalgebra::{Point3, Vector3};
use phenobot::io::{load_leaves_json, save_leaves_json, write_pcd, write_ply, write_segmentation};
use phenobot::{
    detect_leaves_from_file, plan_from_leaf_file, DetectorConfig, PlannerConfig, PointCloud,
    WaypointKind,
};
use std::fs::File;
use std::io::BufWriter;
use tempfile::tempdir;

fn patch(center: Point3<f64>, u: Vector3<f64>, v: Vector3<f64>) -> Vec<Point3<f64>> {
    let mut pts = Vec::new();
    for i in -10..=10 {
        for j in -10..=10 {
            pts.push(center + u * (i as f64 * 0.001) + v * (j as f64 * 0.001));
        }
    }
    pts
}

/// Four leaves and a short stem, in millimetres as a scanner would store them.
fn plant_mm() -> PointCloud {
    let tilt = |deg: f64| Vector3::new(deg.to_radians().cos(), 0.0, deg.to_radians().sin());
    let mut pts = Vec::new();
    pts.extend(patch(Point3::new(0.30, 0.30, -0.15), tilt(20.0), Vector3::y()));
    pts.extend(patch(Point3::new(0.40, 0.30, -0.13), tilt(-30.0), Vector3::y()));
    pts.extend(patch(Point3::new(0.35, 0.40, -0.10), Vector3::x(), Vector3::new(0.0, 0.8, 0.6)));
    pts.extend(patch(Point3::new(0.35, 0.22, -0.17), Vector3::x(), Vector3::new(0.0, 0.6, -0.8)));
    for i in 0..30 {
        pts.push(Point3::new(0.35, 0.31, -0.25 + i as f64 * 0.001));
    }
    PointCloud::new(pts).scaled(1000.0)
}

fn config() -> DetectorConfig {
    DetectorConfig::plant_only().with_min_cluster_size(200)
}

#[test]
fn test_ply_to_leaves_to_path() {
    let dir = tempdir().unwrap();
    let cloud_path = dir.path().join("plant.ply");
    {
        let mut writer = BufWriter::new(File::create(&cloud_path).unwrap());
        write_ply(&mut writer, &plant_mm()).unwrap();
    }

    let detection = detect_leaves_from_file(&cloud_path, 0.001, &config()).unwrap();
    assert_eq!(detection.leaves.len(), 4);
    assert_eq!(detection.counts.input_points, 4 * 441 + 30);
    for (i, leaf) in detection.leaves.iter().enumerate() {
        assert_eq!(leaf.id as usize, i + 1);
        assert!((leaf.normal.norm() - 1.0).abs() < 1e-9);
        assert!(((leaf.target_point - leaf.centroid).norm() - 0.1).abs() < 1e-12);
    }

    let leaves_path = dir.path().join("leaves.json");
    save_leaves_json(&detection.leaves, &leaves_path, false).unwrap();
    let reloaded = load_leaves_json(&leaves_path).unwrap();
    assert_eq!(reloaded.len(), 4);
    assert!(reloaded.iter().all(|l| l.points.is_empty()));

    let start = Point3::new(0.05, 0.05, -0.02);
    let path = plan_from_leaf_file(&leaves_path, start, &PlannerConfig::default()).unwrap();
    assert_eq!(path.visited_leaves(), vec![1, 2, 3, 4]);
    assert!(path.skipped_leaves.is_empty());
    assert_eq!(path.count(WaypointKind::FluoroPoint), 4);
    let ws = PlannerConfig::default().workspace;
    assert!(path.iter().all(|w| ws.contains(&w.position)));
    // One segment ending at each action, plus the way home.
    assert_eq!(path.action_segments().len(), 1 + 3 * 4);
}

#[test]
fn test_pcd_input_matches_ply() {
    let dir = tempdir().unwrap();
    let ply_path = dir.path().join("plant.ply");
    let pcd_path = dir.path().join("plant.pcd");
    let cloud = plant_mm();
    write_ply(&mut BufWriter::new(File::create(&ply_path).unwrap()), &cloud).unwrap();
    write_pcd(&mut BufWriter::new(File::create(&pcd_path).unwrap()), &cloud).unwrap();

    let from_ply = detect_leaves_from_file(&ply_path, 0.001, &config()).unwrap();
    let from_pcd = detect_leaves_from_file(&pcd_path, 0.001, &config()).unwrap();
    assert_eq!(from_ply.leaves.len(), from_pcd.leaves.len());
    for (a, b) in from_ply.leaves.iter().zip(&from_pcd.leaves) {
        assert_eq!(a.points_indices, b.points_indices);
        assert!((a.centroid - b.centroid).norm() < 1e-9);
    }
}

#[test]
fn test_segmentation_export() {
    let dir = tempdir().unwrap();
    let cloud_path = dir.path().join("plant.ply");
    write_ply(&mut BufWriter::new(File::create(&cloud_path).unwrap()), &plant_mm()).unwrap();
    let detection = detect_leaves_from_file(&cloud_path, 0.001, &config()).unwrap();

    let seg_ply = dir.path().join("segmentation.ply");
    let labels = dir.path().join("labels.npy");
    assert!(write_segmentation(&detection.leaves, &seg_ply, &labels).unwrap());

    let colored = phenobot::io::load_point_cloud(&seg_ply, 1.0).unwrap();
    assert_eq!(colored.len(), 4 * 441);
    assert!(colored.colors.is_some());
    let npy = std::fs::read(&labels).unwrap();
    assert_eq!(&npy[..6], b"\x93NUMPY");
    // Header padded to a 64-byte multiple, then one u16 per point.
    let header = npy.len() - 2 * 4 * 441;
    assert_eq!(header % 64, 0);
    assert_eq!(u16::from_le_bytes([npy[header], npy[header + 1]]), 1);
}

#[test]
fn test_unreadable_input_fails_fast() {
    let dir = tempdir().unwrap();
    assert!(detect_leaves_from_file(dir.path().join("missing.ply"), 0.001, &config()).is_err());

    let garbage = dir.path().join("garbage.ply");
    std::fs::write(&garbage, "not a ply file\n").unwrap();
    assert!(detect_leaves_from_file(&garbage, 0.001, &config()).is_err());

    let unknown = dir.path().join("cloud.xyz");
    std::fs::write(&unknown, "0 0 0\n").unwrap();
    assert!(detect_leaves_from_file(&unknown, 0.001, &config()).is_err());
}
