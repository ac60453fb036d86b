use nalgebra::{Point3, Vector3};
use pheno_core::{validate_unit_vector, ClusterLabeling, LeafDocument, PointCloud};

#[test]
fn test_point_cloud_result_handling() {
    let points = vec![Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 1.0)];
    let cloud = PointCloud::new(points);

    let colors = vec![Point3::new(1.0, 0.0, 0.0), Point3::new(0.0, 1.0, 0.0)];
    assert!(cloud.clone().with_colors(colors).is_ok());

    let bad_colors = vec![Point3::new(1.0, 0.0, 0.0)];
    let err = cloud.with_colors(bad_colors).unwrap_err();
    assert!(err.to_string().contains("Color count"));
}

#[test]
fn test_selection_keeps_colors_aligned() {
    let cloud = PointCloud::new(vec![
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(1.0, 0.0, 0.0),
        Point3::new(2.0, 0.0, 0.0),
    ])
    .with_colors(vec![
        Point3::new(0.1, 0.0, 0.0),
        Point3::new(0.2, 0.0, 0.0),
        Point3::new(0.3, 0.0, 0.0),
    ])
    .unwrap();

    let sub = cloud.select(&[2, 0]);
    assert_eq!(sub.len(), 2);
    assert_eq!(sub.points[0].x, 2.0);
    assert_eq!(sub.colors.as_ref().unwrap()[0].x, 0.3);
}

#[test]
fn test_scaling_millimetres_to_metres() {
    let cloud = PointCloud::new(vec![Point3::new(1000.0, -250.0, 5.0)]).scaled(0.001);
    assert!((cloud.points[0] - Point3::new(1.0, -0.25, 0.005)).norm() < 1e-12);
}

#[test]
fn test_labeling_round_trip_through_groups() {
    let labeling = ClusterLabeling::new(vec![3, 3, -1, 7, 3, 7]);
    let groups = labeling.groups();
    assert_eq!(groups, vec![vec![0, 1, 4], vec![3, 5]]);
    assert_eq!(labeling.num_unassigned(), 1);
}

#[test]
fn test_zero_normal_rejected() {
    assert!(validate_unit_vector("normal", &Vector3::zeros()).is_err());
}

#[test]
fn test_leaf_document_from_foreign_json() {
    let json = r#"{
        "leaves": [
            {"id": 4, "centroid": [0.3, 0.3, -0.1], "normal": [0.0, 0.0, 2.0],
             "plane_equation": [0.0, 0.0, 1.0, 0.1], "inlier_ratio": 1.0,
             "target_point": [0.3, 0.3, 0.0]}
        ]
    }"#;
    let doc = LeafDocument::from_json_str(json).unwrap();
    assert_eq!(doc.leaves.len(), 1);
    assert!(doc.leaves[0].points.is_empty());
    assert!(doc.leaves[0].points_indices.is_empty());
}
