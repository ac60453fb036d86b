/// Integration tests for the point-cloud crate on synthetic leaf-like patches
use nalgebra::{Point3, Vector3};
use pheno_point_cloud::{
    compute_eigen_features, crop_by_height, medoid, pca_normal, segment_plane, CropMethod,
    KdTree, DEFAULT_EIGEN_RADII,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// A noisy square patch of side `size` centred on `center`, spanned by `u` and `v`.
fn patch(center: Point3<f64>, u: Vector3<f64>, v: Vector3<f64>, size: f64, n: usize, seed: u64) -> Vec<Point3<f64>> {
    let mut rng = StdRng::seed_from_u64(seed);
    let normal = u.cross(&v).normalize();
    (0..n)
        .map(|_| {
            let a = rng.gen_range(-0.5..0.5) * size;
            let b = rng.gen_range(-0.5..0.5) * size;
            let noise = rng.gen_range(-1e-5..1e-5);
            center + u * a + v * b + normal * noise
        })
        .collect()
}

#[test]
fn test_leaf_patch_pose() {
    let u = Vector3::new(1.0, 0.0, 0.2).normalize();
    let v = Vector3::new(0.0, 1.0, 0.0);
    let pts = patch(Point3::new(0.3, 0.3, -0.1), u, v, 0.03, 600, 3);

    let c = pts[medoid(&pts).unwrap()];
    let n = pca_normal(&pts, &c);
    let truth = u.cross(&v).normalize();
    assert!(n.dot(&truth).abs() > 0.999);
    assert!(n.z >= 0.0);

    let fit = segment_plane(&pts, 0.0005, 100, 1).unwrap();
    assert!(fit.inlier_ratio(pts.len()) > 0.99);
}

#[test]
fn test_features_separate_flat_from_volumetric() {
    let flat = patch(Point3::origin(), Vector3::x(), Vector3::y(), 0.02, 2000, 5);
    let mut rng = StdRng::seed_from_u64(6);
    let blob: Vec<Point3<f64>> = (0..2000)
        .map(|_| {
            Point3::new(
                0.1 + rng.gen_range(-0.005..0.005),
                rng.gen_range(-0.005..0.005),
                rng.gen_range(-0.005..0.005),
            )
        })
        .collect();
    let mut all = flat.clone();
    all.extend(&blob);

    let features = compute_eigen_features(&all, &DEFAULT_EIGEN_RADII);
    let flat_mean: f64 = features[..flat.len()].iter().map(|f| f[6]).sum::<f64>() / flat.len() as f64;
    let blob_mean: f64 = features[flat.len()..].iter().map(|f| f[6]).sum::<f64>() / blob.len() as f64;
    assert!(flat_mean < 0.01);
    assert!(blob_mean > 0.1);
}

#[test]
fn test_crop_then_index_back() {
    let pts: Vec<Point3<f64>> = (0..100).map(|i| Point3::new(0.0, 0.0, i as f64)).collect();
    let (kept, idx) = crop_by_height(&pts, CropMethod::TopFraction(0.5));
    for (p, &i) in kept.iter().zip(&idx) {
        assert_eq!(*p, pts[i]);
    }
    let tree = KdTree::build(&kept);
    assert_eq!(tree.len(), kept.len());
}
