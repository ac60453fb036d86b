//! Spatial Data Structures
//!
//! A balanced KDTree over a fixed set of points. Queries return indices into
//! the slice the tree was built from.

use nalgebra::Point3;

/// Balanced KDTree for radius and nearest neighbor queries
pub struct KdTree {
    points: Vec<Point3<f64>>,
    root: Option<Box<KdNode>>,
}

struct KdNode {
    index: usize,
    axis: usize,
    left: Option<Box<KdNode>>,
    right: Option<Box<KdNode>>,
}

impl KdTree {
    /// Build by recursive median split, cycling x, y, z with depth.
    pub fn build(points: &[Point3<f64>]) -> Self {
        let mut indices: Vec<usize> = (0..points.len()).collect();
        let root = Self::build_recursive(points, &mut indices, 0);
        Self {
            points: points.to_vec(),
            root,
        }
    }

    fn build_recursive(
        points: &[Point3<f64>],
        indices: &mut [usize],
        depth: usize,
    ) -> Option<Box<KdNode>> {
        if indices.is_empty() {
            return None;
        }
        let axis = depth % 3;
        let mid = indices.len() / 2;
        indices.select_nth_unstable_by(mid, |&a, &b| {
            points[a][axis]
                .total_cmp(&points[b][axis])
                .then(a.cmp(&b))
        });
        let index = indices[mid];
        let (lower, rest) = indices.split_at_mut(mid);
        let upper = &mut rest[1..];
        Some(Box::new(KdNode {
            index,
            axis,
            left: Self::build_recursive(points, lower, depth + 1),
            right: Self::build_recursive(points, upper, depth + 1),
        }))
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn point(&self, index: usize) -> &Point3<f64> {
        &self.points[index]
    }

    /// Indices of all points with `‖p − query‖ ≤ radius`, ascending.
    ///
    /// A query located on a stored point returns that point too.
    pub fn search_radius(&self, query: &Point3<f64>, radius: f64) -> Vec<usize> {
        let mut results = Vec::new();
        if let Some(ref root) = self.root {
            self.radius_recursive(root, query, radius * radius, &mut results);
        }
        results.sort_unstable();
        results
    }

    fn radius_recursive(
        &self,
        node: &KdNode,
        query: &Point3<f64>,
        radius_sq: f64,
        results: &mut Vec<usize>,
    ) {
        let p = &self.points[node.index];
        if (p - query).norm_squared() <= radius_sq {
            results.push(node.index);
        }

        let diff = query[node.axis] - p[node.axis];
        let (first, second) = if diff < 0.0 {
            (&node.left, &node.right)
        } else {
            (&node.right, &node.left)
        };

        if let Some(ref child) = first {
            self.radius_recursive(child, query, radius_sq, results);
        }
        if diff * diff <= radius_sq {
            if let Some(ref child) = second {
                self.radius_recursive(child, query, radius_sq, results);
            }
        }
    }

    /// Closest stored point as `(index, distance)`.
    pub fn nearest(&self, query: &Point3<f64>) -> Option<(usize, f64)> {
        self.k_nearest(query, 1).into_iter().next()
    }

    /// Up to `k` closest points as `(index, distance)`, nearest first.
    pub fn k_nearest(&self, query: &Point3<f64>, k: usize) -> Vec<(usize, f64)> {
        let mut best: Vec<(usize, f64)> = Vec::with_capacity(k + 1);
        if k == 0 {
            return best;
        }
        if let Some(ref root) = self.root {
            self.knn_recursive(root, query, k, &mut best);
        }
        best.into_iter().map(|(i, d2)| (i, d2.sqrt())).collect()
    }

    /// `best` holds squared distances sorted ascending, at most `k` long.
    fn knn_recursive(
        &self,
        node: &KdNode,
        query: &Point3<f64>,
        k: usize,
        best: &mut Vec<(usize, f64)>,
    ) {
        let p = &self.points[node.index];
        let d2 = (p - query).norm_squared();
        if best.len() < k || d2 < best[best.len() - 1].1 {
            let pos = best
                .iter()
                .position(|&(i, d)| d2 < d || (d2 == d && node.index < i))
                .unwrap_or(best.len());
            best.insert(pos, (node.index, d2));
            best.truncate(k);
        }

        let diff = query[node.axis] - p[node.axis];
        let (first, second) = if diff < 0.0 {
            (&node.left, &node.right)
        } else {
            (&node.right, &node.left)
        };

        if let Some(ref child) = first {
            self.knn_recursive(child, query, k, best);
        }
        if best.len() < k || diff * diff <= best[best.len() - 1].1 {
            if let Some(ref child) = second {
                self.knn_recursive(child, query, k, best);
            }
        }
    }
}
