//! Natural cubic splines: scalar `y(x)` and arc-length parameterised 3-D curves.

use nalgebra::Point3;

/// Natural cubic spline through `(x[i], y[i])` with zero end curvature.
#[derive(Debug, Clone)]
pub struct CubicSpline {
    x: Vec<f64>,
    y: Vec<f64>,
    /// Second derivative at each knot.
    m: Vec<f64>,
}

impl CubicSpline {
    /// `None` unless `x` is strictly increasing with at least two knots.
    pub fn new(x: Vec<f64>, y: Vec<f64>) -> Option<Self> {
        if x.len() != y.len() || x.len() < 2 {
            return None;
        }
        if x.windows(2).any(|w| !(w[1] > w[0])) {
            return None;
        }
        let m = natural_second_derivatives(&x, &y);
        Some(Self { x, y, m })
    }

    pub fn domain(&self) -> (f64, f64) {
        (self.x[0], self.x[self.x.len() - 1])
    }

    /// Value at `x_val`, clamped to the knot range.
    pub fn call(&self, x_val: f64) -> f64 {
        let (lo, hi) = self.domain();
        let x_val = x_val.clamp(lo, hi);
        let idx = match self.x.partition_point(|&v| v <= x_val) {
            0 => 0,
            p => (p - 1).min(self.x.len() - 2),
        };

        let h = self.x[idx + 1] - self.x[idx];
        let a = (self.x[idx + 1] - x_val) / h;
        let b = (x_val - self.x[idx]) / h;
        a * self.y[idx]
            + b * self.y[idx + 1]
            + ((a * a * a - a) * self.m[idx] + (b * b * b - b) * self.m[idx + 1]) * h * h / 6.0
    }
}

/// Solve the tridiagonal system for knot second derivatives (Thomas algorithm).
fn natural_second_derivatives(x: &[f64], y: &[f64]) -> Vec<f64> {
    let n = x.len();
    let mut m = vec![0.0; n];
    if n < 3 {
        return m;
    }

    let inner = n - 2;
    let mut diag = vec![0.0; inner];
    let mut upper = vec![0.0; inner];
    let mut rhs = vec![0.0; inner];
    for i in 1..n - 1 {
        let h0 = x[i] - x[i - 1];
        let h1 = x[i + 1] - x[i];
        diag[i - 1] = 2.0 * (h0 + h1);
        upper[i - 1] = h1;
        rhs[i - 1] = 6.0 * ((y[i + 1] - y[i]) / h1 - (y[i] - y[i - 1]) / h0);
    }

    // Forward sweep; the sub-diagonal entry of row i is h0 = x[i+1] - x[i].
    for i in 1..inner {
        let lower = x[i + 1] - x[i];
        let w = lower / diag[i - 1];
        diag[i] -= w * upper[i - 1];
        rhs[i] -= w * rhs[i - 1];
    }
    let mut sol = vec![0.0; inner];
    sol[inner - 1] = rhs[inner - 1] / diag[inner - 1];
    for i in (0..inner - 1).rev() {
        sol[i] = (rhs[i] - upper[i] * sol[i + 1]) / diag[i];
    }

    m[1..n - 1].copy_from_slice(&sol);
    m
}

/// Cumulative Euclidean arc length at each point, starting at 0.
pub fn cumulative_arc_length(points: &[Point3<f64>]) -> Vec<f64> {
    let mut t = Vec::with_capacity(points.len());
    let mut acc = 0.0;
    for (i, p) in points.iter().enumerate() {
        if i > 0 {
            acc += (p - points[i - 1]).norm();
        }
        t.push(acc);
    }
    t
}

/// Per-coordinate natural cubic splines over cumulative chord length.
#[derive(Debug, Clone)]
pub struct SplineCurve3 {
    x: CubicSpline,
    y: CubicSpline,
    z: CubicSpline,
}

impl SplineCurve3 {
    /// Control points closer than `min_spacing` to the previously kept one are
    /// dropped. `None` when fewer than two distinct points remain.
    pub fn through(points: &[Point3<f64>], min_spacing: f64) -> Option<Self> {
        let mut kept: Vec<Point3<f64>> = Vec::with_capacity(points.len());
        for p in points {
            if kept.last().map_or(true, |q| (p - q).norm() >= min_spacing) {
                kept.push(*p);
            }
        }
        if kept.len() < 2 {
            return None;
        }
        let t = cumulative_arc_length(&kept);
        let coord = |axis: usize| kept.iter().map(|p| p[axis]).collect::<Vec<_>>();
        Some(Self {
            x: CubicSpline::new(t.clone(), coord(0))?,
            y: CubicSpline::new(t.clone(), coord(1))?,
            z: CubicSpline::new(t, coord(2))?,
        })
    }

    pub fn length(&self) -> f64 {
        self.x.domain().1
    }

    pub fn at(&self, t: f64) -> Point3<f64> {
        Point3::new(self.x.call(t), self.y.call(t), self.z.call(t))
    }

    /// `count` points evenly spaced in the parameter, both ends included.
    pub fn sample(&self, count: usize) -> Vec<Point3<f64>> {
        match count {
            0 => Vec::new(),
            1 => vec![self.at(0.0)],
            _ => {
                let len = self.length();
                (0..count)
                    .map(|i| self.at(len * i as f64 / (count - 1) as f64))
                    .collect()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interpolates_knots() {
        let x = vec![0.0, 1.0, 2.5, 3.0, 4.0];
        let y = vec![1.0, -2.0, 0.5, 0.0, 3.0];
        let s = CubicSpline::new(x.clone(), y.clone()).unwrap();
        for (xi, yi) in x.iter().zip(&y) {
            assert!((s.call(*xi) - yi).abs() < 1e-12);
        }
    }

    #[test]
    fn test_reproduces_linear_data() {
        let x = vec![0.0, 0.3, 1.0, 2.0];
        let y: Vec<f64> = x.iter().map(|v| 2.0 * v - 1.0).collect();
        let s = CubicSpline::new(x, y).unwrap();
        assert!((s.call(1.7) - 2.4).abs() < 1e-12);
    }

    #[test]
    fn test_natural_end_conditions() {
        let s = CubicSpline::new(vec![0.0, 1.0, 2.0], vec![0.0, 1.0, 0.0]).unwrap();
        // Symmetric hump: m = [0, -3, 0], value at 0.5 = 0.6875.
        assert!((s.m[1] + 3.0).abs() < 1e-12);
        assert!((s.call(0.5) - 0.6875).abs() < 1e-12);
    }

    #[test]
    fn test_rejects_unsorted_knots() {
        assert!(CubicSpline::new(vec![0.0, 0.0], vec![1.0, 2.0]).is_none());
        assert!(CubicSpline::new(vec![0.0], vec![1.0]).is_none());
    }

    #[test]
    fn test_curve_passes_through_controls() {
        let pts = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(2.0, 0.0, 0.5),
        ];
        let curve = SplineCurve3::through(&pts, 1e-9).unwrap();
        let samples = curve.sample(10);
        assert_eq!(samples.len(), 10);
        assert!((samples[0] - pts[0]).norm() < 1e-12);
        assert!((samples[9] - pts[3]).norm() < 1e-12);
        assert!((curve.at(2f64.sqrt()) - pts[2]).norm() < 1e-12);
    }

    #[test]
    fn test_curve_needs_two_distinct_points() {
        let p = Point3::new(0.1, 0.2, 0.3);
        assert!(SplineCurve3::through(&[p, p], 1e-9).is_none());
    }
}
