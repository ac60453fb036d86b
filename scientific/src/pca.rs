//! Linear principal component analysis.

use nalgebra::{DMatrix, DVector, SymmetricEigen};
use pheno_core::{Error, Result};

/// A fitted projection onto the leading principal axes.
#[derive(Debug, Clone)]
pub struct Pca {
    mean: DVector<f64>,
    /// One principal axis per column, by decreasing variance.
    components: DMatrix<f64>,
    explained_variance: Vec<f64>,
}

impl Pca {
    /// Fit on `rows` (one observation per row) keeping `n_components` axes.
    ///
    /// Axis signs are fixed so the largest-magnitude coordinate of each axis is
    /// positive, which makes projections reproducible.
    pub fn fit<R: AsRef<[f64]>>(rows: &[R], n_components: usize) -> Result<Self> {
        let n = rows.len();
        let d = rows.first().map(|r| r.as_ref().len()).unwrap_or(0);
        if n == 0 || d == 0 {
            return Err(Error::InvalidInput("PCA needs a non-empty matrix".to_string()));
        }
        if rows.iter().any(|r| r.as_ref().len() != d) {
            return Err(Error::InvalidInput("PCA rows differ in length".to_string()));
        }
        if n_components == 0 || n_components > d {
            return Err(Error::InvalidInput(format!(
                "PCA cannot keep {} components of {} dimensions",
                n_components, d
            )));
        }

        let data = DMatrix::from_fn(n, d, |i, j| rows[i].as_ref()[j]);
        let mean = DVector::from_fn(d, |j, _| data.column(j).mean());
        let mut centered = data;
        for mut row in centered.row_iter_mut() {
            row -= mean.transpose();
        }
        let denom = if n > 1 { (n - 1) as f64 } else { 1.0 };
        let cov = (centered.transpose() * &centered) / denom;

        let eigen = SymmetricEigen::new(cov);
        let mut order: Vec<usize> = (0..d).collect();
        order.sort_by(|&a, &b| eigen.eigenvalues[b].total_cmp(&eigen.eigenvalues[a]));

        let mut components = DMatrix::zeros(d, n_components);
        let mut explained_variance = Vec::with_capacity(n_components);
        for (c, &idx) in order.iter().take(n_components).enumerate() {
            let mut axis = eigen.eigenvectors.column(idx).into_owned();
            let pivot = axis.iter().copied().fold(0.0f64, |best, v| {
                if v.abs() > best.abs() {
                    v
                } else {
                    best
                }
            });
            if pivot < 0.0 {
                axis = -axis;
            }
            components.set_column(c, &axis);
            explained_variance.push(eigen.eigenvalues[idx].max(0.0));
        }

        Ok(Self {
            mean,
            components,
            explained_variance,
        })
    }

    pub fn n_components(&self) -> usize {
        self.components.ncols()
    }

    pub fn explained_variance(&self) -> &[f64] {
        &self.explained_variance
    }

    /// Project rows onto the fitted axes.
    pub fn transform<R: AsRef<[f64]>>(&self, rows: &[R]) -> Vec<Vec<f64>> {
        let d = self.mean.len();
        rows.iter()
            .map(|r| {
                let r = r.as_ref();
                let centered = DVector::from_fn(d, |j, _| r.get(j).copied().unwrap_or(0.0) - self.mean[j]);
                (self.components.transpose() * centered).iter().copied().collect()
            })
            .collect()
    }

    pub fn fit_transform<R: AsRef<[f64]>>(rows: &[R], n_components: usize) -> Result<(Self, Vec<Vec<f64>>)> {
        let pca = Self::fit(rows, n_components)?;
        let projected = pca.transform(rows);
        Ok((pca, projected))
    }
}
