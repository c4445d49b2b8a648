use ndarray::{Array1, Array2, Axis};
use ndarray_rand::RandomExt;
use rand::Rng;
use rand_distr::Normal;
use serde::{Deserialize, Serialize};

use crate::error::{ReinforceError, Result};

/// Persisted form of a [`Mat`]: shape plus row-major values. Gradients are
/// never persisted.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct MatData {
    pub rows: usize,
    pub cols: usize,
    pub values: Vec<f64>,
}

/// A dense 2-D matrix with a gradient buffer of identical shape.
///
/// Values and gradients are stored row-major, so element `(row, col)` sits at
/// flat index `row * cols + col`. The matrix itself is not differentiable; a
/// [`Graph`](crate::graph::Graph) writes into `gradients` during its backward
/// pass and an [`Optimizer`](crate::optimizer::Optimizer) clears them after
/// consuming them.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
#[serde(try_from = "MatData", into = "MatData")]
pub struct Mat {
    pub values: Array2<f64>,
    pub gradients: Array2<f64>,
}

impl Mat {
    /// Create a zero matrix with `rows` rows and `cols` columns.
    pub fn new(rows: usize, cols: usize) -> Self {
        Mat {
            values: Array2::zeros((rows, cols)),
            gradients: Array2::zeros((rows, cols)),
        }
    }

    /// Create a matrix from row-major values.
    pub fn from_vec(rows: usize, cols: usize, values: Vec<f64>) -> Result<Self> {
        let len = values.len();
        let values = Array2::from_shape_vec((rows, cols), values).map_err(|_| {
            ReinforceError::dimension_mismatch(format!("{} values", rows * cols), format!("{} values", len))
        })?;
        Ok(Mat {
            gradients: Array2::zeros((rows, cols)),
            values,
        })
    }

    /// Create a column vector holding `values`.
    pub fn column(values: &[f64]) -> Self {
        let mut mat = Mat::new(values.len(), 1);
        mat.values
            .iter_mut()
            .zip(values.iter())
            .for_each(|(w, &v)| *w = v);
        mat
    }

    /// Create a column vector from a 1-D array.
    pub fn from_array(values: &Array1<f64>) -> Self {
        let values = values.to_owned().insert_axis(Axis(1));
        Mat {
            gradients: Array2::zeros(values.dim()),
            values,
        }
    }

    /// Create a matrix filled with samples from `N(mu, std)`.
    pub fn randn<R: Rng + ?Sized>(rows: usize, cols: usize, mu: f64, std: f64, rng: &mut R) -> Result<Self> {
        if !(std >= 0.0 && std.is_finite()) {
            return Err(ReinforceError::invalid_parameter(
                "std".to_string(),
                format!("must be a finite non-negative number, got {}", std),
            ));
        }
        let normal = Normal::new(mu, std)
            .map_err(|e| ReinforceError::invalid_parameter("std".to_string(), e.to_string()))?;
        Ok(Mat {
            values: Array2::random_using((rows, cols), normal, rng),
            gradients: Array2::zeros((rows, cols)),
        })
    }

    pub fn rows(&self) -> usize {
        self.values.nrows()
    }

    pub fn cols(&self) -> usize {
        self.values.ncols()
    }

    pub fn shape(&self) -> (usize, usize) {
        self.values.dim()
    }

    /// Number of elements, `rows * cols`.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, row: usize, col: usize) -> Result<f64> {
        self.values
            .get((row, col))
            .copied()
            .ok_or_else(|| self.out_of_range(row, col))
    }

    pub fn set(&mut self, row: usize, col: usize, value: f64) -> Result<()> {
        let err = self.out_of_range(row, col);
        let slot = self.values.get_mut((row, col)).ok_or(err)?;
        *slot = value;
        Ok(())
    }

    /// Overwrite all values from a flat row-major sequence of exactly `len()`
    /// numbers.
    pub fn set_from(&mut self, values: &[f64]) -> Result<()> {
        if values.len() != self.len() {
            return Err(ReinforceError::dimension_mismatch(
                format!("{} values", self.len()),
                format!("{} values", values.len()),
            ));
        }
        self.values
            .iter_mut()
            .zip(values.iter())
            .for_each(|(w, &v)| *w = v);
        Ok(())
    }

    /// Copy every value of `src`, read as a column vector, into column `col`.
    /// Used to assemble a Jacobian one column at a time.
    pub fn set_column(&mut self, src: &Mat, col: usize) -> Result<()> {
        if col >= self.cols() {
            return Err(ReinforceError::OutOfRange {
                index: col,
                len: self.cols(),
            });
        }
        if src.len() != self.rows() {
            return Err(ReinforceError::dimension_mismatch(
                format!("{} values", self.rows()),
                format!("{} values", src.len()),
            ));
        }
        self.values
            .column_mut(col)
            .iter_mut()
            .zip(src.values.iter())
            .for_each(|(w, &v)| *w = v);
        Ok(())
    }

    pub fn zero_grad(&mut self) {
        self.gradients.fill(0.0);
    }

    pub fn to_data(&self) -> MatData {
        MatData {
            rows: self.rows(),
            cols: self.cols(),
            values: self.values.iter().copied().collect(),
        }
    }

    fn out_of_range(&self, row: usize, col: usize) -> ReinforceError {
        ReinforceError::OutOfRange {
            index: row.saturating_mul(self.cols()).saturating_add(col),
            len: self.len(),
        }
    }
}

impl From<Mat> for MatData {
    fn from(mat: Mat) -> Self {
        mat.to_data()
    }
}

impl TryFrom<MatData> for Mat {
    type Error = ReinforceError;

    fn try_from(data: MatData) -> Result<Self> {
        Mat::from_vec(data.rows, data.cols, data.values)
    }
}
