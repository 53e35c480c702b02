//! Matrix type for 2D numeric data (row-major storage).

use super::Vector;
use serde::{Deserialize, Serialize};

/// A 2D matrix of floating-point values (row-major storage).
///
/// # Examples
///
/// ```
/// use emular::primitives::Matrix;
///
/// let m = Matrix::from_vec(2, 3, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0])
///     .expect("data length matches rows * cols");
/// assert_eq!(m.shape(), (2, 3));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Matrix<T> {
    data: Vec<T>,
    rows: usize,
    cols: usize,
}

impl<T: Copy> Matrix<T> {
    /// Creates a new matrix from a vector of data.
    ///
    /// # Errors
    ///
    /// Returns an error if data length doesn't match rows * cols.
    pub fn from_vec(rows: usize, cols: usize, data: Vec<T>) -> Result<Self, &'static str> {
        if data.len() != rows * cols {
            return Err("Data length must equal rows * cols");
        }
        Ok(Self { data, rows, cols })
    }

    /// Returns the shape as (rows, cols).
    #[must_use]
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Returns the number of rows.
    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.rows
    }

    /// Returns the number of columns.
    #[must_use]
    pub fn n_cols(&self) -> usize {
        self.cols
    }

    /// Gets element at (row, col).
    ///
    /// # Panics
    ///
    /// Panics if indices are out of bounds.
    #[must_use]
    pub fn get(&self, row: usize, col: usize) -> T {
        self.data[row * self.cols + col]
    }

    /// Sets element at (row, col).
    ///
    /// # Panics
    ///
    /// Panics if indices are out of bounds.
    pub fn set(&mut self, row: usize, col: usize, value: T) {
        self.data[row * self.cols + col] = value;
    }

    /// Returns a row as a Vector.
    #[must_use]
    pub fn row(&self, row_idx: usize) -> Vector<T> {
        let start = row_idx * self.cols;
        let end = start + self.cols;
        Vector::from_slice(&self.data[start..end])
    }

    /// Returns a column as a Vector.
    #[must_use]
    pub fn column(&self, col_idx: usize) -> Vector<T> {
        let data: Vec<T> = (0..self.rows)
            .map(|row| self.data[row * self.cols + col_idx])
            .collect();
        Vector::from_vec(data)
    }

    /// Returns the underlying data as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// Builds a new matrix from the given row indices, in index order.
    ///
    /// Used to extract fold partitions during cross-validation.
    ///
    /// # Panics
    ///
    /// Panics if an index is out of bounds.
    #[must_use]
    pub fn take_rows(&self, indices: &[usize]) -> Self {
        let mut data = Vec::with_capacity(indices.len() * self.cols);
        for &idx in indices {
            let start = idx * self.cols;
            data.extend_from_slice(&self.data[start..start + self.cols]);
        }
        Self {
            data,
            rows: indices.len(),
            cols: self.cols,
        }
    }
}

impl Matrix<f32> {
    /// Creates a matrix of zeros.
    #[must_use]
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            data: vec![0.0; rows * cols],
            rows,
            cols,
        }
    }

    /// Creates an identity matrix.
    #[must_use]
    pub fn eye(n: usize) -> Self {
        let mut m = Self::zeros(n, n);
        for i in 0..n {
            m.set(i, i, 1.0);
        }
        m
    }

    /// Returns the transpose.
    #[must_use]
    pub fn transpose(&self) -> Self {
        let mut data = vec![0.0; self.rows * self.cols];
        for i in 0..self.rows {
            for j in 0..self.cols {
                data[j * self.rows + i] = self.data[i * self.cols + j];
            }
        }
        Self {
            data,
            rows: self.cols,
            cols: self.rows,
        }
    }

    /// Matrix multiplication.
    ///
    /// # Errors
    ///
    /// Returns an error if inner dimensions don't match.
    pub fn matmul(&self, other: &Self) -> Result<Self, &'static str> {
        if self.cols != other.rows {
            return Err("Inner dimensions must match for matmul");
        }
        let mut data = vec![0.0; self.rows * other.cols];
        for i in 0..self.rows {
            for k in 0..self.cols {
                let a = self.data[i * self.cols + k];
                if a == 0.0 {
                    continue;
                }
                for j in 0..other.cols {
                    data[i * other.cols + j] += a * other.data[k * other.cols + j];
                }
            }
        }
        Ok(Self {
            data,
            rows: self.rows,
            cols: other.cols,
        })
    }

    /// Solves `A * x = b` for symmetric positive definite `A` via Cholesky.
    ///
    /// # Errors
    ///
    /// Returns an error if the matrix is not square or not positive definite.
    pub fn cholesky_solve(&self, b: &Vector<f32>) -> Result<Vector<f32>, &'static str> {
        let l = self.cholesky_factor()?;
        if self.rows != b.len() {
            return Err("Matrix rows must match vector length");
        }
        Ok(Vector::from_vec(chol_substitute(
            &l,
            self.rows,
            b.as_slice(),
        )))
    }

    /// Solves `A * X = B` column by column, reusing one Cholesky factorization.
    ///
    /// Used for multi-target normal-equation fits where `B` holds one
    /// right-hand side per simulation output.
    ///
    /// # Errors
    ///
    /// Returns an error if the matrix is not square, not positive definite,
    /// or `B` has the wrong number of rows.
    pub fn cholesky_solve_multi(&self, b: &Matrix<f32>) -> Result<Matrix<f32>, &'static str> {
        let l = self.cholesky_factor()?;
        if self.rows != b.n_rows() {
            return Err("Matrix rows must match right-hand side rows");
        }
        let n = self.rows;
        let mut out = Matrix::zeros(n, b.n_cols());
        for j in 0..b.n_cols() {
            let col: Vec<f32> = (0..n).map(|i| b.get(i, j)).collect();
            let x = chol_substitute(&l, n, &col);
            for (i, &v) in x.iter().enumerate() {
                out.set(i, j, v);
            }
        }
        Ok(out)
    }

    /// Lower-triangular Cholesky factor of a symmetric positive definite matrix.
    fn cholesky_factor(&self) -> Result<Vec<f32>, &'static str> {
        if self.rows != self.cols {
            return Err("Matrix must be square for Cholesky decomposition");
        }
        let n = self.rows;
        let mut l = vec![0.0_f32; n * n];

        for i in 0..n {
            for j in 0..=i {
                let mut sum = 0.0;
                if i == j {
                    for k in 0..j {
                        sum += l[j * n + k] * l[j * n + k];
                    }
                    let diag = self.get(j, j) - sum;
                    if diag <= 0.0 {
                        return Err("Matrix is not positive definite");
                    }
                    l[j * n + j] = diag.sqrt();
                } else {
                    for k in 0..j {
                        sum += l[i * n + k] * l[j * n + k];
                    }
                    l[i * n + j] = (self.get(i, j) - sum) / l[j * n + j];
                }
            }
        }
        Ok(l)
    }
}

/// Forward then backward substitution against a Cholesky factor.
fn chol_substitute(l: &[f32], n: usize, b: &[f32]) -> Vec<f32> {
    // L * y = b
    let mut y = vec![0.0_f32; n];
    for i in 0..n {
        let mut sum = 0.0;
        for j in 0..i {
            sum += l[i * n + j] * y[j];
        }
        y[i] = (b[i] - sum) / l[i * n + i];
    }

    // L^T * x = y
    let mut x = vec![0.0_f32; n];
    for i in (0..n).rev() {
        let mut sum = 0.0;
        for j in (i + 1)..n {
            sum += l[j * n + i] * x[j];
        }
        x[i] = (y[i] - sum) / l[i * n + i];
    }
    x
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_vec_validates_length() {
        assert!(Matrix::from_vec(2, 2, vec![1.0_f32, 2.0, 3.0]).is_err());
        assert!(Matrix::from_vec(2, 2, vec![1.0_f32, 2.0, 3.0, 4.0]).is_ok());
    }

    #[test]
    fn test_shape_and_access() {
        let mut m = Matrix::from_vec(2, 3, vec![1.0_f32, 2.0, 3.0, 4.0, 5.0, 6.0]).expect("matrix");
        assert_eq!(m.shape(), (2, 3));
        assert_eq!(m.n_rows(), 2);
        assert_eq!(m.n_cols(), 3);
        assert_eq!(m.get(1, 2), 6.0);
        m.set(1, 2, 9.0);
        assert_eq!(m.get(1, 2), 9.0);
    }

    #[test]
    fn test_row_and_column() {
        let m = Matrix::from_vec(2, 3, vec![1.0_f32, 2.0, 3.0, 4.0, 5.0, 6.0]).expect("matrix");
        assert_eq!(m.row(0).as_slice(), &[1.0, 2.0, 3.0]);
        assert_eq!(m.column(1).as_slice(), &[2.0, 5.0]);
    }

    #[test]
    fn test_take_rows_preserves_index_order() {
        let m = Matrix::from_vec(4, 2, vec![0.0_f32, 0.0, 1.0, 1.0, 2.0, 2.0, 3.0, 3.0])
            .expect("matrix");
        let sub = m.take_rows(&[3, 1]);
        assert_eq!(sub.shape(), (2, 2));
        assert_eq!(sub.row(0).as_slice(), &[3.0, 3.0]);
        assert_eq!(sub.row(1).as_slice(), &[1.0, 1.0]);
    }

    #[test]
    fn test_transpose() {
        let m = Matrix::from_vec(2, 3, vec![1.0_f32, 2.0, 3.0, 4.0, 5.0, 6.0]).expect("matrix");
        let t = m.transpose();
        assert_eq!(t.shape(), (3, 2));
        assert_eq!(t.get(2, 0), 3.0);
        assert_eq!(t.get(0, 1), 4.0);
    }

    #[test]
    fn test_matmul() {
        let a = Matrix::from_vec(2, 2, vec![1.0_f32, 2.0, 3.0, 4.0]).expect("matrix");
        let b = Matrix::from_vec(2, 2, vec![5.0_f32, 6.0, 7.0, 8.0]).expect("matrix");
        let c = a.matmul(&b).expect("dimensions match");
        assert_eq!(c.as_slice(), &[19.0, 22.0, 43.0, 50.0]);
    }

    #[test]
    fn test_matmul_dimension_mismatch() {
        let a = Matrix::from_vec(2, 3, vec![0.0_f32; 6]).expect("matrix");
        let b = Matrix::from_vec(2, 2, vec![0.0_f32; 4]).expect("matrix");
        assert!(a.matmul(&b).is_err());
    }

    #[test]
    fn test_cholesky_solve_identity() {
        let a = Matrix::eye(3);
        let b = Vector::from_slice(&[1.0_f32, 2.0, 3.0]);
        let x = a.cholesky_solve(&b).expect("identity is SPD");
        assert_eq!(x.as_slice(), &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_cholesky_solve_spd() {
        // A = [[4, 2], [2, 3]], b = [10, 8] -> x = [1.75, 1.5]
        let a = Matrix::from_vec(2, 2, vec![4.0_f32, 2.0, 2.0, 3.0]).expect("matrix");
        let b = Vector::from_slice(&[10.0_f32, 8.0]);
        let x = a.cholesky_solve(&b).expect("SPD matrix");
        assert!((x[0] - 1.75).abs() < 1e-5);
        assert!((x[1] - 1.5).abs() < 1e-5);
    }

    #[test]
    fn test_cholesky_rejects_non_spd() {
        let a = Matrix::from_vec(2, 2, vec![0.0_f32, 1.0, 1.0, 0.0]).expect("matrix");
        let b = Vector::from_slice(&[1.0_f32, 1.0]);
        assert!(a.cholesky_solve(&b).is_err());
    }

    #[test]
    fn test_cholesky_solve_multi_matches_single() {
        let a = Matrix::from_vec(2, 2, vec![4.0_f32, 2.0, 2.0, 3.0]).expect("matrix");
        let b = Matrix::from_vec(2, 2, vec![10.0_f32, 4.0, 8.0, 5.0]).expect("matrix");
        let x = a.cholesky_solve_multi(&b).expect("SPD matrix");
        let x0 = a.cholesky_solve(&b.column(0)).expect("SPD matrix");
        let x1 = a.cholesky_solve(&b.column(1)).expect("SPD matrix");
        for i in 0..2 {
            assert!((x.get(i, 0) - x0[i]).abs() < 1e-6);
            assert!((x.get(i, 1) - x1[i]).abs() < 1e-6);
        }
    }

    #[test]
    fn test_cholesky_solve_multi_shape_mismatch() {
        let a = Matrix::eye(3);
        let b = Matrix::zeros(2, 1);
        assert!(a.cholesky_solve_multi(&b).is_err());
    }
}
