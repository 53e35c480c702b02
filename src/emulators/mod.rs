//! Built-in emulator zoo.
//!
//! Every emulator here implements [`crate::traits::Emulator`] and ships a
//! default hyperparameter search space consumed by the registry. Names and
//! short codes live in [`crate::registry`].

mod linear;
mod neighbors;
mod polynomial;
mod rbf;

pub use linear::{LinearEmulator, RidgeEmulator};
pub use neighbors::KNearest;
pub use polynomial::SecondOrderPolynomial;
pub use rbf::{RadialBasis, RbfKernel};

use crate::error::Result;
use crate::primitives::Matrix;

/// Prepends an all-ones intercept column to `x`.
#[must_use]
pub(crate) fn design_with_intercept(x: &Matrix<f32>) -> Matrix<f32> {
    let (n, p) = x.shape();
    let mut data = Vec::with_capacity(n * (p + 1));
    for i in 0..n {
        data.push(1.0);
        for j in 0..p {
            data.push(x.get(i, j));
        }
    }
    Matrix::from_vec(n, p + 1, data).expect("design matrix dimensions are consistent")
}

/// Solves the regularized normal equations `(A^T A + alpha I) W = A^T Y`.
///
/// The first design column is assumed to be the intercept and is never
/// penalized. With `alpha = 0` this is ordinary least squares, which fails
/// on a singular system.
pub(crate) fn solve_ridge(
    design: &Matrix<f32>,
    y: &Matrix<f32>,
    alpha: f32,
) -> Result<Matrix<f32>> {
    let at = design.transpose();
    let mut gram = at.matmul(design)?;
    if alpha > 0.0 {
        for i in 1..gram.n_rows() {
            let v = gram.get(i, i) + alpha;
            gram.set(i, i, v);
        }
    }
    let rhs = at.matmul(y)?;
    gram.cholesky_solve_multi(&rhs).map_err(Into::into)
}
