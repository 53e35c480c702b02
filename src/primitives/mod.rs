//! Core numeric primitives (Vector, Matrix).
//!
//! These types carry the tabular simulation data and the learned
//! coefficients of the built-in emulators.

mod matrix;
mod vector;

pub use matrix::Matrix;
pub use vector::Vector;
