//! Core compute primitives (Vector, Matrix).
//!
//! Factor matrices, bias vectors, coordinates and cluster centres are all
//! stored in these row-major `f32` containers.

mod matrix;
mod vector;

pub use matrix::Matrix;
pub use vector::Vector;
