//! Core traits for the estimators composed by the recommender.

use crate::error::Result;
use crate::primitives::Matrix;

/// Trait for unsupervised models fitted on a sample matrix.
///
/// # Examples
///
/// ```
/// use georec::prelude::*;
///
/// // Two obvious groups of (lat, lon) points
/// let points = Matrix::from_vec(4, 2, vec![
///     0.0, 0.0, 0.1, 0.1,
///     10.0, 10.0, 10.1, 10.1,
/// ]).expect("4x2");
///
/// let mut clusterer = GeoClusterer::new(2);
/// clusterer.fit(&points).expect("fit succeeds");
/// let labels = clusterer.predict(&points);
/// assert_eq!(labels[0], labels[1]);
/// assert_ne!(labels[0], labels[2]);
/// ```
pub trait UnsupervisedEstimator {
    /// The type of labels/clusters produced.
    type Labels;

    /// Fits the model to data.
    ///
    /// # Errors
    ///
    /// Returns an error if fitting fails (empty data, invalid parameters, etc.).
    fn fit(&mut self, x: &Matrix<f32>) -> Result<()>;

    /// Predicts cluster assignments for data.
    fn predict(&self, x: &Matrix<f32>) -> Self::Labels;
}
