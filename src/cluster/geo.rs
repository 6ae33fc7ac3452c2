//! K-Means over (latitude, longitude) pairs.

use crate::error::{GeoRecError, Result};
use crate::primitives::Matrix;
use crate::traits::UnsupervisedEstimator;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

type Point = [f32; 2];

/// Center and membership count of one fitted cluster.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClusterSummary {
    /// Cluster id, `0..n_clusters`.
    pub id: usize,
    /// Center as (latitude, longitude).
    pub center: (f32, f32),
    /// Number of training rows assigned to the cluster.
    pub size: usize,
}

/// Deterministic K-Means clusterer for geographic coordinates.
///
/// # Algorithm
///
/// 1. Sort the distinct coordinates by (lat, lon) and seed center `i` at
///    position `i * n_distinct / k` of that list
/// 2. Assign every point to its nearest center (Euclidean, lowest id wins ties)
/// 3. Move any empty cluster's center onto the farthest point that its own
///    cluster can spare
/// 4. Recompute centers as the mean of their members
/// 5. Repeat until no center moves more than `tol` or `max_iter` is reached
///
/// When the data holds fewer distinct coordinates than the requested `k`,
/// `k` is clamped to the distinct count; [`n_clusters`](Self::n_clusters)
/// reports the effective value and
/// [`requested_clusters`](Self::requested_clusters) the configured one.
///
/// # Examples
///
/// ```
/// use georec::cluster::GeoClusterer;
///
/// let mut clusterer = GeoClusterer::new(2);
/// clusterer
///     .fit_points(&[(55.75, 37.61), (55.76, 37.62), (40.71, -74.00)])
///     .expect("fit succeeds");
///
/// assert_eq!(clusterer.n_clusters(), 2);
/// assert_eq!(clusterer.sizes().iter().sum::<usize>(), 3);
/// assert_eq!(clusterer.assign(55.70, 37.60), clusterer.assign(55.75, 37.61));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoClusterer {
    /// Requested number of clusters.
    n_clusters: usize,
    /// Maximum iterations.
    max_iter: usize,
    /// Convergence tolerance on center movement.
    tol: f32,
    /// Fitted centers, one (lat, lon) row per cluster.
    centers: Option<Matrix<f32>>,
    /// Labels for training rows.
    labels: Vec<usize>,
    /// Member count per cluster.
    sizes: Vec<usize>,
    /// Within-cluster sum of squared distances.
    inertia: f32,
    /// Number of iterations run.
    n_iter: usize,
}

impl Default for GeoClusterer {
    fn default() -> Self {
        Self::new(10)
    }
}

impl GeoClusterer {
    /// Creates a clusterer that will look for `n_clusters` groups.
    #[must_use]
    pub fn new(n_clusters: usize) -> Self {
        Self {
            n_clusters,
            max_iter: 300,
            tol: 1e-6,
            centers: None,
            labels: Vec::new(),
            sizes: Vec::new(),
            inertia: 0.0,
            n_iter: 0,
        }
    }

    /// Sets the maximum number of iterations.
    #[must_use]
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Sets the convergence tolerance.
    #[must_use]
    pub fn with_tol(mut self, tol: f32) -> Self {
        self.tol = tol;
        self
    }

    /// The configured cluster count.
    #[must_use]
    pub fn requested_clusters(&self) -> usize {
        self.n_clusters
    }

    /// The effective cluster count: the clamped `k` once fitted.
    #[must_use]
    pub fn n_clusters(&self) -> usize {
        self.centers
            .as_ref()
            .map_or(self.n_clusters, Matrix::n_rows)
    }

    /// Returns the fitted centers, if any.
    #[must_use]
    pub fn centers(&self) -> Option<&Matrix<f32>> {
        self.centers.as_ref()
    }

    /// Labels of the training rows, in input order.
    #[must_use]
    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    /// Member count per cluster.
    #[must_use]
    pub fn sizes(&self) -> &[usize] {
        &self.sizes
    }

    /// Returns the inertia (within-cluster sum of squares).
    #[must_use]
    pub fn inertia(&self) -> f32 {
        self.inertia
    }

    /// Returns the number of iterations run.
    #[must_use]
    pub fn n_iter(&self) -> usize {
        self.n_iter
    }

    /// Returns true if the model has been fitted.
    #[must_use]
    pub fn is_fitted(&self) -> bool {
        self.centers.is_some()
    }

    /// Fits on (latitude, longitude) pairs.
    ///
    /// # Errors
    ///
    /// Same as [`UnsupervisedEstimator::fit`].
    pub fn fit_points(&mut self, points: &[(f32, f32)]) -> Result<()> {
        let data: Vec<f32> = points.iter().flat_map(|&(lat, lon)| [lat, lon]).collect();
        let x = Matrix::from_vec(points.len(), 2, data)?;
        self.fit(&x)
    }

    /// Nearest fitted center for a coordinate, or `None` before `fit`.
    ///
    /// Exact distance ties resolve to the lowest cluster id.
    #[must_use]
    pub fn assign(&self, latitude: f32, longitude: f32) -> Option<usize> {
        self.centers
            .as_ref()
            .map(|centers| nearest(centers, [latitude, longitude]).0)
    }

    /// Per-cluster centers and sizes, ordered by id.
    #[must_use]
    pub fn summaries(&self) -> Vec<ClusterSummary> {
        let Some(centers) = self.centers.as_ref() else {
            return Vec::new();
        };
        (0..centers.n_rows())
            .map(|id| ClusterSummary {
                id,
                center: (centers.get(id, 0), centers.get(id, 1)),
                size: self.sizes.get(id).copied().unwrap_or(0),
            })
            .collect()
    }
}

impl UnsupervisedEstimator for GeoClusterer {
    type Labels = Vec<usize>;

    /// Fits the clusterer to an `n x 2` matrix of (lat, lon) rows.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The requested cluster count is zero
    /// - The matrix does not have exactly two columns
    /// - Data is empty
    fn fit(&mut self, x: &Matrix<f32>) -> Result<()> {
        if self.n_clusters == 0 {
            return Err(GeoRecError::invalid_hyperparameter("n_clusters", 0, ">0"));
        }
        if x.n_cols() != 2 {
            return Err(GeoRecError::dimension_mismatch("columns", 2, x.n_cols()));
        }
        if x.n_rows() == 0 {
            return Err(GeoRecError::empty_dataset("no coordinates to cluster"));
        }

        let points: Vec<Point> = (0..x.n_rows())
            .map(|i| [x.get(i, 0), x.get(i, 1)])
            .collect();

        let distinct = distinct_sorted(&points);
        let k = self.n_clusters.min(distinct.len());
        if k < self.n_clusters {
            tracing::warn!(
                requested = self.n_clusters,
                effective = k,
                "fewer distinct coordinates than clusters; clamping k"
            );
        }

        let mut centers = Matrix::from_fn(k, 2, |c, j| distinct[c * distinct.len() / k][j]);
        self.n_iter = 0;

        for iter in 0..self.max_iter {
            let mut labels = assign_all(&centers, &points);
            fill_empty_clusters(&points, &mut centers, &mut labels);

            let new_centers = update_centers(&points, &labels, &centers);
            let converged = max_shift_sq(&centers, &new_centers) <= self.tol * self.tol;

            centers = new_centers;
            self.n_iter = iter + 1;

            if converged {
                break;
            }
        }

        let mut labels = assign_all(&centers, &points);
        if fill_empty_clusters(&points, &mut centers, &mut labels) {
            let relabeled = assign_all(&centers, &points);
            if count_sizes(&relabeled, k).iter().all(|&s| s > 0) {
                labels = relabeled;
            }
        }

        self.inertia = points
            .iter()
            .zip(&labels)
            .map(|(p, &c)| centers.row_distance_sq(c, p))
            .sum();
        self.sizes = count_sizes(&labels, k);
        self.labels = labels;
        self.centers = Some(centers);

        tracing::debug!(
            clusters = k,
            iterations = self.n_iter,
            inertia = self.inertia,
            "geo clustering converged"
        );

        Ok(())
    }

    /// Predicts cluster labels for new coordinates.
    ///
    /// # Panics
    ///
    /// Panics if the model is not fitted.
    fn predict(&self, x: &Matrix<f32>) -> Vec<usize> {
        let centers = self
            .centers
            .as_ref()
            .expect("Model not fitted. Call fit() first.");

        (0..x.n_rows())
            .map(|i| nearest(centers, [x.get(i, 0), x.get(i, 1)]).0)
            .collect()
    }
}

/// Reseeds every empty cluster on the farthest point whose own cluster
/// keeps at least one member. Returns true if anything moved.
fn fill_empty_clusters(
    points: &[Point],
    centers: &mut Matrix<f32>,
    labels: &mut [usize],
) -> bool {
    let k = centers.n_rows();
    let mut sizes = count_sizes(labels, k);
    let mut claimed = vec![false; points.len()];
    let mut changed = false;

    for cluster in 0..k {
        if sizes[cluster] > 0 {
            continue;
        }

        let mut farthest: Option<(usize, f32)> = None;
        for (i, point) in points.iter().enumerate() {
            if claimed[i] || sizes[labels[i]] <= 1 {
                continue;
            }
            let dist = centers.row_distance_sq(labels[i], point);
            if farthest.map_or(true, |(_, best)| dist > best) {
                farthest = Some((i, dist));
            }
        }

        if let Some((i, _)) = farthest {
            sizes[labels[i]] -= 1;
            sizes[cluster] += 1;
            labels[i] = cluster;
            claimed[i] = true;
            centers.set(cluster, 0, points[i][0]);
            centers.set(cluster, 1, points[i][1]);
            changed = true;
        }
    }

    changed
}

fn distinct_sorted(points: &[Point]) -> Vec<Point> {
    let mut distinct = points.to_vec();
    distinct.sort_by(|a, b| a[0].total_cmp(&b[0]).then(a[1].total_cmp(&b[1])));
    distinct.dedup_by(|a, b| {
        a[0].total_cmp(&b[0]) == Ordering::Equal && a[1].total_cmp(&b[1]) == Ordering::Equal
    });
    distinct
}

/// Nearest center and its squared distance; strict `<` keeps the lowest id on ties.
fn nearest(centers: &Matrix<f32>, point: Point) -> (usize, f32) {
    let mut best = (0, f32::INFINITY);
    for c in 0..centers.n_rows() {
        let dist = centers.row_distance_sq(c, &point);
        if dist < best.1 {
            best = (c, dist);
        }
    }
    best
}

fn assign_all(centers: &Matrix<f32>, points: &[Point]) -> Vec<usize> {
    points.iter().map(|&p| nearest(centers, p).0).collect()
}

fn count_sizes(labels: &[usize], k: usize) -> Vec<usize> {
    let mut sizes = vec![0; k];
    for &label in labels {
        sizes[label] += 1;
    }
    sizes
}

/// Mean of each cluster's members; a cluster without members keeps its center.
fn update_centers(points: &[Point], labels: &[usize], previous: &Matrix<f32>) -> Matrix<f32> {
    let k = previous.n_rows();
    let mut sums = vec![[0.0_f64; 2]; k];
    let mut counts = vec![0usize; k];

    for (point, &label) in points.iter().zip(labels) {
        counts[label] += 1;
        sums[label][0] += f64::from(point[0]);
        sums[label][1] += f64::from(point[1]);
    }

    Matrix::from_fn(k, 2, |c, j| {
        if counts[c] == 0 {
            previous.get(c, j)
        } else {
            (sums[c][j] / counts[c] as f64) as f32
        }
    })
}

fn max_shift_sq(old: &Matrix<f32>, new: &Matrix<f32>) -> f32 {
    (0..old.n_rows())
        .map(|c| new.row_distance_sq(c, old.row_slice(c)))
        .fold(0.0, f32::max)
}

#[cfg(test)]
#[path = "tests_geo_contract.rs"]
mod tests_geo_contract;
