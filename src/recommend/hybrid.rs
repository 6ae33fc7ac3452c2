//! Hybrid factorization model: biased matrix factorization blended with a
//! learned per-cluster geo bias and a frozen cultural signal.

use crate::preprocessing::{CulturalTable, CulturalVector, EnrichedRecord};
use crate::primitives::{Matrix, Vector};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Latent factors, biases and blending weights.
///
/// # Prediction
///
/// ```text
/// score = global_bias + user_bias[u] + item_bias[i] + <P[u], Q[i]>
///       + geo_weight * geo_bias[c] + cultural_weight * cultural_signal
/// ```
///
/// # Cold start
///
/// If either `u` or `i` has no factor row (unseen during training, e.g.
/// [`IdCodec::UNKNOWN`](crate::preprocessing::IdCodec::UNKNOWN)), the user
/// and item terms are dropped entirely and the score is
/// `global_bias + geo_weight * geo_bias[c] + cultural_weight * signal`.
/// An unknown cluster contributes zero to both blended terms. This never
/// fails.
///
/// Scores are clamped only when rating bounds are configured.
///
/// # Examples
///
/// ```
/// use georec::recommend::HybridModel;
///
/// let mut model = HybridModel::new(2, 2, 1, 4).with_blend(0.5, 0.0);
/// model.set_global_bias(3.0);
/// assert!((model.predict_one(0, 1, 0) - 3.0).abs() < 1e-6);
/// assert!((model.predict_one(usize::MAX, 1, 0) - 3.0).abs() < 1e-6);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct HybridModel {
    user_factors: Matrix<f32>,
    item_factors: Matrix<f32>,
    user_bias: Vector<f32>,
    item_bias: Vector<f32>,
    geo_bias: Vector<f32>,
    /// Cultural signal per cluster, used when only a cluster id is known.
    cluster_cultural: Vector<f32>,
    global_bias: f32,
    geo_weight: f32,
    cultural_weight: f32,
    rating_bounds: Option<(f32, f32)>,
}

impl HybridModel {
    /// Creates a zero-initialised model.
    #[must_use]
    pub fn new(n_users: usize, n_items: usize, n_clusters: usize, n_factors: usize) -> Self {
        Self {
            user_factors: Matrix::zeros(n_users, n_factors),
            item_factors: Matrix::zeros(n_items, n_factors),
            user_bias: Vector::zeros(n_users),
            item_bias: Vector::zeros(n_items),
            geo_bias: Vector::zeros(n_clusters),
            cluster_cultural: Vector::zeros(n_clusters),
            global_bias: 0.0,
            geo_weight: 0.0,
            cultural_weight: 0.0,
            rating_bounds: None,
        }
    }

    /// Sets the geo and cultural blending weights.
    #[must_use]
    pub fn with_blend(mut self, geo_weight: f32, cultural_weight: f32) -> Self {
        self.geo_weight = geo_weight;
        self.cultural_weight = cultural_weight;
        self
    }

    /// Clamps every prediction to `[min, max]` when set.
    #[must_use]
    pub fn with_rating_bounds(mut self, bounds: Option<(f32, f32)>) -> Self {
        self.rating_bounds = bounds;
        self
    }

    /// Fills both factor matrices with `U(-init_std, init_std)` draws from a
    /// seeded generator. `init_std == 0` leaves them at zero.
    pub fn init_factors(&mut self, init_std: f32, seed: u64) {
        if init_std <= 0.0 {
            return;
        }
        let mut rng = StdRng::seed_from_u64(seed);
        let (n_users, k) = self.user_factors.shape();
        let n_items = self.item_factors.n_rows();
        self.user_factors = Matrix::from_fn(n_users, k, |_, _| rng.gen_range(-init_std..init_std));
        self.item_factors = Matrix::from_fn(n_items, k, |_, _| rng.gen_range(-init_std..init_std));
    }

    /// Sets the global bias (the training mean rating).
    pub fn set_global_bias(&mut self, bias: f32) {
        self.global_bias = bias;
    }

    /// Sets the per-cluster cultural signal used by [`predict_one`](Self::predict_one).
    ///
    /// Entries beyond the model's cluster count are ignored.
    pub fn set_cluster_cultural(&mut self, signals: &[f32]) {
        for (c, &signal) in signals.iter().enumerate().take(self.cluster_cultural.len()) {
            self.cluster_cultural[c] = signal;
        }
    }

    /// Predicts from ids alone; the cultural signal comes from the cluster.
    ///
    /// Training uses each row's own cultural vector, which is the attribute
    /// entry when the table has the attribute column. For such rows this
    /// score can differ from [`predict_with_cultural`](Self::predict_with_cultural)
    /// on the same row; the two agree when rows carry the cluster entry.
    #[must_use]
    pub fn predict_one(&self, user: usize, item: usize, geo_cluster: usize) -> f32 {
        let cultural = self.cluster_cultural.get(geo_cluster).unwrap_or(0.0);
        self.clamp(self.raw_score(user, item, geo_cluster, cultural))
    }

    /// Predicts using a record's own cultural vector (zero signal if absent).
    #[must_use]
    pub fn predict_with_cultural(
        &self,
        user: usize,
        item: usize,
        geo_cluster: usize,
        cultural: Option<&CulturalVector>,
    ) -> f32 {
        let signal = cultural.map_or(0.0, CulturalTable::signal);
        self.clamp(self.raw_score(user, item, geo_cluster, signal))
    }

    /// The cold-start score for a cluster: what any unknown user or item gets.
    #[must_use]
    pub fn cold_start_score(&self, geo_cluster: usize) -> f32 {
        self.predict_one(usize::MAX, usize::MAX, geo_cluster)
    }

    /// One SGD update on a rated row; returns the pre-update error.
    ///
    /// Both ids must be known. `geo_bias` receives the gradient scaled by
    /// `geo_weight`; the blending weights themselves stay fixed.
    pub(crate) fn sgd_step(
        &mut self,
        row: &EnrichedRecord,
        rating: f32,
        learning_rate: f32,
        regularization: f32,
    ) -> f32 {
        let (user, item, cluster) = (row.user_id, row.item_id, row.geo_cluster);
        let signal = row.cultural.as_ref().map_or(0.0, CulturalTable::signal);
        let err = rating - self.raw_score(user, item, cluster, signal);

        let bu = self.user_bias[user];
        self.user_bias[user] += learning_rate * (err - regularization * bu);
        let bi = self.item_bias[item];
        self.item_bias[item] += learning_rate * (err - regularization * bi);
        if cluster < self.geo_bias.len() {
            let bg = self.geo_bias[cluster];
            self.geo_bias[cluster] += learning_rate * (err * self.geo_weight - regularization * bg);
        }

        let p = self.user_factors.row_slice_mut(user);
        let q = self.item_factors.row_slice_mut(item);
        for (pf, qf) in p.iter_mut().zip(q.iter_mut()) {
            let (pu, qi) = (*pf, *qf);
            *pf += learning_rate * (err * qi - regularization * pu);
            *qf += learning_rate * (err * pu - regularization * qi);
        }

        err
    }

    fn raw_score(&self, user: usize, item: usize, geo_cluster: usize, cultural_signal: f32) -> f32 {
        let geo = self.geo_bias.get(geo_cluster).unwrap_or(0.0);
        let mut score = self.global_bias
            + self.geo_weight * geo
            + self.cultural_weight * cultural_signal;

        if self.is_known(user, item) {
            score += self.user_bias[user]
                + self.item_bias[item]
                + self.user_factors.row_dot(user, &self.item_factors, item);
        }

        score
    }

    fn clamp(&self, score: f32) -> f32 {
        match self.rating_bounds {
            Some((lo, hi)) => score.clamp(lo, hi),
            None => score,
        }
    }

    /// Returns true if both ids have factor rows.
    #[must_use]
    pub fn is_known(&self, user: usize, item: usize) -> bool {
        user < self.user_factors.n_rows() && item < self.item_factors.n_rows()
    }

    /// Global bias.
    #[must_use]
    pub fn global_bias(&self) -> f32 {
        self.global_bias
    }

    /// User factor matrix (`n_users x n_factors`).
    #[must_use]
    pub fn user_factors(&self) -> &Matrix<f32> {
        &self.user_factors
    }

    /// Item factor matrix (`n_items x n_factors`).
    #[must_use]
    pub fn item_factors(&self) -> &Matrix<f32> {
        &self.item_factors
    }

    /// Per-user biases.
    #[must_use]
    pub fn user_bias(&self) -> &Vector<f32> {
        &self.user_bias
    }

    /// Per-item biases.
    #[must_use]
    pub fn item_bias(&self) -> &Vector<f32> {
        &self.item_bias
    }

    /// Learned per-cluster geo signal.
    #[must_use]
    pub fn geo_bias(&self) -> &Vector<f32> {
        &self.geo_bias
    }

    /// Per-cluster cultural signal.
    #[must_use]
    pub fn cluster_cultural(&self) -> &Vector<f32> {
        &self.cluster_cultural
    }

    /// Geo blending weight.
    #[must_use]
    pub fn geo_weight(&self) -> f32 {
        self.geo_weight
    }

    /// Cultural blending weight.
    #[must_use]
    pub fn cultural_weight(&self) -> f32 {
        self.cultural_weight
    }

    /// Latent dimension.
    #[must_use]
    pub fn n_factors(&self) -> usize {
        self.user_factors.n_cols()
    }

    /// Configured rating bounds.
    #[must_use]
    pub fn rating_bounds(&self) -> Option<(f32, f32)> {
        self.rating_bounds
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preprocessing::IdCodec;

    fn row(user_id: usize, item_id: usize, geo_cluster: usize, cultural: Option<CulturalVector>) -> EnrichedRecord {
        EnrichedRecord {
            user_id,
            item_id,
            geo_cluster,
            cultural,
            rating: None,
        }
    }

    fn seeded() -> HybridModel {
        let mut model = HybridModel::new(3, 2, 2, 4).with_blend(0.5, 0.25);
        model.set_global_bias(3.0);
        model.init_factors(0.1, 7);
        model.set_cluster_cultural(&[0.4, -0.4]);
        model
    }

    #[test]
    fn test_shapes() {
        let model = seeded();
        assert_eq!(model.user_factors().shape(), (3, 4));
        assert_eq!(model.item_factors().shape(), (2, 4));
        assert_eq!(model.geo_bias().len(), 2);
        assert_eq!(model.n_factors(), 4);
    }

    #[test]
    fn test_init_is_seeded_and_bounded() {
        let a = seeded();
        let b = seeded();
        assert_eq!(a, b);
        assert!(a.user_factors().as_slice().iter().all(|x| x.abs() < 0.1));
        assert!(a.user_factors().as_slice().iter().any(|&x| x != 0.0));
    }

    #[test]
    fn test_zero_init_std_keeps_zeros() {
        let mut model = HybridModel::new(2, 2, 1, 3);
        model.init_factors(0.0, 1);
        assert!(model.user_factors().as_slice().iter().all(|&x| x == 0.0));
    }

    #[test]
    fn test_known_prediction_formula() {
        let model = seeded();
        let expected = 3.0
            + model.user_factors().row_dot(1, model.item_factors(), 0)
            + 0.25 * 0.4;
        assert!((model.predict_one(1, 0, 0) - expected).abs() < 1e-6);
    }

    #[test]
    fn test_cold_start_fallback() {
        let mut model = seeded();
        model.sgd_step(&row(0, 0, 1, Some([-0.4, 0.0, 0.0])), 5.0, 0.1, 0.0);
        let expected = model.global_bias()
            + model.geo_weight() * model.geo_bias()[1]
            + model.cultural_weight() * model.cluster_cultural()[1];
        let unseen_user = model.predict_one(IdCodec::UNKNOWN, 1, 1);
        assert!(unseen_user.is_finite());
        assert_eq!(unseen_user, expected);
        assert_eq!(model.predict_one(0, 1_000, 1), expected);
        assert_eq!(model.cold_start_score(1), expected);
    }

    #[test]
    fn test_unknown_cluster_contributes_nothing() {
        let model = seeded();
        assert!((model.cold_start_score(99) - 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_sgd_step_reduces_error() {
        let mut model = seeded();
        let before = (4.5 - model.predict_one(0, 1, 0)).abs();
        for _ in 0..50 {
            model.sgd_step(&row(0, 1, 0, None), 4.5, 0.05, 0.01);
        }
        let after = (4.5 - model.predict_one(0, 1, 0)).abs();
        assert!(after < before, "error grew: {before} -> {after}");
    }

    #[test]
    fn test_zero_geo_weight_freezes_geo_bias() {
        let mut model = HybridModel::new(1, 1, 1, 2).with_blend(0.0, 0.0);
        model.sgd_step(&row(0, 0, 0, None), 5.0, 0.1, 0.0);
        assert_eq!(model.geo_bias()[0], 0.0);
    }

    #[test]
    fn test_rating_bounds_clamp() {
        let mut model = HybridModel::new(1, 1, 1, 1).with_rating_bounds(Some((1.0, 5.0)));
        model.set_global_bias(9.0);
        assert_eq!(model.predict_one(0, 0, 0), 5.0);
        model.set_global_bias(-2.0);
        assert_eq!(model.predict_one(0, 0, 0), 1.0);
    }

    #[test]
    fn test_predict_with_cultural_vector() {
        let model = seeded();
        let v = [1.0, 0.3, 0.5];
        let with = model.predict_with_cultural(0, 0, 7, Some(&v));
        let without = model.predict_with_cultural(0, 0, 7, None);
        assert!((with - without - 0.25).abs() < 1e-6);
    }
}
