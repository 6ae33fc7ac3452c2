//! The geo-aware hybrid recommender facade.

use super::hybrid::HybridModel;
use super::trainer::{EarlyStopping, EpochRecord, Trainer, TrainingControl};
use crate::cluster::ClusterSummary;
use crate::data::DataFrame;
use crate::error::{GeoRecError, Result};
use crate::metrics::{mae, rmse};
use crate::preprocessing::{
    ColumnSchema, CulturalKey, CulturalTable, EnrichedRecord, EnrichedTable, IdCodec,
    Preprocessor, RawRecord,
};
use crate::primitives::Vector;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

/// Hyperparameters of a [`GeoRecommender`].
///
/// # Examples
///
/// ```
/// use georec::recommend::GeoRecommenderConfig;
///
/// let config = GeoRecommenderConfig::default()
///     .with_n_factors(16)
///     .with_geo_weight(0.5)
///     .with_cultural_features(false);
/// assert!(config.validate().is_ok());
/// assert!(config.with_n_clusters(0).validate().is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeoRecommenderConfig {
    /// Training epochs.
    pub n_epochs: usize,
    /// Latent dimension.
    pub n_factors: usize,
    /// Weight of the per-cluster geo signal.
    pub geo_weight: f32,
    /// Weight of the cultural signal.
    pub cultural_weight: f32,
    /// Derive cultural features at all.
    pub cultural_features: bool,
    /// SGD step size.
    pub learning_rate: f32,
    /// L2 penalty on factors and biases.
    pub regularization: f32,
    /// Requested number of geo clusters.
    pub n_clusters: usize,
    /// Half-width of the uniform factor initialisation.
    pub init_std: f32,
    /// Seed for factor initialisation and traversal order.
    pub random_state: u64,
    /// Log every epoch at `info`.
    pub verbose: bool,
    /// Clamp predictions to `(min, max)`.
    pub rating_bounds: Option<(f32, f32)>,
    /// Optional early stopping rule.
    pub early_stopping: Option<EarlyStopping>,
    /// Input column names.
    pub schema: ColumnSchema,
}

impl Default for GeoRecommenderConfig {
    fn default() -> Self {
        Self {
            n_epochs: 20,
            n_factors: 10,
            geo_weight: 0.3,
            cultural_weight: 0.2,
            cultural_features: true,
            learning_rate: 0.01,
            regularization: 0.02,
            n_clusters: 10,
            init_std: 0.1,
            random_state: 42,
            verbose: false,
            rating_bounds: None,
            early_stopping: None,
            schema: ColumnSchema::default(),
        }
    }
}

impl GeoRecommenderConfig {
    /// Set number of training epochs
    #[must_use]
    pub fn with_n_epochs(mut self, n_epochs: usize) -> Self {
        self.n_epochs = n_epochs;
        self
    }

    /// Set latent dimension
    #[must_use]
    pub fn with_n_factors(mut self, n_factors: usize) -> Self {
        self.n_factors = n_factors;
        self
    }

    /// Set geo signal weight
    #[must_use]
    pub fn with_geo_weight(mut self, geo_weight: f32) -> Self {
        self.geo_weight = geo_weight;
        self
    }

    /// Set cultural signal weight
    #[must_use]
    pub fn with_cultural_weight(mut self, cultural_weight: f32) -> Self {
        self.cultural_weight = cultural_weight;
        self
    }

    /// Enable or disable cultural features
    #[must_use]
    pub fn with_cultural_features(mut self, cultural_features: bool) -> Self {
        self.cultural_features = cultural_features;
        self
    }

    /// Set learning rate
    #[must_use]
    pub fn with_learning_rate(mut self, learning_rate: f32) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    /// Set regularization strength
    #[must_use]
    pub fn with_regularization(mut self, regularization: f32) -> Self {
        self.regularization = regularization;
        self
    }

    /// Set requested cluster count
    #[must_use]
    pub fn with_n_clusters(mut self, n_clusters: usize) -> Self {
        self.n_clusters = n_clusters;
        self
    }

    /// Set factor initialisation scale
    #[must_use]
    pub fn with_init_std(mut self, init_std: f32) -> Self {
        self.init_std = init_std;
        self
    }

    /// Set random seed
    #[must_use]
    pub fn with_random_state(mut self, random_state: u64) -> Self {
        self.random_state = random_state;
        self
    }

    /// Log every epoch at `info`
    #[must_use]
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Clamp predictions to `[min, max]`
    #[must_use]
    pub fn with_rating_bounds(mut self, min: f32, max: f32) -> Self {
        self.rating_bounds = Some((min, max));
        self
    }

    /// Set early stopping rule
    #[must_use]
    pub fn with_early_stopping(mut self, tol: f32, patience: usize) -> Self {
        self.early_stopping = Some(EarlyStopping::new(tol, patience));
        self
    }

    /// Set input column names
    #[must_use]
    pub fn with_schema(mut self, schema: ColumnSchema) -> Self {
        self.schema = schema;
        self
    }

    /// Checks every hyperparameter against its allowed range.
    ///
    /// # Errors
    ///
    /// Returns [`GeoRecError::InvalidHyperparameter`] naming the first bad value.
    pub fn validate(&self) -> Result<()> {
        if self.n_epochs == 0 {
            return Err(GeoRecError::invalid_hyperparameter("n_epochs", self.n_epochs, "> 0"));
        }
        if self.n_factors == 0 {
            return Err(GeoRecError::invalid_hyperparameter("n_factors", self.n_factors, "> 0"));
        }
        if self.n_clusters == 0 {
            return Err(GeoRecError::invalid_hyperparameter("n_clusters", self.n_clusters, "> 0"));
        }
        let non_negative = [
            ("geo_weight", self.geo_weight),
            ("cultural_weight", self.cultural_weight),
            ("init_std", self.init_std),
        ];
        for (param, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(GeoRecError::invalid_hyperparameter(param, value, "finite and >= 0"));
            }
        }
        let positive = [
            ("learning_rate", self.learning_rate),
            ("regularization", self.regularization),
        ];
        for (param, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(GeoRecError::invalid_hyperparameter(param, value, "finite and > 0"));
            }
        }
        if let Some((lo, hi)) = self.rating_bounds {
            if !(lo.is_finite() && hi.is_finite() && lo < hi) {
                return Err(GeoRecError::invalid_hyperparameter(
                    "rating_bounds",
                    format!("({lo}, {hi})"),
                    "finite with min < max",
                ));
            }
        }
        if let Some(rule) = self.early_stopping {
            if !rule.tol.is_finite() {
                return Err(GeoRecError::invalid_hyperparameter(
                    "early_stopping.tol",
                    rule.tol,
                    "finite",
                ));
            }
        }
        Ok(())
    }
}

/// Everything a successful fit produces, swapped in as one unit.
#[derive(Debug, Clone)]
pub struct FittedState {
    config: GeoRecommenderConfig,
    preprocessor: Preprocessor,
    model: HybridModel,
    history: Vec<EpochRecord>,
    processed: EnrichedTable,
    clusters: BTreeMap<usize, ClusterSummary>,
}

impl FittedState {
    /// Configuration the state was trained with.
    #[must_use]
    pub fn config(&self) -> &GeoRecommenderConfig {
        &self.config
    }

    /// Fitted preprocessing pipeline.
    #[must_use]
    pub fn preprocessor(&self) -> &Preprocessor {
        &self.preprocessor
    }

    /// Trained model parameters.
    #[must_use]
    pub fn model(&self) -> &HybridModel {
        &self.model
    }

    /// Per-epoch metrics.
    #[must_use]
    pub fn history(&self) -> &[EpochRecord] {
        &self.history
    }

    /// Enriched training table.
    #[must_use]
    pub fn processed(&self) -> &EnrichedTable {
        &self.processed
    }

    /// Cluster summaries keyed by id.
    #[must_use]
    pub fn clusters(&self) -> &BTreeMap<usize, ClusterSummary> {
        &self.clusters
    }
}

/// Hybrid recommender blending collaborative factors with geographic and
/// cultural signals.
///
/// Starts unfitted. A successful [`fit`](Self::fit) replaces the whole
/// fitted state at once; a failed one leaves the previous state in place.
/// Reads take `&self` and fitting takes `&mut self`, so a host sharing one
/// instance across threads can wrap it in `RwLock`, build a new state with
/// [`train`](Self::train) under a read guard and swap it in with
/// [`replace_state`](Self::replace_state) under a short write guard.
///
/// # Examples
///
/// ```
/// use georec::preprocessing::{ColumnSchema, RawRecord};
/// use georec::recommend::{GeoRecommender, GeoRecommenderConfig};
///
/// let records = vec![
///     RawRecord::rated("u1", "i1", 55.75, 37.61, 4.0),
///     RawRecord::rated("u2", "i2", 40.71, -74.00, 2.0),
///     RawRecord::rated("u3", "i1", 48.85, 2.35, 3.0),
/// ];
/// let df = ColumnSchema::default().frame_from_records(&records).expect("valid");
///
/// let mut rec = GeoRecommender::new(GeoRecommenderConfig::default().with_n_clusters(2).with_n_epochs(5));
/// rec.fit(&df).expect("fit succeeds");
///
/// assert_eq!(rec.train_history().len(), 5);
/// let score = rec.predict("u1", "i2", 55.75, 37.61).expect("fitted");
/// assert!(score.is_finite());
/// ```
#[derive(Debug, Clone, Default)]
pub struct GeoRecommender {
    config: GeoRecommenderConfig,
    state: Option<FittedState>,
}

impl GeoRecommender {
    /// Creates an unfitted recommender.
    #[must_use]
    pub fn new(config: GeoRecommenderConfig) -> Self {
        Self {
            config,
            state: None,
        }
    }

    /// Fits on a rated table, replacing any previous state on success.
    ///
    /// # Errors
    ///
    /// See [`train_with`](Self::train_with). On error the previous state is kept.
    pub fn fit(&mut self, df: &DataFrame) -> Result<()> {
        self.fit_with(df, |_| TrainingControl::Continue)
    }

    /// Like [`fit`](Self::fit), calling `on_epoch` after each epoch.
    ///
    /// # Errors
    ///
    /// See [`train_with`](Self::train_with).
    pub fn fit_with<F>(&mut self, df: &DataFrame, on_epoch: F) -> Result<()>
    where
        F: FnMut(&EpochRecord) -> TrainingControl,
    {
        let state = self.train_with(df, on_epoch)?;
        self.replace_state(state);
        Ok(())
    }

    /// Builds a fitted state without touching `self`.
    ///
    /// # Errors
    ///
    /// See [`train_with`](Self::train_with).
    pub fn train(&self, df: &DataFrame) -> Result<FittedState> {
        self.train_with(df, |_| TrainingControl::Continue)
    }

    /// Builds a fitted state, calling `on_epoch` after each epoch.
    ///
    /// # Errors
    ///
    /// - [`GeoRecError::InvalidHyperparameter`] if the configuration is invalid
    /// - [`GeoRecError::Schema`] if a required column or the rating is missing
    /// - [`GeoRecError::EmptyDataset`] if `df` has no rows
    pub fn train_with<F>(&self, df: &DataFrame, on_epoch: F) -> Result<FittedState>
    where
        F: FnMut(&EpochRecord) -> TrainingControl,
    {
        let config = &self.config;
        config.validate()?;

        let mut preprocessor = Preprocessor::new(
            config.schema.clone(),
            config.n_clusters,
            config.cultural_features,
        );
        let processed = preprocessor.fit_transform(df)?;
        let ratings = processed
            .ratings()
            .ok_or_else(|| GeoRecError::missing_column(&config.schema.rating))?;

        let n_users = preprocessor.user_codec().len();
        let n_items = preprocessor.item_codec().len();
        let n_clusters = preprocessor.clusterer().n_clusters();
        info!(
            rows = processed.len(),
            users = n_users,
            items = n_items,
            clusters = n_clusters,
            "fitting geo recommender"
        );

        let mut model = HybridModel::new(n_users, n_items, n_clusters, config.n_factors)
            .with_blend(config.geo_weight, config.cultural_weight)
            .with_rating_bounds(config.rating_bounds);
        model.set_global_bias(ratings.mean());
        model.init_factors(config.init_std, config.random_state);
        if config.cultural_features {
            let table = preprocessor.cultural_table();
            let signals: Vec<f32> = (0..n_clusters)
                .map(|c| CulturalTable::signal(&table.lookup(&CulturalKey::Cluster(c))))
                .collect();
            model.set_cluster_cultural(&signals);
        }

        let history = Trainer::new(config.n_epochs)
            .with_learning_rate(config.learning_rate)
            .with_regularization(config.regularization)
            .with_early_stopping(config.early_stopping)
            .with_random_state(config.random_state)
            .with_verbose(config.verbose)
            .train_with(&mut model, &processed, on_epoch)?;

        let clusters = preprocessor
            .clusterer()
            .summaries()
            .into_iter()
            .map(|s| (s.id, s))
            .collect();

        if let Some(last) = history.last() {
            info!(epochs = history.len(), rmse = last.rmse, mae = last.mae, "fit complete");
        }

        Ok(FittedState {
            config: config.clone(),
            preprocessor,
            model,
            history,
            processed,
            clusters,
        })
    }

    /// Installs a fitted state, returning the previous one.
    ///
    /// The facade adopts the configuration the state was trained with, so the
    /// hyperparameter accessors always describe the installed model.
    pub fn replace_state(&mut self, state: FittedState) -> Option<FittedState> {
        self.config = state.config.clone();
        self.state.replace(state)
    }

    /// The current fitted state.
    #[must_use]
    pub fn state(&self) -> Option<&FittedState> {
        self.state.as_ref()
    }

    fn fitted(&self) -> Result<&FittedState> {
        self.state.as_ref().ok_or(GeoRecError::NotFitted)
    }

    /// Encodes a table with the fitted codecs, clusters and cultural statistics.
    ///
    /// Does not change the fitted state. The rating column is optional.
    ///
    /// # Errors
    ///
    /// [`GeoRecError::NotFitted`] before a successful fit, or a schema error.
    pub fn preprocess_data(&self, df: &DataFrame) -> Result<EnrichedTable> {
        self.fitted()?.preprocessor.transform(df)
    }

    /// Scores an encoded (user, item, cluster) triple.
    ///
    /// Unknown ids (including [`IdCodec::UNKNOWN`]) fall back to the cold-start
    /// score of the cluster. The cultural term is the cluster's signal; use
    /// [`predict_record`](Self::predict_record) to score with a row's
    /// attribute-level signal, as training does.
    ///
    /// # Errors
    ///
    /// [`GeoRecError::NotFitted`] before a successful fit.
    pub fn predict_one(&self, user_id: usize, item_id: usize, geo_cluster: usize) -> Result<f32> {
        Ok(self.fitted()?.model.predict_one(user_id, item_id, geo_cluster))
    }

    /// Scores one enriched row using its own cultural vector.
    ///
    /// # Errors
    ///
    /// [`GeoRecError::NotFitted`] before a successful fit.
    pub fn predict_record(&self, record: &EnrichedRecord) -> Result<f32> {
        Ok(self.fitted()?.model.predict_with_cultural(
            record.user_id,
            record.item_id,
            record.geo_cluster,
            record.cultural.as_ref(),
        ))
    }

    /// Scores every row of an enriched table.
    ///
    /// # Errors
    ///
    /// [`GeoRecError::NotFitted`] before a successful fit.
    pub fn predict_table(&self, table: &EnrichedTable) -> Result<Vector<f32>> {
        let model = &self.fitted()?.model;
        let scores = table
            .rows()
            .iter()
            .map(|r| model.predict_with_cultural(r.user_id, r.item_id, r.geo_cluster, r.cultural.as_ref()))
            .collect();
        Ok(Vector::from_vec(scores))
    }

    /// Scores raw ids at a coordinate.
    ///
    /// # Errors
    ///
    /// [`GeoRecError::NotFitted`] before a successful fit, or an error if the
    /// coordinate is not finite.
    pub fn predict(&self, user: &str, item: &str, latitude: f32, longitude: f32) -> Result<f32> {
        let state = self.fitted()?;
        let df = state
            .preprocessor
            .schema()
            .frame_from_records(&[RawRecord::query(user, item, latitude, longitude)])?;
        let table = state.preprocessor.transform(&df)?;
        let record = table
            .row(0)
            .ok_or_else(|| GeoRecError::empty_dataset("query produced no row"))?;
        self.predict_record(record)
    }

    /// RMSE and MAE on a rated table.
    ///
    /// # Errors
    ///
    /// - [`GeoRecError::NotFitted`] before a successful fit
    /// - [`GeoRecError::EmptyDataset`] if `df` has no rows
    /// - [`GeoRecError::Schema`] if `df` has no rating column
    pub fn evaluate(&self, df: &DataFrame) -> Result<(f32, f32)> {
        let table = self.preprocess_data(df)?;
        if table.is_empty() {
            return Err(GeoRecError::empty_dataset("evaluation requires at least one row"));
        }
        let actual = table
            .ratings()
            .ok_or_else(|| GeoRecError::missing_column(&self.config.schema.rating))?;
        let predicted = self.predict_table(&table)?;
        Ok((rmse(&predicted, &actual), mae(&predicted, &actual)))
    }

    /// Per-epoch metrics of the last successful fit (empty if unfitted).
    #[must_use]
    pub fn train_history(&self) -> &[EpochRecord] {
        self.state
            .as_ref()
            .map(|s| s.history.as_slice())
            .unwrap_or_default()
    }

    /// The enriched training table of the last successful fit.
    #[must_use]
    pub fn df_processed(&self) -> Option<&EnrichedTable> {
        self.state.as_ref().map(|s| &s.processed)
    }

    /// Cluster summaries keyed by id.
    #[must_use]
    pub fn cluster_centers(&self) -> Option<&BTreeMap<usize, ClusterSummary>> {
        self.state.as_ref().map(|s| &s.clusters)
    }

    /// Fitted model parameters.
    #[must_use]
    pub fn model(&self) -> Option<&HybridModel> {
        self.state.as_ref().map(|s| &s.model)
    }

    /// User id codec.
    #[must_use]
    pub fn user_codec(&self) -> Option<&IdCodec> {
        self.state.as_ref().map(|s| s.preprocessor.user_codec())
    }

    /// Item id codec.
    #[must_use]
    pub fn item_codec(&self) -> Option<&IdCodec> {
        self.state.as_ref().map(|s| s.preprocessor.item_codec())
    }

    /// Effective cluster count (clamped to distinct coordinates), or the
    /// requested count before fitting.
    #[must_use]
    pub fn n_clusters(&self) -> usize {
        self.state
            .as_ref()
            .map_or(self.config.n_clusters, |s| s.preprocessor.clusterer().n_clusters())
    }

    /// Configured cluster count.
    #[must_use]
    pub fn requested_clusters(&self) -> usize {
        self.config.n_clusters
    }

    /// Returns true after a successful fit.
    #[must_use]
    pub fn is_fitted(&self) -> bool {
        self.state.is_some()
    }

    /// Configuration.
    #[must_use]
    pub fn config(&self) -> &GeoRecommenderConfig {
        &self.config
    }

    /// Weight of the geo signal.
    #[must_use]
    pub fn geo_weight(&self) -> f32 {
        self.config.geo_weight
    }

    /// Weight of the cultural signal.
    #[must_use]
    pub fn cultural_weight(&self) -> f32 {
        self.config.cultural_weight
    }

    /// Latent dimension.
    #[must_use]
    pub fn n_factors(&self) -> usize {
        self.config.n_factors
    }

    /// Configured epoch count.
    #[must_use]
    pub fn n_epochs(&self) -> usize {
        self.config.n_epochs
    }

    /// Whether cultural features are derived.
    #[must_use]
    pub fn cultural_features(&self) -> bool {
        self.config.cultural_features
    }
}

#[cfg(test)]
#[path = "geo_tests.rs"]
mod tests;
