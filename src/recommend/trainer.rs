//! SGD training loop for [`HybridModel`].

use super::hybrid::HybridModel;
use crate::error::{GeoRecError, Result};
use crate::metrics::{mae, rmse};
use crate::preprocessing::{EnrichedRecord, EnrichedTable};
use crate::primitives::Vector;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Metrics after one completed epoch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EpochRecord {
    /// Zero-based epoch index.
    pub epoch: usize,
    /// Root mean squared error over the training rows.
    pub rmse: f32,
    /// Mean absolute error over the training rows.
    pub mae: f32,
}

/// Stop once RMSE improves by less than `tol` for `patience` epochs in a row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EarlyStopping {
    /// Minimum RMSE improvement that counts as progress.
    pub tol: f32,
    /// Consecutive stalled epochs tolerated before stopping.
    pub patience: usize,
}

impl EarlyStopping {
    /// Creates an early stopping rule.
    #[must_use]
    pub fn new(tol: f32, patience: usize) -> Self {
        Self { tol, patience }
    }
}

/// Returned by the per-epoch callback of [`Trainer::train_with`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrainingControl {
    /// Keep going.
    Continue,
    /// End training after the current epoch.
    Stop,
}

/// Runs epochs of stochastic gradient descent over rated rows.
///
/// Rows are shuffled once with the seeded generator and visited in that
/// same order every epoch, so two runs with the same seed and data produce
/// the same model and history.
#[derive(Debug, Clone, PartialEq)]
pub struct Trainer {
    n_epochs: usize,
    learning_rate: f32,
    regularization: f32,
    early_stopping: Option<EarlyStopping>,
    random_state: u64,
    verbose: bool,
}

impl Trainer {
    /// Creates a trainer for `n_epochs` epochs.
    #[must_use]
    pub fn new(n_epochs: usize) -> Self {
        Self {
            n_epochs,
            learning_rate: 0.01,
            regularization: 0.02,
            early_stopping: None,
            random_state: 42,
            verbose: false,
        }
    }

    /// Set learning rate
    #[must_use]
    pub fn with_learning_rate(mut self, learning_rate: f32) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    /// Set L2 regularization strength
    #[must_use]
    pub fn with_regularization(mut self, regularization: f32) -> Self {
        self.regularization = regularization;
        self
    }

    /// Set early stopping rule
    #[must_use]
    pub fn with_early_stopping(mut self, early_stopping: Option<EarlyStopping>) -> Self {
        self.early_stopping = early_stopping;
        self
    }

    /// Set random seed for the traversal order
    #[must_use]
    pub fn with_random_state(mut self, random_state: u64) -> Self {
        self.random_state = random_state;
        self
    }

    /// Log per-epoch progress at `info` instead of `debug`
    #[must_use]
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Configured epoch count.
    #[must_use]
    pub fn n_epochs(&self) -> usize {
        self.n_epochs
    }

    /// Trains for the configured number of epochs.
    ///
    /// # Errors
    ///
    /// See [`train_with`](Self::train_with).
    pub fn train(&self, model: &mut HybridModel, table: &EnrichedTable) -> Result<Vec<EpochRecord>> {
        self.train_with(model, table, |_| TrainingControl::Continue)
    }

    /// Trains, calling `on_epoch` after every completed epoch.
    ///
    /// Returns one record per completed epoch, in order.
    ///
    /// # Errors
    ///
    /// - [`GeoRecError::EmptyDataset`] if `table` has no rows
    /// - [`GeoRecError::Other`] if a row has no rating or an unknown id
    pub fn train_with<F>(
        &self,
        model: &mut HybridModel,
        table: &EnrichedTable,
        mut on_epoch: F,
    ) -> Result<Vec<EpochRecord>>
    where
        F: FnMut(&EpochRecord) -> TrainingControl,
    {
        if table.is_empty() {
            return Err(GeoRecError::empty_dataset("training requires at least one rated row"));
        }
        let rows = table.rows();
        let actual = training_ratings(model, rows)?;

        let mut order: Vec<usize> = (0..rows.len()).collect();
        let mut rng = StdRng::seed_from_u64(self.random_state);
        order.shuffle(&mut rng);

        let mut history: Vec<EpochRecord> = Vec::with_capacity(self.n_epochs);
        let mut stalled = 0usize;

        for epoch in 0..self.n_epochs {
            for &idx in &order {
                model.sgd_step(&rows[idx], actual[idx], self.learning_rate, self.regularization);
            }

            let record = evaluate_rows(model, rows, &actual, epoch);
            if self.verbose {
                info!(epoch, rmse = record.rmse, mae = record.mae, "epoch complete");
            } else {
                debug!(epoch, rmse = record.rmse, mae = record.mae, "epoch complete");
            }

            if let (Some(rule), Some(prev)) = (self.early_stopping, history.last()) {
                if prev.rmse - record.rmse < rule.tol {
                    stalled += 1;
                } else {
                    stalled = 0;
                }
            }
            history.push(record);

            if let Some(rule) = self.early_stopping {
                if rule.patience > 0 && stalled >= rule.patience {
                    info!(epoch, rmse = record.rmse, "early stopping");
                    break;
                }
            }
            if on_epoch(&record) == TrainingControl::Stop {
                info!(epoch, "training stopped by callback");
                break;
            }
        }

        Ok(history)
    }
}

fn training_ratings(model: &HybridModel, rows: &[EnrichedRecord]) -> Result<Vector<f32>> {
    let mut ratings = Vec::with_capacity(rows.len());
    for (i, row) in rows.iter().enumerate() {
        let rating = row
            .rating
            .ok_or_else(|| GeoRecError::Other(format!("training row {i} has no rating")))?;
        if !model.is_known(row.user_id, row.item_id) {
            return Err(GeoRecError::Other(format!(
                "training row {i} references an id without a factor row"
            )));
        }
        ratings.push(rating);
    }
    Ok(Vector::from_vec(ratings))
}

fn evaluate_rows(
    model: &HybridModel,
    rows: &[EnrichedRecord],
    actual: &Vector<f32>,
    epoch: usize,
) -> EpochRecord {
    let predicted: Vec<f32> = rows
        .iter()
        .map(|row| {
            model.predict_with_cultural(row.user_id, row.item_id, row.geo_cluster, row.cultural.as_ref())
        })
        .collect();
    let predicted = Vector::from_vec(predicted);
    EpochRecord {
        epoch,
        rmse: rmse(&predicted, actual),
        mae: mae(&predicted, actual),
    }
}

#[cfg(test)]
#[path = "trainer_tests.rs"]
mod tests;
