//! Convenience re-exports for common usage.
//!
//! # Usage
//!
//! ```
//! use georec::prelude::*;
//! ```

pub use crate::cluster::{ClusterSummary, GeoClusterer};
pub use crate::data::{Column, DataFrame};
pub use crate::error::{GeoRecError, Result};
pub use crate::metrics::{mae, mse, rmse};
pub use crate::preprocessing::{ColumnSchema, EnrichedTable, IdCodec, Preprocessor, RawRecord};
pub use crate::primitives::{Matrix, Vector};
pub use crate::recommend::{GeoRecommender, GeoRecommenderConfig, TrainingControl};
pub use crate::traits::UnsupervisedEstimator;
