//! Geo-aware hybrid recommendation.
//!
//! Collaborative matrix factorization with biases, blended with a learned
//! per-cluster geographic signal and a cultural signal derived from rating
//! statistics.
//!
//! # Components
//!
//! - [`HybridModel`]: factor matrices, biases and the prediction function
//! - [`Trainer`]: the SGD loop producing per-epoch [`EpochRecord`]s
//! - [`GeoRecommender`]: the facade owning preprocessing, model and history
//!
//! # Quick Start
//!
//! ```
//! use georec::preprocessing::{ColumnSchema, IdCodec, RawRecord};
//! use georec::recommend::{GeoRecommender, GeoRecommenderConfig};
//!
//! let records = vec![
//!     RawRecord::rated("alice", "10.0.0.1", 55.75, 37.61, 4.5),
//!     RawRecord::rated("bob", "10.0.0.2", 40.71, -74.00, 2.0),
//!     RawRecord::rated("carol", "10.0.0.1", 48.85, 2.35, 3.5),
//!     RawRecord::rated("alice", "10.0.0.2", 55.75, 37.61, 3.0),
//! ];
//! let df = ColumnSchema::default().frame_from_records(&records).expect("valid");
//!
//! let mut rec = GeoRecommender::new(GeoRecommenderConfig::default().with_n_clusters(3));
//! rec.fit(&df).expect("fit succeeds");
//!
//! let enriched = rec.preprocess_data(&df).expect("fitted");
//! let first = &enriched.rows()[0];
//! let score = rec
//!     .predict_one(first.user_id, first.item_id, first.geo_cluster)
//!     .expect("fitted");
//! assert!(score.is_finite());
//!
//! // Unseen users fall back to the cluster-level score.
//! let cold = rec.predict_one(IdCodec::UNKNOWN, 0, first.geo_cluster).expect("fitted");
//! assert!(cold.is_finite());
//! ```

mod geo;
mod hybrid;
mod trainer;

pub use geo::{FittedState, GeoRecommender, GeoRecommenderConfig};
pub use hybrid::HybridModel;
pub use trainer::{EarlyStopping, EpochRecord, Trainer, TrainingControl};
