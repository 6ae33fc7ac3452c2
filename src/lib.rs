//! Georec: a geo-aware hybrid recommender in pure Rust.
//!
//! Predicts a rating (e.g. a QoS score) for a (user, item, location) triple
//! by blending biased matrix factorization with a geographic signal learned
//! per spatial cluster and a cultural signal derived from rating statistics.
//! Users or items never seen in training fall back to a cluster-level score.
//!
//! # Quick Start
//!
//! ```
//! use georec::prelude::*;
//!
//! let records = vec![
//!     RawRecord::rated("u1", "i1", 55.75, 37.61, 4.0),
//!     RawRecord::rated("u2", "i2", 55.76, 37.62, 3.0),
//!     RawRecord::rated("u3", "i1", 40.71, -74.00, 2.0),
//! ];
//! let df = ColumnSchema::default().frame_from_records(&records).unwrap();
//!
//! let config = GeoRecommenderConfig::default()
//!     .with_n_clusters(2)
//!     .with_n_epochs(5);
//! let mut model = GeoRecommender::new(config);
//! model.fit(&df).unwrap();
//!
//! assert_eq!(model.train_history().len(), 5);
//! let sizes: usize = model.cluster_centers().unwrap().values().map(|c| c.size).sum();
//! assert_eq!(sizes, 3);
//! ```
//!
//! # Modules
//!
//! - [`primitives`]: Core Vector and Matrix types
//! - [`data`]: DataFrame for named columns
//! - [`preprocessing`]: Id codecs, cultural features and the preprocessing pipeline
//! - [`cluster`]: Geographic clustering (K-Means over coordinates)
//! - [`recommend`]: Hybrid factorization model, trainer and recommender facade
//! - [`metrics`]: Evaluation metrics
//! - [`traits`]: Estimator traits
//!
//! # Concurrency
//!
//! Nothing here locks. Reads take `&self` and `fit` takes `&mut self`; hosts
//! sharing a recommender across threads wrap it in a `RwLock`.

pub mod cluster;
pub mod data;
pub mod error;
pub mod metrics;
pub mod prelude;
pub mod preprocessing;
pub mod primitives;
pub mod recommend;
pub mod traits;

pub use error::{GeoRecError, Result};
pub use primitives::{Matrix, Vector};
pub use recommend::{GeoRecommender, GeoRecommenderConfig};
pub use traits::UnsupervisedEstimator;
