//! Data preprocessing for the recommender.
//!
//! - [`IdCodec`]: raw user/item identifiers to dense indices
//! - [`CulturalTable`]: frozen per-group cultural feature vectors
//! - [`Preprocessor`]: codecs + geo clustering + cultural features, producing
//!   an [`EnrichedTable`]

pub mod cultural;
pub mod encoder;
pub mod pipeline;

pub use cultural::{CulturalKey, CulturalTable, CulturalVector, CULTURAL_DIM, CULTURAL_FEATURES};
pub use encoder::IdCodec;
pub use pipeline::{ColumnSchema, EnrichedRecord, EnrichedTable, Preprocessor, RawRecord};
