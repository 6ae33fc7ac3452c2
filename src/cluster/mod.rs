//! Geographic clustering.
//!
//! Groups (latitude, longitude) pairs into spatial clusters with a
//! deterministic Lloyd-style k-means. See [`GeoClusterer`].

mod geo;

pub use geo::{ClusterSummary, GeoClusterer};
