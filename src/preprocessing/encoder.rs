//! Identifier codec: raw string ids to dense indices.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Bijective mapping between raw identifiers and dense `0..n` indices.
///
/// Indices are handed out in first-seen order and never reclaimed. Lookups
/// of ids that were never encoded resolve to [`IdCodec::UNKNOWN`], a reserved
/// slot that has no factor row in the model.
///
/// # Examples
///
/// ```
/// use georec::preprocessing::IdCodec;
///
/// let mut codec = IdCodec::new();
/// assert_eq!(codec.encode("user123"), 0);
/// assert_eq!(codec.encode("user456"), 1);
/// assert_eq!(codec.encode("user123"), 0);
/// assert_eq!(codec.decode(1), Some("user456"));
/// assert_eq!(codec.lookup("nobody"), IdCodec::UNKNOWN);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IdCodec {
    index: HashMap<String, usize>,
    raw: Vec<String>,
}

impl IdCodec {
    /// Reserved index for identifiers unseen during training.
    pub const UNKNOWN: usize = usize::MAX;

    /// Creates an empty codec.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the index of `raw_id`, assigning the next free one if new.
    pub fn encode(&mut self, raw_id: &str) -> usize {
        if let Some(&idx) = self.index.get(raw_id) {
            return idx;
        }
        let idx = self.raw.len();
        self.index.insert(raw_id.to_string(), idx);
        self.raw.push(raw_id.to_string());
        idx
    }

    /// Returns the index of `raw_id` without growing, or [`Self::UNKNOWN`].
    #[must_use]
    pub fn lookup(&self, raw_id: &str) -> usize {
        self.index.get(raw_id).copied().unwrap_or(Self::UNKNOWN)
    }

    /// Inverse of [`encode`](Self::encode).
    #[must_use]
    pub fn decode(&self, idx: usize) -> Option<&str> {
        self.raw.get(idx).map(String::as_str)
    }

    /// Returns true if `idx` refers to an encoded identifier.
    #[must_use]
    pub fn is_known(&self, idx: usize) -> bool {
        idx < self.raw.len()
    }

    /// Number of known identifiers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.raw.len()
    }

    /// Returns true if nothing has been encoded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }
}
