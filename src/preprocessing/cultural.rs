//! Cultural feature extraction.
//!
//! Every record gets a fixed-width vector of rating statistics for the group
//! it belongs to: its cultural attribute (e.g. country) when the dataset
//! carries one, otherwise its geo cluster. Statistics are computed once from
//! the training ratings and frozen afterwards.

use std::collections::BTreeMap;

/// Width of a cultural feature vector.
pub const CULTURAL_DIM: usize = 3;

/// Column names of the cultural features, in vector order.
///
/// - `cultural_rating_offset`: group mean rating minus the global mean
/// - `cultural_rating_spread`: standard deviation of the group's ratings
/// - `cultural_share`: fraction of training rows in the group
pub const CULTURAL_FEATURES: [&str; CULTURAL_DIM] = [
    "cultural_rating_offset",
    "cultural_rating_spread",
    "cultural_share",
];

/// A fixed-width cultural feature vector.
pub type CulturalVector = [f32; CULTURAL_DIM];

/// Grouping key of a cultural statistic.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CulturalKey {
    /// Geo cluster id.
    Cluster(usize),
    /// Raw cultural attribute value from the dataset.
    Attribute(String),
}

/// Frozen per-key cultural statistics.
///
/// # Examples
///
/// ```
/// use georec::preprocessing::{CulturalKey, CulturalTable};
///
/// let table = CulturalTable::fit(&[0, 0, 1], None, &[4.0, 2.0, 3.0]);
/// let v = table.lookup(&CulturalKey::Cluster(0));
/// assert!(v[0].abs() < 1e-6); // cluster mean 3.0 == global mean 3.0
/// assert_eq!(table.lookup(&CulturalKey::Cluster(9)), [0.0; 3]);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CulturalTable {
    features: BTreeMap<CulturalKey, CulturalVector>,
}

#[derive(Default)]
struct Accumulator {
    count: usize,
    sum: f64,
    sum_sq: f64,
}

impl CulturalTable {
    /// Builds the table from the training rows.
    ///
    /// `clusters` and `ratings` are parallel; `attributes`, when given, must be
    /// parallel too. Cluster keys are always produced so that lookups by
    /// cluster id alone work at prediction time.
    #[must_use]
    pub fn fit(clusters: &[usize], attributes: Option<&[String]>, ratings: &[f32]) -> Self {
        let n = ratings.len();
        if n == 0 {
            return Self::default();
        }

        let global_mean = ratings.iter().map(|&r| f64::from(r)).sum::<f64>() / n as f64;
        let mut groups: BTreeMap<CulturalKey, Accumulator> = BTreeMap::new();

        for (i, &rating) in ratings.iter().enumerate() {
            let rating = f64::from(rating);
            let mut keys = vec![CulturalKey::Cluster(clusters[i])];
            if let Some(attrs) = attributes {
                keys.push(CulturalKey::Attribute(attrs[i].clone()));
            }
            for key in keys {
                let acc = groups.entry(key).or_default();
                acc.count += 1;
                acc.sum += rating;
                acc.sum_sq += rating * rating;
            }
        }

        let features = groups
            .into_iter()
            .map(|(key, acc)| {
                let count = acc.count as f64;
                let mean = acc.sum / count;
                let variance = (acc.sum_sq / count - mean * mean).max(0.0);
                let vector = [
                    (mean - global_mean) as f32,
                    variance.sqrt() as f32,
                    (count / n as f64) as f32,
                ];
                (key, vector)
            })
            .collect();

        Self { features }
    }

    /// Feature vector for a key, zeros if the key was never seen.
    #[must_use]
    pub fn lookup(&self, key: &CulturalKey) -> CulturalVector {
        self.features.get(key).copied().unwrap_or([0.0; CULTURAL_DIM])
    }

    /// Feature vector for a record: its attribute entry if known, else its
    /// cluster entry, else zeros.
    #[must_use]
    pub fn extract(&self, cluster: usize, attribute: Option<&str>) -> CulturalVector {
        if let Some(vector) = attribute
            .and_then(|a| self.features.get(&CulturalKey::Attribute(a.to_string())))
        {
            return *vector;
        }
        self.lookup(&CulturalKey::Cluster(cluster))
    }

    /// Scalar summary blended into predictions: the rating offset.
    #[must_use]
    pub fn signal(vector: &CulturalVector) -> f32 {
        vector[0]
    }

    /// Number of keys in the table.
    #[must_use]
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Returns true if the table holds no statistics.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Iterates keys in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &CulturalKey> {
        self.features.keys()
    }
}
