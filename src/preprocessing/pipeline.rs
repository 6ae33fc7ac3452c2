//! Preprocessing pipeline: raw table to enriched table.

use super::cultural::{CulturalTable, CulturalVector, CULTURAL_FEATURES};
use super::encoder::IdCodec;
use crate::cluster::GeoClusterer;
use crate::data::{Column, DataFrame};
use crate::error::{GeoRecError, Result};
use crate::primitives::Vector;
use serde::{Deserialize, Serialize};

/// Names of the input columns the pipeline reads.
///
/// Defaults follow the QoS dataset layout (`[User ID]`, `[IP No.]`, ...).
///
/// # Examples
///
/// ```
/// use georec::preprocessing::ColumnSchema;
///
/// let schema = ColumnSchema::default().with_rating("[Response Time]");
/// assert_eq!(schema.user, "[User ID]");
/// assert_eq!(schema.rating, "[Response Time]");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnSchema {
    /// Raw user identifier column (text).
    pub user: String,
    /// Raw item identifier column (text).
    pub item: String,
    /// Latitude column (numeric).
    pub latitude: String,
    /// Longitude column (numeric).
    pub longitude: String,
    /// Rating column (numeric), required for training only.
    pub rating: String,
    /// Optional cultural attribute column (text), used when present.
    pub cultural_attribute: Option<String>,
}

impl Default for ColumnSchema {
    fn default() -> Self {
        Self {
            user: "[User ID]".to_string(),
            item: "[IP No.]".to_string(),
            latitude: "[Latitude]".to_string(),
            longitude: "[Longitude]".to_string(),
            rating: "[Rating]".to_string(),
            cultural_attribute: Some("[Country]".to_string()),
        }
    }
}

impl ColumnSchema {
    /// Sets the rating column name.
    #[must_use]
    pub fn with_rating(mut self, name: &str) -> Self {
        self.rating = name.to_string();
        self
    }

    /// Sets (or clears) the cultural attribute column name.
    #[must_use]
    pub fn with_cultural_attribute(mut self, name: Option<&str>) -> Self {
        self.cultural_attribute = name.map(str::to_string);
        self
    }

    /// Builds an input table from in-memory records.
    ///
    /// The rating column is emitted only if every record has a rating, and
    /// the attribute column only if the schema names one and every record
    /// has a value for it.
    ///
    /// # Errors
    ///
    /// Returns an error if some but not all records carry a rating.
    pub fn frame_from_records(&self, records: &[RawRecord]) -> Result<DataFrame> {
        let mut columns = vec![
            (
                self.user.clone(),
                Column::Text(records.iter().map(|r| r.user.clone()).collect()),
            ),
            (
                self.item.clone(),
                Column::Text(records.iter().map(|r| r.item.clone()).collect()),
            ),
            (
                self.latitude.clone(),
                Column::Numeric(Vector::from_vec(records.iter().map(|r| r.latitude).collect())),
            ),
            (
                self.longitude.clone(),
                Column::Numeric(Vector::from_vec(records.iter().map(|r| r.longitude).collect())),
            ),
        ];

        let ratings: Option<Vec<f32>> = records.iter().map(|r| r.rating).collect();
        match ratings {
            Some(ratings) if !records.is_empty() => columns.push((
                self.rating.clone(),
                Column::Numeric(Vector::from_vec(ratings)),
            )),
            _ if records.iter().any(|r| r.rating.is_some()) => {
                return Err("either every record or no record must carry a rating".into());
            }
            _ => {}
        }

        if let Some(name) = &self.cultural_attribute {
            let attributes: Option<Vec<String>> =
                records.iter().map(|r| r.attribute.clone()).collect();
            if let Some(attributes) = attributes.filter(|a| !a.is_empty()) {
                columns.push((name.clone(), Column::Text(attributes)));
            }
        }

        DataFrame::new(columns)
    }
}

/// One raw input row, for building tables in memory.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    /// Raw user id.
    pub user: String,
    /// Raw item id.
    pub item: String,
    /// Latitude in degrees.
    pub latitude: f32,
    /// Longitude in degrees.
    pub longitude: f32,
    /// Observed rating, absent for pure prediction input.
    pub rating: Option<f32>,
    /// Cultural attribute value (e.g. country code).
    pub attribute: Option<String>,
}

impl RawRecord {
    /// A rated observation.
    #[must_use]
    pub fn rated(user: &str, item: &str, latitude: f32, longitude: f32, rating: f32) -> Self {
        Self {
            user: user.to_string(),
            item: item.to_string(),
            latitude,
            longitude,
            rating: Some(rating),
            attribute: None,
        }
    }

    /// An unrated query row.
    #[must_use]
    pub fn query(user: &str, item: &str, latitude: f32, longitude: f32) -> Self {
        Self {
            user: user.to_string(),
            item: item.to_string(),
            latitude,
            longitude,
            rating: None,
            attribute: None,
        }
    }

    /// Attaches a cultural attribute.
    #[must_use]
    pub fn with_attribute(mut self, attribute: &str) -> Self {
        self.attribute = Some(attribute.to_string());
        self
    }
}

/// One preprocessed row.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedRecord {
    /// Dense user index, or [`IdCodec::UNKNOWN`].
    pub user_id: usize,
    /// Dense item index, or [`IdCodec::UNKNOWN`].
    pub item_id: usize,
    /// Assigned geo cluster.
    pub geo_cluster: usize,
    /// Cultural features, present only when the capability is enabled.
    pub cultural: Option<CulturalVector>,
    /// Observed rating, if the input had one.
    pub rating: Option<f32>,
}

/// Preprocessed rows plus the explicit list of cultural feature columns.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EnrichedTable {
    rows: Vec<EnrichedRecord>,
    cultural_keys: Vec<String>,
}

impl EnrichedTable {
    /// Rows in input order.
    #[must_use]
    pub fn rows(&self) -> &[EnrichedRecord] {
        &self.rows
    }

    /// Row at `idx`.
    #[must_use]
    pub fn row(&self, idx: usize) -> Option<&EnrichedRecord> {
        self.rows.get(idx)
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if the table has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Names of the cultural feature columns, empty when disabled.
    #[must_use]
    pub fn cultural_keys(&self) -> &[String] {
        &self.cultural_keys
    }

    /// Returns true if every row carries a rating.
    #[must_use]
    pub fn has_ratings(&self) -> bool {
        !self.rows.is_empty() && self.rows.iter().all(|r| r.rating.is_some())
    }

    /// The `rating` column, if every row has one.
    #[must_use]
    pub fn ratings(&self) -> Option<Vector<f32>> {
        let ratings: Option<Vec<f32>> = self.rows.iter().map(|r| r.rating).collect();
        ratings.filter(|r| !r.is_empty()).map(Vector::from_vec)
    }

    /// Column names of [`to_frame`](Self::to_frame), in order.
    #[must_use]
    pub fn column_names(&self) -> Vec<String> {
        let mut names = vec![
            "user_id".to_string(),
            "item_id".to_string(),
            "geo_cluster".to_string(),
        ];
        names.extend(self.cultural_keys.iter().cloned());
        if self.has_ratings() {
            names.push("rating".to_string());
        }
        names
    }

    /// Numeric `DataFrame` view: `user_id`, `item_id`, `geo_cluster`, the
    /// cultural columns and `rating` (if present). Unknown ids are written
    /// as `-1`.
    ///
    /// # Errors
    ///
    /// Returns an error if the table is empty.
    pub fn to_frame(&self) -> Result<DataFrame> {
        if self.rows.is_empty() {
            return Err(GeoRecError::empty_dataset("enriched table has no rows"));
        }

        let rows = &self.rows;
        let mut columns = vec![
            ("user_id".to_string(), numeric(rows, |r| encoded_index(r.user_id))),
            ("item_id".to_string(), numeric(rows, |r| encoded_index(r.item_id))),
            ("geo_cluster".to_string(), numeric(rows, |r| r.geo_cluster as f32)),
        ];
        for (j, name) in self.cultural_keys.iter().enumerate() {
            columns.push((
                name.clone(),
                numeric(rows, |r| r.cultural.map_or(0.0, |v| v[j])),
            ));
        }
        if let Some(ratings) = self.ratings() {
            columns.push(("rating".to_string(), Column::Numeric(ratings)));
        }

        DataFrame::new(columns)
    }
}

fn encoded_index(idx: usize) -> f32 {
    if idx == IdCodec::UNKNOWN {
        -1.0
    } else {
        idx as f32
    }
}

fn numeric(rows: &[EnrichedRecord], f: impl Fn(&EnrichedRecord) -> f32) -> Column {
    Column::Numeric(Vector::from_vec(rows.iter().map(f).collect()))
}

/// Borrowed views of the input columns.
struct RawColumns<'a> {
    users: &'a [String],
    items: &'a [String],
    latitudes: &'a Vector<f32>,
    longitudes: &'a Vector<f32>,
    ratings: Option<&'a Vector<f32>>,
    attributes: Option<&'a [String]>,
}

/// Identifier codecs, geo clusterer and cultural table, fitted together.
///
/// # Examples
///
/// ```
/// use georec::preprocessing::{ColumnSchema, Preprocessor, RawRecord};
///
/// let schema = ColumnSchema::default();
/// let train = schema
///     .frame_from_records(&[
///         RawRecord::rated("u1", "i1", 55.75, 37.61, 4.0),
///         RawRecord::rated("u2", "i1", 40.71, -74.00, 2.0),
///     ])
///     .expect("valid records");
///
/// let mut pipeline = Preprocessor::new(schema.clone(), 2, true);
/// let enriched = pipeline.fit_transform(&train).expect("fit succeeds");
/// assert_eq!(enriched.len(), 2);
/// assert_eq!(enriched.cultural_keys().len(), 3);
/// ```
#[derive(Debug, Clone)]
pub struct Preprocessor {
    schema: ColumnSchema,
    cultural_features: bool,
    users: IdCodec,
    items: IdCodec,
    clusterer: GeoClusterer,
    cultural: CulturalTable,
}

impl Preprocessor {
    /// Creates an unfitted pipeline.
    #[must_use]
    pub fn new(schema: ColumnSchema, n_clusters: usize, cultural_features: bool) -> Self {
        Self {
            schema,
            cultural_features,
            users: IdCodec::new(),
            items: IdCodec::new(),
            clusterer: GeoClusterer::new(n_clusters),
            cultural: CulturalTable::default(),
        }
    }

    /// Runs the pipeline in training (`true`) or inference (`false`) mode.
    ///
    /// # Errors
    ///
    /// See [`fit_transform`](Self::fit_transform) and
    /// [`transform`](Self::transform).
    pub fn preprocess(&mut self, df: &DataFrame, training: bool) -> Result<EnrichedTable> {
        if training {
            self.fit_transform(df)
        } else {
            self.transform(df)
        }
    }

    /// Rebuilds codecs, clusters and cultural statistics from `df` and
    /// returns its enriched rows. Nothing is replaced if this fails.
    ///
    /// # Errors
    ///
    /// - [`GeoRecError::Schema`] if a required column (including the rating) is missing
    /// - [`GeoRecError::EmptyDataset`] if `df` has no rows
    /// - an error if a coordinate or rating is not finite
    pub fn fit_transform(&mut self, df: &DataFrame) -> Result<EnrichedTable> {
        let raw = self.read_columns(df, true)?;
        if df.n_rows() == 0 {
            return Err(GeoRecError::empty_dataset("fit requires at least one row"));
        }
        let ratings = raw
            .ratings
            .ok_or_else(|| GeoRecError::missing_column(&self.schema.rating))?;

        let mut users = IdCodec::new();
        let mut items = IdCodec::new();
        let user_ids: Vec<usize> = raw.users.iter().map(|u| users.encode(u)).collect();
        let item_ids: Vec<usize> = raw.items.iter().map(|i| items.encode(i)).collect();

        let points: Vec<(f32, f32)> = raw
            .latitudes
            .as_slice()
            .iter()
            .copied()
            .zip(raw.longitudes.as_slice().iter().copied())
            .collect();
        let mut clusterer = GeoClusterer::new(self.clusterer.requested_clusters());
        clusterer.fit_points(&points)?;
        let clusters = clusterer.labels().to_vec();

        let cultural = if self.cultural_features {
            CulturalTable::fit(&clusters, raw.attributes, ratings.as_slice())
        } else {
            CulturalTable::default()
        };

        let rows = (0..df.n_rows())
            .map(|i| EnrichedRecord {
                user_id: user_ids[i],
                item_id: item_ids[i],
                geo_cluster: clusters[i],
                cultural: self.cultural_features.then(|| {
                    cultural.extract(clusters[i], raw.attributes.map(|a| a[i].as_str()))
                }),
                rating: Some(ratings[i]),
            })
            .collect();

        self.users = users;
        self.items = items;
        self.clusterer = clusterer;
        self.cultural = cultural;

        Ok(EnrichedTable {
            rows,
            cultural_keys: self.cultural_keys(),
        })
    }

    /// Encodes `df` with the fitted state without changing it.
    ///
    /// Unseen ids map to [`IdCodec::UNKNOWN`]; coordinates go to the nearest
    /// fitted center. The rating column is carried through when present.
    ///
    /// # Errors
    ///
    /// - [`GeoRecError::Schema`] if a required column is missing
    /// - [`GeoRecError::NotFitted`] before a successful `fit_transform`
    /// - an error if a coordinate is not finite
    pub fn transform(&self, df: &DataFrame) -> Result<EnrichedTable> {
        let raw = self.read_columns(df, false)?;
        if !self.clusterer.is_fitted() {
            return Err(GeoRecError::NotFitted);
        }

        let mut rows = Vec::with_capacity(df.n_rows());
        for i in 0..df.n_rows() {
            let geo_cluster = self
                .clusterer
                .assign(raw.latitudes[i], raw.longitudes[i])
                .ok_or(GeoRecError::NotFitted)?;
            rows.push(EnrichedRecord {
                user_id: self.users.lookup(&raw.users[i]),
                item_id: self.items.lookup(&raw.items[i]),
                geo_cluster,
                cultural: self.cultural_features.then(|| {
                    self.cultural
                        .extract(geo_cluster, raw.attributes.map(|a| a[i].as_str()))
                }),
                rating: raw.ratings.map(|r| r[i]),
            });
        }

        Ok(EnrichedTable {
            rows,
            cultural_keys: self.cultural_keys(),
        })
    }

    /// Names of the cultural feature columns this pipeline emits.
    #[must_use]
    pub fn cultural_keys(&self) -> Vec<String> {
        if self.cultural_features {
            CULTURAL_FEATURES.iter().map(|s| (*s).to_string()).collect()
        } else {
            Vec::new()
        }
    }

    /// Input column names.
    #[must_use]
    pub fn schema(&self) -> &ColumnSchema {
        &self.schema
    }

    /// Whether cultural features are produced.
    #[must_use]
    pub fn cultural_features(&self) -> bool {
        self.cultural_features
    }

    /// User id codec.
    #[must_use]
    pub fn user_codec(&self) -> &IdCodec {
        &self.users
    }

    /// Item id codec.
    #[must_use]
    pub fn item_codec(&self) -> &IdCodec {
        &self.items
    }

    /// Fitted geo clusterer.
    #[must_use]
    pub fn clusterer(&self) -> &GeoClusterer {
        &self.clusterer
    }

    /// Frozen cultural statistics.
    #[must_use]
    pub fn cultural_table(&self) -> &CulturalTable {
        &self.cultural
    }

    fn read_columns<'a>(&self, df: &'a DataFrame, training: bool) -> Result<RawColumns<'a>> {
        let schema = &self.schema;
        let mut required = vec![
            schema.user.as_str(),
            schema.item.as_str(),
            schema.latitude.as_str(),
            schema.longitude.as_str(),
        ];
        if training {
            required.push(schema.rating.as_str());
        }
        if let Some(missing) = required.into_iter().find(|c| !df.has_column(c)) {
            return Err(GeoRecError::missing_column(missing));
        }

        let raw = RawColumns {
            users: df.text_column(&schema.user)?,
            items: df.text_column(&schema.item)?,
            latitudes: df.numeric_column(&schema.latitude)?,
            longitudes: df.numeric_column(&schema.longitude)?,
            ratings: if df.has_column(&schema.rating) {
                Some(df.numeric_column(&schema.rating)?)
            } else {
                None
            },
            attributes: match &schema.cultural_attribute {
                Some(name) if df.has_column(name) => Some(df.text_column(name)?),
                _ => None,
            },
        };

        for i in 0..df.n_rows() {
            if !raw.latitudes[i].is_finite() || !raw.longitudes[i].is_finite() {
                return Err(format!("non-finite coordinate at row {i}").into());
            }
        }
        if training {
            if let Some(ratings) = raw.ratings {
                if let Some(i) = ratings.as_slice().iter().position(|r| !r.is_finite()) {
                    return Err(format!("non-finite rating at row {i}").into());
                }
            }
        }

        Ok(raw)
    }
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
