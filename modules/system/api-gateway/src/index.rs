//! Record index collaborator.
//!
//! The gateway only needs four calls from the search backend; the query
//! language and wire format belong to the implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use token_authz_sdk::{ResourceId, Token};

use crate::search::{AttributeFilter, GeoDistance, SearchQuery, TimeRange};

const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// One published data point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: ResourceId,
    pub category: String,
    pub timestamp: DateTime<Utc>,
    pub data: Map<String, Value>,
    /// `[lon, lat]`, as published.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<[f64; 2]>,
    #[serde(rename = "mime-type")]
    pub mime_type: String,
}

#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("index unavailable: {0}")]
    Unavailable(String),
}

/// Search and storage backend for records.
#[async_trait]
pub trait RecordIndex: Send + Sync {
    /// Search public data.
    async fn search(&self, query: &SearchQuery) -> Result<Vec<Record>, IndexError>;

    /// Search on behalf of an already-authorized token.
    async fn secure_search(
        &self,
        query: &SearchQuery,
        token: &Token,
    ) -> Result<Vec<Record>, IndexError>;

    /// Most recent record for `id`.
    async fn latest(&self, id: &ResourceId) -> Result<Option<Record>, IndexError>;

    async fn insert(&self, record: Record) -> Result<(), IndexError>;
}

/// Process-local index, newest records first.
#[derive(Default)]
pub struct InMemoryRecordIndex {
    records: RwLock<Vec<Record>>,
}

impl InMemoryRecordIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    fn query(&self, query: &SearchQuery) -> Vec<Record> {
        let mut hits: Vec<Record> = self
            .records
            .read()
            .iter()
            .filter(|r| matches(r, query))
            .cloned()
            .collect();
        hits.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        hits.truncate(query.limit);
        hits
    }
}

#[async_trait]
impl RecordIndex for InMemoryRecordIndex {
    async fn search(&self, query: &SearchQuery) -> Result<Vec<Record>, IndexError> {
        Ok(self.query(query))
    }

    async fn secure_search(
        &self,
        query: &SearchQuery,
        _token: &Token,
    ) -> Result<Vec<Record>, IndexError> {
        Ok(self.query(query))
    }

    async fn latest(&self, id: &ResourceId) -> Result<Option<Record>, IndexError> {
        Ok(self.query(&SearchQuery::latest(id.clone())).into_iter().next())
    }

    async fn insert(&self, record: Record) -> Result<(), IndexError> {
        self.records.write().push(record);
        Ok(())
    }
}

fn matches(record: &Record, query: &SearchQuery) -> bool {
    query.ids.contains(&record.id)
        && query.geo.is_none_or(|geo| within(record, geo))
        && query.time.is_none_or(|time| in_range(record, time))
        && query
            .attribute
            .as_ref()
            .is_none_or(|attribute| attribute_matches(record, attribute))
}

fn within(record: &Record, geo: GeoDistance) -> bool {
    record
        .coordinates
        .is_some_and(|[lon, lat]| haversine_m(geo.lat, geo.lon, lat, lon) <= geo.distance_m)
}

fn in_range(record: &Record, time: TimeRange) -> bool {
    time.start <= record.timestamp && record.timestamp <= time.end
}

fn attribute_matches(record: &Record, attribute: &AttributeFilter) -> bool {
    match attribute {
        AttributeFilter::Range { term, min, max } => record
            .data
            .get(term)
            .and_then(Value::as_f64)
            .is_some_and(|v| *min <= v && v <= *max),
        AttributeFilter::Exact { term, value } => {
            record.data.get(term).and_then(Value::as_str) == Some(value.as_str())
        }
    }
}

fn haversine_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let (phi1, phi2) = (lat1.to_radians(), lat2.to_radians());
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lon2 - lon1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * a.sqrt().asin()
}
