//! Search request validation.
//!
//! The gateway turns a loosely typed JSON body into a [`SearchQuery`] and
//! hands it to the record index; the index owns any query language.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use token_authz_sdk::ResourceId;

use crate::error::ApiError;

/// Upper bound on records returned by one search.
pub const SEARCH_LIMIT: usize = 10_000;

/// Body of `POST /search`.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchRequest {
    pub id: Option<IdSelector>,
    pub geo_distance: Option<GeoDistanceRequest>,
    pub time: Option<TimeRequest>,
    pub attribute: Option<AttributeRequest>,
}

/// `"id"` accepts a single identifier or a list.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum IdSelector {
    One(String),
    Many(Vec<String>),
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeoDistanceRequest {
    pub coordinates: Option<Vec<f64>>,
    pub distance: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TimeRequest {
    pub start: Option<String>,
    pub end: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AttributeRequest {
    pub term: Option<String>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub value: Option<String>,
}

/// Validated search.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchQuery {
    pub ids: Vec<ResourceId>,
    pub geo: Option<GeoDistance>,
    pub time: Option<TimeRange>,
    pub attribute: Option<AttributeFilter>,
    pub limit: usize,
}

/// Circle around `(lat, lon)`, radius in metres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GeoDistance {
    pub lat: f64,
    pub lon: f64,
    pub distance_m: f64,
}

/// Inclusive timestamp range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AttributeFilter {
    Range { term: String, min: f64, max: f64 },
    Exact { term: String, value: String },
}

impl SearchQuery {
    /// Validate a request body.
    ///
    /// `has_token` gates secure identifiers: without a token only `.public`
    /// identifiers may be searched.
    ///
    /// # Errors
    ///
    /// `BadRequest` describing the first invalid field.
    pub fn from_request(req: SearchRequest, has_token: bool) -> Result<Self, ApiError> {
        let ids = match req.id {
            None => return Err(ApiError::bad_request("No id found in body")),
            Some(IdSelector::One(id)) => vec![id],
            Some(IdSelector::Many(ids)) => ids,
        };
        if ids.is_empty() {
            return Err(ApiError::bad_request("Resource ID list is empty"));
        }
        if req.geo_distance.is_none() && req.time.is_none() && req.attribute.is_none() {
            return Err(ApiError::bad_request(
                "At least one of geo_distance, time or attribute is required",
            ));
        }

        let ids = ids
            .into_iter()
            .map(|id| {
                if id.is_empty() {
                    return Err(ApiError::bad_request("Resource ID is empty"));
                }
                let id = ResourceId::from(id);
                if !id.is_public() && !has_token {
                    return Err(ApiError::bad_request("No token found in request"));
                }
                Ok(id)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            ids,
            geo: req.geo_distance.map(GeoDistance::try_from).transpose()?,
            time: req.time.map(TimeRange::try_from).transpose()?,
            attribute: req.attribute.map(AttributeFilter::try_from).transpose()?,
            limit: SEARCH_LIMIT,
        })
    }

    /// Query for the single most recent record of `id`.
    #[must_use]
    pub fn latest(id: ResourceId) -> Self {
        Self {
            ids: vec![id],
            geo: None,
            time: None,
            attribute: None,
            limit: 1,
        }
    }
}

impl TryFrom<GeoDistanceRequest> for GeoDistance {
    type Error = ApiError;

    fn try_from(req: GeoDistanceRequest) -> Result<Self, Self::Error> {
        let (Some(coordinates), Some(distance)) = (req.coordinates, req.distance) else {
            return Err(ApiError::bad_request(
                "Geo distance does not contain coordinates and/or distance",
            ));
        };

        let Some(quantity) = distance
            .strip_suffix('m')
            .or_else(|| distance.strip_suffix('M'))
        else {
            return Err(ApiError::bad_request(
                "Only metres are supported. Use the raw query interface for other units",
            ));
        };
        let distance_m = quantity
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|d| d.is_finite() && *d >= 0.0)
            .ok_or_else(|| ApiError::bad_request("Distance is not valid."))?;

        let [lat, lon] = coordinates[..] else {
            return Err(ApiError::bad_request("Invalid coordinates"));
        };
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
            return Err(ApiError::bad_request("Invalid coordinates"));
        }

        Ok(Self {
            lat,
            lon,
            distance_m,
        })
    }
}

impl TryFrom<TimeRequest> for TimeRange {
    type Error = ApiError;

    fn try_from(req: TimeRequest) -> Result<Self, Self::Error> {
        let (Some(start), Some(end)) = (req.start, req.end) else {
            return Err(ApiError::bad_request("Start and end fields missing"));
        };
        let (Some(start), Some(end)) = (parse_timestamp(&start), parse_timestamp(&end)) else {
            return Err(ApiError::bad_request(
                "Start and/or end strings are not valid dates",
            ));
        };
        if start > end {
            return Err(ApiError::bad_request("Start is after end"));
        }
        Ok(Self { start, end })
    }
}

impl TryFrom<AttributeRequest> for AttributeFilter {
    type Error = ApiError;

    fn try_from(req: AttributeRequest) -> Result<Self, Self::Error> {
        let Some(term) = req.term.filter(|t| !t.is_empty()) else {
            return Err(ApiError::bad_request("Attribute name is missing"));
        };

        match (req.min, req.max, req.value) {
            (Some(min), Some(max), None) => Ok(Self::Range { term, min, max }),
            (None, None, Some(value)) => Ok(Self::Exact { term, value }),
            _ => Err(ApiError::bad_request("Invalid attribute query")),
        }
    }
}

/// RFC 3339 timestamp, naive ISO date-time (taken as UTC) or ISO date
/// (midnight UTC).
#[must_use]
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    if let Ok(ts) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(ts.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|ts| ts.and_utc())
}
