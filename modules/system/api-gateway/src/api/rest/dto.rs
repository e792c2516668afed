use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Fields a publish body may carry; `id`, `category` and `mime-type` are
/// filled in by the gateway.
pub const PUBLISH_FIELDS: [&str; 3] = ["data", "timestamp", "coordinates"];

/// Query parameters carrying only the credential
#[derive(Debug, Default, Deserialize)]
pub struct TokenQuery {
    pub token: Option<String>,
}

/// Query parameters for `POST /publish`
#[derive(Debug, Default, Deserialize)]
pub struct PublishQuery {
    pub id: Option<String>,
    pub token: Option<String>,
}

/// Query parameters for `GET /download`
#[derive(Debug, Default, Deserialize)]
pub struct DownloadQuery {
    pub token: Option<String>,
    /// Comma-separated identifiers
    pub id: Option<String>,
}

/// Body of `POST /latest`
#[derive(Debug, Deserialize)]
pub struct LatestRequest {
    pub id: Option<String>,
}

/// Body of `POST /publish`
#[derive(Debug, Deserialize)]
pub struct PublishRequest {
    pub data: Option<Value>,
    pub timestamp: Option<String>,
    /// `[lon, lat]`
    pub coordinates: Option<[f64; 2]>,
}

/// Result of `GET /download`: where the consumer view can be fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadResponse {
    /// Directory URL of the view, e.g. `/consumer/<token>/`
    pub consumer_url: String,
    /// One URL per linked file
    pub files: Vec<String>,
}
