use std::sync::Arc;

use axum::Json;
use axum::extract::{Extension, Query};
use axum::http::{HeaderMap, StatusCode};
use bytes::Bytes;
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde_json::Value;
use token_authz_sdk::{RequestedSet, ResourceId, Token, TokenAuthzClient};
use tracing::{debug, field::Empty, info};

use crate::api::rest::dto::{
    DownloadQuery, DownloadResponse, LatestRequest, PUBLISH_FIELDS, PublishQuery, PublishRequest,
    TokenQuery,
};
use crate::auth::{self, AccessPlan};
use crate::error::{ApiError, ApiResult};
use crate::index::{Record, RecordIndex};
use crate::search::{self, SearchQuery, SearchRequest};

/// URL prefix under which consumer views are served.
pub const CONSUMER_PREFIX: &str = "/consumer";

const PUBLISHED_MIME_TYPE: &str = "application/json";

fn parse_body<T: DeserializeOwned>(body: &Bytes) -> ApiResult<T> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|_| ApiError::bad_request("Body is not a valid JSON"))?;
    serde_json::from_value(value).map_err(|e| ApiError::bad_request(format!("Invalid body: {e}")))
}

/// Search records, authorizing secure identifiers first
#[tracing::instrument(skip_all, fields(request_id = Empty))]
pub async fn search(
    Extension(authz): Extension<Arc<dyn TokenAuthzClient>>,
    Extension(index): Extension<Arc<dyn RecordIndex>>,
    Query(params): Query<TokenQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<Vec<Record>>> {
    let token = auth::extract_token(params.token.as_deref(), &headers);
    let request: SearchRequest = parse_body(&body)?;
    let query = SearchQuery::from_request(request, token.is_some())?;

    let records = match AccessPlan::classify(&query.ids, token) {
        AccessPlan::Public => {
            debug!(ids = query.ids.len(), "public search");
            index.search(&query).await?
        }
        AccessPlan::Secure { token, requested } => {
            debug!(ids = query.ids.len(), secure = requested.len(), "secure search");
            authz.authorize(&token, &requested).await?;
            index.secure_search(&query, &token).await?
        }
    };

    info!(hits = records.len(), "search completed");
    Ok(Json(records))
}

/// Latest record for one identifier; secure identifiers are authorized first
#[tracing::instrument(skip_all, fields(request_id = Empty))]
pub async fn latest(
    Extension(authz): Extension<Arc<dyn TokenAuthzClient>>,
    Extension(index): Extension<Arc<dyn RecordIndex>>,
    Query(params): Query<TokenQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<Vec<Record>>> {
    let request: LatestRequest = parse_body(&body)?;
    let Some(id) = request.id.filter(|id| !id.is_empty()).map(ResourceId::from) else {
        return Err(ApiError::bad_request("No id found in body"));
    };

    if !id.is_public() {
        let Some(token) = auth::extract_token(params.token.as_deref(), &headers) else {
            return Err(ApiError::bad_request("No token found in request"));
        };
        let requested: RequestedSet = std::iter::once(id.clone()).collect();
        authz.authorize(&token, &requested).await?;
    }

    let latest = index.latest(&id).await?;
    Ok(Json(latest.into_iter().collect()))
}

/// Publish one JSON record under an identifier the token may write
#[tracing::instrument(skip_all, fields(request_id = Empty))]
pub async fn publish(
    Extension(authz): Extension<Arc<dyn TokenAuthzClient>>,
    Extension(index): Extension<Arc<dyn RecordIndex>>,
    Query(params): Query<PublishQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<StatusCode> {
    let Some(id) = params.id.filter(|id| !id.is_empty()).map(ResourceId::from) else {
        return Err(ApiError::bad_request("No resource ID found in request"));
    };
    let Some(token) = auth::extract_token(params.token.as_deref(), &headers) else {
        return Err(ApiError::bad_request("No access token found in request"));
    };
    let Some(category) = id.category().filter(|c| !c.is_empty()).map(str::to_owned) else {
        return Err(ApiError::bad_request("Resource ID has no category segment"));
    };

    let record = build_record(&body, id, category)?;

    let requested: RequestedSet = std::iter::once(record.id.clone()).collect();
    authz.authorize(&token, &requested).await?;
    index.insert(record).await?;

    info!("record published");
    Ok(StatusCode::CREATED)
}

fn build_record(body: &Bytes, id: ResourceId, category: String) -> ApiResult<Record> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|_| ApiError::bad_request("Body is not a valid JSON"))?;
    let Value::Object(fields) = value else {
        return Err(ApiError::bad_request("Body is not a JSON object"));
    };
    if let Some(extra) = fields.keys().find(|k| !PUBLISH_FIELDS.contains(&k.as_str())) {
        return Err(ApiError::bad_request(format!(
            "Body contains unnecessary field '{extra}'"
        )));
    }

    let request: PublishRequest = serde_json::from_value(Value::Object(fields))
        .map_err(|e| ApiError::bad_request(format!("Invalid body: {e}")))?;
    let Some(data) = request.data else {
        return Err(ApiError::bad_request("No data field in body"));
    };
    let Value::Object(data) = data else {
        return Err(ApiError::bad_request("Data field is not a JSON object"));
    };
    let timestamp = match request.timestamp {
        None => Utc::now(),
        Some(raw) => search::parse_timestamp(&raw)
            .ok_or_else(|| ApiError::bad_request("Timestamp is not a valid date"))?,
    };

    Ok(Record {
        id,
        category,
        timestamp,
        data,
        coordinates: request.coordinates,
        mime_type: PUBLISHED_MIME_TYPE.to_owned(),
    })
}

/// Expose secure files in the token's consumer view
#[tracing::instrument(skip_all, fields(request_id = Empty))]
pub async fn download(
    Extension(authz): Extension<Arc<dyn TokenAuthzClient>>,
    Query(params): Query<DownloadQuery>,
    headers: HeaderMap,
) -> ApiResult<Json<DownloadResponse>> {
    let Some(token) = auth::extract_token(params.token.as_deref(), &headers) else {
        return Err(ApiError::bad_request("No access token found in request"));
    };
    let requested = params.id.as_deref().map(parse_id_list).transpose()?;

    let ids = if let Some(ids) = requested {
        let requested: RequestedSet = ids.iter().cloned().collect();
        authz.authorize(&token, &requested).await?;
        ids
    } else {
        let granted = authz.authorized_resources(&token).await?;
        debug!(granted = granted.len(), "bulk download skips public grants");
        granted.secure_ids()
    };

    let view = authz.materialize(&token, &ids).await?;
    info!(files = view.entries().len(), "consumer view ready");

    Ok(Json(download_response(&token, view.entries())))
}

fn parse_id_list(raw: &str) -> ApiResult<Vec<ResourceId>> {
    let ids = raw
        .split(',')
        .map(str::trim)
        .map(|id| {
            if id.is_empty() {
                return Err(ApiError::bad_request("Resource ID is empty"));
            }
            let id = ResourceId::from(id);
            if id.is_public() {
                return Err(ApiError::bad_request(
                    "This API is for secure resources only. Use /provider/public endpoint to explore public data",
                ));
            }
            Ok(id)
        })
        .collect::<ApiResult<Vec<_>>>()?;
    Ok(ids)
}

fn download_response(token: &Token, entries: &[String]) -> DownloadResponse {
    let consumer_url = format!("{CONSUMER_PREFIX}/{}/", token.expose());
    let files = entries
        .iter()
        .map(|leaf| format!("{consumer_url}{leaf}"))
        .collect();
    DownloadResponse {
        consumer_url,
        files,
    }
}
