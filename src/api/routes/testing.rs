//! Test-environment blob proxy. Mounted only when `testing.enabled`.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api::routes::stats::presented;
use crate::api::state::AppState;
use crate::api::ApiError;
use crate::calculate::aggregate;
use crate::fetch::azure::{is_plain_segment, BlobClient, DivisionContext};
use crate::fetch::{parse_match_array, FetchError};
use crate::models::PlayerAggregate;

const DATA_BLOB: &str = "data.json";

#[derive(Debug, Deserialize)]
pub struct DivisionQuery {
    pub division: Option<String>,
    pub season: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BlobResponse {
    pub division: Option<String>,
    pub season: Option<String>,
    pub data: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aggregate: Option<PlayerAggregate>,
}

fn context(state: &AppState, query: DivisionQuery) -> Result<DivisionContext, ApiError> {
    DivisionContext::resolve(query.division, query.season, &state.config.testing)
        .map_err(|e| ApiError::BadRequest(e.to_string()))
}

async fn fetch_blob(
    state: &AppState,
    context: &DivisionContext,
    name: &str,
) -> Result<Value, ApiError> {
    let blobs = BlobClient::new(state.http.clone(), &state.config.testing)?;
    blobs.fetch_json(context, name).await.map_err(|e| match e {
        FetchError::HttpStatus { status: 404, .. } => {
            ApiError::NotFound(format!("Blob {}", name))
        }
        other => other.into(),
    })
}

pub async fn division_data(
    State(state): State<AppState>,
    Query(query): Query<DivisionQuery>,
) -> Result<Json<BlobResponse>, ApiError> {
    let ctx = context(&state, query)?;
    let data = fetch_blob(&state, &ctx, DATA_BLOB).await?;

    Ok(Json(BlobResponse {
        division: ctx.division,
        season: ctx.season,
        data,
        aggregate: None,
    }))
}

/// One player's blob. When it holds match records, their aggregate is
/// attached.
pub async fn player_data(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<DivisionQuery>,
) -> Result<Json<BlobResponse>, ApiError> {
    if !is_plain_segment(&id) {
        return Err(ApiError::BadRequest(format!("Invalid player id: {}", id)));
    }
    let ctx = context(&state, query)?;
    let data = fetch_blob(&state, &ctx, &format!("players/{}.json", id)).await?;

    let agg = match &data {
        Value::Array(_) => parse_match_array(data.clone())
            .ok()
            .and_then(|records| aggregate(&records))
            .map(presented),
        _ => None,
    };

    Ok(Json(BlobResponse {
        division: ctx.division,
        season: ctx.season,
        data,
        aggregate: agg,
    }))
}
