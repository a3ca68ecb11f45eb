use std::sync::Arc;

use axum::{Json, extract::State};

use crate::models::{GrantsResponse, MatchRequest, MatchResponse};
use crate::state::AppState;

pub async fn list_grants_handler(State(state): State<Arc<AppState>>) -> Json<GrantsResponse> {
    Json(GrantsResponse {
        success: true,
        grants: state.grants.all().to_vec(),
    })
}

pub async fn match_grants_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<MatchRequest>,
) -> Json<MatchResponse> {
    let limit = payload.limit.unwrap_or(10).min(50);
    let matches = state
        .grants
        .match_grants(&payload.description, &payload.tags, limit);

    Json(MatchResponse {
        success: true,
        matches,
    })
}
