use std::sync::Arc;

use axum::{Extension, Json, extract::State};
use chrono::Utc;
use tracing::info;

use crate::auth::ApiKeyContext;
use crate::error::ApiError;
use crate::models::{QuotaSnapshot, RotateResponse, UsageResponse};
use crate::state::AppState;
use crate::tiers::Tier;

// quota snapshot for the calling key; reads the table without consuming
pub async fn usage_handler(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<ApiKeyContext>,
) -> Json<UsageResponse> {
    let tier = Tier::resolve(&ctx.permissions);
    let limits = tier.limits();
    let strict_limits = limits.strict();
    let now_epoch = Utc::now().timestamp();

    let (remaining, reset_in) = state.limiter.peek(&ctx.id, limits);
    let strict_key = format!("strict_{}", ctx.id);
    let (strict_remaining, strict_reset_in) = state.limiter.peek(&strict_key, strict_limits);

    Json(UsageResponse {
        success: true,
        key_id: ctx.id,
        tier: tier.as_str().to_string(),
        general: QuotaSnapshot {
            limit: limits.points,
            remaining,
            resets_at: reset_in.map(|s| now_epoch + s as i64),
        },
        strict: QuotaSnapshot {
            limit: strict_limits.points,
            remaining: strict_remaining,
            resets_at: strict_reset_in.map(|s| now_epoch + s as i64),
        },
    })
}

// sensitive operation, sits behind the strict limiter
pub async fn rotate_key_handler(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<ApiKeyContext>,
) -> Result<Json<RotateResponse>, ApiError> {
    match state.keys.rotate(&ctx.id) {
        Some(raw) => {
            info!(key_id = %ctx.id, "api key rotated");
            Ok(Json(RotateResponse {
                success: true,
                key_id: ctx.id,
                api_key: raw,
            }))
        }
        // the record vanished between auth and rotation
        None => Err(ApiError::Internal("key record not found".to_string())),
    }
}
