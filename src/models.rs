use serde::{Deserialize, Serialize};

use crate::grants::{Grant, GrantMatch};

// grant matching request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchRequest {
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    // max results to return, capped server-side
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct MatchResponse {
    pub success: bool,
    pub matches: Vec<GrantMatch>,
}

#[derive(Debug, Serialize)]
pub struct GrantsResponse {
    pub success: bool,
    pub grants: Vec<Grant>,
}

// one window as reported by /usage; resets_at is unix seconds, absent when no
// window is live for the key
#[derive(Debug, Serialize)]
pub struct QuotaSnapshot {
    pub limit: u32,
    pub remaining: u32,
    pub resets_at: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct UsageResponse {
    pub success: bool,
    pub key_id: String,
    pub tier: String,
    pub general: QuotaSnapshot,
    pub strict: QuotaSnapshot,
}

#[derive(Debug, Serialize)]
pub struct RotateResponse {
    pub success: bool,
    pub key_id: String,
    // the replacement raw key, shown exactly once
    pub api_key: String,
}
