//! API-key store and authentication middleware

use std::path::Path;
use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::{ApiError, GatewayError, Result};
use crate::metrics;
use crate::state::AppState;

// request-scoped identity attached by the auth middleware
#[derive(Debug, Clone)]
pub struct ApiKeyContext {
    pub id: String,
    pub name: String,
    pub permissions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKeyRecord {
    pub id: String,
    pub name: String,
    pub permissions: Vec<String>,
    pub created_at: DateTime<Utc>,
}

// entry shape of the --keys-file JSON array
#[derive(Deserialize)]
struct KeyFileEntry {
    key: String,
    name: String,
    #[serde(default)]
    permissions: Vec<String>,
}

/// Keyed by the SHA-256 hex digest of the raw key; raw keys are never stored.
pub struct ApiKeyStore {
    keys: DashMap<String, ApiKeyRecord>,
}

impl Default for ApiKeyStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ApiKeyStore {
    pub fn new() -> Self {
        Self {
            keys: DashMap::new(),
        }
    }

    fn hash_key(raw: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(raw.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    pub fn insert(&self, raw: &str, name: &str, permissions: Vec<String>) -> ApiKeyRecord {
        let hash = Self::hash_key(raw);
        let record = ApiKeyRecord {
            id: format!("key_{}", &hash[..12]),
            name: name.to_string(),
            permissions,
            created_at: Utc::now(),
        };
        self.keys.insert(hash, record.clone());
        record
    }

    pub fn lookup(&self, raw: &str) -> Option<ApiKeyRecord> {
        self.keys.get(&Self::hash_key(raw)).map(|r| r.value().clone())
    }

    // load records from a JSON array, returns how many keys were added
    pub fn load_file(&self, path: &Path) -> Result<usize> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| GatewayError::Config(format!("Failed to read keys file: {}", e)))?;

        let entries: Vec<KeyFileEntry> = serde_json::from_str(&content)
            .map_err(|e| GatewayError::Config(format!("Failed to parse keys file: {}", e)))?;

        let count = entries.len();
        for entry in entries {
            self.insert(&entry.key, &entry.name, entry.permissions);
        }
        Ok(count)
    }

    /// Mint a replacement raw key for an existing record. The old key stops
    /// working immediately; the record (id, permissions) is preserved.
    pub fn rotate(&self, id: &str) -> Option<String> {
        let old_hash = self
            .keys
            .iter()
            .find(|r| r.value().id == id)
            .map(|r| r.key().clone())?;
        let (_, record) = self.keys.remove(&old_hash)?;

        let raw = format!("hdg_{}", Uuid::new_v4().simple());
        self.keys.insert(Self::hash_key(&raw), record);
        Some(raw)
    }

    // well-known development keys, one per tier
    pub fn seed_dev(&self) -> Vec<(String, ApiKeyRecord)> {
        [
            ("hdg_dev_default", "dev default", vec![]),
            ("hdg_dev_basic", "dev basic", vec!["basic"]),
            ("hdg_dev_premium", "dev premium", vec!["premium"]),
            ("hdg_dev_unlimited", "dev unlimited", vec!["unlimited"]),
        ]
        .into_iter()
        .map(|(raw, name, perms)| {
            let perms = perms.into_iter().map(String::from).collect();
            (raw.to_string(), self.insert(raw, name, perms))
        })
        .collect()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

// resolves X-API-Key and attaches ApiKeyContext for the limiter and handlers
pub async fn require_api_key(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Response {
    metrics::REQUEST_TOTAL.inc();

    let raw = req
        .headers()
        .get("x-api-key")
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);

    let Some(raw) = raw else {
        metrics::UNAUTHORIZED_TOTAL.inc();
        return ApiError::Unauthorized("missing X-API-Key header".to_string()).into_response();
    };

    match state.keys.lookup(&raw) {
        Some(record) => {
            req.extensions_mut().insert(ApiKeyContext {
                id: record.id,
                name: record.name,
                permissions: record.permissions,
            });
            next.run(req).await
        }
        None => {
            metrics::UNAUTHORIZED_TOTAL.inc();
            ApiError::Unauthorized("unknown API key".to_string()).into_response()
        }
    }
}
