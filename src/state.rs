use crate::auth::ApiKeyStore;
use crate::grants::GrantCatalog;
use crate::rate_limit::RateLimiter;

// app's shared state
pub struct AppState {
    pub keys: ApiKeyStore,
    pub limiter: RateLimiter,
    pub grants: GrantCatalog,
}
