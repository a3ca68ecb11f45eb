//! Periodic cleanup of expired quota entries

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::metrics;
use crate::state::AppState;

// runs forever; expired entries are also reset on next access, so this only
// bounds memory
pub async fn run(state: Arc<AppState>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    info!("expiry sweeper started (interval: {:?})", interval);

    loop {
        ticker.tick().await;

        let removed = state.limiter.sweep();
        if removed > 0 {
            metrics::SWEPT_ENTRIES.inc_by(removed as f64);
            debug!(removed, "swept expired quota entries");
        }
    }
}
