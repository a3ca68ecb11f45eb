mod grants;
mod health;
mod keys;
mod metrics;

pub use grants::{list_grants_handler, match_grants_handler};
pub use health::health_handler;
pub use keys::{rotate_key_handler, usage_handler};
pub use metrics::metrics_handler;
