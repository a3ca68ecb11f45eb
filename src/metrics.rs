use lazy_static::lazy_static;
use prometheus::{
    Counter, Gauge, Histogram, register_counter, register_gauge, register_histogram,
};

lazy_static! {
    pub static ref REQUEST_TOTAL: Counter = register_counter!(
        "hyperdag_requests_total",
        "Total number of requests to the authenticated API surface"
    )
    .unwrap();
    pub static ref UNAUTHORIZED_TOTAL: Counter = register_counter!(
        "hyperdag_unauthorized_total",
        "Requests rejected for a missing or unknown API key"
    )
    .unwrap();
    pub static ref RATE_LIMITED_TOTAL: Counter = register_counter!(
        "hyperdag_rate_limited_total",
        "Requests rejected by the general rate limiter"
    )
    .unwrap();
    pub static ref STRICT_RATE_LIMITED_TOTAL: Counter = register_counter!(
        "hyperdag_strict_rate_limited_total",
        "Requests rejected by the strict rate limiter"
    )
    .unwrap();
    pub static ref LIMITER_FAILURES: Counter = register_counter!(
        "hyperdag_limiter_failures_total",
        "Internal limiter failures (fail-open pass-throughs)"
    )
    .unwrap();
    pub static ref QUOTA_ENTRIES: Gauge = register_gauge!(
        "hyperdag_quota_entries",
        "Current number of live entries in the quota table"
    )
    .unwrap();
    pub static ref SWEPT_ENTRIES: Counter = register_counter!(
        "hyperdag_swept_entries_total",
        "Expired quota entries removed by the sweeper"
    )
    .unwrap();
    pub static ref REQUEST_LATENCY: Histogram = register_histogram!(
        "hyperdag_request_latency_seconds",
        "Request latency in seconds"
    )
    .unwrap();
}
