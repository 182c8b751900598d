//! # Middleware
//!
//! - `metrics` — request and error counters, rendered at `/metrics`.

pub mod metrics;
