//! Resilience helpers for callers of the API.
//!
//! # Data Flow
//! ```text
//! Publish request from the CLI:
//!     → retries.rs (retry transient failures within a budget)
//!     → backoff.rs (exponential delay with jitter between attempts)
//! ```
//!
//! # Design Decisions
//! - The service itself never retries; retrying is a caller decision
//! - Every retry loop is bounded

pub mod backoff;
pub mod retries;
