//! Association reconciliation.
//!
//! # Data Flow
//! ```text
//! desired file ids (may repeat)
//!     → de-duplicate into an ordered set
//!     → diff.rs against the namespace's current set
//!     → AssociationDiff { to_add, to_remove }
//!     → service layer applies both + marks namespace dirty, in one transaction
//! ```
//!
//! # Design Decisions
//! - Pure set arithmetic; membership is identity only, so there is no
//!   ordering or tie-break concern
//! - An empty diff is a normal result and must not touch storage

pub mod diff;

pub use diff::{diff, AssociationDiff};
