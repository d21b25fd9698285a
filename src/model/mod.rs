//! Domain model shared by every subsystem.
//!
//! # Entities
//! ```text
//! Namespace (app, optional environment)
//!     ├── owns ──────────▶ ConfigFile ──▶ [ConfigItem, ...]
//!     └── associates ────▶ ConfigFile (own or foreign)
//! ```
//!
//! # Design Decisions
//! - Identifiers are newtypes over `i64` so a file id is never passed where a
//!   namespace id is expected
//! - `outdated` is persisted as a plain flag; `state.rs` owns the transitions
//! - Views (`*Brief`, `FileView`) are separate from records so the HTTP layer
//!   never serializes storage internals

pub mod state;
pub mod types;

pub use state::{PublishEvent, PublishState};
pub use types::{
    Association, ConfigFile, ConfigItem, FileBrief, FileId, FileView, ItemId, Namespace,
    NamespaceBrief, NamespaceId, StoredItem,
};
