//! confgate: configuration distribution service library.
//!
//! Config files are ordered `key=value` collections owned by namespaces.
//! A namespace aggregates the files associated with it into one document
//! and publishes it to a distributed key-value store.

// Core
pub mod codec;
pub mod model;
pub mod reconcile;
pub mod service;
pub mod storage;

// Collaborators
pub mod kv;

// Surfaces
pub mod config;
pub mod http;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use config::AppConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use service::ConfigService;
