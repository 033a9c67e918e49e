//! Containment operator (containment-operator)
//!
//! Hosts the containment reconciler over a directory of intent documents:
//! - [`file_store`]: intents as YAML/JSON files with optimistic concurrency
//! - [`manifest_executor`]: actions realised as cluster manifests on disk
//! - [`watcher`] and [`queue`]: change detection and per-key scheduling
//! - [`controller`]: the bounded worker pool with graceful shutdown

pub mod controller;
pub mod file_store;
pub mod manifest;
pub mod manifest_executor;
pub mod queue;
pub mod settings;
pub mod telemetry;
pub mod watcher;

pub use controller::Controller;
pub use file_store::FileIntentStore;
pub use manifest_executor::ManifestExecutor;
pub use settings::OperatorSettings;
pub use watcher::Watcher;
