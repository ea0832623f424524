//! Core abstractions for the Nimbus function-invocation runtime.
//!
//! This crate provides the fundamental types:
//! - `FeatureSet` - Type-keyed invocation state
//! - `InvocationContext` - Per-invocation aggregate
//! - `ServiceRegistry` / `ServiceScope` - Two-level service resolution
//! - `DeadlineProvider` / `DeadlineToken` - Cooperative cancellation
//! - `RuntimeConfig` - Runtime configuration

mod config;
mod context;
mod deadline;
mod features;
mod services;

pub use config::*;
pub use context::*;
pub use deadline::*;
pub use features::*;
pub use services::*;
