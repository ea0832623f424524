//! Invocation pipeline for the Nimbus function runtime.
//!
//! This crate provides the onion-model dispatcher:
//! - `InvocationDelegate` / `Middleware` - the middleware contract
//! - `PipelineBuilder` / `Pipeline` - staged construction and execution
//! - `BinderRegistry` - explicit parameter binding before the terminal handler

mod binder;
mod builder;
mod error;
mod middleware;

pub use binder::*;
pub use builder::*;
pub use error::*;
pub use middleware::*;
