//! Application host for the Nimbus function-invocation runtime.
//!
//! The host composes the pieces the rest of the workspace provides:
//! a [`FunctionApp`] builder collects init/shutdown hooks, middleware and
//! the mapped handler, and `build()` finalizes them into a [`FunctionHost`]
//! whose [`LifecycleController`] runs cold start once, one invocation cycle
//! per platform event, and shutdown once.

mod app;
mod codec;
mod error;
mod event;
mod lifecycle;

pub use app::*;
pub use codec::*;
pub use error::*;
pub use event::*;
pub use lifecycle::*;
