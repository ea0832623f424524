//! Public SDK for the Nimbus function-invocation runtime.
//!
//! This crate re-exports all runtime functionality:
//!
//! ```ignore
//! use nimbus_sdk::prelude::*;
//!
//! let mut host = FunctionApp::new()
//!     .on_init(|_services| async { Ok(()) })
//!     .with_serialization(SerializationConfig::new().with_naming(NamingPolicy::PascalCase))
//!     .map_handler(|req: Greeting| async move {
//!         Ok(Reply { message: format!("hello {}", req.name) })
//!     })
//!     .build()?;
//!
//! let response = host.invoke(event).await?;
//! host.shutdown().await?;
//! ```

pub use nimbus_core;
pub use nimbus_envelope;
pub use nimbus_host;
pub use nimbus_pipeline;

/// Prelude for convenient imports.
pub mod prelude {
    pub use nimbus_core::*;
    pub use nimbus_envelope::*;
    pub use nimbus_host::*;
    pub use nimbus_pipeline::*;
}
