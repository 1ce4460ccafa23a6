//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, catch-all route, tracing layer)
//!     → request.rs (context: tenant, module hint, correlation id)
//!     → dispatcher.rs (resolver chain, ingress or egress handler)
//!     → proxy::ForwardProxy (stream to upstream and back)
//!     → response.rs (JSON error envelope on failure)
//!     → Send to client
//! ```

pub mod dispatcher;
pub mod request;
pub mod response;
pub mod server;

pub use dispatcher::Dispatcher;
pub use request::RequestContext;
pub use response::ApiError;
pub use server::{AppState, SidecarServer};
