//! HTTP hosting subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, tracing, body collection)
//!     → {mount_prefix}/{*path} handler
//!     → adapter (preflight via cors.rs, or embedded dispatch)
//!     → OutboundResponse → Send to client
//! ```

pub mod cors;
pub mod headers;
pub mod request;
pub mod server;

pub use request::{MakeRequestUuidV4, X_REQUEST_ID};
pub use server::{AppState, GatewayServer};
