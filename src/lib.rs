//! Storefront API gateway library.
//!
//! Bridges the hosting HTTP server onto an embedded, Express-style dispatch
//! framework: every request under the API mount becomes a synthetic
//! request/response pair, and whatever the embedded side does first (a
//! terminal write, a callback, a failure, or nothing before the deadline)
//! becomes exactly one HTTP response.

pub mod adapter;
pub mod config;
pub mod embedded;
pub mod http;
pub mod lifecycle;
pub mod observability;

pub use adapter::{Adapter, EmbeddedRequest, EmbeddedResponse, Next, OutboundResponse};
pub use config::GatewayConfig;
pub use embedded::{App, Dispatch, DispatchError, UpstreamDispatch};
pub use http::GatewayServer;
pub use lifecycle::Shutdown;
