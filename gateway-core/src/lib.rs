//! Gateway core: fan-out dispatch, per-endpoint merge, and the tail bridge
//! for a log-query gateway fronting N equivalent backend instances.
//!
//! The binary crate (`gateway-app`) only loads configuration, builds an
//! [`AppState`](server::AppState), and starts the routers this crate
//! builds; everything domain-specific lives here.

pub mod client;
pub mod config;
pub mod dispatch;
pub mod duration;
pub mod error;
pub mod forward;
pub mod merge;
pub mod metrics;
pub mod routes;
pub mod server;
pub mod tail;
pub mod trace;

pub use config::GatewayConfig;
pub use error::GatewayError;
pub use server::{router, AppState};
