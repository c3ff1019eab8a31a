//! HTTP/WebSocket surface: the axum router binding the Command Surface (C8)
//! to authenticated REST endpoints and the Room Runtime (C6) to a
//! hand-written `/ws` upgrade handler using a split-sink/stream-and-forward
//! shape for the bidirectional socket.

mod bootstrap;
mod dto;
mod error;
mod logging;
mod routes;
mod ws;

pub use bootstrap::{run_server, ServerConfig};
pub use error::ApiError;
pub use routes::build_router;
