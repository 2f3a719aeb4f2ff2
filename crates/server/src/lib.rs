//! sift server library.
//!
//! Wires the search gateway, source ranker and answer generator into a
//! [`Pipeline`], and serves it over a streaming WebSocket session
//! ([`SessionHandler`]) and a one-shot HTTP endpoint ([`routes`]).

pub mod pipeline;
pub mod protocol;
pub mod routes;
pub mod session;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use pipeline::Pipeline;
pub use protocol::{ChatRequest, ChatResponse, ServerMessage};
pub use routes::{router, AppState};
pub use session::{SessionHandler, SessionOutcome, SessionState, SessionTransport};
pub use transport::WsTransport;
