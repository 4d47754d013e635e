//! HTTP implementations of the Threadline backend traits.
//!
//! `HttpChatBackend` speaks the chat API over reqwest; `SseChangeFeed` pumps
//! the server-sent change feed onto a typed channel. Wire shapes live in
//! `wire` and stay private to this crate apart from the reply fallback.

mod http;
mod realtime;
mod wire;

pub use http::HttpChatBackend;
pub use realtime::SseChangeFeed;
pub use wire::REPLY_FALLBACK;
