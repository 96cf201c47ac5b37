//! Streaming transport: Server-Sent Events for one-shot chat/job streams
//! (see [`crate::api::chat::chat_stream`]) and a WebSocket for clients that
//! want to subscribe to several jobs over one long-lived connection.

pub mod ws;
