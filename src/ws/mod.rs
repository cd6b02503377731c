//! WebSocket transport

pub mod dispatcher;
pub mod handler;
pub mod protocol;
