//! Lobby flow: joining, readiness and leaving sessions

pub mod service;

pub use service::LobbyService;
