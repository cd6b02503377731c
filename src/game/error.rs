//! Errors reported back to the caller of a game operation

use super::entity::{PlayerId, SessionId};

/// Game operation errors. None of these are fatal to a session.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    /// Connection is not bound, or bound to another session
    #[error("Not authorized or session mismatch for {action}.")]
    Unauthorized { action: &'static str },

    #[error("Session not found.")]
    SessionNotFound(SessionId),

    #[error("Player not found in session.")]
    PlayerNotFound(PlayerId),

    #[error("Player already in session.")]
    PlayerAlreadyInSession(PlayerId),
}
