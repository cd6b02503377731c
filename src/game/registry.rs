//! Registry of all live sessions

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::{Mutex, MutexGuard};
use tokio::sync::broadcast;
use tracing::info;
use uuid::Uuid;

use crate::ws::protocol::ServerMsg;

use super::entity::SessionId;
use super::session::GameSession;

/// Room broadcast capacity per session
const ROOM_CAPACITY: usize = 64;

/// Message fanned out to every connection subscribed to a session
#[derive(Debug, Clone)]
pub struct RoomMessage {
    /// Connection that must not receive this message
    pub except: Option<Uuid>,
    pub msg: Arc<ServerMsg>,
}

/// Shared handle to one session: its state and its broadcast room
pub struct SessionHandle {
    pub id: SessionId,
    session: Mutex<GameSession>,
    room: broadcast::Sender<RoomMessage>,
}

impl SessionHandle {
    pub fn new(session: GameSession) -> Self {
        let (room, _) = broadcast::channel(ROOM_CAPACITY);
        Self {
            id: session.id().to_string(),
            session: Mutex::new(session),
            room,
        }
    }

    /// Exclusive access to the session for one operation. Never hold the
    /// guard across an `.await` or while touching the registry.
    pub fn lock(&self) -> MutexGuard<'_, GameSession> {
        self.session.lock()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RoomMessage> {
        self.room.subscribe()
    }

    /// Send to every connection in the session
    pub fn broadcast(&self, msg: ServerMsg) {
        self.send(None, msg);
    }

    /// Send to every connection in the session except `connection_id`
    pub fn broadcast_except(&self, connection_id: Uuid, msg: ServerMsg) {
        self.send(Some(connection_id), msg);
    }

    fn send(&self, except: Option<Uuid>, msg: ServerMsg) {
        // No subscribers is fine: REST-only sessions have nobody listening
        let _ = self.room.send(RoomMessage {
            except,
            msg: Arc::new(msg),
        });
    }

    pub fn player_count(&self) -> usize {
        self.lock().player_count()
    }
}

/// Registry of all sessions, keyed by session id
pub struct SessionRegistry {
    sessions: DashMap<SessionId, Arc<SessionHandle>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }

    /// Return the session for `id`, creating it if absent
    pub fn create(&self, id: &str) -> Arc<SessionHandle> {
        match self.sessions.entry(id.to_string()) {
            Entry::Occupied(entry) => entry.get().clone(),
            Entry::Vacant(entry) => {
                info!(session_id = %id, "Game session created");
                entry
                    .insert(Arc::new(SessionHandle::new(GameSession::new(id))))
                    .clone()
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<Arc<SessionHandle>> {
        self.sessions.get(id).map(|s| s.value().clone())
    }

    #[cfg(test)]
    pub fn contains(&self, id: &str) -> bool {
        self.sessions.contains_key(id)
    }

    #[cfg(test)]
    pub fn remove(&self, id: &str) -> Option<Arc<SessionHandle>> {
        let removed = self.sessions.remove(id).map(|(_, h)| h);
        if removed.is_some() {
            info!(session_id = %id, "Game session removed");
        }
        removed
    }

    /// Remove `handle` only if it is still the registered instance for its id
    pub fn remove_if_same(&self, handle: &Arc<SessionHandle>) -> bool {
        let removed = self
            .sessions
            .remove_if(&handle.id, |_, current| Arc::ptr_eq(current, handle))
            .is_some();
        if removed {
            info!(session_id = %handle.id, "Game session removed");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn total_players(&self) -> usize {
        self.sessions
            .iter()
            .map(|s| s.value().player_count())
            .sum()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
