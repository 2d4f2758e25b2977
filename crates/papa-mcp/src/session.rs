//! SSE session bookkeeping.
//!
//! A session is OPEN from the moment its stream is created until the stream is
//! dropped or the registry is closed. Each session owns a worker task that
//! handles inbound messages one at a time, so responses on a stream never
//! interleave. Removing a session drops its inbound sender, which stops the
//! worker, which drops the outbound sender, which ends the stream.

use crate::protocol::JsonRpcResponse;
use crate::server::McpServer;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use thiserror::Error;
use tokio::sync::mpsc;

const INBOUND_CAPACITY: usize = 32;
const OUTBOUND_CAPACITY: usize = 32;

/// Errors from the session registry.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("session {id} already exists")]
    Duplicate { id: String },

    #[error("session limit of {max} reached")]
    CapacityReached { max: usize },

    #[error("session {id} is closed")]
    Closed { id: String },

    #[error("session {id} has too many pending messages")]
    Busy { id: String },
}

/// Sending half of an open session.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    id: String,
    inbound: mpsc::Sender<Value>,
}

impl SessionHandle {
    /// Start a session worker for `server`.
    ///
    /// Returns the handle and the receiver the SSE stream reads responses from.
    pub fn spawn(server: Arc<McpServer>) -> (Self, mpsc::Receiver<JsonRpcResponse>) {
        let id = uuid::Uuid::new_v4().to_string();
        let (inbound, mut inbound_rx) = mpsc::channel::<Value>(INBOUND_CAPACITY);
        let (outbound, outbound_rx) = mpsc::channel(OUTBOUND_CAPACITY);

        let session_id = id.clone();
        tokio::spawn(async move {
            while let Some(message) = inbound_rx.recv().await {
                let Some(response) = server.handle_message(message).await else {
                    continue;
                };
                if outbound.send(response).await.is_err() {
                    break;
                }
            }
            tracing::debug!(session_id = %session_id, "Session worker stopped");
        });

        (Self { id, inbound }, outbound_rx)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Queue a message for the session worker without waiting.
    ///
    /// Fails with [`SessionError::Busy`] when the queue is full, which happens
    /// once the client stops reading its stream.
    pub fn try_send(&self, message: Value) -> Result<(), SessionError> {
        self.inbound.try_send(message).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => SessionError::Busy {
                id: self.id.clone(),
            },
            mpsc::error::TrySendError::Closed(_) => SessionError::Closed {
                id: self.id.clone(),
            },
        })
    }
}

/// Open sessions, keyed by id.
#[derive(Debug)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, SessionHandle>>,
    max_sessions: usize,
}

impl SessionRegistry {
    pub fn new(max_sessions: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            max_sessions,
        }
    }

    /// Register an open session.
    pub fn insert(&self, handle: SessionHandle) -> Result<(), SessionError> {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        if sessions.contains_key(&handle.id) {
            return Err(SessionError::Duplicate { id: handle.id });
        }
        if sessions.len() >= self.max_sessions {
            return Err(SessionError::CapacityReached {
                max: self.max_sessions,
            });
        }
        sessions.insert(handle.id.clone(), handle);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<SessionHandle> {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    pub fn remove(&self, id: &str) -> Option<SessionHandle> {
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id)
    }

    pub fn len(&self) -> usize {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn ids(&self) -> Vec<String> {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    /// Drop every session, ending their streams. Returns how many were open.
    pub fn close_all(&self) -> usize {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        let count = sessions.len();
        sessions.clear();
        count
    }
}

/// Removes a session from the registry when dropped.
///
/// Owned by the SSE stream so that a client disconnect closes the session.
pub struct SessionGuard {
    id: String,
    registry: Arc<SessionRegistry>,
}

impl SessionGuard {
    pub fn new(id: impl Into<String>, registry: Arc<SessionRegistry>) -> Self {
        Self {
            id: id.into(),
            registry,
        }
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        if self.registry.remove(&self.id).is_some() {
            tracing::info!(session_id = %self.id, "SSE session closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::testing::executor;
    use serde_json::json;
    use std::time::Duration;

    fn server() -> Arc<McpServer> {
        Arc::new(McpServer::new(executor(Ok("SELECT 1")).0))
    }

    #[tokio::test]
    async fn test_worker_answers_in_order() {
        let (handle, mut outbound) = SessionHandle::spawn(server());
        for id in 1..=3 {
            handle
                .try_send(json!({"jsonrpc": "2.0", "id": id, "method": "ping"}))
                .unwrap();
        }
        handle
            .try_send(json!({"jsonrpc": "2.0", "method": "notifications/initialized"}))
            .unwrap();
        handle
            .try_send(json!({"jsonrpc": "2.0", "id": 4, "method": "tools/list"}))
            .unwrap();

        for expected in 1..=4 {
            let response = outbound.recv().await.unwrap();
            assert_eq!(response.id, Some(json!(expected)));
        }
    }

    #[tokio::test]
    async fn test_dropping_handle_ends_stream() {
        let (handle, mut outbound) = SessionHandle::spawn(server());
        drop(handle);
        let next = tokio::time::timeout(Duration::from_secs(5), outbound.recv())
            .await
            .unwrap();
        assert!(next.is_none());
    }

    #[tokio::test]
    async fn test_registry_lifecycle() {
        let registry = Arc::new(SessionRegistry::new(2));
        let (a, _a_rx) = SessionHandle::spawn(server());
        let (b, _b_rx) = SessionHandle::spawn(server());
        let (c, _c_rx) = SessionHandle::spawn(server());
        let a_id = a.id().to_string();

        registry.insert(a.clone()).unwrap();
        assert_eq!(
            registry.insert(a),
            Err(SessionError::Duplicate { id: a_id.clone() })
        );
        registry.insert(b).unwrap();
        assert_eq!(
            registry.insert(c),
            Err(SessionError::CapacityReached { max: 2 })
        );
        assert_eq!(registry.len(), 2);
        assert!(registry.ids().contains(&a_id));

        drop(SessionGuard::new(a_id.clone(), registry.clone()));
        assert!(registry.get(&a_id).is_none());
        assert_eq!(registry.len(), 1);

        assert_eq!(registry.close_all(), 1);
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_send_after_close_fails() {
        let (handle, outbound) = SessionHandle::spawn(server());
        drop(outbound);
        // The worker exits once it fails to deliver a response.
        handle
            .try_send(json!({"jsonrpc": "2.0", "id": 1, "method": "ping"}))
            .unwrap();
        let mut closed = false;
        for _ in 0..50 {
            if handle.inbound.is_closed() {
                closed = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert!(closed);
        assert!(matches!(
            handle.try_send(json!({})),
            Err(SessionError::Closed { .. })
        ));
    }

    #[tokio::test]
    async fn test_unread_stream_makes_session_busy() {
        // Keep the stream open but never read it.
        let (handle, _outbound) = SessionHandle::spawn(server());
        let mut busy = None;
        for id in 0..500 {
            match handle.try_send(json!({"jsonrpc": "2.0", "id": id, "method": "ping"})) {
                Ok(()) => tokio::task::yield_now().await,
                Err(e) => {
                    busy = Some(e);
                    break;
                }
            }
        }
        assert_eq!(
            busy,
            Some(SessionError::Busy {
                id: handle.id().to_string()
            })
        );
    }
}
