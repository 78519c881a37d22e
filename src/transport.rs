//! Relay Transport Seam
//!
//! The client drives a relay-connected sign transport through this trait.
//! A concrete implementation wraps whatever sign-client talks to the relay;
//! the session lifecycle logic only depends on this surface.

use std::collections::BTreeMap;

use async_trait::async_trait;
use futures_util::future::BoxFuture;
use tokio::sync::mpsc;

use crate::error::TransportError;
use crate::types::{Namespace, Pairing, Session};

/// Events pushed by the transport over the relay
#[derive(Debug, Clone)]
pub enum TransportEvent {
    /// The wallet deleted the session
    SessionDelete { topic: String },
    /// The session reached its expiry
    SessionExpire { topic: String },
    /// The wallet updated the session's namespace grants
    SessionUpdate {
        topic: String,
        namespaces: BTreeMap<String, Namespace>,
    },
    /// Generic wallet-pushed event (e.g. `accountsChanged`)
    SessionEvent {
        topic: String,
        name: String,
        data: serde_json::Value,
    },
}

/// Outcome of a connect request: the pairing URI is available immediately
/// (for QR display / deep-linking) while `approval` resolves once the
/// wallet approves or rejects.
pub struct ConnectProposal {
    pub uri: String,
    pub approval: BoxFuture<'static, Result<Session, TransportError>>,
}

/// Relay-connected sign transport consumed by the wallet client
#[async_trait]
pub trait SignTransport: Send + Sync {
    /// Request a new pairing scoped to the given namespaces
    async fn connect(
        &self,
        required_namespaces: BTreeMap<String, Namespace>,
    ) -> Result<ConnectProposal, TransportError>;

    /// All sessions in the transport's authoritative table
    async fn sessions(&self) -> Vec<Session>;

    /// Delete a session by topic
    async fn delete_session(&self, topic: &str, reason: &str) -> Result<(), TransportError>;

    /// All pairings in the transport's table
    async fn pairings(&self) -> Vec<Pairing>;

    /// Delete a pairing by topic
    async fn delete_pairing(&self, topic: &str, reason: &str) -> Result<(), TransportError>;

    /// Issue a JSON-RPC request to the wallet over an active session
    async fn request(
        &self,
        topic: &str,
        chain: &str,
        method: &str,
        params: serde_json::Value,
    ) -> Result<serde_json::Value, TransportError>;

    /// Hand out a receiver for transport push events. Each call returns an
    /// independent subscription; dropping the receiver ends it.
    fn subscribe(&self) -> mpsc::UnboundedReceiver<TransportEvent>;
}

#[cfg(test)]
pub(crate) mod mock {
    //! Scriptable in-memory transport for client tests.

    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use super::*;
    use crate::types::PeerMetadata;

    /// How the next queued connect proposal resolves
    pub enum Approval {
        /// Approve with this session after a delay
        Approve { session: Session, delay: Duration },
        /// Reject with a reason
        Reject(String),
        /// Never resolve (lets the timeout guard fire)
        Never,
    }

    #[derive(Default)]
    struct MockState {
        sessions: Vec<Session>,
        pairings: Vec<Pairing>,
        proposals: VecDeque<(String, Approval)>,
        responses: VecDeque<Result<serde_json::Value, TransportError>>,
        subscribers: Vec<mpsc::UnboundedSender<TransportEvent>>,
        requests: Vec<(String, String, String, serde_json::Value)>,
        deleted_sessions: Vec<String>,
        deleted_pairings: Vec<String>,
        fail_session_delete: bool,
    }

    #[derive(Default)]
    pub struct MockTransport {
        state: Arc<Mutex<MockState>>,
    }

    impl MockTransport {
        pub fn new() -> Self {
            Self::default()
        }

        fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
            self.state.lock().unwrap()
        }

        pub fn queue_proposal(&self, uri: &str, approval: Approval) {
            self.lock().proposals.push_back((uri.to_string(), approval));
        }

        pub fn queue_response(&self, response: Result<serde_json::Value, TransportError>) {
            self.lock().responses.push_back(response);
        }

        pub fn insert_session(&self, session: Session) {
            self.lock().sessions.push(session);
        }

        pub fn insert_pairing(&self, pairing: Pairing) {
            self.lock().pairings.push(pairing);
        }

        pub fn fail_session_delete(&self) {
            self.lock().fail_session_delete = true;
        }

        /// Push an event to every subscriber
        pub fn emit(&self, event: TransportEvent) {
            let subscribers = self.lock().subscribers.clone();
            for tx in subscribers {
                let _ = tx.send(event.clone());
            }
        }

        pub fn session_topics(&self) -> Vec<String> {
            self.lock().sessions.iter().map(|s| s.topic.clone()).collect()
        }

        pub fn pairing_topics(&self) -> Vec<String> {
            self.lock().pairings.iter().map(|p| p.topic.clone()).collect()
        }

        pub fn deleted_sessions(&self) -> Vec<String> {
            self.lock().deleted_sessions.clone()
        }

        pub fn recorded_requests(&self) -> Vec<(String, String, String, serde_json::Value)> {
            self.lock().requests.clone()
        }

        /// Build a session for `peer_name` expiring `ttl_secs` from now
        pub fn live_session(peer_name: &str, topic: &str, ttl_secs: i64) -> Session {
            Session {
                topic: topic.to_string(),
                peer: PeerMetadata {
                    name: peer_name.to_string(),
                    ..Default::default()
                },
                expiry: chrono::Utc::now().timestamp() + ttl_secs,
                namespaces: crate::types::required_namespaces(&["cosmoshub-4"]),
            }
        }
    }

    #[async_trait]
    impl SignTransport for MockTransport {
        async fn connect(
            &self,
            _required_namespaces: BTreeMap<String, Namespace>,
        ) -> Result<ConnectProposal, TransportError> {
            let (uri, approval) = self
                .lock()
                .proposals
                .pop_front()
                .ok_or_else(|| TransportError::Relay("no proposal queued".to_string()))?;

            let state = self.state.clone();
            let approval: BoxFuture<'static, Result<Session, TransportError>> = match approval {
                Approval::Approve { session, delay } => Box::pin(async move {
                    tokio::time::sleep(delay).await;
                    state.lock().unwrap().sessions.push(session.clone());
                    Ok(session)
                }),
                Approval::Reject(reason) => {
                    Box::pin(async move { Err(TransportError::Rejected(reason)) })
                }
                Approval::Never => Box::pin(futures_util::future::pending()),
            };

            Ok(ConnectProposal { uri, approval })
        }

        async fn sessions(&self) -> Vec<Session> {
            self.lock().sessions.clone()
        }

        async fn delete_session(&self, topic: &str, _reason: &str) -> Result<(), TransportError> {
            let mut state = self.lock();
            if state.fail_session_delete {
                return Err(TransportError::Relay("session delete failed".to_string()));
            }
            state.sessions.retain(|s| s.topic != topic);
            state.deleted_sessions.push(topic.to_string());
            Ok(())
        }

        async fn pairings(&self) -> Vec<Pairing> {
            self.lock().pairings.clone()
        }

        async fn delete_pairing(&self, topic: &str, _reason: &str) -> Result<(), TransportError> {
            let mut state = self.lock();
            state.pairings.retain(|p| p.topic != topic);
            state.deleted_pairings.push(topic.to_string());
            Ok(())
        }

        async fn request(
            &self,
            topic: &str,
            chain: &str,
            method: &str,
            params: serde_json::Value,
        ) -> Result<serde_json::Value, TransportError> {
            let mut state = self.lock();
            state
                .requests
                .push((topic.to_string(), chain.to_string(), method.to_string(), params));
            state
                .responses
                .pop_front()
                .unwrap_or(Ok(serde_json::Value::Null))
        }

        fn subscribe(&self) -> mpsc::UnboundedReceiver<TransportEvent> {
            let (tx, rx) = mpsc::unbounded_channel();
            self.lock().subscribers.push(tx);
            rx
        }
    }
}
