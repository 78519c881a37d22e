//! Event Listener Bridge
//!
//! Translates transport push-events into client-level notifications. One
//! bridge task per attachment consumes an owned event receiver; re-attaching
//! aborts the previous task, so repeated connect attempts never cause
//! duplicate delivery.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::transport::{SignTransport, TransportEvent};
use crate::types::{ConnectionState, WalletEvent};

use super::Shared;

/// Spawn a bridge task consuming the transport's event stream
pub(crate) fn spawn(transport: Arc<dyn SignTransport>, shared: Arc<Shared>) -> JoinHandle<()> {
    let mut rx = transport.subscribe();
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            dispatch(&transport, &shared, event).await;
        }
        debug!("transport event channel closed, bridge stopping");
    })
}

pub(crate) async fn dispatch(
    transport: &Arc<dyn SignTransport>,
    shared: &Arc<Shared>,
    event: TransportEvent,
) {
    match event {
        TransportEvent::SessionDelete { topic } | TransportEvent::SessionExpire { topic } => {
            session_dropped(transport, shared, &topic).await;
        }
        TransportEvent::SessionUpdate { topic, namespaces } => {
            if namespaces.is_empty() {
                // An update that removes every namespace grant is an
                // implicit revoke.
                info!("session {} update revoked all namespaces", topic);
                session_dropped(transport, shared, &topic).await;
            } else {
                debug!("session {} renewed", topic);
            }
        }
        TransportEvent::SessionEvent { topic, name, data } => match name.as_str() {
            "accountsChanged" => {
                let _ = shared.events_tx.send(WalletEvent::AccountChanged(data));
            }
            "chainChanged" => {
                let _ = shared.events_tx.send(WalletEvent::ChainChanged(data));
            }
            other => debug!("ignoring session event {} on {}", other, topic),
        },
    }
}

/// Handle a wallet-side disconnect for `topic`. Unknown topics are a no-op,
/// guarding against stale or duplicate events.
async fn session_dropped(transport: &Arc<dyn SignTransport>, shared: &Arc<Shared>, topic: &str) {
    let removed = {
        let mut state = shared.state();
        let before = state.sessions.len();
        state.sessions.retain(|s| s.topic != topic);
        state.sessions.len() != before
    };
    if !removed {
        return;
    }

    // Best effort; the overriding goal is a clean local state
    if let Err(e) =
        super::delete_remote_session(transport, topic, "session dropped by wallet").await
    {
        warn!("{}", e);
    }

    {
        let mut state = shared.state();
        if state.sessions.is_empty() {
            state.connection = ConnectionState::Init;
            state.pending_uri = None;
            state.pairings.clear();
        }
    }

    info!("wallet session {} disconnected", topic);
    let _ = shared.events_tx.send(WalletEvent::Disconnect);
}
