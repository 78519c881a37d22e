//! Wallet Session Lifecycle
//!
//! `WcClient` orchestrates connect / reconnect / disconnect / reset flows
//! over a relay transport: it restores still-live sessions, guards fresh
//! attempts with a single-shot timeout, bridges transport push-events into
//! client notifications, and keeps persisted storage consistent with the
//! in-memory session store.

mod events;
mod guard;

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_stream::stream;
use chrono::Utc;
use futures_util::future::BoxFuture;
use tokio::sync::{broadcast, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::WalletError;
use crate::registry::WalletInfo;
use crate::storage::{
    CleanupMode, DatabaseStore, KeyValueStore, StorageJanitor, DEEPLINK_CHOICE_KEY,
};
use crate::transport::SignTransport;
use crate::types::{
    required_namespaces, ConnectionState, Os, Pairing, Session, WalletEvent, WalletEventStream,
    COSMOS_NAMESPACE,
};

use guard::{GuardOutcome, TimeoutGuard};

/// Default time allowed for the wallet to approve a fresh pairing
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Async constructor for the relay transport. Invoked lazily on first use
/// and again after `force_reset` drops the handle.
pub type TransportFactory =
    Box<dyn Fn() -> BoxFuture<'static, Result<Arc<dyn SignTransport>, WalletError>> + Send + Sync>;

/// Client tuning knobs
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Time allowed for wallet approval before the attempt is failed
    pub connect_timeout: Duration,
    /// When set, a successful approval emits an [`WalletEvent::OpenApp`]
    /// deep link for this platform and records the deep-link choice
    pub redirect: Option<Os>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            redirect: None,
        }
    }
}

/// Mutable client state, transitioned only by the lifecycle controller and
/// the event bridge
#[derive(Default)]
pub(crate) struct ClientState {
    pub(crate) connection: ConnectionState,
    /// Pairing URI of the active attempt, for QR rendering / deep links
    pub(crate) pending_uri: Option<String>,
    pub(crate) sessions: Vec<Session>,
    pub(crate) pairings: Vec<Pairing>,
}

/// State shared between the client API and the event bridge task
pub(crate) struct Shared {
    pub(crate) state: Mutex<ClientState>,
    pub(crate) events_tx: broadcast::Sender<WalletEvent>,
}

impl Shared {
    pub(crate) fn state(&self) -> MutexGuard<'_, ClientState> {
        self.state.lock().expect("client state lock poisoned")
    }
}

struct Inner {
    info: WalletInfo,
    options: ClientOptions,
    factory: TransportFactory,
    janitor: StorageJanitor,
    kv: Arc<dyn KeyValueStore>,
    shared: Arc<Shared>,
    transport: Mutex<Option<Arc<dyn SignTransport>>>,
    bridge: Mutex<Option<JoinHandle<()>>>,
    /// Cancel handle of the in-flight connect attempt; `Some` doubles as
    /// the single-flight marker.
    attempt: Mutex<Option<Arc<Notify>>>,
}

/// Clears the single-flight marker when a connect attempt settles,
/// including on early returns.
struct AttemptGuard<'a> {
    slot: &'a Mutex<Option<Arc<Notify>>>,
    cancel: Arc<Notify>,
}

impl Drop for AttemptGuard<'_> {
    fn drop(&mut self) {
        if let Ok(mut slot) = self.slot.lock() {
            // A reset may already have handed the slot to a newer attempt;
            // only this attempt's own marker is cleared.
            if slot.as_ref().map_or(false, |c| Arc::ptr_eq(c, &self.cancel)) {
                slot.take();
            }
        }
    }
}

/// WalletConnect session client for one wallet integration. Cheap to clone;
/// clones share state.
#[derive(Clone)]
pub struct WcClient {
    inner: Arc<Inner>,
}

impl WcClient {
    pub fn new(
        info: WalletInfo,
        factory: TransportFactory,
        kv: Arc<dyn KeyValueStore>,
        db: Arc<dyn DatabaseStore>,
        options: ClientOptions,
    ) -> Self {
        let project_id = info
            .walletconnect
            .as_ref()
            .map(|wc| wc.project_id.clone())
            .unwrap_or_default();
        let (events_tx, _) = broadcast::channel(32);

        Self {
            inner: Arc::new(Inner {
                janitor: StorageJanitor::new(&project_id, kv.clone(), db),
                kv,
                info,
                options,
                factory,
                shared: Arc::new(Shared {
                    state: Mutex::new(ClientState::default()),
                    events_tx,
                }),
                transport: Mutex::new(None),
                bridge: Mutex::new(None),
                attempt: Mutex::new(None),
            }),
        }
    }

    pub fn info(&self) -> &WalletInfo {
        &self.inner.info
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.inner.shared.state().connection
    }

    /// Pairing URI of the active attempt, if one is pending or completed
    pub fn pending_uri(&self) -> Option<String> {
        self.inner.shared.state().pending_uri.clone()
    }

    /// Cached view of this wallet's live sessions
    pub fn sessions(&self) -> Vec<Session> {
        self.inner.shared.state().sessions.clone()
    }

    /// Subscribe to client-level notifications. Each call returns an
    /// independent stream starting at the current point in time.
    pub fn events(&self) -> WalletEventStream {
        let mut rx = self.inner.shared.events_tx.subscribe();
        Box::pin(stream! {
            loop {
                match rx.recv().await {
                    Ok(event) => yield event,
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        warn!("event stream lagging, {} event(s) dropped", missed);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }

    /// Establish a wallet session covering the given chain ids.
    ///
    /// If a live session for this wallet already exists it is restored and
    /// the call returns immediately. Otherwise persisted relay state is
    /// cleared (strictly — a fresh attempt never builds on possibly corrupt
    /// storage), a pairing is requested, and the wallet has
    /// `connect_timeout` to approve. The pairing URI is readable through
    /// [`pending_uri`](Self::pending_uri) as soon as it is issued, before
    /// approval resolves.
    ///
    /// Fails with [`WalletError::AlreadyConnecting`] while another attempt
    /// is in flight on this client.
    pub async fn connect(&self, chain_ids: &[&str]) -> Result<(), WalletError> {
        let cancel = Arc::new(Notify::new());
        {
            let mut slot = self.inner.attempt.lock().expect("attempt lock poisoned");
            if slot.is_some() {
                return Err(WalletError::AlreadyConnecting);
            }
            *slot = Some(cancel.clone());
        }
        let _attempt = AttemptGuard {
            slot: &self.inner.attempt,
            cancel: cancel.clone(),
        };

        let transport = self.ensure_transport().await?;

        // Fast path: a still-live session means we are already connected.
        self.restore_on(&transport).await;
        let restored = !self.inner.shared.state().sessions.is_empty();
        if restored {
            {
                let mut state = self.inner.shared.state();
                state.connection = ConnectionState::Done;
                state.pending_uri = None;
            }
            self.attach_bridge(&transport);
            info!("restored existing {} session", self.inner.info.name);
            return Ok(());
        }

        self.inner.janitor.clear(CleanupMode::Strict).await?;
        self.clear_own_remote_state(&transport).await;

        let namespaces = required_namespaces(chain_ids);
        let timeout_guard = TimeoutGuard::new(self.inner.options.connect_timeout, cancel);

        let shared = self.inner.shared.clone();
        let attempt_transport = transport.clone();
        let attempt = async move {
            let proposal = attempt_transport.connect(namespaces).await?;
            // The URI must be readable before approval resolves so the UI
            // can render a QR code.
            {
                let mut state = shared.state();
                state.connection = ConnectionState::Pending;
                state.pending_uri = Some(proposal.uri.clone());
            }
            debug!("pairing uri issued, awaiting wallet approval");
            proposal.approval.await
        };

        match timeout_guard.run(attempt).await {
            GuardOutcome::Completed(Ok(session)) => {
                self.finish_connect(&transport, session).await;
                Ok(())
            }
            GuardOutcome::Completed(Err(e)) => {
                self.cleanup_failed_attempt(&transport).await;
                Err(WalletError::Transport(e))
            }
            GuardOutcome::TimedOut => {
                warn!(
                    "wallet approval timed out after {:?}",
                    self.inner.options.connect_timeout
                );
                self.cleanup_failed_attempt(&transport).await;
                Err(WalletError::ConnectionTimeout)
            }
            GuardOutcome::Cancelled => {
                debug!("connect attempt cancelled by reset");
                self.cleanup_failed_attempt(&transport).await;
                Err(WalletError::Aborted)
            }
        }
    }

    /// Restore an existing session without issuing a new pairing request.
    /// Returns whether a live session was found.
    pub async fn try_reconnect(&self, chain_ids: &[&str]) -> Result<bool, WalletError> {
        debug!("attempting non-interactive reconnect for {:?}", chain_ids);
        let transport = self.ensure_transport().await?;
        self.restore_on(&transport).await;

        let restored = !self.inner.shared.state().sessions.is_empty();
        if restored {
            {
                let mut state = self.inner.shared.state();
                state.connection = ConnectionState::Done;
                state.pending_uri = None;
            }
            self.attach_bridge(&transport);
            info!("reconnected to existing {} session", self.inner.info.name);
        }
        Ok(restored)
    }

    /// Tear down every tracked session and fully reset the client. Remote
    /// deletion is best effort; local state always ends clean.
    pub async fn disconnect(&self) {
        let sessions = self.sessions();
        if let Some(transport) = self.current_transport() {
            for session in &sessions {
                if let Err(e) =
                    delete_remote_session(&transport, &session.topic, "user disconnected").await
                {
                    warn!("{}", e);
                }
            }
        }
        self.force_reset().await;
        let _ = self.inner.shared.events_tx.send(WalletEvent::Disconnect);
    }

    /// Re-derive the session store from the transport's table. Wholesale
    /// replacement; calling twice with no transport-side change yields the
    /// same contents.
    pub async fn restore_sessions(&self) -> Result<(), WalletError> {
        let transport = self.ensure_transport().await?;
        self.restore_on(&transport).await;
        Ok(())
    }

    /// Clear this wallet's own sessions and pairings plus persisted
    /// storage, leaving other wallets' transport state untouched.
    pub async fn reset_client(&self) {
        self.cancel_attempt();
        self.detach_bridge();
        if let Some(transport) = self.current_transport() {
            self.clear_own_remote_state(&transport).await;
        }
        self.reset_local_state();
        if let Err(e) = self.inner.janitor.clear(CleanupMode::BestEffort).await {
            warn!("storage cleanup failed during reset: {}", e);
        }
    }

    /// Unconditionally clear all transport sessions and pairings regardless
    /// of owner, wipe persisted storage, and drop the transport handle so
    /// the next use reinitializes from scratch.
    pub async fn force_reset(&self) {
        self.cancel_attempt();
        self.detach_bridge();

        let transport = self
            .inner
            .transport
            .lock()
            .expect("transport lock poisoned")
            .take();
        if let Some(transport) = transport {
            for session in transport.sessions().await {
                if let Err(e) = delete_remote_session(&transport, &session.topic, "client reset").await {
                    warn!("{}", e);
                }
            }
            for pairing in transport.pairings().await {
                if let Err(e) = transport.delete_pairing(&pairing.topic, "client reset").await {
                    warn!("failed to delete pairing {}: {}", pairing.topic, e);
                }
            }
        }

        self.reset_local_state();
        if let Err(e) = self.inner.janitor.clear(CleanupMode::BestEffort).await {
            warn!("storage cleanup failed during reset: {}", e);
        }
        info!("{} client fully reset", self.inner.info.name);
    }

    /// Issue a JSON-RPC request to the wallet over the current session
    pub(crate) async fn request_current(
        &self,
        chain_id: &str,
        method: &str,
        params: serde_json::Value,
    ) -> Result<serde_json::Value, WalletError> {
        let topic = self
            .inner
            .shared
            .state()
            .sessions
            .first()
            .map(|s| s.topic.clone())
            .ok_or(WalletError::NotConnected)?;
        let transport = self.current_transport().ok_or(WalletError::NotConnected)?;

        let chain = format!("{}:{}", COSMOS_NAMESPACE, chain_id);
        Ok(transport.request(&topic, &chain, method, params).await?)
    }

    fn current_transport(&self) -> Option<Arc<dyn SignTransport>> {
        self.inner
            .transport
            .lock()
            .expect("transport lock poisoned")
            .clone()
    }

    async fn ensure_transport(&self) -> Result<Arc<dyn SignTransport>, WalletError> {
        if let Some(transport) = self.current_transport() {
            return Ok(transport);
        }
        debug!("initializing relay transport");
        let transport = (self.inner.factory)().await?;

        let mut slot = self.inner.transport.lock().expect("transport lock poisoned");
        if let Some(existing) = slot.clone() {
            return Ok(existing);
        }
        *slot = Some(transport.clone());
        Ok(transport)
    }

    /// Sessions whose peer matches this wallet and whose expiry clears the
    /// liveness margin, plus this wallet's pairings
    async fn restore_on(&self, transport: &Arc<dyn SignTransport>) {
        let peer_name = self.inner.info.peer_name().to_string();
        let now_ms = Utc::now().timestamp_millis();

        let live: Vec<Session> = transport
            .sessions()
            .await
            .into_iter()
            .filter(|s| s.peer.name == peer_name && s.is_live(now_ms))
            .collect();
        let pairings: Vec<Pairing> = transport
            .pairings()
            .await
            .into_iter()
            .filter(|p| p.peer.name == peer_name)
            .collect();

        debug!("restored {} live session(s) for {}", live.len(), peer_name);
        let mut state = self.inner.shared.state();
        state.sessions = live;
        state.pairings = pairings;
    }

    async fn finish_connect(&self, transport: &Arc<dyn SignTransport>, session: Session) {
        let peer_name = self.inner.info.peer_name().to_string();
        let pairings: Vec<Pairing> = transport
            .pairings()
            .await
            .into_iter()
            .filter(|p| p.peer.name == peer_name)
            .collect();

        let uri = {
            let mut state = self.inner.shared.state();
            state.connection = ConnectionState::Done;
            state.sessions = vec![session];
            state.pairings = pairings;
            state.pending_uri.clone()
        };
        self.attach_bridge(transport);
        info!("{} session approved", self.inner.info.name);

        if let Some(os) = self.inner.options.redirect {
            self.open_app_redirect(uri.as_deref().unwrap_or_default(), os)
                .await;
        }
    }

    /// Record the deep-link choice and ask the host to foreground the
    /// wallet app
    async fn open_app_redirect(&self, uri: &str, os: Os) {
        let Some(wc) = self.inner.info.walletconnect.as_ref() else {
            return;
        };
        let url = wc.deep_link(uri, Some(os));
        if url.is_empty() {
            return;
        }

        let href = match os {
            Os::Android => wc.native.android.clone(),
            Os::Ios => wc.native.ios.clone(),
        };
        let choice = serde_json::json!({
            "href": href,
            "name": self.inner.info.pretty_name,
        });
        if let Err(e) = self.inner.kv.set(DEEPLINK_CHOICE_KEY, &choice.to_string()).await {
            warn!("failed to persist deep-link choice: {}", e);
        }

        let _ = self.inner.shared.events_tx.send(WalletEvent::OpenApp(url));
    }

    async fn cleanup_failed_attempt(&self, transport: &Arc<dyn SignTransport>) {
        self.reset_local_state();
        self.clear_own_remote_state(transport).await;
        if let Err(e) = self.inner.janitor.clear(CleanupMode::BestEffort).await {
            warn!("storage cleanup failed after aborted connect: {}", e);
        }
    }

    async fn clear_own_remote_state(&self, transport: &Arc<dyn SignTransport>) {
        let peer_name = self.inner.info.peer_name().to_string();
        for session in transport.sessions().await {
            if session.peer.name == peer_name {
                if let Err(e) = delete_remote_session(transport, &session.topic, "client reset").await
                {
                    warn!("{}", e);
                }
            }
        }
        for pairing in transport.pairings().await {
            if pairing.peer.name == peer_name {
                if let Err(e) = transport.delete_pairing(&pairing.topic, "client reset").await {
                    warn!("failed to delete pairing {}: {}", pairing.topic, e);
                }
            }
        }
    }

    fn reset_local_state(&self) {
        let mut state = self.inner.shared.state();
        state.connection = ConnectionState::Init;
        state.pending_uri = None;
        state.sessions.clear();
        state.pairings.clear();
    }

    fn cancel_attempt(&self) {
        let cancel = self
            .inner
            .attempt
            .lock()
            .expect("attempt lock poisoned")
            .take();
        if let Some(cancel) = cancel {
            cancel.notify_one();
        }
    }

    fn attach_bridge(&self, transport: &Arc<dyn SignTransport>) {
        let mut slot = self.inner.bridge.lock().expect("bridge lock poisoned");
        // Re-attachment replaces the previous subscription so repeated
        // connects never double-deliver events.
        if let Some(previous) = slot.take() {
            previous.abort();
        }
        *slot = Some(events::spawn(transport.clone(), self.inner.shared.clone()));
    }

    fn detach_bridge(&self) {
        let handle = self
            .inner
            .bridge
            .lock()
            .expect("bridge lock poisoned")
            .take();
        if let Some(handle) = handle {
            handle.abort();
        }
    }
}

/// Delete a session on the transport, wrapping failures as session
/// bookkeeping errors. Teardown paths log the result and continue.
pub(crate) async fn delete_remote_session(
    transport: &Arc<dyn SignTransport>,
    topic: &str,
    reason: &str,
) -> Result<(), WalletError> {
    transport
        .delete_session(topic, reason)
        .await
        .map_err(|e| WalletError::Session(format!("failed to delete session {}: {}", topic, e)))
}
