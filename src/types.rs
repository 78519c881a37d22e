//! Common types for the wallet session client
//!
//! These types mirror the transport's session/pairing records plus the
//! client-side connection state read by UI layers.

use std::collections::BTreeMap;
use std::pin::Pin;

use futures_util::Stream;
use serde::{Deserialize, Serialize};

/// Namespace key for Cosmos chains (`cosmos:<chain-id>`)
pub const COSMOS_NAMESPACE: &str = "cosmos";

/// Signing methods requested for every session
pub const COSMOS_METHODS: [&str; 3] = [
    "cosmos_getAccounts",
    "cosmos_signDirect",
    "cosmos_signAmino",
];

/// Wallet-pushed events requested for every session
pub const COSMOS_EVENTS: [&str; 2] = ["chainChanged", "accountsChanged"];

/// Safety margin (ms) subtracted from session expiry when judging liveness,
/// so a session about to lapse is not restored mid-use.
pub const EXPIRY_MARGIN_MS: i64 = 5_000;

/// Peer metadata attached to sessions and pairings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerMetadata {
    /// Wallet-reported name, used to filter sessions to this wallet
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub icons: Vec<String>,
}

/// Permitted chains/methods/events for one protocol namespace
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Namespace {
    pub chains: Vec<String>,
    pub methods: Vec<String>,
    pub events: Vec<String>,
    /// Accounts granted on approval (`cosmos:<chain-id>:<address>`)
    #[serde(default)]
    pub accounts: Vec<String>,
}

/// An approved connection between the app and a wallet. Owned by the
/// transport; the client holds a filtered, cached view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Opaque correlation id
    pub topic: String,
    pub peer: PeerMetadata,
    /// Expiry as unix epoch seconds
    pub expiry: i64,
    #[serde(default)]
    pub namespaces: BTreeMap<String, Namespace>,
}

impl Session {
    /// Whether this session is still usable at `now_ms` (unix epoch ms),
    /// with a safety margin against expiring mid-use.
    pub fn is_live(&self, now_ms: i64) -> bool {
        self.expiry * 1000 > now_ms + EXPIRY_MARGIN_MS
    }
}

/// Handshake record preceding session approval
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pairing {
    pub topic: String,
    #[serde(default)]
    pub peer: PeerMetadata,
    pub active: bool,
    pub expiry: i64,
}

/// Connection state of one client instance, read by the UI to drive
/// modal visibility. Mutated only by the lifecycle controller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConnectionState {
    /// Idle, no attempt in flight
    #[default]
    Init,
    /// URI issued, awaiting wallet approval
    Pending,
    /// Session stored
    Done,
}

/// Target mobile platform for deep links
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Os {
    Ios,
    Android,
}

/// Client-level notifications delivered to the UI layer
#[derive(Debug, Clone)]
pub enum WalletEvent {
    /// The wallet session ended (wallet-initiated or expiry)
    Disconnect,
    /// The wallet switched accounts; payload is the wallet-provided data
    AccountChanged(serde_json::Value),
    /// The wallet switched chains; payload is the wallet-provided data
    ChainChanged(serde_json::Value),
    /// Deep link the app should open to foreground the wallet
    OpenApp(String),
}

/// Stream of client-level wallet events
pub type WalletEventStream = Pin<Box<dyn Stream<Item = WalletEvent> + Send>>;

/// Build the required namespaces for a connect request: one `cosmos`
/// namespace covering every requested chain id plus the statically
/// required methods and events.
pub fn required_namespaces(chain_ids: &[&str]) -> BTreeMap<String, Namespace> {
    let namespace = Namespace {
        chains: chain_ids
            .iter()
            .map(|id| format!("{}:{}", COSMOS_NAMESPACE, id))
            .collect(),
        methods: COSMOS_METHODS.iter().map(|m| m.to_string()).collect(),
        events: COSMOS_EVENTS.iter().map(|e| e.to_string()).collect(),
        accounts: Vec::new(),
    };

    let mut namespaces = BTreeMap::new();
    namespaces.insert(COSMOS_NAMESPACE.to_string(), namespace);
    namespaces
}
