//! WalletConnect session SDK for Cosmos chains.
//!
//! Presents a uniform wallet surface (connect, disconnect, account lookup,
//! direct/amino signing) over relay-connected mobile wallets. The session
//! lifecycle — pairing, approval timeout, restoration, event-driven
//! disconnect detection, persisted-state cleanup — lives in
//! [`client::WcClient`]; the relay itself is consumed through the
//! [`transport::SignTransport`] seam, so any sign-client implementation
//! can be plugged in.

pub mod client;
pub mod deeplink;
pub mod error;
pub mod registry;
pub mod signer;
pub mod storage;
pub mod transport;
pub mod types;

pub use client::{ClientOptions, TransportFactory, WcClient, DEFAULT_CONNECT_TIMEOUT};
pub use error::{TransportError, WalletError};
pub use registry::{WalletInfo, WalletMode, WcEndpoint};
pub use signer::{AccountData, PubKey, SignDoc, SignResponse, SignatureInfo, StdSignDoc};
pub use storage::{
    CleanupMode, DatabaseStore, KeyValueStore, MemoryStore, StorageError, StorageJanitor,
};
pub use transport::{ConnectProposal, SignTransport, TransportEvent};
pub use types::{
    ConnectionState, Namespace, Os, Pairing, PeerMetadata, Session, WalletEvent, WalletEventStream,
};
