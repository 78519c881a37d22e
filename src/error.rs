//! Error Types
//!
//! Unified error handling for the wallet client and its transport seam.

use thiserror::Error;

/// Errors raised by the relay transport itself. These pass through the
/// client unchanged so callers can distinguish a wallet rejection from a
/// relay outage.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Relay/network failure (connection dropped, publish failed, etc.)
    #[error("relay error: {0}")]
    Relay(String),

    /// The wallet rejected the request
    #[error("request rejected: {0}")]
    Rejected(String),

    /// No session or pairing exists for the given topic
    #[error("unknown topic: {0}")]
    UnknownTopic(String),
}

/// Errors surfaced by the wallet client
#[derive(Debug, Error)]
pub enum WalletError {
    /// The connection timeout guard fired before the wallet approved
    #[error("connection timed out waiting for wallet approval")]
    ConnectionTimeout,

    /// A connect attempt is already in flight on this client
    #[error("a connection attempt is already in flight")]
    AlreadyConnecting,

    /// An in-flight connect attempt was cancelled by a reset
    #[error("connection attempt aborted")]
    Aborted,

    /// No live wallet session to serve the request
    #[error("no active wallet session")]
    NotConnected,

    /// Persisted-state cleanup failed
    #[error("storage error: {0}")]
    Storage(String),

    /// Remote session bookkeeping failed
    #[error("session error: {0}")]
    Session(String),

    /// Transport-raised error, passed through unchanged
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Response parsing failed
    #[error("parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// A wire field failed to decode (base64, bech32)
    #[error("encoding error: {0}")]
    Encoding(String),

    /// The wallet returned malformed account data
    #[error("invalid account data: {0}")]
    InvalidAccount(String),
}
