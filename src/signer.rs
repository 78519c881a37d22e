//! Wallet Signing Interface
//!
//! Account lookup and transaction signing over an active wallet session.
//! Requests go out as `cosmos_*` JSON-RPC calls addressed to
//! `cosmos:<chain-id>`; binary fields cross the wire base64-encoded.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::client::WcClient;
use crate::error::WalletError;

/// Protobuf sign doc for `cosmos_signDirect`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignDoc {
    pub body_bytes: Vec<u8>,
    pub auth_info_bytes: Vec<u8>,
    pub chain_id: String,
    pub account_number: u64,
}

/// Amino JSON sign doc for `cosmos_signAmino`. Serialized field order
/// matches the canonical sorted-key encoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StdSignDoc {
    pub account_number: String,
    pub chain_id: String,
    pub fee: serde_json::Value,
    pub memo: String,
    pub msgs: Vec<serde_json::Value>,
    pub sequence: String,
}

/// Account the wallet grants for a chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountData {
    /// Bech32 account address
    pub address: String,
    /// Key algorithm, e.g. `secp256k1`
    pub algo: String,
    /// Base64-encoded public key bytes
    pub pubkey: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PubKey {
    #[serde(rename = "type")]
    pub key_type: String,
    /// Base64-encoded key bytes
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignatureInfo {
    pub pub_key: PubKey,
    /// Base64-encoded signature bytes
    pub signature: String,
}

impl SignatureInfo {
    pub fn signature_bytes(&self) -> Result<Vec<u8>, WalletError> {
        BASE64
            .decode(&self.signature)
            .map_err(|e| WalletError::Encoding(e.to_string()))
    }
}

/// Response to a sign request: the signature plus the document actually
/// signed, since wallets may patch fee or memo before signing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignResponse {
    pub signature: SignatureInfo,
    #[serde(default)]
    pub signed: Option<serde_json::Value>,
}

impl WcClient {
    /// First account the wallet grants for `chain_id`
    pub async fn get_account(&self, chain_id: &str) -> Result<AccountData, WalletError> {
        self.get_accounts(chain_id)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| WalletError::InvalidAccount("wallet returned no accounts".to_string()))
    }

    /// All accounts the wallet grants for `chain_id`. Addresses are
    /// validated as bech32 before being handed to the caller.
    pub async fn get_accounts(&self, chain_id: &str) -> Result<Vec<AccountData>, WalletError> {
        let response = self
            .request_current(chain_id, "cosmos_getAccounts", json!({}))
            .await?;
        let accounts: Vec<AccountData> = serde_json::from_value(response)?;

        for account in &accounts {
            bech32::decode(&account.address).map_err(|e| {
                WalletError::InvalidAccount(format!("bad address {}: {}", account.address, e))
            })?;
        }
        Ok(accounts)
    }

    /// Sign a protobuf sign doc over the active session
    pub async fn sign_direct(
        &self,
        chain_id: &str,
        signer: &str,
        doc: &SignDoc,
    ) -> Result<SignResponse, WalletError> {
        debug!("requesting direct signature on {}", chain_id);
        let params = json!({
            "signerAddress": signer,
            "signDoc": {
                "bodyBytes": BASE64.encode(&doc.body_bytes),
                "authInfoBytes": BASE64.encode(&doc.auth_info_bytes),
                "chainId": doc.chain_id,
                "accountNumber": doc.account_number.to_string(),
            },
        });

        let response = self
            .request_current(chain_id, "cosmos_signDirect", params)
            .await?;
        Ok(serde_json::from_value(response)?)
    }

    /// Sign an amino JSON sign doc over the active session
    pub async fn sign_amino(
        &self,
        chain_id: &str,
        signer: &str,
        doc: &StdSignDoc,
    ) -> Result<SignResponse, WalletError> {
        debug!("requesting amino signature on {}", chain_id);
        let params = json!({
            "signerAddress": signer,
            "signDoc": serde_json::to_value(doc)?,
        });

        let response = self
            .request_current(chain_id, "cosmos_signAmino", params)
            .await?;
        Ok(serde_json::from_value(response)?)
    }
}
