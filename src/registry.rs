//! Wallet Registry Metadata
//!
//! Static descriptions of the wallets this SDK can drive: identity, mode,
//! download links, and the WalletConnect endpoint used for deep-linking and
//! peer filtering.

use serde::{Deserialize, Serialize};

use crate::deeplink::format_native_url;
use crate::types::Os;

/// How the wallet is reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WalletMode {
    /// Browser extension / in-app injection
    Extension,
    /// Mobile app over a WalletConnect relay
    WalletConnect,
}

/// Install link for one device/browser combination
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadLink {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub os: Option<Os>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub browser: Option<String>,
    pub link: String,
}

/// Native app schemes per platform
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NativeSchemes {
    pub ios: String,
    pub android: String,
}

/// WalletConnect endpoint details for a relay-connected wallet
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WcEndpoint {
    /// Peer metadata name the wallet reports over the relay; sessions are
    /// filtered to this identity
    pub peer_name: String,
    pub project_id: String,
    pub native: NativeSchemes,
    /// Android package for intent-style deep links
    pub android_package: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub universal: Option<String>,
}

impl WcEndpoint {
    /// Format the deep link that opens the wallet app with a pairing URI
    pub fn deep_link(&self, wc_uri: &str, os: Option<Os>) -> String {
        let app_url = match os {
            Some(Os::Android) => &self.native.android,
            _ => &self.native.ios,
        };
        format_native_url(app_url, wc_uri, os, &self.android_package)
    }
}

/// Registry entry for one wallet integration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletInfo {
    pub name: String,
    pub pretty_name: String,
    pub mode: WalletMode,
    pub supported_chains: Vec<String>,
    pub downloads: Vec<DownloadLink>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub walletconnect: Option<WcEndpoint>,
}

impl WalletInfo {
    /// Peer identity string used to filter transport sessions. Relay
    /// wallets report their WalletConnect peer name; extension wallets
    /// fall back to the pretty name.
    pub fn peer_name(&self) -> &str {
        self.walletconnect
            .as_ref()
            .map(|wc| wc.peer_name.as_str())
            .unwrap_or(&self.pretty_name)
    }

    /// Arculus mobile app reached over a WalletConnect relay
    pub fn arculus_mobile() -> Self {
        Self {
            name: "arculus-mobile".to_string(),
            pretty_name: "Arculus Mobile".to_string(),
            mode: WalletMode::WalletConnect,
            supported_chains: vec![
                "cosmoshub".to_string(),
                "osmosis".to_string(),
                "provenance".to_string(),
            ],
            downloads: vec![
                DownloadLink {
                    device: Some("mobile".to_string()),
                    os: Some(Os::Android),
                    browser: None,
                    link: "https://play.google.com/store/apps/details?id=co.arculus.wallet.android"
                        .to_string(),
                },
                DownloadLink {
                    device: Some("mobile".to_string()),
                    os: Some(Os::Ios),
                    browser: None,
                    link: "https://apps.apple.com/us/app/arculus-wallet/id1575425801".to_string(),
                },
            ],
            walletconnect: Some(WcEndpoint {
                peer_name: "Arculus Wallet".to_string(),
                project_id: "d5235b42fc7273823b6dc3214c822da3".to_string(),
                native: NativeSchemes {
                    ios: "arculuswc:".to_string(),
                    android: "arculuswc:".to_string(),
                },
                android_package: "co.arculus.wallet.android".to_string(),
                universal: Some("https://gw.arculus.co/app/wc".to_string()),
            }),
        }
    }

    /// Arculus browser extension / in-app injection
    pub fn arculus_extension() -> Self {
        Self {
            name: "arculus-extension".to_string(),
            pretty_name: "Arculus".to_string(),
            mode: WalletMode::Extension,
            supported_chains: vec![
                "cosmoshub".to_string(),
                "osmosis".to_string(),
                "provenance".to_string(),
            ],
            downloads: vec![
                DownloadLink {
                    device: Some("desktop".to_string()),
                    os: None,
                    browser: Some("chrome".to_string()),
                    link: "https://chrome.google.com/webstore/detail/arculus/dmkamcknogkgcdfhhbddcghachkejeap?hl=en"
                        .to_string(),
                },
                DownloadLink {
                    device: Some("desktop".to_string()),
                    os: None,
                    browser: Some("firefox".to_string()),
                    link: "https://addons.mozilla.org/en-US/firefox/addon/arculus/".to_string(),
                },
            ],
            walletconnect: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arculus_mobile_metadata() {
        let info = WalletInfo::arculus_mobile();
        assert_eq!(info.mode, WalletMode::WalletConnect);
        assert_eq!(info.peer_name(), "Arculus Wallet");

        let wc = info.walletconnect.unwrap();
        assert_eq!(wc.native.ios, "arculuswc:");
        assert_eq!(wc.android_package, "co.arculus.wallet.android");
    }

    #[test]
    fn test_extension_peer_name_falls_back_to_pretty_name() {
        let info = WalletInfo::arculus_extension();
        assert_eq!(info.peer_name(), "Arculus");
    }

    #[test]
    fn test_deep_link_roundtrip() {
        let info = WalletInfo::arculus_mobile();
        let wc = info.walletconnect.unwrap();

        let url = wc.deep_link("wc:xyz", Some(Os::Android));
        assert!(url.starts_with("arculuswc://wcV2?wc%3Axyz"));
        assert!(url.contains("package=co.arculus.wallet.android"));
    }
}
