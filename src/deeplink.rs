//! Native Deep-Link Formatting
//!
//! Builds the platform-specific URL that foregrounds a mobile wallet with a
//! pairing URI. Pure string work; callers decide whether to navigate.

use tracing::error;

use crate::types::Os;

/// Build a platform-appropriate wallet-invocation URL from a pairing URI.
///
/// iOS uses the custom scheme directly; Android wraps the same form in an
/// intent suffix carrying the package and scheme. An unknown OS falls back
/// to the iOS-style form. Returns an empty string if the pairing URI is
/// unusable, signalling "do not attempt navigation".
pub fn format_native_url(
    app_url: &str,
    wc_uri: &str,
    os: Option<Os>,
    android_package: &str,
) -> String {
    if wc_uri.is_empty() {
        error!("cannot format native url: empty pairing uri");
        return String::new();
    }

    let scheme = app_url.split(':').next().unwrap_or(app_url);
    let encoded = encode_uri_component(wc_uri);

    match os {
        Some(Os::Android) => format!(
            "{}://wcV2?{}#Intent;package={};scheme={};end;",
            scheme, encoded, android_package, scheme
        ),
        _ => format!("{}://wcV2?{}", scheme, encoded),
    }
}

/// Percent-encode a string the way `encodeURIComponent` does: everything
/// except ASCII alphanumerics and `- _ . ! ~ * ' ( )` is escaped.
pub fn encode_uri_component(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for byte in input.bytes() {
        match byte {
            b'A'..=b'Z'
            | b'a'..=b'z'
            | b'0'..=b'9'
            | b'-'
            | b'_'
            | b'.'
            | b'!'
            | b'~'
            | b'*'
            | b'\''
            | b'('
            | b')' => out.push(byte as char),
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_uri_component() {
        assert_eq!(
            encode_uri_component("wc:abc@2?relay-protocol=irn&symKey=ff"),
            "wc%3Aabc%402%3Frelay-protocol%3Dirn%26symKey%3Dff"
        );
        assert_eq!(encode_uri_component("plain-text_1.0"), "plain-text_1.0");
    }

    #[test]
    fn test_ios_url() {
        let url = format_native_url("arculuswc:", "wc:xyz", Some(Os::Ios), "co.arculus.wallet.android");
        assert_eq!(url, "arculuswc://wcV2?wc%3Axyz");
    }

    #[test]
    fn test_android_url_has_intent_suffix() {
        let url = format_native_url(
            "arculuswc:",
            "wc:xyz",
            Some(Os::Android),
            "co.arculus.wallet.android",
        );
        assert!(url.contains("wc%3Axyz"));
        assert!(url.ends_with("#Intent;package=co.arculus.wallet.android;scheme=arculuswc;end;"));
    }

    #[test]
    fn test_unknown_os_falls_back_to_ios_form() {
        let url = format_native_url("arculuswc:", "wc:xyz", None, "co.arculus.wallet.android");
        assert_eq!(url, "arculuswc://wcV2?wc%3Axyz");
    }

    #[test]
    fn test_empty_uri_yields_empty_string() {
        let url = format_native_url("arculuswc:", "", Some(Os::Ios), "co.arculus.wallet.android");
        assert!(url.is_empty());
    }
}
