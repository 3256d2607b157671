//! Deep-link construction for handing the login over to the BankID app
//!
//! Mobile browsers use the universal/app link so the OS can route to the
//! installed app; desktop browsers use the `bankid://` custom scheme. Both
//! carry a `redirect` URL pointing back at the current page with the launch
//! nonce in its fragment.

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use url::Url;

use crate::platform::Platform;

/// Universal-link base used on iOS and Android.
pub const UNIVERSAL_LINK_BASE: &str = "https://app.bankid.com/";

/// Custom-scheme base used on desktop.
pub const CUSTOM_SCHEME_BASE: &str = "bankid:///";

/// Fragment key carrying the launch nonce on the return URL.
pub const NONCE_FRAGMENT_KEY: &str = "nonce";

/// Characters left unescaped by a browser's `encodeURIComponent`.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Percent-encode a value for use as a single query component.
pub fn encode_component(value: &str) -> String {
    utf8_percent_encode(value, URI_COMPONENT).to_string()
}

/// Reverse [`encode_component`]. Invalid UTF-8 is replaced lossily.
pub fn decode_component(value: &str) -> String {
    percent_decode_str(value).decode_utf8_lossy().into_owned()
}

/// Builds launch URIs for the page at `page_url`.
#[derive(Debug, Clone)]
pub struct DeepLinkBuilder {
    page_url: Url,
}

impl DeepLinkBuilder {
    pub fn new(page_url: Url) -> Self {
        Self { page_url }
    }

    /// The page the app should return to.
    pub fn page_url(&self) -> &Url {
        &self.page_url
    }

    /// Current page address with any existing fragment replaced by
    /// `#nonce=<nonce>`.
    pub fn return_url(&self, nonce: &str) -> Url {
        let mut url = self.page_url.clone();
        url.set_fragment(Some(&format!(
            "{NONCE_FRAGMENT_KEY}={}",
            encode_component(nonce)
        )));
        url
    }

    /// Build the launch URI.
    ///
    /// `token` must be non-empty; callers check for a usable token first.
    pub fn build(&self, platform: Platform, token: &str, nonce: &str) -> String {
        let base = if platform.is_mobile() {
            UNIVERSAL_LINK_BASE
        } else {
            CUSTOM_SCHEME_BASE
        };
        let redirect = encode_component(self.return_url(nonce).as_str());
        format!(
            "{base}?autostarttoken={}&redirect={redirect}",
            encode_component(token)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder() -> DeepLinkBuilder {
        DeepLinkBuilder::new(Url::parse("https://bank.example.se/login").unwrap())
    }

    #[test]
    fn test_desktop_uses_custom_scheme() {
        let uri = builder().build(Platform::Desktop, "TOK123", "n1");
        assert_eq!(
            uri,
            "bankid:///?autostarttoken=TOK123&redirect=https%3A%2F%2Fbank.example.se%2Flogin%23nonce%3Dn1"
        );
    }

    #[test]
    fn test_mobile_uses_universal_link() {
        for platform in [Platform::Ios, Platform::Android] {
            let uri = builder().build(platform, "TOK123", "n1");
            assert!(uri.starts_with("https://app.bankid.com/?autostarttoken=TOK123&redirect="));
            assert!(uri.ends_with("%23nonce%3Dn1"));
        }
    }

    #[test]
    fn test_existing_fragment_is_replaced() {
        let builder =
            DeepLinkBuilder::new(Url::parse("https://bank.example.se/login?x=1#old").unwrap());
        let ret = builder.return_url("abc");
        assert_eq!(ret.as_str(), "https://bank.example.se/login?x=1#nonce=abc");
    }

    #[test]
    fn test_uri_never_contains_raw_fragment() {
        let builder =
            DeepLinkBuilder::new(Url::parse("https://bank.example.se/login#section").unwrap());
        let uri = builder.build(Platform::Ios, "TOK", "n#1 &x");
        assert!(!uri.contains('#'));
        assert!(!uri.contains("section"));
    }

    #[test]
    fn test_redirect_is_never_null() {
        let uri = builder().build(Platform::Android, "TOK", "n1");
        assert!(!uri.contains("redirect=null"));
    }

    #[test]
    fn test_nonce_round_trips_through_encoding() {
        let nonce = "aZ9-_.~ äö/?&=#";
        let uri = builder().build(Platform::Desktop, "TOK", nonce);
        let redirect = uri.split("redirect=").nth(1).unwrap();
        let decoded = Url::parse(&decode_component(redirect)).unwrap();
        let fragment = decoded.fragment().unwrap();
        let value = fragment.strip_prefix("nonce=").unwrap();
        assert_eq!(decode_component(value), nonce);
    }

    #[test]
    fn test_encode_component_matches_browser_unreserved_set() {
        assert_eq!(encode_component("a-b_c.d!e~f*g'h(i)j"), "a-b_c.d!e~f*g'h(i)j");
        assert_eq!(encode_component("a b/c#d=e&f"), "a%20b%2Fc%23d%3De%26f");
    }
}
