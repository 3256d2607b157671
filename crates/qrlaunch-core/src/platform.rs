//! Platform families that determine deep-link shape and install links

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static IOS_AGENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"iPad|iPhone|iPod").expect("valid iOS user-agent regex"));

static ANDROID_AGENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Android").expect("valid Android user-agent regex"));

/// Browser platform family hosting the login page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Ios,
    Android,
    #[default]
    Desktop,
}

impl Platform {
    /// Classify a browser user-agent string.
    ///
    /// Anything that is neither an iOS device nor Android is treated as a
    /// desktop browser.
    pub fn from_user_agent(user_agent: &str) -> Self {
        if IOS_AGENT.is_match(user_agent) {
            Platform::Ios
        } else if ANDROID_AGENT.is_match(user_agent) {
            Platform::Android
        } else {
            Platform::Desktop
        }
    }

    /// Mobile platforms launch through universal/app links.
    pub fn is_mobile(&self) -> bool {
        matches!(self, Platform::Ios | Platform::Android)
    }

    /// Where to send the user when the app could not be opened.
    pub fn install_url(&self) -> &'static str {
        match self {
            Platform::Ios => "https://apps.apple.com/se/app/bankid-s%C3%A4kerhetsapp/id433151512",
            Platform::Android => "https://play.google.com/store/apps/details?id=com.bankid.bus",
            Platform::Desktop => "https://install.bankid.com/",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Platform::Ios => write!(f, "ios"),
            Platform::Android => write!(f, "android"),
            Platform::Desktop => write!(f, "desktop"),
        }
    }
}

impl std::str::FromStr for Platform {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ios" => Ok(Platform::Ios),
            "android" => Ok(Platform::Android),
            "desktop" => Ok(Platform::Desktop),
            other => Err(crate::error::Error::config_invalid(format!(
                "unknown platform '{other}' (expected ios, android or desktop)"
            ))),
        }
    }
}
