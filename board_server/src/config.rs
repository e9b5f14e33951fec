//! Build board configuration, loaded from environment variables.

use std::path::PathBuf;

/// Application whose builds are shown when `BUDDYBUILD_APP_ID` is unset.
pub const DEFAULT_APP_ID: &str = "57bf25c0f096bc01001e21e0";

#[derive(Clone, Debug)]
pub struct BoardConfig {
    /// buddybuild API access token, sent as a bearer token.
    pub access_token: String,
    /// Base URL of the buddybuild API, without a trailing slash.
    pub api_url: String,
    /// buddybuild application id to list builds for.
    pub app_id: String,
    /// Display name shown at the top of the board.
    pub application: String,
    /// Page template, read on every request.
    pub template_path: PathBuf,
}

impl BoardConfig {
    pub fn from_env() -> Self {
        let config = Self::from_lookup(|name| std::env::var(name).ok());

        if config.access_token.is_empty() {
            tracing::warn!("BUDDYBUILD_ACCESS_KEY not set -- upstream requests will be unauthorized");
        }

        config
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let access_token = lookup("BUDDYBUILD_ACCESS_KEY").unwrap_or_default();
        let api_url = lookup("BUDDYBUILD_API_URL")
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "https://api.buddybuild.com".to_string())
            .trim_end_matches('/')
            .to_string();
        let app_id = lookup("BUDDYBUILD_APP_ID")
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_APP_ID.to_string());
        let application = lookup("BOARD_APPLICATION")
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "Fennec".to_string());
        let template_path = lookup("BOARD_TEMPLATE")
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("templates/main.html"));

        Self {
            access_token,
            api_url,
            app_id,
            application,
            template_path,
        }
    }
}
