use std::net::SocketAddr;

use serde::Deserialize;

/// Global application configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Twitch application client id
    pub client_id: String,

    /// Twitch application client secret
    pub client_secret: String,

    /// Shared secret used to sign EventSub deliveries
    pub webhook_secret: String,

    /// Broadcaster whose latest video is checked on `stream.offline`
    pub streamer_id: String,

    /// Target game name (only consulted when `require_game_match` is set)
    pub target_game: Option<String>,

    /// Lower-cased title keywords; any one of them is enough to match
    pub keywords: Vec<String>,

    /// Require the video's game to equal `target_game` in addition to a keyword match
    pub require_game_match: bool,

    /// Telegram bot token
    pub telegram_bot_token: String,

    /// Telegram chat receiving the alerts
    pub telegram_chat_id: String,

    /// Audit sink (Google Apps Script) URL; audit logging is disabled when unset
    pub audit_url: Option<String>,

    /// Token sent along with every audit record
    pub audit_secret: Option<String>,

    /// Address the HTTP server binds to (default: 0.0.0.0:3000)
    pub bind_addr: SocketAddr,

    /// Per-request timeout for outbound HTTP calls in seconds (default: 10)
    pub http_timeout_secs: u64,

    /// OAuth token endpoint (default: https://id.twitch.tv/oauth2/token)
    pub twitch_auth_url: String,

    /// Helix API base URL (default: https://api.twitch.tv/helix)
    pub twitch_api_url: String,

    /// Telegram Bot API base URL (default: https://api.telegram.org)
    pub telegram_api_url: String,

    /// Base for canonical VOD links (default: https://twitch.tv)
    pub vod_base_url: String,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    ///
    /// Values are trimmed and empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let required = |key: &str| {
            get(key).ok_or_else(|| anyhow::anyhow!("{} environment variable is required", key))
        };

        let require_game_match = match get("REQUIRE_GAME_MATCH") {
            Some(raw) => parse_flag(&raw)
                .ok_or_else(|| anyhow::anyhow!("REQUIRE_GAME_MATCH must be true or false"))?,
            None => false,
        };
        let target_game = get("GAME_NAME");
        if require_game_match && target_game.is_none() {
            anyhow::bail!("GAME_NAME environment variable is required when REQUIRE_GAME_MATCH is set");
        }

        let audit_url = get("GOOGLE_SCRIPT_URL");
        let audit_secret = get("GOOGLE_SECRET");
        if audit_url.is_some() && audit_secret.is_none() {
            anyhow::bail!("GOOGLE_SECRET environment variable is required when GOOGLE_SCRIPT_URL is set");
        }

        Ok(Self {
            client_id: required("CLIENT_ID")?,
            client_secret: required("CLIENT_SECRET")?,
            webhook_secret: required("TWITCH_WEBHOOK_SECRET")?,
            streamer_id: required("TWITCH_STREAMER_ID")?,
            target_game,
            keywords: parse_keywords(&required("KEYWORDS")?),
            require_game_match,
            telegram_bot_token: required("TELEGRAM_BOT_TOKEN")?,
            telegram_chat_id: required("TELEGRAM_CHAT_ID")?,
            audit_url,
            audit_secret,
            bind_addr: get("BIND_ADDR")
                .unwrap_or_else(|| "0.0.0.0:3000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("BIND_ADDR must be a valid socket address"))?,
            http_timeout_secs: get("HTTP_TIMEOUT_SECS")
                .unwrap_or_else(|| "10".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("HTTP_TIMEOUT_SECS must be a valid u64"))?,
            twitch_auth_url: get("TWITCH_AUTH_URL")
                .unwrap_or_else(|| "https://id.twitch.tv/oauth2/token".to_string()),
            twitch_api_url: trim_slash(
                get("TWITCH_API_URL").unwrap_or_else(|| "https://api.twitch.tv/helix".to_string()),
            ),
            telegram_api_url: trim_slash(
                get("TELEGRAM_API_URL").unwrap_or_else(|| "https://api.telegram.org".to_string()),
            ),
            vod_base_url: trim_slash(
                get("VOD_BASE_URL").unwrap_or_else(|| "https://twitch.tv".to_string()),
            ),
        })
    }
}

/// Split a comma-separated keyword list into trimmed, lower-cased, non-empty entries.
pub fn parse_keywords(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|k| k.trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .collect()
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn trim_slash(url: String) -> String {
    url.trim_end_matches('/').to_string()
}
