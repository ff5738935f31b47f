/// Config schema types (webhook listener, VoceChat account, OneBot transports, logging).
use std::path::PathBuf;

use {
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub webhook: WebhookServerConfig,
    pub vocechat: VoceChatConfig,
    pub onebot: OneBotConfig,
    pub log: LogConfig,
}

/// Listener for VoceChat's bot webhook.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhookServerConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for WebhookServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".into(),
            port: 8000,
        }
    }
}

/// VoceChat server and bot account.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VoceChatConfig {
    /// Base URL of the VoceChat server, without trailing `/api`.
    pub server_url: String,

    /// Bot API key sent as `x-api-key`.
    #[serde(serialize_with = "serialize_secret")]
    pub api_key: Secret<String>,

    /// User id of the bot account on the server.
    pub bot_user_id: String,

    /// Platform name reported in OneBot `self`.
    pub platform: String,

    /// Optional HTTP proxy for send, reply and upload calls.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub send_proxy: Option<String>,

    /// JSON file holding the contact directory.
    pub contact_store: PathBuf,
}

impl std::fmt::Debug for VoceChatConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VoceChatConfig")
            .field("server_url", &self.server_url)
            .field("api_key", &"[REDACTED]")
            .field("bot_user_id", &self.bot_user_id)
            .field("platform", &self.platform)
            .field("send_proxy", &self.send_proxy)
            .field("contact_store", &self.contact_store)
            .finish()
    }
}

impl Default for VoceChatConfig {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:3000".into(),
            api_key: Secret::new(String::new()),
            bot_user_id: "2".into(),
            platform: "vocechat".into(),
            send_proxy: None,
            contact_store: PathBuf::from("friend_list.json"),
        }
    }
}

/// OneBot side: implementation identity and enabled transports.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OneBotConfig {
    pub impl_name: String,
    pub http: HttpActionConfig,
    pub http_webhook: HttpWebhookConfig,
}

impl Default for OneBotConfig {
    fn default() -> Self {
        Self {
            impl_name: "vocechat-onebot".into(),
            http: HttpActionConfig::default(),
            http_webhook: HttpWebhookConfig::default(),
        }
    }
}

/// OneBot HTTP transport: clients POST actions, optionally poll events.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpActionConfig {
    pub enabled: bool,
    pub bind: String,
    pub port: u16,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_option_secret"
    )]
    pub access_token: Option<Secret<String>>,
    /// Buffer events for `get_latest_events`.
    pub event_enabled: bool,
    pub event_buffer_size: usize,
}

impl std::fmt::Debug for HttpActionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpActionConfig")
            .field("enabled", &self.enabled)
            .field("bind", &self.bind)
            .field("port", &self.port)
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("event_enabled", &self.event_enabled)
            .field("event_buffer_size", &self.event_buffer_size)
            .finish()
    }
}

impl Default for HttpActionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind: "0.0.0.0".into(),
            port: 8080,
            access_token: None,
            event_enabled: true,
            event_buffer_size: 20,
        }
    }
}

/// OneBot HTTP webhook transport: events are POSTed to `url`.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpWebhookConfig {
    pub enabled: bool,
    pub url: String,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_option_secret"
    )]
    pub access_token: Option<Secret<String>>,
}

impl std::fmt::Debug for HttpWebhookConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpWebhookConfig")
            .field("enabled", &self.enabled)
            .field("url", &self.url)
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Default filter when `RUST_LOG` is unset.
    pub level: String,
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            json: false,
        }
    }
}

// ── Serde helpers for Secret<String> ────────────────────────────────────────

fn serialize_secret<S: serde::Serializer>(
    secret: &Secret<String>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}

fn serialize_option_secret<S: serde::Serializer>(
    secret: &Option<Secret<String>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match secret {
        Some(s) => serializer.serialize_some(s.expose_secret()),
        None => serializer.serialize_none(),
    }
}
