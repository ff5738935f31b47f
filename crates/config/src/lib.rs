//! Configuration loading, env substitution, legacy env overrides and
//! validation for the VoceChat bridge.
//!
//! Config files: `vocebot.toml`, `vocebot.yaml`, or `vocebot.json`
//! Searched in `./` then `~/.config/vocebot/`.
//!
//! Supports `${ENV_VAR}` substitution in all string values.

pub mod env_subst;
pub mod loader;
pub mod schema;
pub mod template;
pub mod validate;

pub use {
    loader::{apply_env_overrides, config_dir, discover_and_load, load_config},
    schema::{
        BridgeConfig, HttpActionConfig, HttpWebhookConfig, LogConfig, OneBotConfig,
        VoceChatConfig, WebhookServerConfig,
    },
    template::{default_config_template, write_default_config},
    validate::{Diagnostic, Severity},
};
