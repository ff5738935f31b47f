use std::path::{Path, PathBuf};

use {
    secrecy::Secret,
    tracing::{debug, warn},
};

use crate::{env_subst::substitute_env, schema::BridgeConfig};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &[
    "vocebot.toml",
    "vocebot.yaml",
    "vocebot.yml",
    "vocebot.json",
];

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> anyhow::Result<BridgeConfig> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
    parse_config(&substitute_env(&raw), path)
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. `./vocebot.{toml,yaml,yml,json}`
/// 2. `<user config dir>/vocebot/vocebot.{toml,yaml,yml,json}`
///
/// Falls back to defaults when nothing is found or the file is unreadable.
pub fn discover_and_load() -> BridgeConfig {
    if let Some(path) = find_config_file() {
        debug!(path = %path.display(), "loading config");
        match load_config(&path) {
            Ok(cfg) => return cfg,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
            },
        }
    } else {
        debug!("no config file found, using defaults");
    }
    BridgeConfig::default()
}

fn find_config_file() -> Option<PathBuf> {
    let local = CONFIG_FILENAMES.iter().map(PathBuf::from);
    let global = config_dir()
        .into_iter()
        .flat_map(|dir| CONFIG_FILENAMES.iter().map(move |name| dir.join(name)));
    local.chain(global).find(|p| p.exists())
}

/// User-global config directory (`~/.config/vocebot` on Linux).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "vocebot").map(|d| d.config_dir().to_path_buf())
}

fn parse_config(raw: &str, path: &Path) -> anyhow::Result<BridgeConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");
    match ext {
        "toml" => Ok(toml::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        _ => anyhow::bail!("unsupported config format: .{ext}"),
    }
}

/// Apply the legacy flat environment variables on top of a loaded config.
pub fn apply_env_overrides(cfg: &mut BridgeConfig) -> anyhow::Result<()> {
    apply_env_overrides_with(cfg, |name| std::env::var(name).ok())
}

pub(crate) fn apply_env_overrides_with(
    cfg: &mut BridgeConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<()> {
    let flag = |name: &str| -> Option<bool> {
        lookup(name).map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes"))
    };
    let number = |name: &str| -> anyhow::Result<Option<u64>> {
        lookup(name)
            .map(|v| {
                v.trim()
                    .parse::<u64>()
                    .map_err(|e| anyhow::anyhow!("invalid {name}={v:?}: {e}"))
            })
            .transpose()
    };
    let port = |name: &str| -> anyhow::Result<Option<u16>> {
        number(name)?
            .map(|n| u16::try_from(n).map_err(|_| anyhow::anyhow!("{name} out of range: {n}")))
            .transpose()
    };

    if let Some(v) = lookup("WEBHOOK_HOST") {
        cfg.webhook.bind = v;
    }
    if let Some(v) = port("WEBHOOK_PORT")? {
        cfg.webhook.port = v;
    }

    let vc = &mut cfg.vocechat;
    if let Some(v) = lookup("BOT_SERVER_URL") {
        vc.server_url = v;
    }
    if let Some(v) = lookup("BOT_API_KEY") {
        vc.api_key = Secret::new(v);
    }
    if let Some(v) = lookup("BOT_USER_ID") {
        vc.bot_user_id = v;
    }
    if let Some(v) = lookup("BOT_PLATFORM") {
        vc.platform = v;
    }
    match (flag("PROXY_ENABLED"), lookup("SEND_PROXY")) {
        (Some(false), _) => vc.send_proxy = None,
        (Some(true), Some(proxy)) => vc.send_proxy = Some(proxy),
        _ => {},
    }

    let http = &mut cfg.onebot.http;
    if let Some(v) = flag("HTTP_ENABLED") {
        http.enabled = v;
    }
    if let Some(v) = lookup("HTTP_HOST") {
        http.bind = v;
    }
    if let Some(v) = port("HTTP_PORT")? {
        http.port = v;
    }
    if let Some(v) = lookup("HTTP_ACCESS_TOKEN") {
        http.access_token = (!v.is_empty()).then(|| Secret::new(v));
    }
    if let Some(v) = flag("HTTP_EVENT_ENABLED") {
        http.event_enabled = v;
    }
    if let Some(v) = number("HTTP_EVENT_BUFFER_SIZE")? {
        http.event_buffer_size = usize::try_from(v)?;
    }

    let hook = &mut cfg.onebot.http_webhook;
    if let Some(v) = flag("HTTP_WEBHOOK_ENABLED") {
        hook.enabled = v;
    }
    if let Some(v) = lookup("HTTP_WEBHOOK_URL") {
        hook.url = v;
    }

    if let Some(v) = lookup("LOG_LEVEL") {
        cfg.log.level = v.to_ascii_lowercase();
    }
    Ok(())
}
