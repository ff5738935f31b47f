//! Commented starter config written by `vocebot init`.

use std::{io::Write, path::Path};

/// Default config template with every option and its default.
pub fn default_config_template() -> &'static str {
    r##"# vocebot configuration
# =====================
# Defaults are shown. Uncomment and modify settings as needed.
# Environment variable substitution is supported: ${ENV_VAR} or ${ENV_VAR:-fallback}
# The legacy flat variables (BOT_API_KEY, WEBHOOK_PORT, ...) override this file.

# ══════════════════════════════════════════════════════════════════════════════
# VOCECHAT WEBHOOK LISTENER
# ══════════════════════════════════════════════════════════════════════════════
# Point the bot's webhook URL in VoceChat at http://<bind>:<port>/

[webhook]
bind = "0.0.0.0"
port = 8000

# ══════════════════════════════════════════════════════════════════════════════
# VOCECHAT SERVER
# ══════════════════════════════════════════════════════════════════════════════

[vocechat]
server_url = "http://127.0.0.1:3000"     # Without trailing /api
api_key = "${BOT_API_KEY}"               # Bot API key (required)
bot_user_id = "2"                        # User id of the bot account
platform = "vocechat"                    # Platform reported in OneBot "self"
contact_store = "friend_list.json"       # Contact directory persistence file
# send_proxy = "http://127.0.0.1:7897"   # Proxy for send, reply and upload calls

# ══════════════════════════════════════════════════════════════════════════════
# ONEBOT 12
# ══════════════════════════════════════════════════════════════════════════════

[onebot]
impl_name = "vocechat-onebot"

[onebot.http]                            # Clients POST actions to http://<bind>:<port>/
enabled = true
bind = "0.0.0.0"
port = 8080
# access_token = "${HTTP_ACCESS_TOKEN}"
event_enabled = true                     # Expose get_latest_events
event_buffer_size = 20

[onebot.http_webhook]                    # Events are POSTed to url
enabled = false
url = ""
# access_token = ""

# ══════════════════════════════════════════════════════════════════════════════
# LOGGING
# ══════════════════════════════════════════════════════════════════════════════

[log]
level = "info"                           # Used when RUST_LOG is unset
json = false
"##
}

/// Write the template to `path`, refusing to overwrite an existing file.
pub fn write_default_config(path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::AlreadyExists => {
                anyhow::anyhow!("{} already exists, not overwriting", path.display())
            },
            _ => anyhow::anyhow!("failed to create {}: {e}", path.display()),
        })?;
    file.write_all(default_config_template().as_bytes())?;
    Ok(())
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, crate::schema::BridgeConfig};

    #[test]
    fn template_parses_to_defaults() {
        let cfg: BridgeConfig = toml::from_str(default_config_template()).unwrap();
        let defaults = BridgeConfig::default();
        assert_eq!(cfg.webhook.port, defaults.webhook.port);
        assert_eq!(cfg.vocechat.server_url, defaults.vocechat.server_url);
        assert_eq!(cfg.onebot.http.port, defaults.onebot.http.port);
        assert_eq!(cfg.onebot.impl_name, defaults.onebot.impl_name);
    }

    #[test]
    fn refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("vocebot.toml");
        write_default_config(&path).unwrap();
        std::fs::write(&path, "# edited").unwrap();

        let err = write_default_config(&path).unwrap_err();
        assert!(err.to_string().contains("already exists"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "# edited");
    }
}
