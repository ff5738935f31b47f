//! Semantic checks on a fully resolved [`BridgeConfig`].

use secrecy::ExposeSecret;

use crate::schema::BridgeConfig;

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
        }
    }
}

/// A single validation diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Dotted path, e.g. "vocechat.server_url"
    pub path: String,
    pub message: String,
}

impl Diagnostic {
    fn error(path: &str, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            path: path.into(),
            message: message.into(),
        }
    }

    fn warning(path: &str, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            path: path.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} [{}]: {}", self.severity, self.path, self.message)
    }
}

impl BridgeConfig {
    /// Check the config for problems that would prevent or degrade startup.
    #[must_use]
    pub fn validate(&self) -> Vec<Diagnostic> {
        let mut out = Vec::new();

        let vc = &self.vocechat;
        if vc.server_url.trim().is_empty() {
            out.push(Diagnostic::error("vocechat.server_url", "must be set"));
        } else if let Err(e) = check_http_url(&vc.server_url) {
            out.push(Diagnostic::error("vocechat.server_url", e));
        }
        let api_key = vc.api_key.expose_secret();
        if api_key.trim().is_empty() {
            out.push(Diagnostic::error("vocechat.api_key", "must be set"));
        } else if api_key.contains("${") {
            out.push(Diagnostic::error(
                "vocechat.api_key",
                "contains an unresolved ${...} placeholder",
            ));
        }
        if vc.bot_user_id.trim().is_empty() {
            out.push(Diagnostic::error("vocechat.bot_user_id", "must be set"));
        }
        if let Some(proxy) = &vc.send_proxy
            && let Err(e) = check_http_url(proxy)
        {
            out.push(Diagnostic::error("vocechat.send_proxy", e));
        }

        let http = &self.onebot.http;
        if http.enabled {
            if http.access_token.is_none() {
                out.push(Diagnostic::warning(
                    "onebot.http.access_token",
                    "action endpoint accepts unauthenticated requests",
                ));
            }
            if http.port == self.webhook.port && http.bind == self.webhook.bind {
                out.push(Diagnostic::error(
                    "onebot.http.port",
                    format!("conflicts with webhook listener on port {}", http.port),
                ));
            }
            if http.event_enabled && http.event_buffer_size == 0 {
                out.push(Diagnostic::warning(
                    "onebot.http.event_buffer_size",
                    "0 is raised to 1",
                ));
            }
        }

        let hook = &self.onebot.http_webhook;
        if hook.enabled {
            if hook.url.trim().is_empty() {
                out.push(Diagnostic::error("onebot.http_webhook.url", "must be set"));
            } else if let Err(e) = check_http_url(&hook.url) {
                out.push(Diagnostic::error("onebot.http_webhook.url", e));
            }
        }

        if !http.enabled && !hook.enabled {
            out.push(Diagnostic::warning(
                "onebot",
                "no OneBot transport enabled; events are dropped and actions unreachable",
            ));
        }

        out
    }
}

fn check_http_url(raw: &str) -> Result<(), String> {
    let url = url::Url::parse(raw).map_err(|e| format!("invalid URL {raw:?}: {e}"))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(format!("unsupported URL scheme {other:?}")),
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest, secrecy::Secret};

    fn valid() -> BridgeConfig {
        let mut cfg = BridgeConfig::default();
        cfg.vocechat.api_key = Secret::new("key".into());
        cfg.onebot.http.access_token = Some(Secret::new("tok".into()));
        cfg
    }

    fn errors(cfg: &BridgeConfig) -> Vec<String> {
        cfg.validate()
            .into_iter()
            .filter(|d| d.severity == Severity::Error)
            .map(|d| d.path)
            .collect()
    }

    #[test]
    fn default_with_key_is_clean() {
        assert!(valid().validate().is_empty());
    }

    #[test]
    fn missing_credentials_are_errors() {
        let mut cfg = valid();
        cfg.vocechat.server_url.clear();
        cfg.vocechat.api_key = Secret::new(String::new());
        assert_eq!(errors(&cfg), vec![
            "vocechat.server_url",
            "vocechat.api_key"
        ]);
    }

    #[test]
    fn unresolved_placeholder_key() {
        let mut cfg = valid();
        cfg.vocechat.api_key = Secret::new("${BOT_API_KEY}".into());
        assert_eq!(errors(&cfg), vec!["vocechat.api_key"]);
    }

    #[rstest]
    #[case("not a url")]
    #[case("ftp://chat.example.com")]
    fn bad_server_url(#[case] url: &str) {
        let mut cfg = valid();
        cfg.vocechat.server_url = url.into();
        assert_eq!(errors(&cfg), vec!["vocechat.server_url"]);
    }

    #[test]
    fn enabled_webhook_needs_url() {
        let mut cfg = valid();
        cfg.onebot.http_webhook.enabled = true;
        assert_eq!(errors(&cfg), vec!["onebot.http_webhook.url"]);
    }

    #[test]
    fn port_clash_is_an_error() {
        let mut cfg = valid();
        cfg.onebot.http.port = cfg.webhook.port;
        assert_eq!(errors(&cfg), vec!["onebot.http.port"]);
    }

    #[test]
    fn open_action_endpoint_warns() {
        let mut cfg = valid();
        cfg.onebot.http.access_token = None;
        let diags = cfg.validate();
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].severity, Severity::Warning);
        assert!(diags[0].to_string().starts_with("warning [onebot.http.access_token]"));
    }
}
