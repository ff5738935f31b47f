//! Inbound normalizer: VoceChat webhook payload → canonical message event.

use std::sync::LazyLock;

use {
    regex::Regex,
    serde::{Deserialize, Deserializer},
    serde_json::Value,
    vocebot_onebot::{MediaKind, MessageEvent, MessageSegment, Scope},
};

use crate::{api::id_string, error::Result};

/// Content type of a webhook message that carries an uploaded file.
const FILE_CONTENT_TYPE: &str = "vocechat/file";

/// `@<uid>` followed by whitespace.
static MENTION: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"@(\d+)\s").ok());

/// Body of a VoceChat bot webhook call.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookPayload {
    #[serde(default, deserialize_with = "lenient_id")]
    pub mid: String,
    #[serde(default, deserialize_with = "lenient_id")]
    pub from_uid: String,
    #[serde(default)]
    pub target: WebhookTarget,
    #[serde(default)]
    pub detail: WebhookDetail,
    /// Milliseconds since the unix epoch.
    #[serde(default)]
    pub created_at: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookTarget {
    #[serde(default)]
    pub gid: Option<Value>,
    #[serde(default)]
    pub uid: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookDetail {
    /// `"normal"`, `"reply"`, ...
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    /// Quoted message id for replies.
    #[serde(default)]
    pub mid: Option<Value>,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub content_type: String,
    #[serde(default)]
    pub properties: Option<Value>,
}

impl WebhookPayload {
    pub fn parse(body: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(body)?)
    }

    pub fn scope(&self) -> Scope {
        match &self.target.gid {
            Some(gid) => Scope::Group {
                group_id: id_string(gid),
            },
            None => Scope::Direct {
                user_id: self.from_uid.clone(),
            },
        }
    }

    /// Sub-content-type reported for file messages, e.g. `image/png`.
    fn file_content_type(&self) -> Option<&str> {
        self.detail
            .properties
            .as_ref()?
            .get("content_type")?
            .as_str()
    }
}

fn lenient_id<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<String, D::Error> {
    Ok(id_string(&Value::deserialize(deserializer)?))
}

/// Build the canonical event for one webhook call.
pub fn normalize(payload: &WebhookPayload) -> MessageEvent {
    let detail = &payload.detail;
    let mut segments = Vec::new();

    if detail.kind.as_deref() == Some("reply") {
        let quoted = detail.mid.as_ref().map(id_string).unwrap_or_default();
        segments.push(MessageSegment::reply(quoted, Some(payload.from_uid.clone())));
    }

    segments.extend(split_mentions(&detail.content));
    if segments.is_empty() {
        segments.push(MessageSegment::text(""));
    }

    if detail.content_type == FILE_CONTENT_TYPE
        && payload
            .file_content_type()
            .is_some_and(|ct| ct.starts_with("image/"))
    {
        segments.push(MessageSegment::media(MediaKind::Image, detail.content.clone()));
    }

    MessageEvent::new(
        payload.mid.clone(),
        segments,
        detail.content.clone(),
        payload.scope(),
        payload.from_uid.clone(),
        payload.created_at / 1000.0,
    )
}

/// Split `content` into text and mention segments, keeping every byte of
/// unmatched text in order.
pub fn split_mentions(content: &str) -> Vec<MessageSegment> {
    let Some(re) = MENTION.as_ref() else {
        return non_empty_text(content).into_iter().collect();
    };

    let mut segments = Vec::new();
    let mut cursor = 0;
    for caps in re.captures_iter(content) {
        let (Some(whole), Some(uid)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        segments.extend(non_empty_text(&content[cursor..whole.start()]));
        segments.push(MessageSegment::mention(uid.as_str()));
        cursor = whole.end();
    }
    segments.extend(non_empty_text(&content[cursor..]));
    segments
}

fn non_empty_text(text: &str) -> Option<MessageSegment> {
    (!text.is_empty()).then(|| MessageSegment::text(text))
}
