//! Message segments: the atomic parts of a composite message.
//!
//! On the wire a segment is `{"type": <name>, "data": {...}}`. Inside the
//! bridge it is the closed [`MessageSegment`] enum so both the inbound
//! normalizer and the outbound dispatcher match exhaustively.

use {
    serde::{Deserialize, Deserializer, Serialize, Serializer},
    serde_json::{Map, Value},
    tracing::warn,
};

use crate::{Error, Result};

/// Kinds of media a segment can reference by `file_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Image,
    Voice,
    Audio,
    Video,
    File,
}

impl MediaKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Voice => "voice",
            Self::Audio => "audio",
            Self::Video => "video",
            Self::File => "file",
        }
    }

    pub fn from_type(name: &str) -> Option<Self> {
        match name {
            "image" => Some(Self::Image),
            "voice" => Some(Self::Voice),
            "audio" => Some(Self::Audio),
            "video" => Some(Self::Video),
            "file" => Some(Self::File),
            _ => None,
        }
    }
}

/// One segment of a canonical message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageSegment {
    Text {
        text: String,
    },
    Mention {
        user_id: String,
    },
    Reply {
        message_id: String,
        user_id: Option<String>,
    },
    Media {
        kind: MediaKind,
        file_id: String,
    },
}

impl MessageSegment {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn mention(user_id: impl Into<String>) -> Self {
        Self::Mention {
            user_id: user_id.into(),
        }
    }

    pub fn reply(message_id: impl Into<String>, user_id: Option<String>) -> Self {
        Self::Reply {
            message_id: message_id.into(),
            user_id,
        }
    }

    pub fn media(kind: MediaKind, file_id: impl Into<String>) -> Self {
        Self::Media {
            kind,
            file_id: file_id.into(),
        }
    }

    /// Wire name of the segment type.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Text { .. } => "text",
            Self::Mention { .. } => "mention",
            Self::Reply { .. } => "reply",
            Self::Media { kind, .. } => kind.as_str(),
        }
    }

    /// Encode as a OneBot `{"type", "data"}` object.
    pub fn to_value(&self) -> Value {
        let mut data = Map::new();
        match self {
            Self::Text { text } => {
                data.insert("text".into(), Value::String(text.clone()));
            },
            Self::Mention { user_id } => {
                data.insert("user_id".into(), Value::String(user_id.clone()));
            },
            Self::Reply {
                message_id,
                user_id,
            } => {
                data.insert("message_id".into(), Value::String(message_id.clone()));
                if let Some(user_id) = user_id {
                    data.insert("user_id".into(), Value::String(user_id.clone()));
                }
            },
            Self::Media { file_id, .. } => {
                data.insert("file_id".into(), Value::String(file_id.clone()));
            },
        }
        serde_json::json!({ "type": self.type_name(), "data": data })
    }

    /// Decode one wire segment.
    ///
    /// Returns `Ok(None)` for segments that contribute nothing (no `type`,
    /// or a mention without a user). Unknown types degrade to a text
    /// placeholder instead of being dropped.
    pub fn from_value(value: &Value) -> Result<Option<Self>> {
        let Some(kind) = value.get("type").and_then(Value::as_str) else {
            warn!("message segment without type skipped");
            return Ok(None);
        };
        let empty = Map::new();
        let data = value.get("data").and_then(Value::as_object).unwrap_or(&empty);

        let segment = match kind {
            "text" => Self::text(data_str(data, "text").unwrap_or_default()),
            "mention" => match data_str(data, "user_id").filter(|id| !id.is_empty()) {
                Some(user_id) => Self::mention(user_id),
                None => return Ok(None),
            },
            "reply" => {
                let message_id = data_str(data, "message_id")
                    .filter(|id| !id.is_empty())
                    .ok_or_else(|| Error::invalid_input("missing 'message_id' for reply segment"))?;
                let user_id = data_str(data, "user_id").filter(|id| !id.is_empty());
                Self::reply(message_id, user_id)
            },
            other => match MediaKind::from_type(other) {
                Some(media) => {
                    let file_id = data_str(data, "file_id")
                        .filter(|id| !id.is_empty())
                        .ok_or_else(|| {
                            Error::invalid_input(format!(
                                "missing 'file_id' for message type '{other}'"
                            ))
                        })?;
                    Self::media(media, file_id)
                },
                None => {
                    warn!(segment_type = other, "unsupported message segment type");
                    Self::text(format!("[Unsupported message type: {other}]"))
                },
            },
        };
        Ok(Some(segment))
    }
}

/// Decode a list of wire segments, skipping the ones that carry nothing.
pub fn decode_segments(values: &[Value]) -> Result<Vec<MessageSegment>> {
    let mut segments = Vec::with_capacity(values.len());
    for value in values {
        if let Some(segment) = MessageSegment::from_value(value)? {
            segments.push(segment);
        }
    }
    Ok(segments)
}

/// Read a string field, accepting numeric ids as well.
fn data_str(data: &Map<String, Value>, key: &str) -> Option<String> {
    match data.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

impl Serialize for MessageSegment {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for MessageSegment {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        MessageSegment::from_value(&value)
            .map_err(serde::de::Error::custom)?
            .ok_or_else(|| serde::de::Error::custom("empty message segment"))
    }
}
