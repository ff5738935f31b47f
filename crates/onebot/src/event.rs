use {
    serde::{Deserialize, Serialize},
    serde_json::{Value, json},
};

use crate::{Error, Result, segment::MessageSegment};

/// Identity of the bot an event or action belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotSelf {
    pub platform: String,
    pub user_id: String,
}

/// Routing target of a message: a direct peer or a group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    Direct { user_id: String },
    Group { group_id: String },
}

impl Scope {
    /// Resolve a scope from OneBot `detail_type` plus the candidate ids.
    ///
    /// The id selected by `detail_type` must be non-empty.
    pub fn resolve(detail_type: &str, user_id: &str, group_id: &str) -> Result<Self> {
        match detail_type {
            "private" if user_id.is_empty() => {
                Err(Error::invalid_input("missing 'user_id' for private message"))
            },
            "private" => Ok(Self::Direct {
                user_id: user_id.to_string(),
            }),
            "group" if group_id.is_empty() => {
                Err(Error::invalid_input("missing 'group_id' for group message"))
            },
            "group" => Ok(Self::Group {
                group_id: group_id.to_string(),
            }),
            other => Err(Error::invalid_input(format!(
                "unsupported detail_type: {other}"
            ))),
        }
    }

    pub fn detail_type(&self) -> &'static str {
        match self {
            Self::Direct { .. } => "private",
            Self::Group { .. } => "group",
        }
    }
}

/// A canonical inbound message, built once per webhook call.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageEvent {
    pub id: String,
    pub message_id: String,
    pub segments: Vec<MessageSegment>,
    pub alt_text: String,
    pub scope: Scope,
    pub sender_id: String,
    /// Seconds since the unix epoch.
    pub time: f64,
}

impl MessageEvent {
    /// Build an event with a freshly generated event id.
    pub fn new(
        message_id: impl Into<String>,
        segments: Vec<MessageSegment>,
        alt_text: impl Into<String>,
        scope: Scope,
        sender_id: impl Into<String>,
        time: f64,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            message_id: message_id.into(),
            segments,
            alt_text: alt_text.into(),
            scope,
            sender_id: sender_id.into(),
            time,
        }
    }
}

/// Bridge health as reported by `get_status` and `status_update`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub good: bool,
    pub online: bool,
}

impl Status {
    pub fn to_value(&self, bot: &BotSelf) -> Value {
        json!({
            "good": self.good,
            "bots": [{ "self": bot, "online": self.online }],
        })
    }
}

/// Everything the bridge can emit towards OneBot clients.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Message(MessageEvent),
    StatusUpdate(Status),
}

impl Event {
    /// Serialize into a OneBot 12 event frame attributed to `bot`.
    pub fn to_frame(&self, bot: &BotSelf) -> Value {
        match self {
            Self::Message(msg) => {
                let segments: Vec<Value> = msg.segments.iter().map(|s| s.to_value()).collect();
                let mut frame = json!({
                    "id": msg.id,
                    "time": msg.time,
                    "type": "message",
                    "detail_type": msg.scope.detail_type(),
                    "sub_type": "",
                    "self": bot,
                    "message_id": msg.message_id,
                    "message": segments,
                    "alt_message": msg.alt_text,
                    "user_id": msg.sender_id,
                });
                if let Scope::Group { group_id } = &msg.scope
                    && let Some(obj) = frame.as_object_mut()
                {
                    obj.insert("group_id".into(), Value::String(group_id.clone()));
                }
                frame
            },
            Self::StatusUpdate(status) => json!({
                "id": uuid::Uuid::new_v4().to_string(),
                "time": unix_now_secs(),
                "type": "meta",
                "detail_type": "status_update",
                "sub_type": "",
                "status": status.to_value(bot),
            }),
        }
    }
}

/// Current time as float seconds.
pub fn unix_now_secs() -> f64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn bot() -> BotSelf {
        BotSelf {
            platform: "vocechat".into(),
            user_id: "2".into(),
        }
    }

    #[test]
    fn resolve_requires_matching_id() {
        assert_eq!(Scope::resolve("private", "7", "").unwrap(), Scope::Direct {
            user_id: "7".into()
        });
        assert_eq!(Scope::resolve("group", "", "5").unwrap(), Scope::Group {
            group_id: "5".into()
        });
        assert!(Scope::resolve("private", "", "5").is_err());
        assert!(Scope::resolve("group", "7", "").is_err());
        let err = Scope::resolve("channel", "7", "5").unwrap_err();
        assert!(err.to_string().contains("unsupported detail_type"));
    }

    #[test]
    fn group_message_frame_carries_group_id() {
        let event = Event::Message(MessageEvent::new(
            "10",
            vec![MessageSegment::text("hi")],
            "hi",
            Scope::Group {
                group_id: "5".into(),
            },
            "7",
            1.5,
        ));
        let frame = event.to_frame(&bot());
        assert_eq!(frame["type"], "message");
        assert_eq!(frame["detail_type"], "group");
        assert_eq!(frame["group_id"], "5");
        assert_eq!(frame["user_id"], "7");
        assert_eq!(frame["alt_message"], "hi");
        assert_eq!(frame["self"]["platform"], "vocechat");
        assert_eq!(frame["message"][0]["data"]["text"], "hi");
    }

    #[test]
    fn private_message_frame_has_no_group_id() {
        let event = Event::Message(MessageEvent::new(
            "10",
            vec![],
            "",
            Scope::Direct {
                user_id: "7".into(),
            },
            "7",
            0.0,
        ));
        let frame = event.to_frame(&bot());
        assert_eq!(frame["detail_type"], "private");
        assert!(frame.get("group_id").is_none());
    }

    #[test]
    fn event_ids_are_unique() {
        let scope = Scope::Direct {
            user_id: "1".into(),
        };
        let a = MessageEvent::new("1", vec![], "", scope.clone(), "1", 0.0);
        let b = MessageEvent::new("1", vec![], "", scope, "1", 0.0);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn status_update_frame() {
        let frame = Event::StatusUpdate(Status {
            good: true,
            online: true,
        })
        .to_frame(&bot());
        assert_eq!(frame["type"], "meta");
        assert_eq!(frame["detail_type"], "status_update");
        assert_eq!(frame["status"]["good"], true);
        assert_eq!(frame["status"]["bots"][0]["online"], true);
    }
}
