//! Outbound dispatcher: one canonical message → ordered VoceChat calls.
//!
//! Segments are bucketed into replies, media and text. Replies go first, one
//! call each, then media, one call each, then all text joined into a single
//! call. The first failing call aborts the rest; calls already made stay made.

use {
    serde::{Deserialize, Serialize},
    serde_json::Value,
    tracing::debug,
    vocebot_onebot::{MessageSegment, Scope, event::unix_now_secs, segment::decode_segments},
};

use crate::{
    api::{VoceChatClient, id_string},
    error::Result,
};

/// Message id reported when no text call was made.
pub const SENTINEL_MESSAGE_ID: &str = "0";

/// Params of the `send_message` action.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SendMessageParams {
    pub detail_type: String,
    pub user_id: String,
    pub group_id: String,
    pub message: Vec<Value>,
}

/// A message ready to send: destination resolved, segments decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub scope: Scope,
    pub segments: Vec<MessageSegment>,
}

impl SendMessageParams {
    /// Resolve the scope and decode segments. Nothing here touches the
    /// network, so a bad request fails before any call is issued.
    pub fn into_outgoing(self) -> Result<OutgoingMessage> {
        let scope = Scope::resolve(&self.detail_type, &self.user_id, &self.group_id)?;
        let segments = decode_segments(&self.message)?;
        Ok(OutgoingMessage { scope, segments })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SendReceipt {
    pub message_id: String,
    pub time: f64,
}

#[derive(Debug, Default, PartialEq, Eq)]
struct Buckets<'a> {
    replies: Vec<(&'a str, Option<&'a str>)>,
    media: Vec<&'a str>,
    text: String,
}

fn bucket(segments: &[MessageSegment]) -> Buckets<'_> {
    let mut buckets = Buckets::default();
    for segment in segments {
        match segment {
            MessageSegment::Reply {
                message_id,
                user_id,
            } => buckets
                .replies
                .push((message_id.as_str(), user_id.as_deref())),
            MessageSegment::Media { file_id, .. } => buckets.media.push(file_id.as_str()),
            MessageSegment::Text { text } => buckets.text.push_str(text),
            MessageSegment::Mention { user_id } => {
                buckets.text.push('@');
                buckets.text.push_str(user_id);
                buckets.text.push(' ');
            },
        }
    }
    buckets
}

pub struct Dispatcher<'a> {
    api: &'a VoceChatClient,
}

impl<'a> Dispatcher<'a> {
    pub fn new(api: &'a VoceChatClient) -> Self {
        Self { api }
    }

    pub async fn send(&self, message: &OutgoingMessage) -> Result<SendReceipt> {
        let buckets = bucket(&message.segments);
        debug!(
            detail_type = message.scope.detail_type(),
            replies = buckets.replies.len(),
            media = buckets.media.len(),
            text_len = buckets.text.len(),
            "dispatching message"
        );

        for (message_id, user_id) in &buckets.replies {
            self.api.reply(message_id, *user_id).await?;
        }
        for file_id in &buckets.media {
            self.api.send_file(&message.scope, file_id).await?;
        }

        let message_id = if buckets.text.is_empty() {
            SENTINEL_MESSAGE_ID.to_string()
        } else {
            let body = self.api.send_text(&message.scope, &buckets.text).await?;
            parse_message_id(&body)
        };

        Ok(SendReceipt {
            message_id,
            time: unix_now_secs(),
        })
    }
}

/// Read a message id out of a send response: a bare integer, an object with
/// `message_id`, or the raw text.
pub fn parse_message_id(body: &str) -> String {
    let trimmed = body.trim();
    if let Ok(id) = trimmed.parse::<i64>() {
        return id.to_string();
    }
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(trimmed)
        && let Some(id) = map.get("message_id").filter(|v| !v.is_null())
    {
        return id_string(id);
    }
    body.to_string()
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::error::Error,
        rstest::rstest,
        secrecy::Secret,
        serde_json::json,
        vocebot_onebot::MediaKind,
    };

    fn client(server: &mockito::ServerGuard) -> VoceChatClient {
        VoceChatClient::new(&server.url(), Secret::new("key".into()), None).unwrap()
    }

    fn direct(segments: Vec<MessageSegment>) -> OutgoingMessage {
        OutgoingMessage {
            scope: Scope::Direct {
                user_id: "7".into(),
            },
            segments,
        }
    }

    #[rstest]
    #[case("12345", "12345")]
    #[case(" 42\n", "42")]
    #[case(r#"{"message_id": 9}"#, "9")]
    #[case(r#"{"message_id": "abc"}"#, "abc")]
    #[case(r#"{"other": 1}"#, r#"{"other": 1}"#)]
    #[case("ok", "ok")]
    fn message_id_parsing(#[case] body: &str, #[case] expected: &str) {
        assert_eq!(parse_message_id(body), expected);
    }

    #[test]
    fn mentions_fold_into_text_in_place() {
        let segments = vec![
            MessageSegment::text("hi "),
            MessageSegment::mention("3"),
            MessageSegment::media(MediaKind::Image, "f/1"),
            MessageSegment::reply("8", None),
            MessageSegment::text("there"),
        ];
        let buckets = bucket(&segments);
        assert_eq!(buckets.replies, vec![("8", None)]);
        assert_eq!(buckets.media, vec!["f/1"]);
        assert_eq!(buckets.text, "hi @3 there");
    }

    #[test]
    fn params_resolve_before_any_call() {
        let params: SendMessageParams = serde_json::from_value(json!({
            "detail_type": "group",
            "message": [{"type": "text", "data": {"text": "x"}}],
        }))
        .unwrap();
        assert!(params.into_outgoing().unwrap_err().is_validation());

        let params: SendMessageParams = serde_json::from_value(json!({
            "detail_type": "channel",
            "user_id": "7",
        }))
        .unwrap();
        let err = params.into_outgoing().unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));
    }

    #[tokio::test]
    async fn private_text_is_one_call() {
        let mut server = mockito::Server::new_async().await;
        let send = server
            .mock("POST", "/api/bot/send_to_user/7")
            .match_header("content-type", "text/plain")
            .match_body("hi")
            .with_body("1234")
            .expect(1)
            .create_async()
            .await;

        let params: SendMessageParams = serde_json::from_value(json!({
            "detail_type": "private",
            "user_id": "7",
            "message": [{"type": "text", "data": {"text": "hi"}}],
        }))
        .unwrap();
        let api = client(&server);
        let receipt = Dispatcher::new(&api)
            .send(&params.into_outgoing().unwrap())
            .await
            .unwrap();
        send.assert_async().await;
        assert_eq!(receipt.message_id, "1234");
        assert!(receipt.time > 0.0);
    }

    #[tokio::test]
    async fn text_segments_are_joined() {
        let mut server = mockito::Server::new_async().await;
        let reply = server
            .mock("POST", "/api/bot/reply/5")
            .match_body(mockito::Matcher::Json(json!({"user_id": "9"})))
            .with_body("1")
            .expect(1)
            .create_async()
            .await;
        let text = server
            .mock("POST", "/api/bot/send_to_group/3")
            .match_body("ab")
            .with_body(r#"{"message_id": 77}"#)
            .expect(1)
            .create_async()
            .await;

        let api = client(&server);
        let message = OutgoingMessage {
            scope: Scope::Group {
                group_id: "3".into(),
            },
            segments: vec![
                MessageSegment::text("a"),
                MessageSegment::reply("5", Some("9".into())),
                MessageSegment::text("b"),
            ],
        };
        let receipt = Dispatcher::new(&api).send(&message).await.unwrap();
        reply.assert_async().await;
        text.assert_async().await;
        assert_eq!(receipt.message_id, "77");
    }

    #[tokio::test]
    async fn reply_media_then_joined_text() {
        let mut server = mockito::Server::new_async().await;
        let reply = server
            .mock("POST", "/api/bot/reply/5")
            .with_body("1")
            .expect(1)
            .create_async()
            .await;
        let media = server
            .mock("POST", "/api/bot/send_to_user/7")
            .match_header("content-type", "vocechat/file")
            .match_body(mockito::Matcher::Json(json!({"path": "f/1"})))
            .with_body("2")
            .expect(1)
            .create_async()
            .await;
        let text = server
            .mock("POST", "/api/bot/send_to_user/7")
            .match_header("content-type", "text/plain")
            .match_body("ab")
            .with_body("3")
            .expect(1)
            .create_async()
            .await;

        let api = client(&server);
        let receipt = Dispatcher::new(&api)
            .send(&direct(vec![
                MessageSegment::reply("5", None),
                MessageSegment::media(MediaKind::Image, "f/1"),
                MessageSegment::text("a"),
                MessageSegment::text("b"),
            ]))
            .await
            .unwrap();
        reply.assert_async().await;
        media.assert_async().await;
        text.assert_async().await;
        assert_eq!(receipt.message_id, "3");
    }

    #[tokio::test]
    async fn media_only_keeps_sentinel_id() {
        let mut server = mockito::Server::new_async().await;
        let media = server
            .mock("POST", "/api/bot/send_to_user/7")
            .match_header("content-type", "vocechat/file")
            .match_body(mockito::Matcher::Json(json!({"path": "2024/a.png"})))
            .with_body("555")
            .expect(1)
            .create_async()
            .await;

        let api = client(&server);
        let receipt = Dispatcher::new(&api)
            .send(&direct(vec![MessageSegment::media(
                MediaKind::Image,
                "2024/a.png",
            )]))
            .await
            .unwrap();
        media.assert_async().await;
        assert_eq!(receipt.message_id, SENTINEL_MESSAGE_ID);
    }

    #[tokio::test]
    async fn reply_failure_stops_later_buckets() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/bot/reply/5")
            .with_status(500)
            .create_async()
            .await;
        let rest = server
            .mock("POST", "/api/bot/send_to_user/7")
            .expect(0)
            .create_async()
            .await;

        let api = client(&server);
        let err = Dispatcher::new(&api)
            .send(&direct(vec![
                MessageSegment::text("hello"),
                MessageSegment::media(MediaKind::File, "f"),
                MessageSegment::reply("5", None),
            ]))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UpstreamHttp { status: 500, .. }));
        rest.assert_async().await;
    }

    #[tokio::test]
    async fn media_failure_skips_text() {
        let mut server = mockito::Server::new_async().await;
        let media = server
            .mock("POST", "/api/bot/send_to_user/7")
            .match_header("content-type", "vocechat/file")
            .with_status(404)
            .expect(1)
            .create_async()
            .await;
        let text = server
            .mock("POST", "/api/bot/send_to_user/7")
            .match_header("content-type", "text/plain")
            .expect(0)
            .create_async()
            .await;

        let api = client(&server);
        let result = Dispatcher::new(&api)
            .send(&direct(vec![
                MessageSegment::text("caption"),
                MessageSegment::media(MediaKind::Image, "f/1"),
            ]))
            .await;
        assert!(result.is_err());
        media.assert_async().await;
        text.assert_async().await;
    }
}
