//! HTTP endpoint VoceChat calls for every message the bot can see.

use std::sync::Arc;

use {
    axum::{
        Router,
        body::Bytes,
        extract::State,
        http::StatusCode,
        routing::get,
    },
    tracing::{debug, warn},
    vocebot_onebot::{Event, EventSink},
};

use crate::{
    directory::ContactDirectory,
    inbound::{WebhookPayload, normalize},
};

#[derive(Clone)]
struct WebhookState {
    sink: Arc<dyn EventSink>,
    directory: Arc<ContactDirectory>,
}

/// `GET /` answers VoceChat's reachability check, `POST /` takes messages.
pub fn webhook_router(sink: Arc<dyn EventSink>, directory: Arc<ContactDirectory>) -> Router {
    Router::new()
        .route("/", get(probe).post(receive))
        .with_state(WebhookState { sink, directory })
}

async fn probe() -> StatusCode {
    StatusCode::OK
}

async fn receive(State(state): State<WebhookState>, body: Bytes) -> StatusCode {
    let payload = match WebhookPayload::parse(&body) {
        Ok(payload) => payload,
        Err(e) => {
            warn!(error = %e, "malformed webhook payload");
            return StatusCode::INTERNAL_SERVER_ERROR;
        },
    };

    let event = normalize(&payload);
    debug!(
        message_id = %event.message_id,
        sender_id = %event.sender_id,
        detail_type = event.scope.detail_type(),
        "webhook message received"
    );

    // The response never waits on delivery or the directory.
    let sink = Arc::clone(&state.sink);
    tokio::spawn(async move {
        sink.emit(Event::Message(event)).await;
    });
    let directory = Arc::clone(&state.directory);
    let sender = payload.from_uid;
    tokio::spawn(async move {
        directory.refresh(&sender).await;
    });

    StatusCode::OK
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::api::VoceChatClient,
        async_trait::async_trait,
        axum::{body::Body, http::Request},
        secrecy::Secret,
        std::time::Duration,
        tokio::sync::mpsc,
        tower::ServiceExt,
        vocebot_onebot::{MessageSegment, Scope},
    };

    struct RecordingSink(mpsc::UnboundedSender<Event>);

    #[async_trait]
    impl EventSink for RecordingSink {
        async fn emit(&self, event: Event) {
            let _ = self.0.send(event);
        }
    }

    fn router(
        server_url: &str,
        store: &std::path::Path,
    ) -> (Router, mpsc::UnboundedReceiver<Event>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let api = VoceChatClient::new(server_url, Secret::new("key".into()), None).unwrap();
        let directory = Arc::new(ContactDirectory::load(api, store));
        (webhook_router(Arc::new(RecordingSink(tx)), directory), rx)
    }

    fn post(body: &str) -> Request<Body> {
        Request::post("/")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn get_is_reachability_probe() {
        let dir = tempfile::tempdir().unwrap();
        let (app, _rx) = router("http://127.0.0.1:1", &dir.path().join("f.json"));
        let resp = app
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn message_is_emitted_and_sender_recorded() {
        let mut server = mockito::Server::new_async().await;
        let lookup = server
            .mock("GET", "/api/bot/user/7")
            .match_query(mockito::Matcher::Any)
            .with_body(r#"{"uid": 7, "name": "alice"}"#)
            .create_async()
            .await;
        let dir = tempfile::tempdir().unwrap();
        let store = dir.path().join("f.json");
        let (app, mut rx) = router(&server.url(), &store);

        let resp = app
            .oneshot(post(
                r#"{"mid": 9, "from_uid": 7, "target": {"gid": 1},
                    "detail": {"type": "normal", "content": "@2 hello", "content_type": "text/plain"},
                    "created_at": 1700000000000}"#,
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let Event::Message(event) = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap()
        else {
            panic!("expected a message event");
        };
        assert_eq!(event.message_id, "9");
        assert_eq!(event.scope, Scope::Group {
            group_id: "1".into()
        });
        assert_eq!(event.segments, vec![
            MessageSegment::mention("2"),
            MessageSegment::text("hello"),
        ]);

        let mut saved = String::new();
        for _ in 0..100 {
            saved = std::fs::read_to_string(&store).unwrap_or_default();
            if saved.contains("alice") {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        lookup.assert_async().await;
        assert!(saved.contains("alice"), "{saved}");
    }

    #[tokio::test]
    async fn malformed_payload_is_server_error() {
        let dir = tempfile::tempdir().unwrap();
        let (app, mut rx) = router("http://127.0.0.1:1", &dir.path().join("f.json"));
        let resp = app.oneshot(post("{oops")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(rx.try_recv().is_err());
    }
}
