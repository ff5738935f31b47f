//! Minimal OneBot protocol host.
//!
//! Owns the bot identity, health flags, the action registry and the event
//! transports. Bridge cores register their actions on the registry before
//! the host is shared, then emit events through [`EventSink`].

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use {
    async_trait::async_trait,
    serde::Deserialize,
    serde_json::{Value, json},
    tracing::{debug, info},
};

use crate::{
    action::{ActionError, ActionRequest, ActionResponse},
    buffer::EventBuffer,
    event::{BotSelf, Event, Status},
    registry::ActionRegistry,
    sink::{EventSink, EventTransport},
};

const META_ACTIONS: &[&str] = &["get_status", "get_version", "get_supported_actions"];

#[derive(Debug, Default, Deserialize)]
struct LatestEventsParams {
    #[serde(default)]
    limit: usize,
    #[serde(default)]
    timeout: u64,
}

pub struct OneBotHost {
    impl_name: String,
    impl_version: String,
    bot: BotSelf,
    good: AtomicBool,
    online: AtomicBool,
    registry: ActionRegistry,
    transports: Vec<Arc<dyn EventTransport>>,
    buffer: Option<Arc<EventBuffer>>,
}

impl OneBotHost {
    pub fn new(impl_name: impl Into<String>, impl_version: impl Into<String>, bot: BotSelf) -> Self {
        Self {
            impl_name: impl_name.into(),
            impl_version: impl_version.into(),
            bot,
            good: AtomicBool::new(false),
            online: AtomicBool::new(false),
            registry: ActionRegistry::new(),
            transports: Vec::new(),
            buffer: None,
        }
    }

    pub fn with_transport(mut self, transport: Arc<dyn EventTransport>) -> Self {
        self.transports.push(transport);
        self
    }

    /// Buffer events for polling clients and expose `get_latest_events`.
    pub fn with_event_buffer(mut self, buffer: Arc<EventBuffer>) -> Self {
        self.transports.push(Arc::clone(&buffer) as Arc<dyn EventTransport>);
        self.buffer = Some(buffer);
        self
    }

    pub fn registry_mut(&mut self) -> &mut ActionRegistry {
        &mut self.registry
    }

    pub fn bot(&self) -> &BotSelf {
        &self.bot
    }

    pub fn status(&self) -> Status {
        Status {
            good: self.good.load(Ordering::Relaxed),
            online: self.online.load(Ordering::Relaxed),
        }
    }

    pub fn set_good(&self, good: bool) {
        self.good.store(good, Ordering::Relaxed);
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::Relaxed);
    }

    /// Broadcast the current status as a `meta.status_update` event.
    pub async fn update_status(&self) {
        let status = self.status();
        info!(good = status.good, online = status.online, "bridge status updated");
        self.emit(Event::StatusUpdate(status)).await;
    }

    pub fn supported_actions(&self) -> Vec<String> {
        let mut names = self.registry.action_names();
        names.extend(META_ACTIONS.iter().map(|s| s.to_string()));
        if self.buffer.is_some() {
            names.push("get_latest_events".into());
        }
        names.sort();
        names
    }

    /// Answer one action request, meta actions first, then the registry.
    pub async fn handle(&self, request: ActionRequest) -> ActionResponse {
        if let Some(bot) = &request.bot_self
            && bot != &self.bot
        {
            return ActionResponse::failed(
                ActionError::bad_request(format!(
                    "unknown bot: {}/{}",
                    bot.platform, bot.user_id
                )),
                request.echo,
            );
        }

        match request.action.as_str() {
            "get_status" => ActionResponse::ok(self.status().to_value(&self.bot), request.echo),
            "get_version" => ActionResponse::ok(
                json!({
                    "impl": self.impl_name,
                    "version": self.impl_version,
                    "onebot_version": "12",
                }),
                request.echo,
            ),
            "get_supported_actions" => {
                ActionResponse::ok(json!(self.supported_actions()), request.echo)
            },
            "get_latest_events" if self.buffer.is_some() => {
                let params: LatestEventsParams = if request.params.is_null() {
                    LatestEventsParams::default()
                } else {
                    match serde_json::from_value(request.params) {
                        Ok(p) => p,
                        Err(e) => {
                            return ActionResponse::failed(
                                ActionError::bad_param(e),
                                request.echo,
                            );
                        },
                    }
                };
                let events = match &self.buffer {
                    Some(buffer) => buffer.take(params.limit, params.timeout).await,
                    None => Vec::new(),
                };
                ActionResponse::ok(Value::Array(events), request.echo)
            },
            _ => self.registry.dispatch(request).await,
        }
    }
}

#[async_trait]
impl EventSink for OneBotHost {
    async fn emit(&self, event: Event) {
        let frame = event.to_frame(&self.bot);
        debug!(
            event_type = %frame["type"],
            detail_type = %frame["detail_type"],
            transports = self.transports.len(),
            "emitting event"
        );
        for transport in &self.transports {
            transport.push(&frame).await;
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{
            action::retcode,
            event::{MessageEvent, Scope},
            segment::MessageSegment,
        },
    };

    fn bot() -> BotSelf {
        BotSelf {
            platform: "vocechat".into(),
            user_id: "2".into(),
        }
    }

    fn host_with_buffer() -> (OneBotHost, Arc<EventBuffer>) {
        let buffer = Arc::new(EventBuffer::new(8));
        let mut host =
            OneBotHost::new("vocebot", "0.1.0", bot()).with_event_buffer(Arc::clone(&buffer));
        host.registry_mut()
            .register_typed("ping", |_: Value| async { Ok(json!("pong")) });
        (host, buffer)
    }

    #[tokio::test]
    async fn emitted_events_reach_buffer() {
        let (host, buffer) = host_with_buffer();
        host.emit(Event::Message(MessageEvent::new(
            "1",
            vec![MessageSegment::text("hi")],
            "hi",
            Scope::Direct {
                user_id: "7".into(),
            },
            "7",
            1.0,
        )))
        .await;
        let events = buffer.take(0, 0).await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0]["self"]["user_id"], "2");
    }

    #[tokio::test]
    async fn status_reflects_flags() {
        let (host, buffer) = host_with_buffer();
        host.set_good(true);
        host.set_online(true);
        host.update_status().await;

        let resp = host.handle(ActionRequest::new("get_status", json!({}))).await;
        assert_eq!(resp.data["good"], true);
        assert_eq!(resp.data["bots"][0]["online"], true);
        let events = buffer.take(0, 0).await;
        assert_eq!(events[0]["detail_type"], "status_update");
    }

    #[tokio::test]
    async fn latest_events_action_drains_buffer() {
        let (host, buffer) = host_with_buffer();
        buffer.push(&json!({"n": 1})).await;
        let resp = host
            .handle(ActionRequest::new("get_latest_events", json!({"limit": 5})))
            .await;
        assert_eq!(resp.data, json!([{"n": 1}]));
        assert!(buffer.is_empty());
    }

    #[tokio::test]
    async fn supported_actions_include_meta_and_registered() {
        let (host, _) = host_with_buffer();
        let resp = host
            .handle(ActionRequest::new("get_supported_actions", json!({})))
            .await;
        let names: Vec<String> = serde_json::from_value(resp.data).unwrap();
        assert!(names.contains(&"ping".to_string()));
        assert!(names.contains(&"get_version".to_string()));
        assert!(names.contains(&"get_latest_events".to_string()));
    }

    #[tokio::test]
    async fn foreign_self_is_rejected() {
        let (host, _) = host_with_buffer();
        let mut req = ActionRequest::new("ping", json!({}));
        req.bot_self = Some(BotSelf {
            platform: "vocechat".into(),
            user_id: "99".into(),
        });
        let resp = host.handle(req).await;
        assert_eq!(resp.retcode, retcode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn registered_actions_are_dispatched() {
        let (host, _) = host_with_buffer();
        let resp = host.handle(ActionRequest::new("ping", json!({}))).await;
        assert_eq!(resp.data, json!("pong"));
    }
}
