use {async_trait::async_trait, serde_json::Value};

use crate::event::Event;

/// Where the bridge core hands canonical events.
///
/// The host provides the concrete implementation; the webhook normalizer
/// only ever sees this trait.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn emit(&self, event: Event);
}

/// A OneBot transport that pushes serialized event frames to clients.
///
/// Delivery failures are the transport's own concern: they are logged and
/// never surface to the emitter.
#[async_trait]
pub trait EventTransport: Send + Sync {
    async fn push(&self, frame: &Value);
}
