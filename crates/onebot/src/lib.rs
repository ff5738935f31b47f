//! OneBot 12 protocol surface for the VoceChat bridge.
//!
//! Holds the canonical message model (segments, scopes, events), the action
//! request/response frames, the action registry, and the minimal protocol
//! host that fans events out to the configured transports.

pub mod action;
pub mod buffer;
pub mod error;
pub mod event;
pub mod host;
pub mod http;
pub mod registry;
pub mod segment;
pub mod sink;
pub mod webhook;

pub use {
    action::{ActionError, ActionRequest, ActionResponse, retcode},
    error::{Error, Result},
    event::{BotSelf, Event, MessageEvent, Scope, Status},
    host::OneBotHost,
    registry::{ActionRegistry, ActionResult},
    segment::{MediaKind, MessageSegment},
    sink::{EventSink, EventTransport},
};
