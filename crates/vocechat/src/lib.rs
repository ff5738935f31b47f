//! VoceChat side of the bridge.
//!
//! Turns VoceChat bot webhooks into OneBot events and OneBot actions into
//! VoceChat REST calls. File uploads go through a two-phase transfer, and
//! a small contact directory remembers the users the bot has heard from.

pub mod actions;
pub mod api;
pub mod directory;
pub mod error;
pub mod inbound;
pub mod outbound;
pub mod source;
pub mod state;
pub mod upload;
pub mod webhook;

pub use {
    actions::register_actions,
    api::{SUPPORTED_SERVER_VERSION, VoceChatClient},
    directory::{ContactDirectory, ContactRecord},
    error::{Error, Result},
    inbound::{WebhookPayload, normalize},
    outbound::{Dispatcher, OutgoingMessage, SendReceipt},
    state::BridgeState,
    upload::{FilePayload, FileTransfer, TransferState},
    webhook::webhook_router,
};
