use std::sync::Arc;

use crate::{api::VoceChatClient, directory::ContactDirectory};

/// Everything the action handlers share.
pub struct BridgeState {
    pub api: VoceChatClient,
    pub directory: Arc<ContactDirectory>,
    /// VoceChat uid of the bot account itself.
    pub bot_user_id: String,
    /// Client for `upload_file` downloads; never proxied, no API key.
    pub download: reqwest::Client,
}

impl BridgeState {
    pub fn new(
        api: VoceChatClient,
        directory: Arc<ContactDirectory>,
        bot_user_id: impl Into<String>,
    ) -> Self {
        Self {
            api,
            directory,
            bot_user_id: bot_user_id.into(),
            download: reqwest::Client::new(),
        }
    }
}
