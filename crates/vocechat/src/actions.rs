//! OneBot action handlers backed by the VoceChat REST API.

use std::sync::Arc;

use {
    serde::Deserialize,
    serde_json::{Value, json},
    tracing::{error, info},
    vocebot_onebot::{ActionError, ActionRegistry, ActionResult},
};

use crate::{
    error::Error,
    outbound::{Dispatcher, SendMessageParams},
    source::{UploadFileParams, acquire},
    state::BridgeState,
    upload::FileTransfer,
};

/// Actions that are registered so clients can discover them, but always
/// answer `UNSUPPORTED_ACTION`.
pub const UNSUPPORTED_ACTIONS: &[&str] = &[
    "upload_file_fragmented",
    "get_file",
    "get_file_fragmented",
];

#[derive(Debug, Deserialize)]
struct UserInfoParams {
    user_id: String,
}

/// Log a handler failure and wrap it as `"<context>: <error>"`.
fn fail(action: &str, context: &str, e: Error) -> ActionError {
    error!(action, error = %e, "{context}");
    ActionError::internal(context, e)
}

pub fn register_actions(reg: &mut ActionRegistry, state: Arc<BridgeState>) {
    let st = Arc::clone(&state);
    reg.register_typed("send_message", move |p| send_message(Arc::clone(&st), p));
    let st = Arc::clone(&state);
    reg.register_typed("upload_file", move |p| upload_file(Arc::clone(&st), p));
    let st = Arc::clone(&state);
    reg.register_typed("get_self_info", move |_: Value| get_self_info(Arc::clone(&st)));
    let st = Arc::clone(&state);
    reg.register_typed("get_user_info", move |p| get_user_info(Arc::clone(&st), p));
    let st = Arc::clone(&state);
    reg.register_typed("get_group_list", move |_: Value| get_group_list(Arc::clone(&st)));
    reg.register_typed("get_friend_list", move |_: Value| get_friend_list(Arc::clone(&state)));

    for &name in UNSUPPORTED_ACTIONS {
        reg.register_typed(name, move |_: Value| unsupported(name));
    }
}

async fn send_message(st: Arc<BridgeState>, params: SendMessageParams) -> ActionResult {
    let message = params
        .into_outgoing()
        .map_err(|e| fail("send_message", "Error sending message", e))?;
    let receipt = Dispatcher::new(&st.api)
        .send(&message)
        .await
        .map_err(|e| fail("send_message", "Error sending message", e))?;
    Ok(json!(receipt))
}

async fn upload_file(st: Arc<BridgeState>, params: UploadFileParams) -> ActionResult {
    let payload = acquire(&st.download, &params)
        .await
        .map_err(|e| fail("upload_file", "Error uploading file", e))?;
    let filename = payload.filename.clone();
    let file_id = FileTransfer::new(&st.api, payload)
        .run()
        .await
        .map_err(|e| fail("upload_file", "Error uploading file", e))?;
    info!(%filename, %file_id, "file uploaded");
    Ok(json!({ "file_id": file_id }))
}

async fn get_self_info(st: Arc<BridgeState>) -> ActionResult {
    let profile = st
        .api
        .get_user(&st.bot_user_id)
        .await
        .map_err(|e| fail("get_self_info", "Error getting self info", e))?;
    Ok(json!({
        "user_id": st.bot_user_id,
        "user_name": profile.name,
        "user_displayname": profile.name,
    }))
}

async fn get_user_info(st: Arc<BridgeState>, params: UserInfoParams) -> ActionResult {
    let profile = st
        .api
        .get_user(&params.user_id)
        .await
        .map_err(|e| fail("get_user_info", "Error getting user info", e))?;
    Ok(json!({
        "user_id": params.user_id,
        "user_name": profile.name,
        "user_displayname": profile.name,
        "user_avatar": st.api.avatar_url(&params.user_id),
        "user_remark": "",
    }))
}

async fn get_group_list(st: Arc<BridgeState>) -> ActionResult {
    let groups = st
        .api
        .list_groups()
        .await
        .map_err(|e| fail("get_group_list", "Error getting group list", e))?;
    let list: Vec<_> = groups
        .into_iter()
        .map(|g| json!({ "group_id": g.group_id, "group_name": g.name }))
        .collect();
    Ok(json!(list))
}

async fn get_friend_list(st: Arc<BridgeState>) -> ActionResult {
    let list: Vec<_> = st
        .directory
        .list()
        .into_iter()
        .map(|c| {
            json!({
                "user_id": c.user_id,
                "user_name": c.display_name,
                "user_displayname": "",
                "user_remark": "",
            })
        })
        .collect();
    Ok(json!(list))
}

async fn unsupported(action: &'static str) -> ActionResult {
    Err(ActionError::unsupported(Error::unsupported(action)))
}
