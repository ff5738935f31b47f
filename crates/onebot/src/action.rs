//! OneBot 12 action frames.
//!
//! A client sends an [`ActionRequest`]; the bridge always answers with an
//! [`ActionResponse`], using `status: "failed"` plus a retcode for errors.

use {
    serde::{Deserialize, Serialize},
    serde_json::Value,
};

use crate::event::BotSelf;

// ── Return codes ─────────────────────────────────────────────────────────────

pub mod retcode {
    pub const OK: i64 = 0;
    pub const BAD_REQUEST: i64 = 10001;
    pub const UNSUPPORTED_ACTION: i64 = 10002;
    pub const BAD_PARAM: i64 = 10003;
    pub const INTERNAL_HANDLER_ERROR: i64 = 20002;
}

// ── Frames ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionRequest {
    pub action: String,
    #[serde(default = "empty_params")]
    pub params: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub echo: Option<Value>,
    #[serde(default, rename = "self", skip_serializing_if = "Option::is_none")]
    pub bot_self: Option<BotSelf>,
}

fn empty_params() -> Value {
    Value::Object(serde_json::Map::new())
}

impl ActionRequest {
    pub fn new(action: impl Into<String>, params: Value) -> Self {
        Self {
            action: action.into(),
            params,
            echo: None,
            bot_self: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionResponse {
    pub status: String,
    pub retcode: i64,
    pub data: Value,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub echo: Option<Value>,
}

impl ActionResponse {
    pub fn ok(data: Value, echo: Option<Value>) -> Self {
        Self {
            status: "ok".into(),
            retcode: retcode::OK,
            data,
            message: String::new(),
            echo,
        }
    }

    pub fn failed(error: ActionError, echo: Option<Value>) -> Self {
        Self {
            status: "failed".into(),
            retcode: error.retcode,
            data: Value::Null,
            message: error.message,
            echo,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.retcode == retcode::OK
    }
}

// ── Errors ───────────────────────────────────────────────────────────────────

/// The uniform failure signal every action handler returns.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message} (retcode {retcode})")]
pub struct ActionError {
    pub retcode: i64,
    pub message: String,
}

impl ActionError {
    pub fn new(retcode: i64, message: impl Into<String>) -> Self {
        Self {
            retcode,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl std::fmt::Display) -> Self {
        Self::new(retcode::BAD_REQUEST, message.to_string())
    }

    pub fn bad_param(message: impl std::fmt::Display) -> Self {
        Self::new(retcode::BAD_PARAM, message.to_string())
    }

    pub fn unsupported(message: impl std::fmt::Display) -> Self {
        Self::new(retcode::UNSUPPORTED_ACTION, message.to_string())
    }

    /// Wrap a handler failure as `"<context>: <error>"`.
    pub fn internal(context: &str, error: impl std::fmt::Display) -> Self {
        Self::new(retcode::INTERNAL_HANDLER_ERROR, format!("{context}: {error}"))
    }
}
