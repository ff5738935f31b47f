use std::{collections::HashMap, future::Future};

use {
    futures::future::{BoxFuture, FutureExt},
    serde::de::DeserializeOwned,
    serde_json::Value,
    tracing::{debug, warn},
};

use crate::action::{ActionError, ActionRequest, ActionResponse};

/// The result an action handler produces.
pub type ActionResult = Result<Value, ActionError>;

/// A boxed async action handler.
pub type ActionHandlerFn = Box<dyn Fn(Value) -> BoxFuture<'static, ActionResult> + Send + Sync>;

/// Action name → handler table.
pub struct ActionRegistry {
    handlers: HashMap<String, ActionHandlerFn>,
}

impl Default for ActionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    pub fn register(&mut self, action: impl Into<String>, handler: ActionHandlerFn) {
        self.handlers.insert(action.into(), handler);
    }

    /// Register a handler whose params are deserialized into `P`.
    ///
    /// Params that fail to deserialize answer `BAD_PARAM` without calling
    /// the handler.
    pub fn register_typed<P, F, Fut>(&mut self, action: impl Into<String>, handler: F)
    where
        P: DeserializeOwned + Send + 'static,
        F: Fn(P) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ActionResult> + Send + 'static,
    {
        self.register(
            action,
            Box::new(move |params| match serde_json::from_value::<P>(params) {
                Ok(params) => handler(params).boxed(),
                Err(e) => futures::future::ready(Err(ActionError::bad_param(e))).boxed(),
            }),
        );
    }

    pub fn contains(&self, action: &str) -> bool {
        self.handlers.contains_key(action)
    }

    pub async fn dispatch(&self, request: ActionRequest) -> ActionResponse {
        let ActionRequest {
            action,
            params,
            echo,
            ..
        } = request;

        let Some(handler) = self.handlers.get(&action) else {
            warn!(action, "unknown action");
            return ActionResponse::failed(
                ActionError::unsupported(format!("unsupported action: {action}")),
                echo,
            );
        };

        let params = if params.is_null() {
            Value::Object(serde_json::Map::new())
        } else {
            params
        };

        debug!(action, "dispatching action");
        match handler(params).await {
            Ok(data) => {
                debug!(action, "action ok");
                ActionResponse::ok(data, echo)
            },
            Err(err) => {
                warn!(action, retcode = err.retcode, msg = %err.message, "action failed");
                ActionResponse::failed(err, echo)
            },
        }
    }

    pub fn action_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.handlers.keys().cloned().collect();
        names.sort();
        names
    }
}
