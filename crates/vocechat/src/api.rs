//! Thin client for the VoceChat bot REST API.
//!
//! Every call carries the bot's `x-api-key`. Send, reply and upload calls go
//! through the optional send proxy; lookups always go direct.

use {
    reqwest::{
        Client, Response,
        header::{ACCEPT, CONTENT_TYPE},
        multipart,
    },
    secrecy::{ExposeSecret, Secret},
    serde::Deserialize,
    serde_json::{Value, json},
    tracing::{debug, error, info, warn},
    vocebot_onebot::Scope,
};

use crate::error::{Error, Result};

/// Server version this bridge is tested against.
pub const SUPPORTED_SERVER_VERSION: &str = "0.4.2";

const API_KEY_HEADER: &str = "x-api-key";

/// Content type VoceChat uses for "send an uploaded file" messages.
const FILE_MESSAGE_TYPE: &str = "vocechat/file";

#[derive(Clone)]
pub struct VoceChatClient {
    base_url: String,
    api_key: Secret<String>,
    http: Client,
    send_http: Client,
}

impl std::fmt::Debug for VoceChatClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VoceChatClient")
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

/// A user as returned by `GET /api/bot/user/{uid}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub name: String,
}

/// A group as listed by `GET /api/bot` or fetched by id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupInfo {
    pub group_id: String,
    pub name: String,
    pub description: String,
    pub owner_id: String,
    pub member_count: usize,
}

impl GroupInfo {
    fn from_value(value: &Value) -> Self {
        let text = |key: &str| value.get(key).and_then(Value::as_str).unwrap_or_default();
        Self {
            group_id: value.get("gid").map(id_string).unwrap_or_default(),
            name: text("name").to_string(),
            description: text("description").to_string(),
            owner_id: value.get("owner").map(id_string).unwrap_or_default(),
            member_count: value
                .get("members")
                .and_then(Value::as_array)
                .map_or(0, Vec::len),
        }
    }
}

/// Render a JSON id (number or string) as a string.
pub(crate) fn id_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

impl VoceChatClient {
    /// Build a client for `server_url` (without the trailing `/api`).
    pub fn new(
        server_url: &str,
        api_key: Secret<String>,
        send_proxy: Option<&str>,
    ) -> Result<Self> {
        let http = Client::new();
        let send_http = match send_proxy.filter(|p| !p.is_empty()) {
            Some(proxy) => {
                let proxy = reqwest::Proxy::all(proxy)
                    .map_err(|e| Error::validation(format!("invalid send proxy {proxy:?}: {e}")))?;
                Client::builder()
                    .proxy(proxy)
                    .build()
                    .map_err(|e| Error::internal(format!("failed to build proxied client: {e}")))?
            },
            None => http.clone(),
        };
        Ok(Self {
            base_url: server_url.trim_end_matches('/').to_string(),
            api_key,
            http,
            send_http,
        })
    }

    /// Public avatar URL of a user.
    pub fn avatar_url(&self, user_id: &str) -> String {
        format!(
            "{}/api/resource/avatar?uid={}",
            self.base_url,
            urlencoding::encode(user_id)
        )
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/api{path}", self.base_url)
    }

    fn send_endpoint(&self, scope: &Scope) -> String {
        match scope {
            Scope::Direct { user_id } => {
                self.endpoint(&format!("/bot/send_to_user/{}", urlencoding::encode(user_id)))
            },
            Scope::Group { group_id } => self.endpoint(&format!(
                "/bot/send_to_group/{}",
                urlencoding::encode(group_id)
            )),
        }
    }

    /// Prepare phase: announce a file and get its temporary id.
    pub async fn prepare_file(&self, filename: &str, content_type: &str) -> Result<String> {
        let url = self.endpoint("/bot/file/prepare");
        debug!(filename, content_type, "preparing file upload");
        let resp = self
            .http
            .post(&url)
            .header(API_KEY_HEADER, self.api_key.expose_secret())
            .header(ACCEPT, "*/*")
            .json(&json!({ "filename": filename, "content_type": content_type }))
            .send()
            .await
            .map_err(|e| Error::network("prepare file", e))?;
        let body = read_text(expect_success(resp).await?, "prepare file").await?;
        let file_id = body.trim().trim_matches('"');
        if file_id.is_empty() {
            return Err(Error::decode("prepare returned an empty file id"));
        }
        Ok(file_id.to_string())
    }

    /// Upload phase: send all bytes as a single, final chunk.
    ///
    /// Returns the full JSON response; its `path` is the persistent file id.
    pub async fn upload_file(
        &self,
        file_id: &str,
        filename: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<Value> {
        let url = self.endpoint("/bot/file/upload");
        let chunk = multipart::Part::bytes(bytes)
            .file_name(filename.to_string())
            .mime_str(content_type)
            .map_err(|e| Error::validation(format!("invalid content type {content_type:?}: {e}")))?;
        let form = multipart::Form::new()
            .text("file_id", file_id.to_string())
            .part("chunk_data", chunk)
            .text("chunk_is_last", "true");

        debug!(file_id, filename, "uploading file chunk");
        let resp = self
            .send_http
            .post(&url)
            .header(API_KEY_HEADER, self.api_key.expose_secret())
            .header(ACCEPT, "*/*")
            .header("cache-control", "no-cache")
            .multipart(form)
            .send()
            .await
            .map_err(|e| Error::network("upload file", e))?;
        let resp = expect_success(resp).await?;

        let is_json = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.contains("application/json"));
        let body = read_text(resp, "upload file").await?;
        if !is_json {
            return Err(Error::decode(format!("upload did not return JSON: {body}")));
        }
        let value: Value = serde_json::from_str(&body)
            .map_err(|e| Error::decode(format!("failed to parse upload response: {e}")))?;
        match value.get("path").and_then(Value::as_str) {
            Some(path) if !path.is_empty() => Ok(value),
            _ => Err(Error::decode(format!("upload response missing 'path': {value}"))),
        }
    }

    /// Send a plain-text message. Returns the raw response body.
    pub async fn send_text(&self, scope: &Scope, text: &str) -> Result<String> {
        let resp = self
            .send_http
            .post(self.send_endpoint(scope))
            .header(API_KEY_HEADER, self.api_key.expose_secret())
            .header(ACCEPT, "application/json; charset=utf-8")
            .header(CONTENT_TYPE, "text/plain")
            .body(text.to_string())
            .send()
            .await
            .map_err(|e| Error::network("send text message", e))?;
        read_text(expect_success(resp).await?, "send text message").await
    }

    /// Send a previously uploaded file by its persistent path.
    pub async fn send_file(&self, scope: &Scope, path: &str) -> Result<String> {
        let body = serde_json::to_vec(&json!({ "path": path }))?;
        let resp = self
            .send_http
            .post(self.send_endpoint(scope))
            .header(API_KEY_HEADER, self.api_key.expose_secret())
            .header(ACCEPT, "application/json; charset=utf-8")
            .header(CONTENT_TYPE, FILE_MESSAGE_TYPE)
            .body(body)
            .send()
            .await
            .map_err(|e| Error::network("send file message", e))?;
        read_text(expect_success(resp).await?, "send file message").await
    }

    /// Reply to an existing message.
    pub async fn reply(&self, message_id: &str, user_id: Option<&str>) -> Result<String> {
        let payload = match user_id.filter(|id| !id.is_empty()) {
            Some(user_id) => json!({ "user_id": user_id }),
            None => json!({}),
        };
        let url = self.endpoint(&format!("/bot/reply/{}", urlencoding::encode(message_id)));
        let resp = self
            .send_http
            .post(url)
            .header(API_KEY_HEADER, self.api_key.expose_secret())
            .header(ACCEPT, "application/json; charset=utf-8")
            .json(&payload)
            .send()
            .await
            .map_err(|e| Error::network("send reply message", e))?;
        read_text(expect_success(resp).await?, "send reply message").await
    }

    pub async fn get_user(&self, user_id: &str) -> Result<UserProfile> {
        let url = self.endpoint(&format!("/bot/user/{}", urlencoding::encode(user_id)));
        let value = self.get_json(&url, &[("uid", user_id)], "get user").await?;
        Ok(serde_json::from_value(value)?)
    }

    pub async fn list_groups(&self) -> Result<Vec<GroupInfo>> {
        let value = self.get_json(&self.endpoint("/bot"), &[], "list groups").await?;
        let groups = value
            .as_array()
            .ok_or_else(|| Error::decode(format!("expected a group array, got: {value}")))?;
        Ok(groups.iter().map(GroupInfo::from_value).collect())
    }

    pub async fn get_group(&self, group_id: &str) -> Result<GroupInfo> {
        let url = self.endpoint(&format!("/bot/group/{}", urlencoding::encode(group_id)));
        let value = self.get_json(&url, &[("gid", group_id)], "get group").await?;
        Ok(GroupInfo::from_value(&value))
    }

    /// Server version string, e.g. `0.4.2`.
    pub async fn server_version(&self) -> Result<String> {
        let resp = self
            .http
            .get(self.endpoint("/admin/system/version"))
            .header(API_KEY_HEADER, self.api_key.expose_secret())
            .send()
            .await
            .map_err(|e| Error::network("get server version", e))?;
        let body = read_text(expect_success(resp).await?, "get server version").await?;
        Ok(body.trim().trim_matches('"').to_string())
    }

    /// Log whether the server runs the supported version. Never fails.
    pub async fn check_server_version(&self) -> Option<String> {
        match self.server_version().await {
            Ok(version) if version == SUPPORTED_SERVER_VERSION => {
                info!(%version, "VoceChat server version supported");
                Some(version)
            },
            Ok(version) => {
                warn!(
                    %version,
                    supported = SUPPORTED_SERVER_VERSION,
                    "VoceChat server version differs from the supported one, some calls may fail"
                );
                Some(version)
            },
            Err(e) => {
                error!(error = %e, "failed to get VoceChat server version");
                None
            },
        }
    }

    async fn get_json(&self, url: &str, query: &[(&str, &str)], context: &str) -> Result<Value> {
        let resp = self
            .http
            .get(url)
            .query(query)
            .header(API_KEY_HEADER, self.api_key.expose_secret())
            .header(ACCEPT, "application/json; charset=utf-8")
            .send()
            .await
            .map_err(|e| Error::network(context, e))?;
        let body = read_text(expect_success(resp).await?, context).await?;
        serde_json::from_str(&body)
            .map_err(|e| Error::decode(format!("failed to parse {context} response: {e}")))
    }
}

async fn expect_success(resp: Response) -> Result<Response> {
    let status = resp.status();
    if status.is_client_error() || status.is_server_error() {
        let path = resp.url().path().to_string();
        let body = resp.text().await.unwrap_or_default();
        warn!(status = status.as_u16(), %path, %body, "VoceChat API call failed");
        return Err(Error::UpstreamHttp {
            status: status.as_u16(),
            body,
        });
    }
    Ok(resp)
}

async fn read_text(resp: Response, context: &str) -> Result<String> {
    resp.text().await.map_err(|e| Error::network(context, e))
}
