//! Acquire upload bytes from a URL, a local path or inline base64 data.

use std::{collections::HashMap, path::Path};

use {
    base64::Engine as _,
    reqwest::header::CONTENT_TYPE,
    serde::Deserialize,
    tracing::{debug, warn},
};

use crate::{
    error::{Error, Result},
    upload::FilePayload,
};

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Params of the `upload_file` action.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UploadFileParams {
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    pub url: String,
    pub headers: Option<HashMap<String, String>>,
    pub path: String,
    pub data: String,
    /// Accepted for protocol compatibility, not verified.
    pub sha256: String,
}

/// Where the bytes of an upload come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileSource {
    Url {
        url: String,
        headers: HashMap<String, String>,
    },
    Path(String),
    Data(String),
}

impl UploadFileParams {
    /// Pick the source named by `type`, checking its required field.
    pub fn source(&self) -> Result<FileSource> {
        match self.kind.as_str() {
            "url" if self.url.is_empty() => {
                Err(Error::validation("missing 'url' parameter for type 'url'"))
            },
            "url" => Ok(FileSource::Url {
                url: self.url.clone(),
                headers: self.headers.clone().unwrap_or_default(),
            }),
            "path" if self.path.is_empty() => {
                Err(Error::validation("missing 'path' parameter for type 'path'"))
            },
            "path" => Ok(FileSource::Path(self.path.clone())),
            "data" if self.data.is_empty() => {
                Err(Error::validation("missing 'data' parameter for type 'data'"))
            },
            "data" => Ok(FileSource::Data(self.data.clone())),
            other => Err(Error::validation(format!("unsupported upload type: {other}"))),
        }
    }
}

/// Fetch the bytes described by `params` and settle filename and content type.
pub async fn acquire(http: &reqwest::Client, params: &UploadFileParams) -> Result<FilePayload> {
    let source = params.source()?;
    let mut filename = params.name.clone();
    let mut content_type = guess_content_type(&filename);

    let bytes = match source {
        FileSource::Url { url, headers } => {
            let mut req = http.get(&url);
            for (name, value) in &headers {
                req = req.header(name.as_str(), value.as_str());
            }
            let resp = req
                .send()
                .await
                .map_err(|e| Error::network("download file", e))?;
            let status = resp.status();
            if status.is_client_error() || status.is_server_error() {
                let body = resp.text().await.unwrap_or_default();
                warn!(%url, status = status.as_u16(), "file download failed");
                return Err(Error::UpstreamHttp {
                    status: status.as_u16(),
                    body,
                });
            }
            if let Some(ct) = resp
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .filter(|ct| !ct.is_empty())
            {
                content_type = ct.to_string();
            }
            if filename.is_empty() {
                filename = url_basename(&url).unwrap_or_else(|| "downloaded_file".into());
            }
            resp.bytes()
                .await
                .map_err(|e| Error::network("download file", e))?
                .to_vec()
        },
        FileSource::Path(path) => {
            let bytes = tokio::fs::read(&path)
                .await
                .map_err(|e| Error::io(&path, e))?;
            if filename.is_empty() {
                filename = Path::new(&path)
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
            }
            bytes
        },
        FileSource::Data(data) => {
            // Line-wrapped (MIME style) input is accepted.
            let compact: String = data.split_ascii_whitespace().collect();
            let bytes = base64::engine::general_purpose::STANDARD.decode(compact)?;
            if filename.is_empty() {
                filename = format!("uploaded_file{}", extension_for(&content_type));
            }
            bytes
        },
    };

    if filename.is_empty() {
        return Err(Error::validation("could not determine filename"));
    }
    debug!(%filename, %content_type, size = bytes.len(), "upload source acquired");
    Ok(FilePayload {
        filename,
        content_type,
        bytes,
    })
}

fn guess_content_type(filename: &str) -> String {
    if filename.is_empty() {
        return DEFAULT_CONTENT_TYPE.into();
    }
    mime_guess::from_path(filename)
        .first_raw()
        .unwrap_or(DEFAULT_CONTENT_TYPE)
        .to_string()
}

/// `.ext` for a content type, `.bin` when unknown.
fn extension_for(content_type: &str) -> String {
    let essence = content_type.split(';').next().unwrap_or_default().trim();
    if essence == DEFAULT_CONTENT_TYPE {
        return ".bin".into();
    }
    mime_guess::get_mime_extensions_str(essence)
        .and_then(|exts| exts.first())
        .map_or_else(|| ".bin".into(), |ext| format!(".{ext}"))
}

fn url_basename(raw: &str) -> Option<String> {
    let url = url::Url::parse(raw).ok()?;
    let last = url.path_segments()?.next_back()?;
    let decoded = urlencoding::decode(last).ok()?;
    (!decoded.is_empty()).then(|| decoded.into_owned())
}
