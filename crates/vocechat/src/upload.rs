//! Two-phase file transfer: prepare, then upload one final chunk.

use {serde_json::Value, tracing::{debug, warn}};

use crate::{
    api::VoceChatClient,
    error::{Error, Result},
};

/// Bytes to stage, with the metadata VoceChat needs for them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePayload {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Which remote call a transfer failed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferPhase {
    Prepare,
    Upload,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferState {
    Idle,
    Prepared { temp_ref: String },
    Uploaded { persistent_ref: String },
    Failed { phase: TransferPhase },
}

/// One file transfer. Lives for a single upload and is never reused;
/// there is no way out of `Failed`.
pub struct FileTransfer<'a> {
    api: &'a VoceChatClient,
    filename: String,
    content_type: String,
    bytes: Vec<u8>,
    state: TransferState,
}

impl<'a> FileTransfer<'a> {
    pub fn new(api: &'a VoceChatClient, payload: FilePayload) -> Self {
        Self {
            api,
            filename: payload.filename,
            content_type: payload.content_type,
            bytes: payload.bytes,
            state: TransferState::Idle,
        }
    }

    pub fn state(&self) -> &TransferState {
        &self.state
    }

    /// `Idle -> Prepared | Failed`. Returns the temporary reference.
    pub async fn prepare(&mut self) -> Result<&str> {
        if self.state != TransferState::Idle {
            return Err(Error::internal(format!(
                "cannot prepare a transfer in state {:?}",
                self.state
            )));
        }
        match self.api.prepare_file(&self.filename, &self.content_type).await {
            Ok(temp_ref) => {
                debug!(filename = %self.filename, %temp_ref, "file prepared");
                self.state = TransferState::Prepared { temp_ref };
            },
            Err(e) => {
                warn!(filename = %self.filename, error = %e, "file prepare failed");
                self.state = TransferState::Failed {
                    phase: TransferPhase::Prepare,
                };
                return Err(e);
            },
        }
        match &self.state {
            TransferState::Prepared { temp_ref } => Ok(temp_ref),
            _ => Err(Error::internal("transfer left the prepared state")),
        }
    }

    /// `Prepared -> Uploaded | Failed`. Returns the persistent reference.
    pub async fn upload(&mut self) -> Result<&str> {
        let TransferState::Prepared { temp_ref } = &self.state else {
            return Err(Error::internal(format!(
                "cannot upload a transfer in state {:?}",
                self.state
            )));
        };
        let bytes = std::mem::take(&mut self.bytes);
        let result = self
            .api
            .upload_file(temp_ref, &self.filename, &self.content_type, bytes)
            .await
            .and_then(|resp| {
                resp.get("path")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .ok_or_else(|| Error::decode("upload response missing 'path'"))
            });
        match result {
            Ok(persistent_ref) => {
                debug!(filename = %self.filename, %persistent_ref, "file uploaded");
                self.state = TransferState::Uploaded { persistent_ref };
            },
            Err(e) => {
                warn!(filename = %self.filename, error = %e, "file upload failed");
                self.state = TransferState::Failed {
                    phase: TransferPhase::Upload,
                };
                return Err(e);
            },
        }
        match &self.state {
            TransferState::Uploaded { persistent_ref } => Ok(persistent_ref),
            _ => Err(Error::internal("transfer left the uploaded state")),
        }
    }

    /// Run both phases and return the persistent reference.
    pub async fn run(mut self) -> Result<String> {
        self.prepare().await?;
        Ok(self.upload().await?.to_string())
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, secrecy::Secret};

    fn payload() -> FilePayload {
        FilePayload {
            filename: "a.bin".into(),
            content_type: "application/octet-stream".into(),
            bytes: vec![1, 2, 3],
        }
    }

    fn client(server: &mockito::ServerGuard) -> VoceChatClient {
        VoceChatClient::new(&server.url(), Secret::new("key".into()), None).unwrap()
    }

    #[tokio::test]
    async fn idle_to_uploaded() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/bot/file/prepare")
            .with_body("tmp")
            .create_async()
            .await;
        let _mock = server
            .mock("POST", "/api/bot/file/upload")
            .with_header("content-type", "application/json")
            .with_body(r#"{"path": "p/a.bin"}"#)
            .create_async()
            .await;

        let api = client(&server);
        let mut transfer = FileTransfer::new(&api, payload());
        assert_eq!(transfer.state(), &TransferState::Idle);
        assert_eq!(transfer.prepare().await.unwrap(), "tmp");
        assert_eq!(transfer.upload().await.unwrap(), "p/a.bin");
        assert_eq!(transfer.state(), &TransferState::Uploaded {
            persistent_ref: "p/a.bin".into()
        });
    }

    #[tokio::test]
    async fn prepare_failure_is_terminal() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/bot/file/prepare")
            .with_status(500)
            .create_async()
            .await;
        let upload = server
            .mock("POST", "/api/bot/file/upload")
            .expect(0)
            .create_async()
            .await;

        let api = client(&server);
        let mut transfer = FileTransfer::new(&api, payload());
        assert!(transfer.prepare().await.is_err());
        assert_eq!(transfer.state(), &TransferState::Failed {
            phase: TransferPhase::Prepare
        });
        assert!(transfer.prepare().await.is_err());
        assert!(transfer.upload().await.is_err());
        upload.assert_async().await;
    }

    #[tokio::test]
    async fn upload_failure_is_distinguishable() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/bot/file/prepare")
            .with_body("tmp")
            .create_async()
            .await;
        let _mock = server
            .mock("POST", "/api/bot/file/upload")
            .with_status(413)
            .with_body("too large")
            .create_async()
            .await;

        let api = client(&server);
        let mut transfer = FileTransfer::new(&api, payload());
        transfer.prepare().await.unwrap();
        let err = transfer.upload().await.unwrap_err();
        assert!(matches!(err, Error::UpstreamHttp { status: 413, .. }));
        assert_eq!(transfer.state(), &TransferState::Failed {
            phase: TransferPhase::Upload
        });
    }

    #[tokio::test]
    async fn upload_before_prepare_is_rejected() {
        let server = mockito::Server::new_async().await;
        let api = client(&server);
        let mut transfer = FileTransfer::new(&api, payload());
        assert!(transfer.upload().await.is_err());
        assert_eq!(transfer.state(), &TransferState::Idle);
    }
}
