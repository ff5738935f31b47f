//! OneBot "HTTP webhook" transport: POST every event frame to a URL.

use {
    async_trait::async_trait,
    secrecy::{ExposeSecret, Secret},
    serde_json::Value,
    tracing::{debug, warn},
};

use crate::sink::EventTransport;

pub struct HttpWebhookTransport {
    http: reqwest::Client,
    url: String,
    impl_name: String,
    user_agent: String,
    access_token: Option<Secret<String>>,
}

impl HttpWebhookTransport {
    pub fn new(
        http: reqwest::Client,
        url: impl Into<String>,
        impl_name: impl Into<String>,
        impl_version: &str,
    ) -> Self {
        let impl_name = impl_name.into();
        Self {
            http,
            url: url.into(),
            user_agent: format!("OneBot/12 ({impl_name}) {impl_name}/{impl_version}"),
            impl_name,
            access_token: None,
        }
    }

    pub fn with_access_token(mut self, token: Secret<String>) -> Self {
        if !token.expose_secret().is_empty() {
            self.access_token = Some(token);
        }
        self
    }
}

#[async_trait]
impl EventTransport for HttpWebhookTransport {
    async fn push(&self, frame: &Value) {
        let mut req = self
            .http
            .post(&self.url)
            .header("User-Agent", &self.user_agent)
            .header("X-OneBot-Version", "12")
            .header("X-Impl", &self.impl_name)
            .json(frame);
        if let Some(token) = &self.access_token {
            req = req.bearer_auth(token.expose_secret());
        }

        match req.send().await {
            Ok(resp) if resp.status().is_success() => {
                debug!(url = %self.url, "event pushed to webhook");
            },
            Ok(resp) => {
                warn!(url = %self.url, status = %resp.status(), "webhook rejected event");
            },
            Err(e) => {
                warn!(url = %self.url, error = %e, "failed to push event to webhook");
            },
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, serde_json::json};

    #[tokio::test]
    async fn posts_frame_with_onebot_headers() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/events")
            .match_header("x-onebot-version", "12")
            .match_header("x-impl", "vocebot")
            .match_header("authorization", "Bearer tok")
            .match_body(mockito::Matcher::Json(json!({"type": "message"})))
            .with_status(204)
            .create_async()
            .await;

        let transport = HttpWebhookTransport::new(
            reqwest::Client::new(),
            format!("{}/events", server.url()),
            "vocebot",
            "0.1.0",
        )
        .with_access_token(Secret::new("tok".into()));
        transport.push(&json!({"type": "message"})).await;
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn upstream_failure_is_swallowed() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/")
            .with_status(500)
            .create_async()
            .await;
        let transport =
            HttpWebhookTransport::new(reqwest::Client::new(), server.url(), "vocebot", "0.1.0");
        transport.push(&json!({})).await;
        mock.assert_async().await;
    }
}
