//! Wire the VoceChat side to the OneBot host and run both listeners.

use std::sync::Arc;

use {
    anyhow::Context,
    secrecy::{ExposeSecret, Secret},
    tracing::{info, warn},
    vocebot_config::BridgeConfig,
    vocebot_onebot::{
        BotSelf, EventSink, OneBotHost, buffer::EventBuffer, http::action_router,
        webhook::HttpWebhookTransport,
    },
    vocebot_vocechat::{
        BridgeState, ContactDirectory, VoceChatClient, register_actions, webhook_router,
    },
};

const IMPL_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Everything `serve` needs, built from config but not yet listening.
pub struct Bridge {
    pub host: Arc<OneBotHost>,
    pub api: VoceChatClient,
    pub directory: Arc<ContactDirectory>,
}

/// Build the host, its transports and the VoceChat action handlers.
pub fn build(config: &BridgeConfig) -> anyhow::Result<Bridge> {
    let vc = &config.vocechat;
    let api = VoceChatClient::new(
        &vc.server_url,
        Secret::new(vc.api_key.expose_secret().clone()),
        vc.send_proxy.as_deref(),
    )
    .context("failed to build VoceChat client")?;
    if let Some(proxy) = &vc.send_proxy {
        info!(%proxy, "send calls go through proxy");
    }

    let directory = Arc::new(ContactDirectory::load(api.clone(), &vc.contact_store));
    info!(
        path = %directory.path().display(),
        contacts = directory.len(),
        "contact directory ready"
    );

    let onebot = &config.onebot;
    let mut host = OneBotHost::new(&onebot.impl_name, IMPL_VERSION, BotSelf {
        platform: vc.platform.clone(),
        user_id: vc.bot_user_id.clone(),
    });
    if onebot.http.enabled && onebot.http.event_enabled {
        host = host.with_event_buffer(Arc::new(EventBuffer::new(onebot.http.event_buffer_size)));
    }
    if onebot.http_webhook.enabled {
        let mut transport = HttpWebhookTransport::new(
            reqwest::Client::new(),
            &onebot.http_webhook.url,
            &onebot.impl_name,
            IMPL_VERSION,
        );
        if let Some(token) = &onebot.http_webhook.access_token {
            transport = transport.with_access_token(Secret::new(token.expose_secret().clone()));
        }
        info!(url = %onebot.http_webhook.url, "OneBot HTTP webhook transport enabled");
        host = host.with_transport(Arc::new(transport));
    }

    let state = BridgeState::new(api.clone(), Arc::clone(&directory), &vc.bot_user_id);
    register_actions(host.registry_mut(), Arc::new(state));

    Ok(Bridge {
        host: Arc::new(host),
        api,
        directory,
    })
}

/// Probe the server, report the bridge online, then serve until a listener
/// fails.
pub async fn serve(config: BridgeConfig) -> anyhow::Result<()> {
    let Bridge {
        host,
        api,
        directory,
    } = build(&config)?;

    api.check_server_version().await;
    host.set_good(true);
    host.set_online(true);
    host.update_status().await;

    let webhook_routes = webhook_app(&host, directory);
    let webhook_listener = bind(&config.webhook.bind, config.webhook.port).await?;
    info!(addr = %webhook_listener.local_addr()?, "VoceChat webhook listening");
    let webhook = async move {
        axum::serve(webhook_listener, webhook_routes)
            .await
            .context("webhook server failed")
    };

    let http = &config.onebot.http;
    if !http.enabled {
        warn!("OneBot HTTP action transport disabled");
        return webhook.await;
    }

    let token = http
        .access_token
        .as_ref()
        .map(|t| Secret::new(t.expose_secret().clone()));
    let action_app = action_router(Arc::clone(&host), token);
    let action_listener = bind(&http.bind, http.port).await?;
    info!(
        addr = %action_listener.local_addr()?,
        actions = host.supported_actions().len(),
        "OneBot HTTP listening"
    );
    let actions = async move {
        axum::serve(action_listener, action_app)
            .await
            .context("OneBot HTTP server failed")
    };

    tokio::try_join!(webhook, actions)?;
    Ok(())
}

/// VoceChat webhook router emitting into `host`.
fn webhook_app(host: &Arc<OneBotHost>, directory: Arc<ContactDirectory>) -> axum::Router {
    let sink: Arc<dyn EventSink> = host.clone();
    webhook_router(sink, directory)
}

async fn bind(host: &str, port: u16) -> anyhow::Result<tokio::net::TcpListener> {
    tokio::net::TcpListener::bind((host, port))
        .await
        .with_context(|| format!("failed to bind {host}:{port}"))
}
