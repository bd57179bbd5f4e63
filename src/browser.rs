use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::channel::mpsc::{channel, Sender};
use futures::channel::oneshot::channel as oneshot_channel;
use futures::SinkExt;
use serde_json::Value;

use crate::cdp::target::CreateTargetParams;
use crate::conn::Connection;
use crate::emitter::EventEmitter;
use crate::error::{CdpError, Result};
use crate::handler::target::PageState;
use crate::handler::{Handler, HandlerMessage, PageRegistration, REQUEST_TIMEOUT};
use crate::page::Page;
use crate::protocol::{Command, CommandResponse};
use crate::stealth::{PatchRegistry, StealthProfile};

/// How to reach the browser's remote debugging endpoint and how the pages it
/// hands out should behave.
#[derive(Debug, Clone)]
pub struct BrowserConfig {
    /// Host the browser's debugging endpoint listens on
    pub host: String,
    /// Port of the debugging endpoint
    pub port: u16,
    /// Timeout applied to every command without an explicit deadline
    pub request_timeout: Duration,
    /// When set, every new page gets the stealth patches of this profile
    pub stealth: Option<StealthProfile>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 9222,
            request_timeout: Duration::from_millis(REQUEST_TIMEOUT),
            stealth: None,
        }
    }
}

impl BrowserConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    pub fn with_stealth(mut self, profile: StealthProfile) -> Self {
        self.stealth = Some(profile);
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// A `Browser` is created when this crate connects to a running Chromium
/// instance.
///
/// [`Browser::connect`] returns the api handle plus the [`Handler`] that
/// drives the websocket; spawn a task that polls the handler to completion:
///
/// ```no_run
/// # use cdp_stealth::{Browser, BrowserConfig};
/// # use futures::StreamExt;
/// # async fn run() -> Result<(), cdp_stealth::CdpError> {
/// let (browser, mut handler) = Browser::connect(BrowserConfig::default()).await?;
/// let driver = async_std::task::spawn(async move {
///     while handler.next().await.is_some() {}
/// });
/// let page = browser.new_page().await?;
/// page.navigate("https://example.com").await?;
/// browser.close().await?;
/// driver.await;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Browser {
    /// The sender half of the channel into the handler that drives the
    /// websocket
    sender: Sender<HandlerMessage>,
    config: BrowserConfig,
    /// The debug websocket url this browser is connected over
    debug_ws_url: String,
    /// The stealth patch registry shared by every page of this browser
    registry: Arc<PatchRegistry>,
    pages: Mutex<Vec<Page>>,
    closing: AtomicBool,
}

impl Browser {
    /// Discover the websocket debugger url of the browser at
    /// `config.host:config.port` and connect to it.
    pub async fn connect(config: BrowserConfig) -> Result<(Self, Handler)> {
        let debug_ws_url = discover_ws_url(&config.host, config.port).await?;
        Self::connect_with_ws_url(config, debug_ws_url).await
    }

    /// Connect straight to a known websocket debugger url.
    pub async fn connect_with_ws_url(
        config: BrowserConfig,
        debug_ws_url: String,
    ) -> Result<(Self, Handler)> {
        let conn = Connection::connect(&debug_ws_url).await?;
        tracing::info!(url = %debug_ws_url, "connected to browser");

        let (tx, rx) = channel(256);
        let handler = Handler::new(conn, rx);
        let browser = Self {
            sender: tx,
            config,
            debug_ws_url,
            registry: Arc::new(PatchRegistry::with_builtin_patches()),
            pages: Mutex::new(Vec::new()),
            closing: AtomicBool::new(false),
        };
        Ok((browser, handler))
    }

    /// The websocket url this browser is connected over.
    pub fn ws_url(&self) -> &str {
        &self.debug_ws_url
    }

    pub fn config(&self) -> &BrowserConfig {
        &self.config
    }

    /// The registry the stealth injector reads from.
    pub fn patch_registry(&self) -> &Arc<PatchRegistry> {
        &self.registry
    }

    /// Execute a command at the browser level, outside any page session.
    pub async fn execute<T: Command>(&self, cmd: T) -> Result<CommandResponse<T::Response>> {
        if self.closing.load(Ordering::SeqCst) {
            return Err(CdpError::TransportClosed);
        }
        crate::page::execute(cmd, self.sender.clone(), None, self.config.request_timeout).await
    }

    /// Create a new page: create and attach to a target, enable the required
    /// domains and, when the config carries a stealth profile, install the
    /// profile's patches before handing the page out.
    pub async fn new_page(&self) -> Result<Page> {
        if self.closing.load(Ordering::SeqCst) {
            return Err(CdpError::TransportClosed);
        }
        let resp = self.execute(CreateTargetParams::default()).await?;
        let target_id = resp.result.target_id;
        tracing::debug!(%target_id, "created target");

        let state = Arc::new(Mutex::new(PageState::default()));
        let emitter = Arc::new(EventEmitter::new());
        self.sender
            .clone()
            .send(HandlerMessage::RegisterPage(PageRegistration {
                target_id: target_id.clone(),
                state: Arc::clone(&state),
                emitter: Arc::clone(&emitter),
            }))
            .await?;

        let page = Page::new(
            target_id,
            self.sender.clone(),
            state,
            emitter,
            self.config.request_timeout,
        );
        page.initialize().await?;

        if let Some(profile) = &self.config.stealth {
            crate::stealth::injector::apply_stealth(&page, profile, &self.registry).await?;
        }

        self.pages.lock().unwrap().push(page.clone());
        Ok(page)
    }

    /// Pages created through this browser that have not been closed yet.
    pub fn pages(&self) -> Vec<Page> {
        self.pages.lock().unwrap().clone()
    }

    /// Close every page, cancel all pending commands and stop the handler.
    /// Idempotent.
    pub async fn close(&self) -> Result<()> {
        if self.closing.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        tracing::debug!("closing browser");

        let pages: Vec<Page> = std::mem::take(&mut *self.pages.lock().unwrap());
        for page in pages {
            if let Err(err) = page.close().await {
                tracing::warn!("failed to close page: {err}");
            }
        }

        let (tx, rx) = oneshot_channel();
        if self
            .sender
            .clone()
            .send(HandlerMessage::Shutdown(tx))
            .await
            .is_ok()
        {
            // the handler cancels every pending command before acking
            let _ = rx.await;
        }
        tracing::info!("browser closed");
        Ok(())
    }
}

/// Fetch `webSocketDebuggerUrl` from the browser's `/json/version` endpoint.
///
/// Browsers often advertise their own default authority; any embedded
/// `localhost:9222` is rewritten to the configured host and port.
async fn discover_ws_url(host: &str, port: u16) -> Result<String> {
    let version_url = format!("http://{host}:{port}/json/version");
    let body = reqwest::get(&version_url).await?.text().await?;
    let resp: Value = serde_json::from_str(&body)?;
    let ws_url = resp
        .get("webSocketDebuggerUrl")
        .and_then(Value::as_str)
        .ok_or_else(|| CdpError::msg("no webSocketDebuggerUrl in /json/version response"))?;

    let ws_url = if ws_url.contains("localhost:9222") {
        ws_url.replace("localhost:9222", &format!("{host}:{port}"))
    } else {
        ws_url.to_string()
    };
    url::Url::parse(&ws_url)?;
    Ok(ws_url)
}
