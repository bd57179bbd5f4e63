use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use futures::channel::mpsc::Sender;
use futures::channel::oneshot::channel as oneshot_channel;
use futures::{FutureExt, SinkExt};
use futures_timer::Delay;
use serde_json::Value;

use crate::cdp::dom;
use crate::cdp::network::{Cookie, GetAllCookiesParams};
use crate::cdp::page::{
    AddScriptToEvaluateOnNewDocumentParams, CaptureScreenshotParams, GetNavigationHistoryParams,
    NavigateParams,
};
use crate::cdp::runtime::EvaluateParams;
use crate::cdp::target::{
    AttachToTargetParams, CloseTargetParams, DetachFromTargetParams, SessionId, TargetId,
};
use crate::cdp::{emulation, network, page as page_domain, runtime};
use crate::cmd::{to_command_response, CommandMessage};
use crate::emitter::EventEmitter;
use crate::error::{CdpError, NavigationError, Result};
use crate::handler::target::{signal, NavigationState, PageState};
use crate::handler::HandlerMessage;
use crate::input::Input;
use crate::protocol::{Command, CommandResponse, Method, Response};

/// Default navigation timeout
pub const NAVIGATION_TIMEOUT: Duration = Duration::from_secs(30);
/// Deadline for enabling the required domains during initialization
const DOMAIN_ENABLE_TIMEOUT: Duration = Duration::from_secs(5);
/// Deadline for acquiring the default execution context
const EXECUTION_CONTEXT_TIMEOUT: Duration = Duration::from_secs(2);
/// Sustained quiet window after which the network counts as idle
const NETWORK_QUIESCENCE: Duration = Duration::from_millis(500);
/// Poll interval for selector and network-idle waits
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// The navigation condition a caller requires before a navigation resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WaitUntil {
    DomContentLoaded,
    #[default]
    Load,
    NetworkIdle,
    /// First of load, domcontentloaded or networkidle
    Any,
}

/// A handle to one attached page session.
///
/// Cheap to clone; all clones drive the same underlying session.
#[derive(Debug, Clone)]
pub struct Page {
    inner: Arc<PageInner>,
}

impl Page {
    pub(crate) fn new(
        target_id: TargetId,
        sender: Sender<HandlerMessage>,
        state: Arc<Mutex<PageState>>,
        emitter: Arc<EventEmitter>,
        command_timeout: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(PageInner {
                target_id,
                session_id: Mutex::new(None),
                sender,
                state,
                emitter,
                closed: AtomicBool::new(false),
                command_timeout,
            }),
        }
    }

    /// Execute a command scoped to this page's session.
    pub async fn execute<T: Command>(&self, cmd: T) -> Result<CommandResponse<T::Response>> {
        self.inner.execute(cmd).await
    }

    /// The identifier of the `Target` this page belongs to
    pub fn target_id(&self) -> &TargetId {
        &self.inner.target_id
    }

    /// The identifier of the session this page is attached over, once attached
    pub fn session_id(&self) -> Option<SessionId> {
        self.inner.session_id()
    }

    pub(crate) fn emitter(&self) -> &Arc<EventEmitter> {
        &self.inner.emitter
    }

    /// Snapshot of the current navigation lifecycle flags.
    pub fn navigation_state(&self) -> NavigationState {
        self.inner.state.lock().unwrap().nav
    }

    /// Attach to the target, enable the required domains and acquire the
    /// default execution context.
    pub(crate) async fn initialize(&self) -> Result<()> {
        self.inner.attach().await?;

        let enables = async {
            futures::try_join!(
                self.inner.execute(page_domain::EnableParams::default()),
                self.inner.execute(runtime::EnableParams::default()),
                self.inner.execute(network::EnableParams::default()),
                self.inner.execute(dom::EnableParams::default()),
            )
        }
        .fuse();
        futures::pin_mut!(enables);
        futures::select! {
            res = enables => {
                res?;
            }
            _ = Delay::new(DOMAIN_ENABLE_TIMEOUT).fuse() => {
                return Err(CdpError::Timeout {
                    method: "Page.initialize".into(),
                    timeout: DOMAIN_ENABLE_TIMEOUT,
                });
            }
        }

        self.ensure_execution_context(EXECUTION_CONTEXT_TIMEOUT)
            .await
    }

    /// Navigate to the given url and wait for the load event.
    pub async fn navigate(&self, url: impl Into<String>) -> Result<&Self> {
        self.navigate_with(url, WaitUntil::Load, NAVIGATION_TIMEOUT)
            .await
    }

    /// Navigate and block until `wait_until` holds or the timeout elapses.
    pub async fn navigate_with(
        &self,
        url: impl Into<String>,
        wait_until: WaitUntil,
        timeout: Duration,
    ) -> Result<&Self> {
        let url = url.into();
        let deadline = Instant::now() + timeout;

        let resp = self.inner.execute(NavigateParams::new(url)).await?;
        if let Some(error_text) = &resp.result.error_text {
            return Err(NavigationError::new(error_text.clone(), self.navigation_state()).into());
        }

        self.wait_for_navigation_until(wait_until, deadline).await?;

        // a new document means a new execution context; make sure the next
        // evaluate finds one
        self.ensure_execution_context(EXECUTION_CONTEXT_TIMEOUT)
            .await?;
        Ok(self)
    }

    /// Block until `wait_until` holds for the current navigation.
    pub async fn wait_for_navigation(&self, wait_until: WaitUntil, timeout: Duration) -> Result<()> {
        self.wait_for_navigation_until(wait_until, Instant::now() + timeout)
            .await
    }

    async fn wait_for_navigation_until(
        &self,
        wait_until: WaitUntil,
        deadline: Instant,
    ) -> Result<()> {
        match wait_until {
            WaitUntil::DomContentLoaded => {
                self.wait_signal(
                    |nav| nav.dom_content_event_fired,
                    signal::DOM_CONTENT,
                    deadline,
                )
                .await
            }
            WaitUntil::Load => {
                self.wait_signal(|nav| nav.load_complete, signal::LOAD, deadline)
                    .await
            }
            WaitUntil::NetworkIdle => self.wait_network_idle_signal(deadline).await,
            WaitUntil::Any => self.wait_any_signal(deadline).await,
        }
    }

    /// Park on a synthetic lifecycle signal, checking the shared state first
    /// so a signal that fired before we arrived is not missed.
    async fn wait_signal(
        &self,
        done: impl Fn(&NavigationState) -> bool,
        name: &'static str,
        deadline: Instant,
    ) -> Result<()> {
        loop {
            if done(&self.navigation_state()) {
                return Ok(());
            }
            let Some(remaining) = deadline.checked_duration_since(Instant::now()).filter(|d| !d.is_zero()) else {
                return Err(self.navigation_timeout(name));
            };
            match self.inner.emitter.wait_for(name, remaining).await {
                Ok(_) => continue,
                Err(CdpError::Timeout { .. }) => return Err(self.navigation_timeout(name)),
                Err(err) => return Err(err),
            }
        }
    }

    /// Network idle requires a stopped main frame plus a sustained quiet
    /// window, so a burst of requests right after the idle edge does not count.
    async fn wait_network_idle_signal(&self, deadline: Instant) -> Result<()> {
        loop {
            let nav = self.navigation_state();
            if nav.network_idle && nav.frame_stopped_loading {
                Delay::new(NETWORK_QUIESCENCE).await;
                let nav = self.navigation_state();
                if nav.network_idle && nav.frame_stopped_loading {
                    return Ok(());
                }
                continue;
            }
            let Some(remaining) = deadline.checked_duration_since(Instant::now()).filter(|d| !d.is_zero()) else {
                return Err(self.navigation_timeout(signal::NETWORK_IDLE));
            };
            // cap the park so a missed edge (e.g. frame stop without a fresh
            // idle emission) is re-checked promptly
            let park = remaining.min(NETWORK_QUIESCENCE);
            match self.inner.emitter.wait_for(signal::NETWORK_IDLE, park).await {
                Ok(_) | Err(CdpError::Timeout { .. }) => continue,
                Err(err) => return Err(err),
            }
        }
    }

    async fn wait_any_signal(&self, deadline: Instant) -> Result<()> {
        let nav = self.navigation_state();
        if nav.load_complete || nav.dom_content_event_fired || nav.network_idle {
            return Ok(());
        }
        let Some(remaining) = deadline.checked_duration_since(Instant::now()).filter(|d| !d.is_zero()) else {
            return Err(self.navigation_timeout("any"));
        };
        let emitter = &self.inner.emitter;
        let load = emitter.wait_for(signal::LOAD, remaining).fuse();
        let dom_content = emitter.wait_for(signal::DOM_CONTENT, remaining).fuse();
        let network_idle = emitter.wait_for(signal::NETWORK_IDLE, remaining).fuse();
        futures::pin_mut!(load, dom_content, network_idle);
        let res = futures::select! {
            res = load => res,
            res = dom_content => res,
            res = network_idle => res,
        };
        match res {
            Ok(_) => Ok(()),
            Err(CdpError::Timeout { .. }) => Err(self.navigation_timeout("any")),
            Err(err) => Err(err),
        }
    }

    fn navigation_timeout(&self, waiting_for: &str) -> CdpError {
        NavigationError::new(
            format!("timed out waiting for `{waiting_for}`"),
            self.navigation_state(),
        )
        .into()
    }

    /// Make sure evaluate will find a default execution context: wait briefly
    /// for the context event and fall back to probing with a trivial
    /// expression.
    pub(crate) async fn ensure_execution_context(&self, timeout: Duration) -> Result<()> {
        if self.inner.execution_context_id().is_some() {
            return Ok(());
        }
        match self
            .inner
            .emitter
            .wait_for(signal::EXECUTION_CONTEXT, timeout)
            .await
        {
            Ok(_) => Ok(()),
            Err(CdpError::Timeout { .. }) => {
                // no event observed; probe whether a context is nevertheless
                // usable
                let probe = self.evaluate("1 + 1").await?;
                if probe == Value::from(2) {
                    Ok(())
                } else {
                    Err(CdpError::Timeout {
                        method: "Runtime.executionContextCreated".into(),
                        timeout,
                    })
                }
            }
            Err(err) => Err(err),
        }
    }

    /// Evaluate an expression in the page's default world and return its
    /// value.
    ///
    /// Returns `Value::Null` for `undefined` and `null` results. A thrown
    /// exception surfaces as [`CdpError::Evaluate`] with the exception text.
    pub async fn evaluate(&self, expression: impl Into<String>) -> Result<Value> {
        let resp = self.evaluate_raw(expression.into(), true).await?;
        if let Some(details) = resp.exception_details {
            return Err(CdpError::Evaluate {
                text: details.text,
                description: details.exception.and_then(|e| e.description),
            });
        }
        match resp.result.r#type.as_str() {
            "undefined" => Ok(Value::Null),
            _ => Ok(resp.result.value.unwrap_or(Value::Null)),
        }
    }

    async fn evaluate_raw(
        &self,
        expression: String,
        return_by_value: bool,
    ) -> Result<runtime::EvaluateReturns> {
        let mut params = EvaluateParams::new(expression.clone());
        params.return_by_value = Some(return_by_value);
        params = params.with_context(self.inner.execution_context_id());

        match self.inner.execute(params).await {
            Ok(resp) => Ok(resp.result),
            Err(err) if err.is_context_not_found() => {
                // the stored context went away mid-navigation; retry in
                // whatever default world the browser picks
                let mut params = EvaluateParams::new(expression);
                params.return_by_value = Some(return_by_value);
                Ok(self.inner.execute(params).await?.result)
            }
            Err(err) => Err(err),
        }
    }

    /// Register a script that runs in every new document before any page
    /// script does.
    pub async fn add_script_on_new_document(&self, source: impl Into<String>) -> Result<String> {
        let mut params = AddScriptToEvaluateOnNewDocumentParams::new(source);
        params.world_name = Some("main".to_string());
        Ok(self.inner.execute(params).await?.result.identifier)
    }

    /// Returns the serialized html of the page.
    pub async fn get_content(&self) -> Result<String> {
        for expression in [
            "document.documentElement.outerHTML",
            "document.documentElement.innerHTML",
            "document.body.outerHTML",
            "document.body.innerHTML",
        ] {
            if let Ok(Value::String(content)) = self.evaluate(expression).await {
                if !content.trim().is_empty() {
                    return Ok(content);
                }
            }
        }
        // scripted access failed, go through the DOM domain
        let root = self
            .inner
            .execute(dom::GetDocumentParams::default())
            .await?
            .result
            .root;
        let html = self
            .inner
            .execute(dom::GetOuterHtmlParams::new(root.node_id))
            .await?
            .result
            .outer_html;
        if html.trim().is_empty() {
            return Err(CdpError::msg("failed to get page content"));
        }
        Ok(html)
    }

    /// Returns the title of the document.
    pub async fn get_title(&self) -> Result<String> {
        match self.evaluate("document.title").await? {
            Value::String(title) => Ok(title),
            other => Ok(other.to_string()),
        }
    }

    /// The url currently shown, from the navigation history.
    pub async fn get_current_url(&self) -> Result<String> {
        let history = self
            .inner
            .execute(GetNavigationHistoryParams::default())
            .await?
            .result;
        let idx = usize::try_from(history.current_index).ok();
        if let Some(entry) = idx.and_then(|i| history.entries.get(i)) {
            return Ok(entry.url.clone());
        }
        Ok(self.inner.state.lock().unwrap().url.clone())
    }

    /// Returns all cookies of the browser.
    pub async fn get_cookies(&self) -> Result<Vec<Cookie>> {
        Ok(self
            .inner
            .execute(GetAllCookiesParams::default())
            .await?
            .result
            .cookies)
    }

    /// Capture a screenshot and return the decoded image bytes.
    pub async fn screenshot(&self, params: CaptureScreenshotParams) -> Result<Vec<u8>> {
        use base64::prelude::*;
        let resp = self.inner.execute(params).await?;
        BASE64_STANDARD
            .decode(&resp.result.data)
            .map_err(|err| CdpError::msg(format!("invalid screenshot payload: {err}")))
    }

    /// Capture a screenshot and write it to `output`.
    pub async fn save_screenshot(
        &self,
        params: CaptureScreenshotParams,
        output: impl AsRef<Path>,
    ) -> Result<Vec<u8>> {
        let data = self.screenshot(params).await?;
        crate::utils::write(output.as_ref(), &data).await?;
        Ok(data)
    }

    /// Override the user agent reported by this session.
    pub async fn set_user_agent(
        &self,
        params: impl Into<network::SetUserAgentOverrideParams>,
    ) -> Result<&Self> {
        self.inner.execute(params.into()).await?;
        Ok(self)
    }

    /// Override the viewport metrics of this session.
    pub async fn set_viewport(&self, width: u32, height: u32) -> Result<&Self> {
        self.inner
            .execute(emulation::SetDeviceMetricsOverrideParams::new(width, height))
            .await?;
        Ok(self)
    }

    /// Wait for the next emission of `event`, raw CDP method names and
    /// synthetic lifecycle signals both work.
    pub async fn wait_for_event(&self, event: &str, timeout: Duration) -> Result<Value> {
        self.inner.emitter.wait_for(event, timeout).await
    }

    /// Wait until the element matched by `selector` exists and is visible.
    pub async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        let selector_literal = serde_json::to_string(selector)?;
        let expression = format!(
            "(function() {{\
                const el = document.querySelector({selector_literal});\
                if (!el) return false;\
                const style = window.getComputedStyle(el);\
                return el.offsetParent !== null && style.visibility !== 'hidden';\
            }})()"
        );
        loop {
            if self.evaluate(expression.clone()).await? == Value::Bool(true) {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(CdpError::Timeout {
                    method: format!("wait_for_selector({selector})").into(),
                    timeout,
                });
            }
            Delay::new(POLL_INTERVAL).await;
        }
    }

    /// Wait until at most `max_inflight` requests stay pending for
    /// [`NETWORK_QUIESCENCE`].
    pub async fn wait_for_network_idle(
        &self,
        timeout: Duration,
        max_inflight: usize,
    ) -> Result<()> {
        let deadline = Instant::now() + timeout;
        let mut quiet_since: Option<Instant> = None;
        loop {
            let pending = self.inner.state.lock().unwrap().pending_requests;
            let now = Instant::now();
            if pending <= max_inflight {
                match quiet_since {
                    Some(since) if now.duration_since(since) >= NETWORK_QUIESCENCE => {
                        return Ok(());
                    }
                    None => quiet_since = Some(now),
                    _ => {}
                }
            } else {
                quiet_since = None;
            }
            if now >= deadline {
                return Err(CdpError::Timeout {
                    method: "wait_for_network_idle".into(),
                    timeout,
                });
            }
            Delay::new(POLL_INTERVAL).await;
        }
    }

    /// Wait for the load event of the current navigation.
    pub async fn wait_for_load(&self, timeout: Duration) -> Result<()> {
        self.wait_signal(
            |nav| nav.load_complete,
            signal::LOAD,
            Instant::now() + timeout,
        )
        .await
    }

    /// Wait for the DOMContentLoaded event of the current navigation.
    pub async fn wait_for_dom_content(&self, timeout: Duration) -> Result<()> {
        self.wait_signal(
            |nav| nav.dom_content_event_fired,
            signal::DOM_CONTENT,
            Instant::now() + timeout,
        )
        .await
    }

    /// An input synthesizer bound to this page.
    ///
    /// The keyboard modifier state lives on the returned value, never shared
    /// across pages.
    pub fn input(&self) -> Input {
        Input::new(self.clone())
    }

    /// Detach the session and close the target. Idempotent; a session that is
    /// already gone is tolerated.
    pub async fn close(&self) -> Result<()> {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        if let Some(session_id) = self.inner.session_id() {
            match self
                .inner
                .execute_unchecked(DetachFromTargetParams::new(session_id))
                .await
            {
                Err(err) if err.is_session_not_found() => {
                    tracing::debug!(target_id = %self.inner.target_id, "session already detached");
                }
                Err(err) => {
                    tracing::warn!(target_id = %self.inner.target_id, "detach failed: {err}");
                }
                Ok(_) => {}
            }
        }
        if let Err(err) = self
            .inner
            .execute_unchecked(CloseTargetParams::new(self.inner.target_id.clone()))
            .await
        {
            tracing::warn!(target_id = %self.inner.target_id, "close target failed: {err}");
        }
        let _ = self
            .inner
            .sender
            .clone()
            .send(HandlerMessage::UnregisterPage(self.inner.target_id.clone()))
            .await;
        self.inner.emitter.clear();
        Ok(())
    }
}

#[derive(Debug)]
pub(crate) struct PageInner {
    target_id: TargetId,
    session_id: Mutex<Option<SessionId>>,
    sender: Sender<HandlerMessage>,
    state: Arc<Mutex<PageState>>,
    emitter: Arc<EventEmitter>,
    closed: AtomicBool,
    command_timeout: Duration,
}

impl PageInner {
    pub fn session_id(&self) -> Option<SessionId> {
        self.session_id.lock().unwrap().clone()
    }

    pub fn execution_context_id(&self) -> Option<crate::cdp::runtime::ExecutionContextId> {
        self.state.lock().unwrap().execution_context_id
    }

    /// Attach to the target over a flat session if not yet attached.
    async fn attach(&self) -> Result<()> {
        if self.session_id().is_some() {
            return Ok(());
        }
        let resp = self
            .execute_without_session(AttachToTargetParams::new(self.target_id.clone()))
            .await?;
        *self.session_id.lock().unwrap() = Some(resp.result.session_id);
        Ok(())
    }

    pub(crate) async fn execute<T: Command>(&self, cmd: T) -> Result<CommandResponse<T::Response>> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(CdpError::TransportClosed);
        }
        self.execute_unchecked(cmd).await
    }

    /// Like [`execute`](Self::execute) but usable while the page is closing.
    async fn execute_unchecked<T: Command>(&self, cmd: T) -> Result<CommandResponse<T::Response>> {
        let session_id = self.session_id();
        execute(
            cmd,
            self.sender.clone(),
            session_id,
            self.command_timeout,
        )
        .await
    }

    /// Commands that must not carry a session id, e.g. the attach itself.
    async fn execute_without_session<T: Command>(
        &self,
        cmd: T,
    ) -> Result<CommandResponse<T::Response>> {
        execute(cmd, self.sender.clone(), None, self.command_timeout).await
    }
}

/// The single send path: every command of this crate funnels through here.
pub(crate) async fn execute<T: Command>(
    cmd: T,
    mut sender: Sender<HandlerMessage>,
    session_id: Option<SessionId>,
    timeout: Duration,
) -> Result<CommandResponse<T::Response>> {
    let (tx, rx) = oneshot_channel::<Result<Response>>();
    let method = cmd.identifier();
    let msg = CommandMessage::with_session(cmd, tx, session_id, timeout)?;

    sender.send(HandlerMessage::Command(msg)).await?;

    let resp = futures::select! {
        resp = rx.fuse() => resp??,
        _ = Delay::new(timeout).fuse() => {
            return Err(CdpError::Timeout { method, timeout });
        }
    };
    to_command_response::<T>(resp, method)
}
