use std::collections::HashMap;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use fnv::FnvHashMap;
use futures::channel::mpsc::Receiver;
use futures::channel::oneshot::Sender as OneshotSender;
use futures::stream::{Fuse, Stream};
use futures::task::{Context, Poll};
use futures::StreamExt;

use crate::cdp::target::{EventAttachedToTarget, EventDetachedFromTarget, EventTargetDestroyed, TargetId};
use crate::cmd::CommandMessage;
use crate::conn::Connection;
use crate::emitter::EventEmitter;
use crate::error::{CdpError, Result};
use crate::handler::job::PeriodicJob;
use crate::handler::session::Session;
use crate::handler::target::{PageState, Target};
use crate::protocol::{CallId, CdpEventMessage, Message, MethodId, Response};

pub(crate) mod job;
pub mod network;
pub mod session;
pub mod target;

/// Standard command timeout in ms
pub const REQUEST_TIMEOUT: u64 = 30_000;

/// How often the handler sweeps for timed out commands
const EVICTION_INTERVAL: Duration = Duration::from_millis(500);

/// Drives the websocket: correlates command responses, routes events to their
/// page target and keeps the session bookkeeping.
///
/// The `Handler` is a stream of the events it processed. The caller spawns a
/// task that polls it to completion; every API handle talks to it through the
/// channel handed out by [`Browser::connect`](crate::browser::Browser::connect).
#[must_use = "streams do nothing unless polled"]
#[derive(Debug)]
pub struct Handler {
    /// Commands that are being processed and await a response from the browser
    pending_commands: FnvHashMap<CallId, PendingCommand>,
    /// Messages from the `Browser` and `Page` handles
    from_browser: Fuse<Receiver<HandlerMessage>>,
    /// The created targets with a page handle attached
    targets: HashMap<TargetId, Target>,
    /// All the current active sessions
    sessions: HashMap<String, Session>,
    /// The websocket connection to the browser instance
    conn: Connection,
    evict_command_timeout: PeriodicJob,
    /// Set once a shutdown was requested; the stream ends on the next poll
    shutdown: Option<OneshotSender<()>>,
}

#[derive(Debug)]
struct PendingCommand {
    sender: OneshotSender<Result<Response>>,
    deadline: Instant,
    timeout: Duration,
    method: MethodId,
}

impl Handler {
    pub(crate) fn new(conn: Connection, rx: Receiver<HandlerMessage>) -> Self {
        Self {
            pending_commands: Default::default(),
            from_browser: rx.fuse(),
            targets: Default::default(),
            sessions: Default::default(),
            conn,
            evict_command_timeout: PeriodicJob::new(EVICTION_INTERVAL),
            shutdown: None,
        }
    }

    fn submit_command(&mut self, msg: CommandMessage) {
        let CommandMessage {
            method,
            session_id,
            params,
            timeout,
            sender,
        } = msg;
        match self
            .conn
            .submit_command(method.clone(), session_id, params)
        {
            Ok(call_id) => {
                self.pending_commands.insert(
                    call_id,
                    PendingCommand {
                        sender,
                        deadline: Instant::now() + timeout,
                        timeout,
                        method,
                    },
                );
            }
            Err(err) => {
                let _ = sender.send(Err(err.into()));
            }
        }
    }

    fn on_response(&mut self, resp: Response) {
        if let Some(pending) = self.pending_commands.remove(&resp.id) {
            let _ = pending.sender.send(Ok(resp));
        } else {
            tracing::warn!(id = %resp.id, "response for unknown command id, dropping");
        }
    }

    fn on_event(&mut self, event: &CdpEventMessage) {
        if let Some(session_id) = &event.session_id {
            if let Some(session) = self.sessions.get(session_id) {
                if let Some(target) = self.targets.get_mut(session.target_id()) {
                    target.on_event(event);
                    return;
                }
            }
        }
        let method = event.method.as_ref();
        if method == EventAttachedToTarget::IDENTIFIER {
            if let Ok(ev) = serde_json::from_value::<EventAttachedToTarget>(event.params.clone()) {
                self.on_attached_to_target(ev);
            }
        } else if method == EventDetachedFromTarget::IDENTIFIER {
            if let Ok(ev) = serde_json::from_value::<EventDetachedFromTarget>(event.params.clone())
            {
                self.on_detached_from_target(ev);
            }
        } else if method == EventTargetDestroyed::IDENTIFIER {
            if let Ok(ev) = serde_json::from_value::<EventTargetDestroyed>(event.params.clone()) {
                self.on_target_destroyed(ev);
            }
        }
    }

    fn on_attached_to_target(&mut self, event: EventAttachedToTarget) {
        let session = Session::new(
            event.session_id.clone(),
            event.target_info.r#type.clone(),
            event.target_info.target_id.clone(),
        );
        if let Some(target) = self.targets.get_mut(session.target_id()) {
            target.set_session_id(event.session_id.clone());
        }
        self.sessions.insert(event.session_id, session);
    }

    /// The session was detached from target.
    /// Can be issued multiple times per target if multiple sessions have been
    /// attached to it.
    fn on_detached_from_target(&mut self, event: EventDetachedFromTarget) {
        if let Some(session) = self.sessions.remove(&event.session_id) {
            if let Some(target) = self.targets.get_mut(session.target_id()) {
                target.clear_session();
            }
        }
    }

    fn on_target_destroyed(&mut self, event: EventTargetDestroyed) {
        if let Some(target) = self.targets.remove(&event.target_id) {
            if let Some(session) = target.session_id() {
                self.sessions.remove(session);
            }
        }
    }

    fn evict_timed_out_commands(&mut self) {
        let now = Instant::now();
        let expired: Vec<CallId> = self
            .pending_commands
            .iter()
            .filter(|(_, cmd)| cmd.deadline <= now)
            .map(|(id, _)| *id)
            .collect();
        for id in expired {
            if let Some(cmd) = self.pending_commands.remove(&id) {
                tracing::warn!(method = %cmd.method, "command timed out, evicting");
                let _ = cmd.sender.send(Err(CdpError::Timeout {
                    method: cmd.method,
                    timeout: cmd.timeout,
                }));
            }
        }
    }

    /// Fail every pending command; the connection is gone or going away.
    fn cancel_pending_commands(&mut self) {
        for (_, cmd) in self.pending_commands.drain() {
            let _ = cmd.sender.send(Err(CdpError::TransportClosed));
        }
    }

    fn on_handler_message(&mut self, msg: HandlerMessage) {
        match msg {
            HandlerMessage::Command(cmd) => self.submit_command(cmd),
            HandlerMessage::RegisterPage(reg) => {
                let target = Target::new(reg.target_id.clone(), reg.state, reg.emitter);
                self.targets.insert(reg.target_id, target);
            }
            HandlerMessage::UnregisterPage(target_id) => {
                if let Some(target) = self.targets.remove(&target_id) {
                    if let Some(session) = target.session_id() {
                        self.sessions.remove(session);
                    }
                }
            }
            HandlerMessage::Shutdown(ack) => {
                self.shutdown = Some(ack);
            }
        }
    }
}

impl Stream for Handler {
    type Item = Result<CdpEventMessage>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let pin = self.get_mut();

        // drain messages from the api handles first so commands get queued
        // before the next read pass
        while let Poll::Ready(Some(msg)) = Pin::new(&mut pin.from_browser).poll_next(cx) {
            pin.on_handler_message(msg);
        }

        if let Some(ack) = pin.shutdown.take() {
            pin.cancel_pending_commands();
            let _ = ack.send(());
            return Poll::Ready(None);
        }

        if pin.evict_command_timeout.is_ready(cx) {
            pin.evict_timed_out_commands();
        }

        loop {
            return match Pin::new(&mut pin.conn).poll_next(cx) {
                Poll::Ready(Some(Ok(Message::Response(resp)))) => {
                    pin.on_response(resp);
                    continue;
                }
                Poll::Ready(Some(Ok(Message::Event(ev)))) => {
                    pin.on_event(&ev);
                    Poll::Ready(Some(Ok(ev)))
                }
                Poll::Ready(Some(Err(err))) => Poll::Ready(Some(Err(err))),
                Poll::Ready(None) => {
                    pin.cancel_pending_commands();
                    Poll::Ready(None)
                }
                Poll::Pending => Poll::Pending,
            };
        }
    }
}

/// Everything a target needs before its page handle can observe events.
#[derive(Debug)]
pub(crate) struct PageRegistration {
    pub target_id: TargetId,
    pub state: Arc<Mutex<PageState>>,
    pub emitter: Arc<EventEmitter>,
}

/// Events used internally to communicate with the handler, which is executed
/// in the background.
#[derive(Debug)]
pub(crate) enum HandlerMessage {
    Command(CommandMessage),
    RegisterPage(PageRegistration),
    UnregisterPage(TargetId),
    Shutdown(OneshotSender<()>),
}
