use std::sync::{Arc, Mutex};

use serde_json::Value;

use crate::cdp::network::{
    EventLoadingFailed, EventLoadingFinished, EventRequestWillBeSent, EventResponseReceived,
};
use crate::cdp::page::{
    EventDomContentEventFired, EventFrameNavigated, EventFrameStartedLoading,
    EventFrameStoppedLoading, EventLoadEventFired, FrameId,
};
use crate::cdp::runtime::{EventExecutionContextCreated, ExecutionContextId};
use crate::cdp::target::TargetId;
use crate::emitter::EventEmitter;
use crate::handler::network::{NetworkTracker, RequestOutcome};
use crate::protocol::CdpEventMessage;

/// Synthetic lifecycle signals emitted through the page emitter, alongside the
/// raw CDP events they are derived from.
pub mod signal {
    pub const LOAD: &str = "load";
    pub const DOM_CONTENT: &str = "domcontentloaded";
    pub const NETWORK_IDLE: &str = "networkidle";
    pub const NAVIGATION_COMPLETE: &str = "navigation-complete";
    pub const EXECUTION_CONTEXT: &str = "execution-context";
}

/// The lifecycle flags of one navigation.
///
/// `navigation_complete` implies `frame_stopped_loading` and either
/// `load_complete` or `network_idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavigationState {
    pub frame_stopped_loading: bool,
    pub load_event_fired: bool,
    pub dom_content_event_fired: bool,
    pub network_idle: bool,
    pub load_complete: bool,
    pub navigation_complete: bool,
}

impl Default for NavigationState {
    fn default() -> Self {
        Self {
            frame_stopped_loading: false,
            load_event_fired: false,
            dom_content_event_fired: false,
            // no navigation yet, nothing in flight
            network_idle: true,
            load_complete: false,
            navigation_complete: false,
        }
    }
}

impl NavigationState {
    fn reset(&mut self) {
        *self = Self {
            network_idle: false,
            ..Self::default()
        };
    }

    fn force_complete(&mut self) {
        self.frame_stopped_loading = true;
        self.load_event_fired = true;
        self.dom_content_event_fired = true;
        self.network_idle = true;
        self.load_complete = true;
        self.navigation_complete = true;
    }
}

/// The page-visible slice of a target's state, shared between the handler
/// (writer) and the `Page` handle (reader).
#[derive(Debug, Default)]
pub struct PageState {
    pub nav: NavigationState,
    pub execution_context_id: Option<ExecutionContextId>,
    pub url: String,
    pub pending_requests: usize,
    pub crashed: bool,
}

/// One attached page target on the handler side.
///
/// Aggregates `Page.*`, `Network.*` and `Runtime.*` events into the
/// navigation state machine, re-emits every raw event into the page's emitter
/// and derives the synthetic lifecycle signals.
#[derive(Debug)]
pub(crate) struct Target {
    target_id: TargetId,
    session_id: Option<String>,
    state: Arc<Mutex<PageState>>,
    emitter: Arc<EventEmitter>,
    network: NetworkTracker,
    main_frame_id: Option<FrameId>,
}

impl Target {
    pub fn new(
        target_id: TargetId,
        state: Arc<Mutex<PageState>>,
        emitter: Arc<EventEmitter>,
    ) -> Self {
        Self {
            target_id,
            session_id: None,
            state,
            emitter,
            network: NetworkTracker::default(),
            main_frame_id: None,
        }
    }

    pub fn session_id(&self) -> Option<&String> {
        self.session_id.as_ref()
    }

    pub fn set_session_id(&mut self, id: String) {
        self.session_id = Some(id);
    }

    pub fn clear_session(&mut self) {
        self.session_id = None;
    }

    /// Route one event into the state machine, then re-emit it raw.
    pub fn on_event(&mut self, event: &CdpEventMessage) {
        let method = event.method.as_ref();
        if method == EventFrameStartedLoading::IDENTIFIER {
            if let Ok(ev) = serde_json::from_value::<EventFrameStartedLoading>(event.params.clone())
            {
                self.on_frame_started_loading(&ev);
            }
        } else if method == EventFrameStoppedLoading::IDENTIFIER {
            if let Ok(ev) = serde_json::from_value::<EventFrameStoppedLoading>(event.params.clone())
            {
                self.on_frame_stopped_loading(&ev);
            }
        } else if method == EventLoadEventFired::IDENTIFIER {
            self.on_load_event_fired();
        } else if method == EventDomContentEventFired::IDENTIFIER {
            self.on_dom_content_event_fired();
        } else if method == EventFrameNavigated::IDENTIFIER {
            if let Ok(ev) = serde_json::from_value::<EventFrameNavigated>(event.params.clone()) {
                self.on_frame_navigated(&ev);
            }
        } else if method == EventRequestWillBeSent::IDENTIFIER {
            if let Ok(ev) = serde_json::from_value::<EventRequestWillBeSent>(event.params.clone()) {
                self.on_request_will_be_sent(&ev);
            }
        } else if method == EventResponseReceived::IDENTIFIER {
            if let Ok(ev) = serde_json::from_value::<EventResponseReceived>(event.params.clone()) {
                let outcome = self.network.on_response_received(&ev);
                self.on_request_settled(outcome);
            }
        } else if method == EventLoadingFinished::IDENTIFIER {
            if let Ok(ev) = serde_json::from_value::<EventLoadingFinished>(event.params.clone()) {
                let outcome = self.network.on_loading_finished(&ev);
                self.on_request_settled(outcome);
            }
        } else if method == EventLoadingFailed::IDENTIFIER {
            if let Ok(ev) = serde_json::from_value::<EventLoadingFailed>(event.params.clone()) {
                let outcome = self.network.on_loading_failed(&ev);
                self.on_request_settled(outcome);
            }
        } else if method == EventExecutionContextCreated::IDENTIFIER {
            self.on_execution_context_created(&event.params);
        } else if method == "Runtime.executionContextsCleared" {
            self.on_execution_contexts_cleared();
        } else if method == "Inspector.targetCrashed" {
            self.on_crashed();
        }
        self.emitter.emit(method, &event.params);
    }

    fn is_main_frame(&mut self, frame_id: &FrameId) -> bool {
        match &self.main_frame_id {
            Some(main) => main == frame_id,
            None => {
                self.main_frame_id = Some(frame_id.clone());
                true
            }
        }
    }

    fn on_frame_started_loading(&mut self, event: &EventFrameStartedLoading) {
        if !self.is_main_frame(&event.frame_id) {
            return;
        }
        tracing::debug!(target_id = %self.target_id, "main frame started loading");
        self.network.reset();
        let mut state = self.state.lock().unwrap();
        state.nav.reset();
        state.pending_requests = 0;
    }

    fn on_frame_stopped_loading(&mut self, event: &EventFrameStoppedLoading) {
        if !self.is_main_frame(&event.frame_id) {
            return;
        }
        let signals = {
            let mut state = self.state.lock().unwrap();
            let nav = &mut state.nav;
            nav.frame_stopped_loading = true;
            let mut signals = Signals::default();
            if nav.load_event_fired && !nav.load_complete {
                nav.load_complete = true;
                signals.load = true;
            }
            signals.navigation_complete = Self::check_navigation_complete(nav);
            signals
        };
        self.release(signals);
    }

    fn on_load_event_fired(&mut self) {
        let signals = {
            let mut state = self.state.lock().unwrap();
            let nav = &mut state.nav;
            nav.load_event_fired = true;
            let mut signals = Signals::default();
            if nav.frame_stopped_loading && !nav.load_complete {
                nav.load_complete = true;
                signals.load = true;
            }
            signals.navigation_complete = Self::check_navigation_complete(nav);
            signals
        };
        self.release(signals);
    }

    fn on_dom_content_event_fired(&mut self) {
        {
            let mut state = self.state.lock().unwrap();
            state.nav.dom_content_event_fired = true;
        }
        self.release(Signals {
            dom_content: true,
            ..Default::default()
        });
    }

    fn on_frame_navigated(&mut self, event: &EventFrameNavigated) {
        // only the main frame has no parent
        if event.frame.parent_id.is_some() {
            return;
        }
        self.main_frame_id = Some(event.frame.id.clone());
        self.state.lock().unwrap().url = event.frame.url.clone();
    }

    fn on_request_will_be_sent(&mut self, event: &EventRequestWillBeSent) {
        self.network.on_request_will_be_sent(event);
        let mut state = self.state.lock().unwrap();
        state.pending_requests = self.network.pending_count();
        state.nav.network_idle = false;
        state.nav.navigation_complete = false;
    }

    fn on_request_settled(&mut self, outcome: RequestOutcome) {
        let signals = {
            let mut state = self.state.lock().unwrap();
            state.pending_requests = self.network.pending_count();
            let nav = &mut state.nav;
            let mut signals = Signals::default();

            if outcome.became_idle {
                nav.network_idle = true;
                signals.network_idle = true;
                if nav.frame_stopped_loading {
                    // single page apps may never fire a load event; a stopped
                    // frame with a drained network counts as loaded
                    if !nav.load_complete && !nav.load_event_fired {
                        nav.load_complete = true;
                        signals.load = true;
                    }
                }
                signals.navigation_complete = Self::check_navigation_complete(nav);
            }

            if outcome.document_failed {
                tracing::debug!(target_id = %self.target_id, "document request failed");
                // the navigation is over; every wait-until mode resolves from
                // this terminal state
                nav.frame_stopped_loading = true;
                nav.load_event_fired = true;
                nav.dom_content_event_fired = true;
                nav.load_complete = true;
                nav.navigation_complete = true;
                signals.load = true;
                signals.dom_content = true;
            }
            signals
        };
        self.release(signals);
    }

    fn on_execution_context_created(&mut self, params: &Value) {
        let Ok(event) = serde_json::from_value::<EventExecutionContextCreated>(params.clone())
        else {
            return;
        };
        if !event.context.is_default() {
            return;
        }
        {
            let mut state = self.state.lock().unwrap();
            state.execution_context_id = Some(event.context.id);
        }
        self.emitter.emit(signal::EXECUTION_CONTEXT, params);
    }

    fn on_execution_contexts_cleared(&mut self) {
        self.state.lock().unwrap().execution_context_id = None;
    }

    fn on_crashed(&mut self) {
        tracing::warn!(target_id = %self.target_id, "page crashed");
        {
            let mut state = self.state.lock().unwrap();
            state.crashed = true;
            state.nav.force_complete();
        }
        self.release(Signals {
            load: true,
            dom_content: true,
            network_idle: true,
            navigation_complete: true,
        });
    }

    fn check_navigation_complete(nav: &mut NavigationState) -> bool {
        if nav.frame_stopped_loading
            && (nav.load_complete || nav.network_idle)
            && !nav.navigation_complete
        {
            nav.navigation_complete = true;
            true
        } else {
            false
        }
    }

    fn release(&self, signals: Signals) {
        if signals.dom_content {
            self.emitter.emit(signal::DOM_CONTENT, &Value::Null);
        }
        if signals.load {
            self.emitter.emit(signal::LOAD, &Value::Null);
        }
        if signals.network_idle {
            self.emitter.emit(signal::NETWORK_IDLE, &Value::Null);
        }
        if signals.navigation_complete {
            self.emitter.emit(signal::NAVIGATION_COMPLETE, &Value::Null);
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct Signals {
    load: bool,
    dom_content: bool,
    network_idle: bool,
    navigation_complete: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn target() -> (Target, Arc<Mutex<PageState>>, Arc<EventEmitter>) {
        let state = Arc::new(Mutex::new(PageState::default()));
        let emitter = Arc::new(EventEmitter::new());
        let target = Target::new("T1".to_string(), Arc::clone(&state), Arc::clone(&emitter));
        (target, state, emitter)
    }

    fn event(method: &'static str, params: Value) -> CdpEventMessage {
        CdpEventMessage {
            method: method.into(),
            session_id: Some("S1".to_string()),
            params,
        }
    }

    fn nav(state: &Arc<Mutex<PageState>>) -> NavigationState {
        state.lock().unwrap().nav
    }

    #[test]
    fn frame_start_resets_lifecycle_flags() {
        let (mut target, state, _) = target();
        target.on_event(&event("Page.loadEventFired", json!({"timestamp": 1.0})));
        target.on_event(&event(
            "Page.frameStartedLoading",
            json!({"frameId": "F1"}),
        ));

        let nav = nav(&state);
        assert!(!nav.load_event_fired);
        assert!(!nav.network_idle);
        assert!(!nav.load_complete);
        assert!(!nav.navigation_complete);
    }

    #[test]
    fn load_requires_frame_stop_and_load_event() {
        let (mut target, state, _) = target();
        target.on_event(&event(
            "Page.frameStartedLoading",
            json!({"frameId": "F1"}),
        ));
        target.on_event(&event("Page.loadEventFired", json!({"timestamp": 1.0})));
        assert!(!nav(&state).load_complete);

        target.on_event(&event(
            "Page.frameStoppedLoading",
            json!({"frameId": "F1"}),
        ));
        let nav = nav(&state);
        assert!(nav.load_complete);
        assert!(nav.load_event_fired);
        assert!(nav.frame_stopped_loading);
    }

    #[test]
    fn network_drain_sets_idle_and_completes_navigation() {
        let (mut target, state, _) = target();
        target.on_event(&event(
            "Page.frameStartedLoading",
            json!({"frameId": "F1"}),
        ));
        target.on_event(&event(
            "Network.requestWillBeSent",
            json!({"requestId": "R1", "type": "Document"}),
        ));
        target.on_event(&event(
            "Network.requestWillBeSent",
            json!({"requestId": "R2"}),
        ));
        target.on_event(&event(
            "Page.frameStoppedLoading",
            json!({"frameId": "F1"}),
        ));
        target.on_event(&event("Network.loadingFinished", json!({"requestId": "R1"})));
        assert!(!nav(&state).network_idle);

        target.on_event(&event("Network.loadingFinished", json!({"requestId": "R2"})));
        let nav = nav(&state);
        assert!(nav.network_idle);
        assert!(nav.navigation_complete);
        // SPA rule: frame stopped + drained network counts as loaded even
        // though no load event fired
        assert!(nav.load_complete);
    }

    #[test]
    fn document_request_failure_forces_load_complete() {
        let (mut target, state, _) = target();
        target.on_event(&event(
            "Page.frameStartedLoading",
            json!({"frameId": "F1"}),
        ));
        target.on_event(&event(
            "Network.requestWillBeSent",
            json!({"requestId": "R1", "type": "Document"}),
        ));
        target.on_event(&event(
            "Network.loadingFailed",
            json!({"requestId": "R1", "errorText": "net::ERR_NAME_NOT_RESOLVED"}),
        ));

        let nav = nav(&state);
        assert!(nav.load_complete);
        assert!(nav.navigation_complete);
        // the terminal state must satisfy every wait-until check, not just
        // the one-shot signals
        assert!(nav.load_event_fired);
        assert!(nav.dom_content_event_fired);
        assert!(nav.frame_stopped_loading);
    }

    #[test]
    fn crash_forces_all_flags() {
        let (mut target, state, _) = target();
        target.on_event(&event(
            "Page.frameStartedLoading",
            json!({"frameId": "F1"}),
        ));
        target.on_event(&event("Inspector.targetCrashed", json!({})));

        let nav = nav(&state);
        assert!(nav.frame_stopped_loading);
        assert!(nav.load_event_fired);
        assert!(nav.dom_content_event_fired);
        assert!(nav.network_idle);
        assert!(nav.load_complete);
        assert!(nav.navigation_complete);
        assert!(state.lock().unwrap().crashed);
    }

    #[test]
    fn child_frame_events_do_not_touch_main_state() {
        let (mut target, state, _) = target();
        target.on_event(&event(
            "Page.frameStartedLoading",
            json!({"frameId": "F1"}),
        ));
        target.on_event(&event("Page.loadEventFired", json!({"timestamp": 1.0})));
        // a child frame stopping must not complete the main load
        target.on_event(&event(
            "Page.frameStoppedLoading",
            json!({"frameId": "CHILD"}),
        ));
        assert!(!nav(&state).load_complete);
    }

    #[test]
    fn default_execution_context_is_captured() {
        let (mut target, state, _) = target();
        target.on_event(&event(
            "Runtime.executionContextCreated",
            json!({"context": {"id": 4, "auxData": {"isDefault": true, "frameId": "F1"}}}),
        ));
        assert_eq!(state.lock().unwrap().execution_context_id, Some(4));

        // non-default worlds are ignored
        target.on_event(&event(
            "Runtime.executionContextCreated",
            json!({"context": {"id": 9, "auxData": {"isDefault": false}}}),
        ));
        assert_eq!(state.lock().unwrap().execution_context_id, Some(4));

        target.on_event(&event("Runtime.executionContextsCleared", json!({})));
        assert_eq!(state.lock().unwrap().execution_context_id, None);
    }

    #[test]
    fn lifecycle_signals_reach_the_emitter() {
        let (mut target, _, emitter) = target();
        let fired = Arc::new(Mutex::new(Vec::new()));
        for name in [signal::LOAD, signal::DOM_CONTENT, signal::NETWORK_IDLE] {
            let log = Arc::clone(&fired);
            emitter.on(name, move |_| log.lock().unwrap().push(name));
        }

        target.on_event(&event(
            "Page.frameStartedLoading",
            json!({"frameId": "F1"}),
        ));
        target.on_event(&event("Page.domContentEventFired", json!({"timestamp": 1.0})));
        target.on_event(&event("Page.loadEventFired", json!({"timestamp": 1.0})));
        target.on_event(&event(
            "Page.frameStoppedLoading",
            json!({"frameId": "F1"}),
        ));

        let fired = fired.lock().unwrap();
        assert!(fired.contains(&signal::DOM_CONTENT));
        assert!(fired.contains(&signal::LOAD));
    }

    #[test]
    fn frame_navigated_tracks_main_frame_url() {
        let (mut target, state, _) = target();
        target.on_event(&event(
            "Page.frameNavigated",
            json!({"frame": {"id": "F1", "url": "https://example.com/"}}),
        ));
        assert_eq!(state.lock().unwrap().url, "https://example.com/");

        // child frames carry a parent id and are ignored
        target.on_event(&event(
            "Page.frameNavigated",
            json!({"frame": {"id": "F2", "parentId": "F1", "url": "https://ads.example.com/"}}),
        ));
        assert_eq!(state.lock().unwrap().url, "https://example.com/");
    }
}
