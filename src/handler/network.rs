use std::collections::HashSet;

use crate::cdp::network::{
    EventLoadingFailed, EventLoadingFinished, EventRequestWillBeSent, EventResponseReceived,
    RequestId,
};

/// Tracks the in-flight network requests of one target.
///
/// The target feeds every `Network.*` event through this tracker and reads
/// back whether the set of pending requests just drained, which is the
/// network-idle transition of the navigation state machine.
#[derive(Debug, Default)]
pub struct NetworkTracker {
    /// Requests sent but neither finished nor failed yet
    pending: HashSet<RequestId>,
    /// The request that fetches the document of the current navigation
    document_request: Option<RequestId>,
}

/// What a completed request event meant for the lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RequestOutcome {
    /// The pending set just became empty
    pub became_idle: bool,
    /// The document request itself failed
    pub document_failed: bool,
}

impl NetworkTracker {
    pub fn on_request_will_be_sent(&mut self, event: &EventRequestWillBeSent) {
        self.pending.insert(event.request_id.clone());
        // redirects re-send the document request under the same id
        if event.r#type.as_deref() == Some("Document") && event.redirect_response.is_none() {
            self.document_request = Some(event.request_id.clone());
        }
    }

    pub(crate) fn on_response_received(&mut self, event: &EventResponseReceived) -> RequestOutcome {
        self.complete(&event.request_id, false)
    }

    pub(crate) fn on_loading_finished(&mut self, event: &EventLoadingFinished) -> RequestOutcome {
        self.complete(&event.request_id, false)
    }

    pub(crate) fn on_loading_failed(&mut self, event: &EventLoadingFailed) -> RequestOutcome {
        self.complete(&event.request_id, true)
    }

    fn complete(&mut self, request_id: &RequestId, failed: bool) -> RequestOutcome {
        let removed = self.pending.remove(request_id);
        RequestOutcome {
            became_idle: removed && self.pending.is_empty(),
            document_failed: failed && self.document_request.as_ref() == Some(request_id),
        }
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Forget everything; a new main-frame navigation started.
    pub fn reset(&mut self) {
        self.pending.clear();
        self.document_request = None;
    }
}
