use std::io;
use std::time::Duration;

use async_tungstenite::tungstenite;
use futures::channel::mpsc::SendError;
use futures::channel::oneshot::Canceled;
use thiserror::Error;

use crate::handler::target::NavigationState;
use crate::protocol::{self, MethodId};

pub type Result<T, E = CdpError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum CdpError {
    #[error("{0}")]
    Ws(#[from] tungstenite::Error),
    #[error("{0}")]
    Io(#[from] io::Error),
    #[error("{0}")]
    Serde(#[from] serde_json::Error),
    #[error("{0}")]
    Http(#[from] reqwest::Error),
    #[error("{0}")]
    Url(#[from] url::ParseError),
    /// The browser returned an error envelope; code and message are verbatim.
    #[error("{0}")]
    Chrome(#[from] protocol::Error),
    #[error("{0}")]
    ChannelSendError(#[from] ChannelError),
    #[error("received no response from the browser")]
    NoResponse,
    #[error("the connection to the browser is closed")]
    TransportClosed,
    #[error("`{method}` timed out after {timeout:?}")]
    Timeout { method: MethodId, timeout: Duration },
    #[error("{0}")]
    Navigation(#[from] NavigationError),
    #[error("javascript evaluation failed: {text}")]
    Evaluate {
        text: String,
        description: Option<String>,
    },
    #[error("stealth patch `{patch}` failed: {message}")]
    Patch { patch: String, message: String },
    #[error("stealth patch `{patch}` verification failed: {check}")]
    PatchVerification { patch: String, check: String },
    #[error("{0}")]
    Input(String),
    #[error("{0}")]
    Msg(String),
}

impl CdpError {
    pub fn msg(msg: impl Into<String>) -> Self {
        CdpError::Msg(msg.into())
    }

    /// The browser telling us a session is already gone, a benign condition
    /// during teardown.
    pub(crate) fn is_session_not_found(&self) -> bool {
        matches!(self, CdpError::Chrome(err) if err.message.contains("Session with given id not found"))
    }

    /// "Cannot find context with specified id"; a first evaluate after
    /// navigation can race the new context and is retried without an explicit
    /// context id.
    pub(crate) fn is_context_not_found(&self) -> bool {
        matches!(self, CdpError::Chrome(err) if err.message.contains("Cannot find context with specified id"))
    }
}

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("{0}")]
    Send(#[from] SendError),
    #[error("{0}")]
    Canceled(#[from] Canceled),
}

impl From<Canceled> for CdpError {
    fn from(err: Canceled) -> Self {
        ChannelError::from(err).into()
    }
}

impl From<SendError> for CdpError {
    fn from(err: SendError) -> Self {
        ChannelError::from(err).into()
    }
}

/// A navigation that failed to reach its requested wait-until condition,
/// carrying the last seen lifecycle state for diagnostics.
#[derive(Debug, Error)]
#[error("navigation failed: {message}; last state: {state:?}")]
pub struct NavigationError {
    pub message: String,
    pub state: NavigationState,
}

impl NavigationError {
    pub fn new(message: impl Into<String>, state: NavigationState) -> Self {
        Self {
            message: message.into(),
            state,
        }
    }
}
