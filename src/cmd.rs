use std::time::Duration;

use futures::channel::oneshot::Sender as OneshotSender;

use crate::error::{CdpError, Result};
use crate::protocol::{Command, CommandResponse, Method, MethodId, Response};

/// Messages used internally to communicate with the handler, which drives the
/// websocket in the background.
#[derive(Debug)]
pub(crate) struct CommandMessage {
    pub method: MethodId,
    pub session_id: Option<String>,
    pub params: serde_json::Value,
    /// Deadline hint for the handler side eviction job; the caller enforces
    /// its own timeout as well.
    pub timeout: Duration,
    pub sender: OneshotSender<Result<Response>>,
}

impl CommandMessage {
    pub fn with_session<C: Command>(
        cmd: C,
        sender: OneshotSender<Result<Response>>,
        session_id: Option<String>,
        timeout: Duration,
    ) -> serde_json::Result<Self> {
        Ok(Self {
            method: cmd.identifier(),
            session_id,
            params: serde_json::to_value(cmd)?,
            timeout,
            sender,
        })
    }
}

impl Method for CommandMessage {
    fn identifier(&self) -> MethodId {
        self.method.clone()
    }
}

/// Deserializes a raw response into the command's typed response, surfacing
/// the browser's error envelope verbatim.
pub(crate) fn to_command_response<T: Command>(
    resp: Response,
    method: MethodId,
) -> Result<CommandResponse<T::Response>> {
    if let Some(res) = resp.result {
        let result = serde_json::from_value(res)?;
        Ok(CommandResponse {
            id: resp.id,
            result,
            method,
        })
    } else if let Some(err) = resp.error {
        Err(err.into())
    } else {
        Err(CdpError::NoResponse)
    }
}
