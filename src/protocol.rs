use std::borrow::Cow;
use std::fmt;
use std::ops::Deref;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// The whole identifier of a method, like `Page.navigate`
pub type MethodId = Cow<'static, str>;

pub trait Method {
    /// The whole string identifier for this method like: `DOM.querySelector`
    fn identifier(&self) -> MethodId;
}

/// A command is a request to the browser that expects a typed response.
pub trait Command: Serialize + Method {
    type Response: DeserializeOwned + fmt::Debug;
}

/// A message sent by the client.
///
/// In the flat session protocol the session id is carried at the top level of
/// the frame whenever the command targets a specific page session.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct MethodCall {
    /// Identifier for this method call
    ///
    /// [`MethodCall`] ids must be unique for every connection
    pub id: CallId,
    #[serde(rename = "sessionId", skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub method: MethodId,
    pub params: serde_json::Value,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallId(u64);

impl CallId {
    pub fn new(id: u64) -> Self {
        CallId(id)
    }
}

impl fmt::Display for CallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CallId({})", self.0)
    }
}

/// A response to a [`MethodCall`] from the browser.
#[derive(Deserialize, Debug, PartialEq, Clone)]
pub struct Response {
    /// Matches the id of the request this responds to
    pub id: CallId,
    /// The response payload
    pub result: Option<serde_json::Value>,
    /// The reason why the [`MethodCall`] failed
    pub error: Option<Error>,
}

/// The structured error envelope the browser returns for a failed command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Error {
    /// Error code
    pub code: i64,
    /// Error message
    pub message: String,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Error {}: {}", self.code, self.message)
    }
}

impl std::error::Error for Error {}

/// An event frame pushed by the browser, identified by method name.
///
/// Params stay raw json; the `cdp` module provides typed views for the events
/// the client inspects.
#[derive(Deserialize, Debug, PartialEq, Clone)]
pub struct CdpEventMessage {
    /// Name of the method
    pub method: MethodId,
    /// The session this event is meant for, if any
    #[serde(rename = "sessionId")]
    pub session_id: Option<String>,
    /// Json params
    #[serde(default)]
    pub params: serde_json::Value,
}

impl Method for CdpEventMessage {
    fn identifier(&self) -> MethodId {
        self.method.clone()
    }
}

/// Incoming messages are either responses to earlier commands or events.
#[derive(Deserialize, Debug, Clone)]
#[serde(untagged)]
#[allow(clippy::large_enum_variant)]
pub enum Message {
    Response(Response),
    Event(CdpEventMessage),
}

/// A successfully completed command with its deserialized result.
#[derive(Debug, Clone)]
pub struct CommandResponse<T>
where
    T: fmt::Debug,
{
    pub id: CallId,
    pub result: T,
    pub method: MethodId,
}

impl<T: fmt::Debug> Deref for CommandResponse<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn method_call_carries_flat_session_id() {
        let call = MethodCall {
            id: CallId::new(3),
            session_id: Some("ABC".into()),
            method: "Page.enable".into(),
            params: json!({}),
        };
        let frame = serde_json::to_value(&call).unwrap();
        assert_eq!(frame["sessionId"], "ABC");
        assert_eq!(frame["id"], 3);
        assert_eq!(frame["method"], "Page.enable");
    }

    #[test]
    fn method_call_omits_missing_session_id() {
        let call = MethodCall {
            id: CallId::new(1),
            session_id: None,
            method: "Target.createTarget".into(),
            params: json!({"url": "about:blank"}),
        };
        let frame = serde_json::to_value(&call).unwrap();
        assert!(frame.get("sessionId").is_none());
    }

    #[test]
    fn classifies_response_frames() {
        let msg: Message =
            serde_json::from_str(r#"{"id": 7, "result": {"frameId": "F1"}}"#).unwrap();
        match msg {
            Message::Response(resp) => {
                assert_eq!(resp.id, CallId::new(7));
                assert!(resp.error.is_none());
            }
            Message::Event(_) => panic!("expected a response"),
        }
    }

    #[test]
    fn classifies_error_responses() {
        let msg: Message = serde_json::from_str(
            r#"{"id": 8, "error": {"code": -32000, "message": "Session with given id not found."}}"#,
        )
        .unwrap();
        match msg {
            Message::Response(resp) => {
                let err = resp.error.unwrap();
                assert_eq!(err.code, -32000);
                assert!(err.message.contains("not found"));
            }
            Message::Event(_) => panic!("expected a response"),
        }
    }

    #[test]
    fn classifies_event_frames() {
        let msg: Message = serde_json::from_str(
            r#"{"method": "Page.loadEventFired", "sessionId": "S1", "params": {"timestamp": 1.0}}"#,
        )
        .unwrap();
        match msg {
            Message::Event(ev) => {
                assert_eq!(ev.method, "Page.loadEventFired");
                assert_eq!(ev.session_id.as_deref(), Some("S1"));
            }
            Message::Response(_) => panic!("expected an event"),
        }
    }
}
