use std::collections::VecDeque;
use std::pin::Pin;

use async_tungstenite::tungstenite::protocol::Message as WsMessage;
use async_tungstenite::WebSocketStream;
use futures::stream::Stream;
use futures::task::{Context, Poll};
use futures::Sink;

use crate::error::{CdpError, Result};
use crate::protocol::{CallId, Message, MethodCall, MethodId};

cfg_if::cfg_if! {
    if #[cfg(feature = "async-std-runtime")] {
        use async_tungstenite::async_std::{connect_async, ConnectStream};
    } else if #[cfg(feature = "tokio-runtime")] {
        use async_tungstenite::tokio::{connect_async, ConnectStream};
    }
}

/// Exchanges the messages with the websocket.
///
/// Writes are serialized through the sink half; each poll of the stream half
/// also advances the outbound queue, so a single task driving the stream is
/// all the scheduling this type needs.
#[must_use = "streams do nothing unless polled"]
#[derive(Debug)]
pub struct Connection {
    /// Queue of commands to send
    pending_commands: VecDeque<MethodCall>,
    /// The websocket to the browser instance
    ws: WebSocketStream<ConnectStream>,
    /// The identifier for the next command
    next_id: u64,
    needs_flush: bool,
    /// The message that is currently being sent
    pending_flush: Option<MethodCall>,
}

impl Connection {
    pub async fn connect(debug_ws_url: impl AsRef<str>) -> Result<Self> {
        let (ws, _) = connect_async(debug_ws_url.as_ref()).await?;
        Ok(Self {
            pending_commands: Default::default(),
            ws,
            next_id: 0,
            needs_flush: false,
            pending_flush: None,
        })
    }

    fn next_call_id(&mut self) -> CallId {
        self.next_id = self.next_id.wrapping_add(1);
        CallId::new(self.next_id)
    }

    /// Queue in the command to send over the socket and return the id assigned
    /// to it
    pub fn submit_command(
        &mut self,
        method: MethodId,
        session_id: Option<String>,
        params: serde_json::Value,
    ) -> serde_json::Result<CallId> {
        let id = self.next_call_id();
        tracing::debug!(id = %id, %method, "submitting command");
        self.pending_commands.push_back(MethodCall {
            id,
            session_id,
            method,
            params,
        });
        Ok(id)
    }

    /// Flush any processed message and start sending the next over the sink
    fn start_send_next(&mut self, cx: &mut Context<'_>) -> Result<()> {
        if self.needs_flush {
            if let Poll::Ready(Ok(())) = Sink::poll_flush(Pin::new(&mut self.ws), cx) {
                self.needs_flush = false;
            }
        }
        if self.pending_flush.is_none() && !self.needs_flush {
            if let Some(cmd) = self.pending_commands.pop_front() {
                let msg = serde_json::to_string(&cmd)?;
                Sink::start_send(Pin::new(&mut self.ws), msg.into())?;
                self.pending_flush = Some(cmd);
            }
        }
        Ok(())
    }
}

impl Stream for Connection {
    type Item = Result<Message>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let pin = self.get_mut();

        // queue in the next message if not currently flushing
        if let Err(err) = pin.start_send_next(cx) {
            return Poll::Ready(Some(Err(err)));
        }

        // send the message
        if let Some(call) = pin.pending_flush.take() {
            if Sink::poll_ready(Pin::new(&mut pin.ws), cx).is_ready() {
                pin.needs_flush = true;
            } else {
                pin.pending_flush = Some(call);
            }
        }

        // read from the ws
        loop {
            return match Stream::poll_next(Pin::new(&mut pin.ws), cx) {
                Poll::Ready(Some(Ok(WsMessage::Text(text)))) => {
                    match serde_json::from_str::<Message>(&text) {
                        Ok(msg) => Poll::Ready(Some(Ok(msg))),
                        Err(err) => {
                            tracing::error!(frame = %text, "failed to decode frame");
                            Poll::Ready(Some(Err(err.into())))
                        }
                    }
                }
                Poll::Ready(Some(Ok(WsMessage::Binary(data)))) => {
                    match serde_json::from_slice::<Message>(&data) {
                        Ok(msg) => Poll::Ready(Some(Ok(msg))),
                        Err(err) => {
                            tracing::error!(
                                frame = %String::from_utf8_lossy(&data),
                                "failed to decode frame"
                            );
                            Poll::Ready(Some(Err(err.into())))
                        }
                    }
                }
                Poll::Ready(Some(Ok(WsMessage::Close(_)))) => Poll::Ready(None),
                // ping/pong handled by tungstenite itself
                Poll::Ready(Some(Ok(_))) => continue,
                Poll::Ready(Some(Err(err))) => Poll::Ready(Some(Err(CdpError::Ws(err)))),
                Poll::Ready(None) => Poll::Ready(None),
                Poll::Pending => Poll::Pending,
            };
        }
    }
}
