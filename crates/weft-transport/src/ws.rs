//! Websocket channel over tokio-tungstenite.

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, trace};
use url::Url;

use crate::channel::{Channel, Connector};
use crate::error::TransportError;

/// Connects to the document service over a websocket.
#[derive(Clone, Copy, Debug, Default)]
pub struct WsConnector;

impl Connector for WsConnector {
    type Channel = WsChannel;

    async fn connect(&self, url: &Url) -> Result<WsChannel, TransportError> {
        let (stream, _response) = connect_async(url.as_str())
            .await
            .map_err(|e| TransportError::connect(url.as_str(), e))?;
        debug!(%url, "websocket handshake complete");
        Ok(WsChannel { stream })
    }
}

pub struct WsChannel {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl Channel for WsChannel {
    async fn send(&mut self, text: String) -> Result<(), TransportError> {
        self.stream
            .send(Message::Text(text.into()))
            .await
            .map_err(|e| TransportError::Send(Box::new(e)))
    }

    async fn recv(&mut self) -> Option<Result<String, TransportError>> {
        while let Some(msg) = self.stream.next().await {
            match msg {
                Ok(Message::Text(text)) => return Some(Ok(text.as_str().to_owned())),
                Ok(Message::Ping(data)) => {
                    if let Err(e) = self.stream.send(Message::Pong(data)).await {
                        return Some(Err(TransportError::Send(Box::new(e))));
                    }
                }
                Ok(Message::Close(frame)) => {
                    debug!(?frame, "service closed the websocket");
                    return None;
                }
                Ok(other) => {
                    // Binary, pong and raw frames carry nothing for us.
                    trace!(len = other.len(), "ignoring non-text frame");
                }
                Err(e) => return Some(Err(TransportError::Receive(Box::new(e)))),
            }
        }
        None
    }

    async fn close(&mut self) {
        let _ = self.stream.close(None).await;
    }
}
