//! The duplex channel the bridge runs over, as traits so the reconnect logic
//! can be driven by something other than a real socket.

use std::future::Future;

use url::Url;

use crate::error::TransportError;

/// A connected, message-oriented duplex channel carrying text frames.
pub trait Channel: Send {
    /// Send one frame. An error means the frame was not delivered.
    fn send(&mut self, text: String) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Next text frame. `None` once the peer has closed the channel.
    ///
    /// Must be cancel safe: the bridge drops a pending `recv` whenever it has
    /// something to send.
    fn recv(&mut self) -> impl Future<Output = Option<Result<String, TransportError>>> + Send;

    /// Close the channel, ignoring failures.
    fn close(&mut self) -> impl Future<Output = ()> + Send;
}

/// Opens channels to an endpoint.
pub trait Connector: Send + Sync + 'static {
    type Channel: Channel + 'static;

    fn connect(
        &self,
        url: &Url,
    ) -> impl Future<Output = Result<Self::Channel, TransportError>> + Send;
}
