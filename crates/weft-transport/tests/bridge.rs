//! Reconnect, buffering and delivery behaviour of the bridge, driven by a
//! scripted in-memory connector under paused time.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;
use url::Url;
use weft_editor_core::{Operation, RemoteUpdate};
use weft_transport::{
    BridgeHandle, Channel, ConnectionState, Connector, TransportConfig, TransportError,
};

/// Client end of an in-memory connection.
struct FakeChannel {
    outgoing: mpsc::UnboundedSender<String>,
    incoming: mpsc::UnboundedReceiver<Result<String, String>>,
}

/// Service end of an in-memory connection. Dropping it closes the
/// connection.
struct FakeServer {
    sent: mpsc::UnboundedReceiver<String>,
    push: mpsc::UnboundedSender<Result<String, String>>,
}

impl FakeServer {
    fn push(&self, text: &str) {
        self.push.send(Ok(text.to_string())).unwrap();
    }

    async fn next_op(&mut self) -> Operation {
        let text = self.sent.recv().await.expect("channel closed");
        serde_json::from_str(&text).unwrap()
    }
}

fn connection() -> (FakeChannel, FakeServer) {
    let (outgoing, sent) = mpsc::unbounded_channel();
    let (push, incoming) = mpsc::unbounded_channel();
    (FakeChannel { outgoing, incoming }, FakeServer { sent, push })
}

impl Channel for FakeChannel {
    async fn send(&mut self, text: String) -> Result<(), TransportError> {
        self.outgoing.send(text).map_err(|_| TransportError::Closed)
    }

    async fn recv(&mut self) -> Option<Result<String, TransportError>> {
        self.incoming
            .recv()
            .await
            .map(|frame| frame.map_err(|e| TransportError::Receive(e.into())))
    }

    async fn close(&mut self) {}
}

enum Outcome {
    Accept(FakeChannel),
    Refuse,
}

/// Hands out scripted outcomes, then never completes.
#[derive(Clone, Default)]
struct FakeConnector {
    script: Arc<Mutex<VecDeque<Outcome>>>,
    attempts: Arc<Mutex<Vec<Instant>>>,
}

impl FakeConnector {
    fn scripted(outcomes: impl IntoIterator<Item = Outcome>) -> Self {
        Self {
            script: Arc::new(Mutex::new(outcomes.into_iter().collect())),
            attempts: Arc::default(),
        }
    }

    fn attempts(&self) -> Vec<Instant> {
        self.attempts.lock().unwrap().clone()
    }
}

impl Connector for FakeConnector {
    type Channel = FakeChannel;

    async fn connect(&self, url: &Url) -> Result<FakeChannel, TransportError> {
        self.attempts.lock().unwrap().push(Instant::now());
        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(Outcome::Accept(channel)) => Ok(channel),
            Some(Outcome::Refuse) => Err(TransportError::connect(
                url.as_str(),
                std::io::Error::from(std::io::ErrorKind::ConnectionRefused),
            )),
            None => std::future::pending().await,
        }
    }
}

fn config() -> TransportConfig {
    TransportConfig::new(Url::parse("ws://localhost:8080/ws").unwrap())
}

async fn wait_for(handle: &BridgeHandle, want: ConnectionState) {
    let mut state = handle.watch_state();
    state.wait_for(|s| *s == want).await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_starts_disconnected_then_opens() {
    let (channel, _server) = connection();
    let (handle, _updates) =
        weft_transport::spawn(config(), FakeConnector::scripted([Outcome::Accept(channel)]));

    assert_eq!(handle.state(), ConnectionState::Disconnected);
    wait_for(&handle, ConnectionState::Open).await;
    assert_eq!(handle.state(), ConnectionState::Open);
}

#[tokio::test(start_paused = true)]
async fn test_ops_sent_in_order() {
    let (channel, mut server) = connection();
    let (handle, _updates) =
        weft_transport::spawn(config(), FakeConnector::scripted([Outcome::Accept(channel)]));

    handle.send(Operation::add('h')).unwrap();
    handle.send(Operation::add('i')).unwrap();
    handle.send(Operation::delete(1)).unwrap();

    assert_eq!(server.next_op().await, Operation::add('h'));
    assert_eq!(server.next_op().await, Operation::add('i'));
    assert_eq!(server.next_op().await, Operation::delete(1));
}

#[tokio::test(start_paused = true)]
async fn test_refused_connection_retries_after_delay() {
    let (channel, mut server) = connection();
    let connector = FakeConnector::scripted([Outcome::Refuse, Outcome::Accept(channel)]);
    let config = config().with_reconnect_delay(Duration::from_millis(1000));
    let (handle, _updates) = weft_transport::spawn(config, connector.clone());

    // Buffered while the first attempt fails and the bridge waits.
    handle.send(Operation::delete(7)).unwrap();

    assert_eq!(server.next_op().await, Operation::delete(7));
    assert_eq!(handle.state(), ConnectionState::Open);

    let attempts = connector.attempts();
    assert_eq!(attempts.len(), 2);
    assert!(attempts[1] - attempts[0] >= Duration::from_millis(1000));
}

#[tokio::test(start_paused = true)]
async fn test_inbound_messages_reach_host() {
    let (channel, server) = connection();
    let (handle, mut updates) =
        weft_transport::spawn(config(), FakeConnector::scripted([Outcome::Accept(channel)]));
    wait_for(&handle, ConnectionState::Open).await;

    server.push(r#"{"op":"delete","id":2}"#);
    server.push(r#"{"ops":[{"op":"add","value":"x"}]}"#);
    server.push(r#"{"nodes":[]}"#);

    assert_eq!(
        updates.recv().await,
        Some(RemoteUpdate::Operations(vec![Operation::delete(2)]))
    );
    assert_eq!(
        updates.recv().await,
        Some(RemoteUpdate::Operations(vec![Operation::add('x')]))
    );
    assert_eq!(updates.recv().await, Some(RemoteUpdate::Snapshot(vec![])));
}

#[tokio::test(start_paused = true)]
async fn test_malformed_message_is_discarded() {
    let (channel, server) = connection();
    let (handle, mut updates) =
        weft_transport::spawn(config(), FakeConnector::scripted([Outcome::Accept(channel)]));
    wait_for(&handle, ConnectionState::Open).await;

    server.push("{not json");
    server.push(r#"{"op":"explode"}"#);
    server.push(r#"{"op":"delete","id":3}"#);

    assert_eq!(
        updates.recv().await,
        Some(RemoteUpdate::Operations(vec![Operation::delete(3)]))
    );
    assert_eq!(handle.state(), ConnectionState::Open);
}

#[tokio::test(start_paused = true)]
async fn test_op_in_flight_at_close_delivered_once_after_reconnect() {
    let (first, first_server) = connection();
    let (second, mut second_server) = connection();
    let connector = FakeConnector::scripted([Outcome::Accept(first), Outcome::Accept(second)]);
    let (handle, _updates) = weft_transport::spawn(config(), connector.clone());
    wait_for(&handle, ConnectionState::Open).await;

    drop(first_server);
    handle.send(Operation::add('a')).unwrap();
    handle.send(Operation::add('b')).unwrap();

    assert_eq!(second_server.next_op().await, Operation::add('a'));
    assert_eq!(second_server.next_op().await, Operation::add('b'));

    handle.send(Operation::delete(9)).unwrap();
    assert_eq!(second_server.next_op().await, Operation::delete(9));
    assert!(second_server.sent.try_recv().is_err());
    assert_eq!(connector.attempts().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_receive_error_triggers_reconnect() {
    let (first, first_server) = connection();
    let (second, second_server) = connection();
    let connector = FakeConnector::scripted([Outcome::Accept(first), Outcome::Accept(second)]);
    let config = config().with_reconnect_delay(Duration::from_millis(250));
    let (handle, mut updates) = weft_transport::spawn(config, connector.clone());
    wait_for(&handle, ConnectionState::Open).await;

    first_server.push.send(Err("reset by peer".into())).unwrap();
    second_server.push(r#"{"op":"delete","id":1}"#);

    assert_eq!(
        updates.recv().await,
        Some(RemoteUpdate::Operations(vec![Operation::delete(1)]))
    );
    let attempts = connector.attempts();
    assert_eq!(attempts.len(), 2);
    assert!(attempts[1] - attempts[0] >= Duration::from_millis(250));
}

#[tokio::test(start_paused = true)]
async fn test_full_outbox_drops_newest() {
    let (channel, mut server) = connection();
    let connector = FakeConnector::scripted([Outcome::Refuse, Outcome::Accept(channel)]);
    let config = config().with_outbox_capacity(2);
    let (handle, _updates) = weft_transport::spawn(config, connector);

    handle.send(Operation::delete(1)).unwrap();
    handle.send(Operation::delete(2)).unwrap();
    handle.send(Operation::delete(3)).unwrap();

    assert_eq!(server.next_op().await, Operation::delete(1));
    assert_eq!(server.next_op().await, Operation::delete(2));

    handle.send(Operation::delete(4)).unwrap();
    assert_eq!(server.next_op().await, Operation::delete(4));
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_cancels_reconnect() {
    let connector = FakeConnector::scripted([Outcome::Refuse]);
    let (handle, _updates) = weft_transport::spawn(config(), connector.clone());
    wait_for(&handle, ConnectionState::Errored).await;
    assert_eq!(connector.attempts().len(), 1);

    handle.shutdown();
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(connector.attempts().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_bridge_stops_when_host_drops_updates() {
    let (channel, server) = connection();
    let (handle, updates) =
        weft_transport::spawn(config(), FakeConnector::scripted([Outcome::Accept(channel)]));
    wait_for(&handle, ConnectionState::Open).await;

    drop(updates);
    server.push(r#"{"op":"delete","id":1}"#);
    while !handle.is_finished() {
        tokio::task::yield_now().await;
    }

    assert!(matches!(
        handle.send(Operation::delete(2)),
        Err(TransportError::Closed)
    ));
}
