//! The reconnecting bridge between a replica and the document service.
//!
//! One task owns the channel. The host hands it operations through a
//! [`BridgeHandle`] and receives [`RemoteUpdate`]s on a channel; neither side
//! ever waits on the network. While the connection is down operations are
//! buffered in a bounded [`Outbox`] and flushed in order once it is open again.

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};
use weft_editor_core::{Operation, RemoteUpdate};

use crate::channel::{Channel, Connector};
use crate::config::TransportConfig;
use crate::error::TransportError;
use crate::messages::{self, Inbound};
use crate::outbox::Outbox;
use crate::state::ConnectionState;

/// Host side of a running bridge.
#[derive(Debug)]
pub struct BridgeHandle {
    ops: mpsc::UnboundedSender<Operation>,
    state: watch::Receiver<ConnectionState>,
    task: JoinHandle<()>,
}

impl BridgeHandle {
    /// Queue an operation for the service.
    ///
    /// Transmitted right away when the connection is open, buffered
    /// otherwise. Fails only once the bridge has stopped.
    pub fn send(&self, op: Operation) -> Result<(), TransportError> {
        self.ops.send(op).map_err(|_| TransportError::Closed)
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Receiver notified on every state change.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop the bridge, cancelling any pending reconnect.
    ///
    /// Buffered operations are discarded.
    pub fn shutdown(self) {
        self.task.abort();
    }
}

/// Start a bridge on the current tokio runtime.
///
/// The bridge runs until [`BridgeHandle::shutdown`], until the handle is
/// dropped, or until the update receiver is dropped.
pub fn spawn<C: Connector>(
    config: TransportConfig,
    connector: C,
) -> (BridgeHandle, mpsc::UnboundedReceiver<RemoteUpdate>) {
    let (ops_tx, ops_rx) = mpsc::unbounded_channel();
    let (updates_tx, updates_rx) = mpsc::unbounded_channel();
    let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);

    let bridge = Bridge {
        outbox: Outbox::new(config.outbox_capacity),
        config,
        connector,
        ops: ops_rx,
        updates: updates_tx,
        state: state_tx,
    };
    let task = tokio::spawn(bridge.run());

    let handle = BridgeHandle {
        ops: ops_tx,
        state: state_rx,
        task,
    };
    (handle, updates_rx)
}

/// Why a phase of the run loop ended.
enum Exit {
    /// The connection went down; reconnect after the delay.
    Down(ConnectionState),
    /// The host is gone.
    Stop,
}

struct Bridge<C: Connector> {
    config: TransportConfig,
    connector: C,
    outbox: Outbox,
    ops: mpsc::UnboundedReceiver<Operation>,
    updates: mpsc::UnboundedSender<RemoteUpdate>,
    state: watch::Sender<ConnectionState>,
}

impl<C: Connector> Bridge<C> {
    async fn run(mut self) {
        loop {
            self.set_state(ConnectionState::Connecting);
            info!(url = %self.config.url, "connecting to document service");

            let exit = match self.connect().await {
                None => Exit::Stop,
                Some(Ok(channel)) => {
                    self.set_state(ConnectionState::Open);
                    info!(buffered = self.outbox.len(), "connected to document service");
                    self.serve(channel).await
                }
                Some(Err(e)) => {
                    error!(error = ?e, "failed to connect to document service");
                    Exit::Down(ConnectionState::Errored)
                }
            };

            match exit {
                Exit::Stop => break,
                Exit::Down(state) => self.set_state(state),
            }

            info!(delay = ?self.config.reconnect_delay, "reconnecting to document service");
            if !self.backoff().await {
                break;
            }
        }
        debug!(dropped = self.outbox.dropped(), "bridge stopped");
    }

    /// Wait for the connector, buffering operations meanwhile.
    ///
    /// `None` if the host went away first.
    async fn connect(&mut self) -> Option<Result<C::Channel, TransportError>> {
        let connect = self.connector.connect(&self.config.url);
        tokio::pin!(connect);
        loop {
            tokio::select! {
                result = &mut connect => return Some(result),
                op = self.ops.recv() => match op {
                    Some(op) => {
                        self.outbox.push(op);
                    }
                    None => return None,
                },
            }
        }
    }

    /// Sleep out the reconnect delay, buffering operations meanwhile.
    ///
    /// `false` if the host went away first.
    async fn backoff(&mut self) -> bool {
        let sleep = tokio::time::sleep(self.config.reconnect_delay);
        tokio::pin!(sleep);
        loop {
            tokio::select! {
                _ = &mut sleep => return true,
                op = self.ops.recv() => match op {
                    Some(op) => {
                        self.outbox.push(op);
                    }
                    None => return false,
                },
            }
        }
    }

    async fn serve(&mut self, mut channel: C::Channel) -> Exit {
        if let Err(e) = self.flush(&mut channel).await {
            warn!(error = %e, "failed to flush buffered operations");
            channel.close().await;
            return Exit::Down(ConnectionState::Errored);
        }

        loop {
            tokio::select! {
                msg = channel.recv() => match msg {
                    Some(Ok(text)) => {
                        if !self.deliver(&text) {
                            channel.close().await;
                            return Exit::Stop;
                        }
                    }
                    Some(Err(e)) => {
                        warn!(error = %e, "connection to document service failed");
                        channel.close().await;
                        return Exit::Down(ConnectionState::Errored);
                    }
                    None => {
                        info!("document service closed the connection");
                        return Exit::Down(ConnectionState::Closed);
                    }
                },
                op = self.ops.recv() => match op {
                    Some(op) => {
                        self.outbox.push(op);
                        if let Err(e) = self.flush(&mut channel).await {
                            warn!(error = %e, "failed to send operation");
                            channel.close().await;
                            return Exit::Down(ConnectionState::Errored);
                        }
                    }
                    None => {
                        if let Err(e) = self.flush(&mut channel).await {
                            warn!(error = %e, "failed to flush operations on shutdown");
                        }
                        channel.close().await;
                        return Exit::Stop;
                    }
                },
            }
        }
    }

    /// Send everything in the outbox, oldest first.
    ///
    /// An operation whose send fails goes back to the head of the outbox, so
    /// it is retried once on the next connection.
    async fn flush(&mut self, channel: &mut C::Channel) -> Result<usize, TransportError> {
        let mut sent = 0;
        while let Some(op) = self.outbox.pop() {
            let text = match messages::encode(&op) {
                Ok(text) => text,
                Err(e) => {
                    warn!(error = %e, ?op, "dropping operation that failed to encode");
                    continue;
                }
            };
            if let Err(e) = channel.send(text).await {
                self.outbox.requeue(op);
                return Err(e);
            }
            sent += 1;
        }
        if sent > 0 {
            debug!(sent, "flushed operations");
        }
        Ok(sent)
    }

    /// Hand an incoming frame to the host. `false` if the host is gone.
    fn deliver(&self, text: &str) -> bool {
        let update = match Inbound::decode(text) {
            Ok(msg) => msg.into_update(),
            Err(e) => {
                warn!(error = %e, text = %text, "discarding malformed message");
                return true;
            }
        };
        trace!(?update, "received update");
        if self.updates.send(update).is_err() {
            error!("update receiver dropped, stopping bridge");
            return false;
        }
        true
    }

    fn set_state(&self, next: ConnectionState) {
        let prev = self.state.send_replace(next);
        debug_assert!(
            prev.can_transition_to(next),
            "illegal state transition {prev} -> {next}"
        );
        debug!(from = %prev, to = %next, "connection state changed");
    }
}
