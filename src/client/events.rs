//! Out-of-band client events
//!
//! Background failures never reject an unrelated in-flight call. They are
//! broadcast here instead, to whoever subscribed.

use crate::config::ServerAddress;
use crate::error::GraphError;
use crate::protocol::transport::FaultStream;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::debug;

/// Buffered events per subscriber before it starts lagging
pub const EVENT_CAPACITY: usize = 256;

#[derive(Debug, Clone)]
pub enum ClientEvent {
    /// A background failure: a transport fault, or a failed Sentinel reconnection
    Error(Arc<GraphError>),
    /// The Sentinel strategy switched to a new master
    Reconnected { master: ServerAddress },
}

pub type EventSender = broadcast::Sender<ClientEvent>;
pub type EventReceiver = broadcast::Receiver<ClientEvent>;

pub fn event_channel() -> EventSender {
    let (events, _) = broadcast::channel(EVENT_CAPACITY);
    events
}

pub(crate) fn emit(events: &EventSender, event: ClientEvent) {
    match events.send(event) {
        Ok(receivers) => debug!("Client event delivered to {} subscribers", receivers),
        Err(broadcast::error::SendError(event)) => debug!("No subscribers for {:?}", event),
    }
}

/// Republish every transport fault as an [`ClientEvent::Error`]
pub(crate) fn forward_faults(mut faults: FaultStream, events: EventSender) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(fault) = faults.recv().await {
            debug!("Forwarding fault from {}", fault.connection);
            emit(&events, ClientEvent::Error(fault.error));
        }
    })
}
