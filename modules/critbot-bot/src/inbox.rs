// Single-consumer inbox between the transport (webhook) and the dispatcher.
//
// Producers only enqueue; one task drains the queue and handles each event
// to completion before taking the next.

use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::dispatch::Dispatcher;
use crate::transport::InboundMessage;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BotEvent {
    /// The messaging session is up.
    Ready,
    Message(InboundMessage),
    /// The messaging session went away; carries the reported reason.
    Disconnected(String),
}

#[derive(Clone)]
pub struct InboxSender {
    tx: mpsc::Sender<BotEvent>,
}

impl InboxSender {
    /// Enqueue an event. Fails only once the consumer has stopped.
    pub async fn send(&self, event: BotEvent) -> anyhow::Result<()> {
        self.tx
            .send(event)
            .await
            .map_err(|_| anyhow::anyhow!("inbox closed"))
    }
}

pub struct Inbox {
    rx: mpsc::Receiver<BotEvent>,
}

pub fn channel(capacity: usize) -> (InboxSender, Inbox) {
    let (tx, rx) = mpsc::channel(capacity);
    (InboxSender { tx }, Inbox { rx })
}

impl Inbox {
    pub async fn recv(&mut self) -> Option<BotEvent> {
        self.rx.recv().await
    }

    /// Drain events into the dispatcher until every sender is dropped.
    pub async fn run(mut self, mut dispatcher: Dispatcher) {
        info!("Inbox consumer started");
        while let Some(event) = self.rx.recv().await {
            dispatcher.handle(event).await;
        }
        warn!("Inbox closed, consumer stopping");
    }
}
