//! Ordered outbound writer.
//!
//! All remote writes of a client go through one task so two writes issued in
//! sequence reach the store in that sequence. Writes are fire-and-forget:
//! a failure is logged and dropped, never retried.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

use partysheet_shared::RemoteRow;

use crate::ports::outbound::RemoteStorePort;

/// One remote write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteCommand {
    Upsert(RemoteRow),
    DeleteInventory(Uuid),
}

impl WriteCommand {
    fn describe(&self) -> String {
        match self {
            Self::Upsert(row) => format!("upsert {}", row.table()),
            Self::DeleteInventory(id) => format!("delete inventory {}", id),
        }
    }
}

#[derive(Debug)]
enum WriterMessage {
    Write {
        command: WriteCommand,
        done: Option<oneshot::Sender<()>>,
    },
    Flush(oneshot::Sender<()>),
}

/// Handle to the writer task. Clones share the same queue.
#[derive(Debug, Clone)]
pub struct OutboundWriter {
    tx: mpsc::UnboundedSender<WriterMessage>,
}

impl OutboundWriter {
    /// Spawns the writer task on the current runtime.
    ///
    /// The task stops once every handle is dropped.
    pub fn spawn(store: Arc<dyn RemoteStorePort>) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<WriterMessage>();

        tokio::spawn(async move {
            while let Some(message) = rx.recv().await {
                match message {
                    WriterMessage::Write { command, done } => {
                        execute(store.as_ref(), command).await;
                        if let Some(done) = done {
                            let _ = done.send(());
                        }
                    }
                    WriterMessage::Flush(done) => {
                        let _ = done.send(());
                    }
                }
            }
            tracing::debug!("Outbound writer stopped");
        });

        Self { tx }
    }

    /// Queues a write and returns immediately.
    pub fn submit(&self, command: WriteCommand) {
        self.enqueue(command, None);
    }

    /// Queues a write and waits until the store call has finished,
    /// successfully or not.
    pub async fn submit_and_wait(&self, command: WriteCommand) {
        let (done, rx) = oneshot::channel();
        if self.enqueue(command, Some(done)) {
            let _ = rx.await;
        }
    }

    /// Waits until every write queued before this call has finished.
    pub async fn flush(&self) {
        let (done, rx) = oneshot::channel();
        if self.tx.send(WriterMessage::Flush(done)).is_ok() {
            let _ = rx.await;
        }
    }

    fn enqueue(&self, command: WriteCommand, done: Option<oneshot::Sender<()>>) -> bool {
        let description = command.describe();
        match self.tx.send(WriterMessage::Write { command, done }) {
            Ok(()) => true,
            Err(_) => {
                tracing::warn!(write = %description, "Outbound writer is gone, dropping write");
                false
            }
        }
    }
}

async fn execute(store: &dyn RemoteStorePort, command: WriteCommand) {
    let description = command.describe();
    let result = match command {
        WriteCommand::Upsert(row) => store.upsert(row).await,
        WriteCommand::DeleteInventory(id) => store.delete_inventory_item(id).await,
    };
    match result {
        Ok(()) => tracing::trace!(write = %description, "Remote write completed"),
        Err(e) => tracing::warn!(write = %description, error = %e, "Remote write failed"),
    }
}
