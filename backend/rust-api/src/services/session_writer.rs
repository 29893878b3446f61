use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};

use crate::errors::StoreError;
use crate::metrics::record_persistence_failure;
use crate::models::game::{GameSessionRecord, PersistenceStatus};

use super::stores::SessionStore;

enum WriteCommand {
    Save(GameSessionRecord),
    SaveAndConfirm(GameSessionRecord, oneshot::Sender<Result<(), StoreError>>),
}

/// Single worker applying session upserts in the order they were queued, so a
/// later record for a player never gets overwritten by an earlier one.
#[derive(Clone)]
pub struct SessionWriter {
    tx: mpsc::UnboundedSender<WriteCommand>,
}

impl SessionWriter {
    /// Spawns the worker; it stops once every writer handle is dropped.
    pub fn spawn(sessions: Arc<dyn SessionStore>) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<WriteCommand>();

        tokio::spawn(async move {
            while let Some(command) = rx.recv().await {
                match command {
                    WriteCommand::Save(record) => {
                        if let Err(e) = sessions.upsert(&record).await {
                            tracing::warn!(
                                "Background session save failed: player={}, error={}",
                                record.player_id,
                                e
                            );
                            record_persistence_failure("upsert");
                        }
                    }
                    WriteCommand::SaveAndConfirm(record, reply) => {
                        let result = sessions.upsert(&record).await;
                        let _ = reply.send(result);
                    }
                }
            }
            tracing::debug!("Session writer stopped");
        });

        Self { tx }
    }

    /// Queues the record behind any earlier writes.
    pub fn enqueue(&self, record: GameSessionRecord) -> PersistenceStatus {
        let player_id = record.player_id.clone();
        match self.tx.send(WriteCommand::Save(record)) {
            Ok(()) => PersistenceStatus::Queued,
            Err(_) => {
                tracing::warn!("Session writer closed: player={}", player_id);
                record_persistence_failure("upsert");
                PersistenceStatus::Failed
            }
        }
    }

    /// Queues the record and waits until it, and everything queued before it,
    /// has been written.
    pub async fn save_and_wait(&self, record: GameSessionRecord) -> PersistenceStatus {
        let player_id = record.player_id.clone();
        let (reply_tx, reply_rx) = oneshot::channel();

        if self
            .tx
            .send(WriteCommand::SaveAndConfirm(record, reply_tx))
            .is_err()
        {
            tracing::warn!("Session writer closed: player={}", player_id);
            record_persistence_failure("upsert");
            return PersistenceStatus::Failed;
        }

        match reply_rx.await {
            Ok(Ok(())) => PersistenceStatus::Saved,
            Ok(Err(e)) => {
                tracing::warn!(
                    "Session save failed, continuing in memory: player={}, error={}",
                    player_id,
                    e
                );
                record_persistence_failure("upsert");
                PersistenceStatus::Failed
            }
            Err(_) => {
                tracing::warn!("Session writer dropped reply: player={}", player_id);
                record_persistence_failure("upsert");
                PersistenceStatus::Failed
            }
        }
    }
}
