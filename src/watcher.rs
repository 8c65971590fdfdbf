//! Keeps an up-to-date [`Summary`] by recomputing it whenever the store reports a change.
use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::StreamExt;
use tracing::debug;
use tracing::warn;

use crate::aggregate::Summary;
use crate::service::InventoryService;
use crate::traits::InventoryStore;
use crate::types::Result;

/// Recomputes the summary in a background task. Subscribers get the latest value through a watch channel, so
/// intermediate states may be skipped when changes come in faster than they are read.
#[derive(Debug)]
pub struct SummaryWatcher {
    receiver: watch::Receiver<Arc<Summary>>,
    task:     JoinHandle<()>,
}

impl SummaryWatcher {
    pub async fn start<S: InventoryStore>(service: Arc<InventoryService<S>>) -> Result<Self> {
        // Subscribe before computing the initial summary or a change in between would go unnoticed.
        let mut changes = service.store().changes();
        let initial = service.summary().await?;
        let (sender, receiver) = watch::channel(Arc::new(initial));

        let task = tokio::spawn(async move {
            while let Some(event) = changes.next().await {
                match event {
                    Ok(change) => debug!("Recomputing summary after {change:?}"),
                    Err(BroadcastStreamRecvError::Lagged(missed)) => {
                        warn!("Summary watcher missed {missed} change notification(s), recomputing")
                    }
                }

                match service.summary().await {
                    Ok(summary) => {
                        if sender.send(Arc::new(summary)).is_err() {
                            debug!("No summary subscribers left");
                            break;
                        }
                    }
                    Err(err) => warn!("Failed to recompute summary, keeping the previous one: {err}"),
                }
            }
        });

        Ok(Self { receiver, task })
    }

    /// The most recent summary.
    pub fn current(&self) -> Arc<Summary> {
        self.receiver.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<Summary>> {
        self.receiver.clone()
    }

    pub fn shutdown(self) {
        self.task.abort();
    }
}

impl Drop for SummaryWatcher {
    fn drop(&mut self) {
        self.task.abort();
    }
}
