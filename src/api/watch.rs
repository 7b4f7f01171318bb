//! Change notification for record stores.

use super::{Filter, RecordStore};
use crate::model::{Collection, NewRecord, Record, RecordPatch};
use crate::Result;
use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::trace;

const CHANNEL_CAPACITY: usize = 64;

/// A successful write to the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "change", rename_all = "snake_case")]
pub enum Change {
    Created { collection: Collection, id: String },
    Updated { collection: Collection, id: String },
    Deleted { collection: Collection, id: String },
}

impl Change {
    pub fn collection(&self) -> Collection {
        match self {
            Change::Created { collection, .. }
            | Change::Updated { collection, .. }
            | Change::Deleted { collection, .. } => *collection,
        }
    }
}

/// Wraps a store and announces every successful write to its subscribers, so that views built
/// from a query can be refreshed instead of polling.
///
/// Failed writes are not announced. Subscribers that fall behind lose the oldest changes and are
/// told so by the channel.
pub struct WatchedStore<S> {
    inner: S,
    changes: broadcast::Sender<Change>,
}

impl<S: RecordStore> WatchedStore<S> {
    pub fn new(inner: S) -> Self {
        let (changes, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { inner, changes }
    }

    /// Receives every change made after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<Change> {
        self.changes.subscribe()
    }

    pub fn into_inner(self) -> S {
        self.inner
    }

    fn publish(&self, change: Change) {
        trace!("{change:?}");
        // Having no subscribers is not an error.
        let _ = self.changes.send(change);
    }
}

#[async_trait]
impl<S: RecordStore> RecordStore for WatchedStore<S> {
    async fn create(&self, record: NewRecord, user_id: &str) -> Result<String> {
        let collection = record.collection();
        let id = self.inner.create(record, user_id).await?;
        self.publish(Change::Created {
            collection,
            id: id.clone(),
        });
        Ok(id)
    }

    async fn query(&self, collection: Collection, filter: &Filter) -> Result<Vec<Record>> {
        self.inner.query(collection, filter).await
    }

    async fn update(&self, id: &str, patch: RecordPatch) -> Result<()> {
        let collection = patch.collection();
        self.inner.update(id, patch).await?;
        self.publish(Change::Updated {
            collection,
            id: id.to_string(),
        });
        Ok(())
    }

    async fn delete(&self, collection: Collection, id: &str) -> Result<()> {
        self.inner.delete(collection, id).await?;
        self.publish(Change::Deleted {
            collection,
            id: id.to_string(),
        });
        Ok(())
    }
}
