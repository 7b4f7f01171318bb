//! Access to the record store and the signed-in session.
//!
//! The `RecordStore` trait is what the rest of the app talks to. `FirestoreStore` reaches the
//! hosted document database over REST. `SqliteStore` keeps records in a local file and is what
//! the tests run against, so the app can be exercised top to bottom without the hosted backend.

mod auth;
mod firestore;
mod watch;
mod wire;

pub use auth::{sign_in, Session};
pub use firestore::FirestoreStore;
pub use watch::{Change, WatchedStore};

use crate::aggregate::DateRange;
use crate::config::Backend;
use crate::db::SqliteStore;
use crate::error::{ErrorType, IntoResult};
use crate::model::{Collection, Ledger, NewRecord, Record, RecordPatch};
use crate::{Config, Result};
use anyhow::Context;
use async_trait::async_trait;
use tracing::debug;

/// Restricts which records a query returns. Results are always newest first by record date.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    /// Only records whose date falls in this inclusive range.
    pub range: Option<DateRange>,
    /// At most this many records.
    pub limit: Option<u32>,
}

impl Filter {
    /// Every record in the collection.
    pub fn all() -> Self {
        Self::default()
    }

    /// Records dated within `range`.
    pub fn within(range: DateRange) -> Self {
        Self {
            range: Some(range),
            limit: None,
        }
    }

    pub fn with_limit(mut self, limit: Option<u32>) -> Self {
        self.limit = limit;
        self
    }
}

/// The operations the app needs from a record store.
///
/// The store assigns record ids and creation timestamps. It does not validate records; that
/// happens before a record gets here.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Adds a record attributed to `user_id` and returns the id the store gave it.
    async fn create(&self, record: NewRecord, user_id: &str) -> Result<String>;

    /// Returns the records of `collection` that match `filter`, newest first.
    async fn query(&self, collection: Collection, filter: &Filter) -> Result<Vec<Record>>;

    /// Applies `patch` to the record with `id`. It is an error if no such record exists.
    async fn update(&self, id: &str, patch: RecordPatch) -> Result<()>;

    /// Permanently removes the record with `id`. It is an error if no such record exists.
    async fn delete(&self, collection: Collection, id: &str) -> Result<()>;
}

/// Fetches all three collections with the same filter.
pub async fn fetch_ledger(store: &dyn RecordStore, filter: &Filter) -> Result<Ledger> {
    let mut records = Vec::new();
    for collection in Collection::ALL {
        let found = store.query(collection, filter).await?;
        debug!("Fetched {} records from {collection}", found.len());
        records.extend(found);
    }
    Ok(Ledger::from_records(records))
}

/// Opens the store named in `config`, acting as the user in `session`.
pub async fn open_store(config: &Config, session: &Session) -> Result<Box<dyn RecordStore>> {
    match config.backend() {
        Backend::Firestore => {
            let store = FirestoreStore::new(config, session).pub_result(ErrorType::Config)?;
            Ok(Box::new(store))
        }
        Backend::Sqlite => {
            let store = SqliteStore::load(config.sqlite_path())
                .await
                .pub_result(ErrorType::Store)?;
            Ok(Box::new(store))
        }
    }
}

/// An HTTP client that applies the configured request timeout.
pub(crate) fn http_client(config: &Config) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(config.timeout())
        .build()
        .context("Unable to build an HTTP client")
}

/// Parses a service base URL so that relative paths join onto it rather than replacing its last
/// segment.
pub(crate) fn parse_base_url(s: &str) -> Result<url::Url> {
    let mut base = url::Url::parse(s).with_context(|| format!("Invalid base URL '{s}'"))?;
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    Ok(base)
}
