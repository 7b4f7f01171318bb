//! Shared test utilities for creating test environments.
//!
//! This module is only compiled when running tests (`#[cfg(test)]`).

use crate::api::Session;
use crate::config::{Backend, InitOptions};
use crate::db::SqliteStore;
use crate::Config;
use tempfile::TempDir;

pub(crate) const TEST_EMAIL: &str = "treasurer@church.cm";

/// A church-books home directory using the sqlite backend, with a signed-in session.
/// Holds TempDir to keep the directory alive for the duration of the test.
pub(crate) struct TestEnv {
    _temp_dir: TempDir,
    config: Config,
    store: SqliteStore,
    session: Session,
}

impl TestEnv {
    pub(crate) async fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("church-books");
        let options = InitOptions {
            backend: Backend::Sqlite,
            ..InitOptions::default()
        };
        let config = Config::create(&root, options).await.unwrap();
        let store = SqliteStore::load(config.sqlite_path()).await.unwrap();
        let session = Session::local(TEST_EMAIL);
        session.save(&config).await.unwrap();

        Self {
            _temp_dir: temp_dir,
            config,
            store,
            session,
        }
    }

    pub(crate) fn config(&self) -> &Config {
        &self.config
    }

    pub(crate) fn store(&self) -> &SqliteStore {
        &self.store
    }

    pub(crate) fn session(&self) -> &Session {
        &self.session
    }
}
