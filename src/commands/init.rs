use crate::args::InitArgs;
use crate::commands::Out;
use crate::config::InitOptions;
use crate::error::{ErrorType, IntoResult};
use crate::{Config, Result};
use anyhow::Context;
use std::path::Path;

/// Creates the data directory, its `.secrets` subdirectory and an initial `config.json`. With
/// the sqlite backend the database is created as well.
///
/// # Arguments
/// - `home` - The directory that will be the root of data directory, e.g. `$HOME/church-books`
/// - `args` - The backend and, for firestore, the project id and web API key.
///
/// # Errors
/// - Returns a `Config` error if the firestore settings are incomplete, if the directory already
///   holds a config file, or if any file operation fails.
pub async fn init(home: &Path, args: &InitArgs) -> Result<Out<()>> {
    let options = InitOptions {
        backend: args.backend,
        project_id: args.project_id.clone(),
        api_key: args.api_key.clone(),
        model: args.model.clone(),
    };
    let config = Config::create(home, options)
        .await
        .context("Unable to create the data directory and configs")
        .pub_result(ErrorType::Config)?;
    Ok(format!(
        "Created the church-books directory at {} using the {} backend. Sign in with \
        `churchbooks login`",
        config.root().display(),
        config.backend()
    )
    .into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Backend;
    use crate::error::error_type;
    use tempfile::TempDir;

    fn sqlite_args() -> InitArgs {
        InitArgs {
            backend: Backend::Sqlite,
            project_id: None,
            api_key: None,
            model: None,
        }
    }

    #[tokio::test]
    async fn test_init() {
        let dir = TempDir::new().unwrap();
        let home = dir.path().join("books");
        let out = init(&home, &sqlite_args()).await.unwrap();
        assert!(out.message().contains("sqlite backend"));
        let config = Config::load(&home).await.unwrap();
        assert_eq!(config.backend(), Backend::Sqlite);

        let err = init(&home, &sqlite_args()).await.unwrap_err();
        assert_eq!(error_type(&err), Some(ErrorType::Config));
    }

    #[tokio::test]
    async fn test_init_firestore_needs_project() {
        let dir = TempDir::new().unwrap();
        let args = InitArgs {
            backend: Backend::Firestore,
            ..sqlite_args()
        };
        let err = init(dir.path(), &args).await.unwrap_err();
        assert_eq!(error_type(&err), Some(ErrorType::Config));
        assert!(!dir.path().join("config.json").exists());
    }
}
