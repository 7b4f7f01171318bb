//! Error handling for the app.
//!
//! Internally everything is an `anyhow::Error` with context attached as it propagates. Errors that
//! reach the user are tagged with an `ErrorType` through `IntoResult::pub_result` so the CLI can
//! say what kind of failure happened without exposing internals.

use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Display, Formatter};

pub type Error = anyhow::Error;
pub type Result<T> = std::result::Result<T, Error>;

/// The kinds of failure a user can see.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorType {
    /// Not signed in, or the session could not be established or refreshed.
    Auth,
    /// The record store could not be reached or rejected the request.
    Store,
    /// A form failed validation before it was submitted.
    Validation,
    /// The text-generation service failed or there was nothing to send it.
    Generation,
    /// The home directory or its configuration is missing or invalid.
    Config,
}

serde_plain::derive_display_from_serialize!(ErrorType);
serde_plain::derive_fromstr_from_deserialize!(ErrorType);

/// An error that has been tagged with an `ErrorType`.
pub struct PubError {
    error_type: ErrorType,
    inner: Error,
}

impl PubError {
    pub fn error_type(&self) -> ErrorType {
        self.error_type
    }
}

impl Debug for PubError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} error: {:?}", self.error_type, self.inner)
    }
}

impl Display for PubError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} error: {}", self.error_type, self.inner)
    }
}

impl std::error::Error for PubError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.inner.as_ref())
    }
}

/// Converts a result into one whose error carries an `ErrorType`.
pub trait IntoResult<T> {
    /// Tags the error, if any, with `error_type`. An error that is already tagged keeps its
    /// original tag.
    fn pub_result(self, error_type: ErrorType) -> Result<T>;
}

impl<T, E> IntoResult<T> for std::result::Result<T, E>
where
    E: Into<Error>,
{
    fn pub_result(self, error_type: ErrorType) -> Result<T> {
        self.map_err(|e| {
            let inner: Error = e.into();
            if inner.downcast_ref::<PubError>().is_some() {
                inner
            } else {
                Error::new(PubError { error_type, inner })
            }
        })
    }
}

/// Returns the `ErrorType` of `e` if it has been tagged.
pub fn error_type(e: &Error) -> Option<ErrorType> {
    e.downcast_ref::<PubError>().map(PubError::error_type)
}
