//! Signing in and out.

use crate::api::{sign_in, Session};
use crate::commands::Out;
use crate::error::{ErrorType, IntoResult};
use crate::{Config, Result};
use anyhow::anyhow;
use serde::Serialize;

/// Who signed in, without their tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignedIn {
    pub user_id: String,
    pub email: String,
}

/// Handles `churchbooks login`: signs in and saves the session for the commands that follow.
///
/// # Errors
/// A `Validation` error for a blank email address, otherwise the errors of `sign_in`.
pub async fn login(config: &Config, email: &str, password: &str) -> Result<Out<SignedIn>> {
    let email = email.trim();
    if email.is_empty() {
        return Err(anyhow!("email: Email is required.")).pub_result(ErrorType::Validation);
    }
    let session = sign_in(config, email, password).await?;
    session.save(config).await.pub_result(ErrorType::Auth)?;
    Ok(Out::new(
        format!("Signed in as {}", session.name()),
        SignedIn {
            user_id: session.user_id.clone(),
            email: session.email.clone(),
        },
    ))
}

/// Handles `churchbooks logout`.
pub async fn logout(config: &Config) -> Result<Out<()>> {
    let removed = Session::clear(config).await.pub_result(ErrorType::Auth)?;
    Ok(if removed {
        "Signed out".into()
    } else {
        "Nobody was signed in".into()
    })
}
