//! Signing in and keeping the signed-in session on disk.
//!
//! With the Firestore backend, people sign in with the email and password of their Firebase
//! account through the Identity Toolkit REST API. The returned ID token is what Firestore
//! requests are authorized with; it lasts an hour and is refreshed with the refresh token when a
//! command starts. The SQLite backend has no accounts, so signing in only records who is using
//! the app.

use super::http_client;
use crate::config::Backend;
use crate::error::{ErrorType, IntoResult};
use crate::{utils, Config, Result};
use anyhow::{anyhow, Context};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Formatter};
use tracing::{debug, info};

const SIGN_IN_URL: &str = "https://identitytoolkit.googleapis.com/v1/accounts:signInWithPassword";
const REFRESH_URL: &str = "https://securetoken.googleapis.com/v1/token";

/// Tokens this close to expiring are refreshed before use.
const EXPIRY_MARGIN_SECS: i64 = 60;

const NOT_SIGNED_IN: &str = "Not Authenticated. Please log in with `churchbooks login`";

/// The signed-in user.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Recorded on every record this user creates.
    pub user_id: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    id_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expires_at: Option<DateTime<Utc>>,
}

impl Debug for Session {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("user_id", &self.user_id)
            .field("email", &self.email)
            .field("display_name", &self.display_name)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// A session for the SQLite backend, where the email address identifies the user.
    pub fn local(email: &str) -> Self {
        Self {
            user_id: email.to_string(),
            email: email.to_string(),
            display_name: None,
            id_token: String::new(),
            refresh_token: None,
            expires_at: None,
        }
    }

    /// The name to greet the user with.
    pub fn name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.email)
    }

    pub fn id_token(&self) -> &str {
        &self.id_token
    }

    fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at
            .is_some_and(|at| at - Duration::seconds(EXPIRY_MARGIN_SECS) <= now)
    }

    /// Loads the saved session, refreshing its ID token first if it has expired.
    ///
    /// # Errors
    /// An `Auth` error when nobody is signed in or the session can no longer be refreshed.
    pub async fn load(config: &Config) -> Result<Self> {
        let path = config.session_path();
        if !path.is_file() {
            return Err(anyhow!(NOT_SIGNED_IN)).pub_result(ErrorType::Auth);
        }
        let content = utils::read(&path).await.pub_result(ErrorType::Auth)?;
        let session: Session = serde_json::from_str(&content)
            .with_context(|| format!("The session file at {} is corrupt", path.display()))
            .context(NOT_SIGNED_IN)
            .pub_result(ErrorType::Auth)?;

        if config.backend() == Backend::Firestore && session.needs_refresh(Utc::now()) {
            debug!("The ID token for {} has expired, refreshing it", session.email);
            let refreshed = refresh(config, &session)
                .await
                .context("Your session has expired. Please log in with `churchbooks login`")
                .pub_result(ErrorType::Auth)?;
            refreshed.save(config).await?;
            return Ok(refreshed);
        }
        Ok(session)
    }

    /// Writes the session where only the current user can read it.
    pub async fn save(&self, config: &Config) -> Result<()> {
        let data = serde_json::to_string_pretty(self).context("Unable to serialize session")?;
        utils::write_secret(&config.session_path(), data)
            .await
            .context("Unable to save the session")
    }

    /// Forgets the saved session. Returns false if nobody was signed in.
    pub async fn clear(config: &Config) -> Result<bool> {
        utils::remove(&config.session_path()).await
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SignInRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInResponse {
    local_id: String,
    email: String,
    #[serde(default)]
    display_name: Option<String>,
    id_token: String,
    refresh_token: String,
    expires_in: String,
}

#[derive(Deserialize)]
struct RefreshResponse {
    id_token: String,
    refresh_token: String,
    expires_in: String,
    user_id: String,
}

#[derive(Deserialize)]
struct AuthErrorBody {
    error: AuthErrorDetail,
}

#[derive(Deserialize)]
struct AuthErrorDetail {
    message: String,
}

/// Signs in with an email address and password.
///
/// # Errors
/// An `Auth` error when the credentials are rejected or the service cannot be reached.
pub async fn sign_in(config: &Config, email: &str, password: &str) -> Result<Session> {
    if config.backend() == Backend::Sqlite {
        info!("Using the local record store, no password check is made");
        return Ok(Session::local(email));
    }
    let api_key = config
        .store()
        .api_key
        .as_deref()
        .context("The config file has no web API key for signing in")
        .pub_result(ErrorType::Config)?;

    let response = http_client(config)?
        .post(SIGN_IN_URL)
        .query(&[("key", api_key)])
        .json(&SignInRequest {
            email,
            password,
            return_secure_token: true,
        })
        .send()
        .await
        .context("Unable to reach the sign-in service")
        .pub_result(ErrorType::Auth)?;

    if !response.status().is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(anyhow!(sign_in_failure(&body))).pub_result(ErrorType::Auth);
    }
    let body: SignInResponse = response
        .json()
        .await
        .context("Unable to read the sign-in response")
        .pub_result(ErrorType::Auth)?;

    Ok(Session {
        user_id: body.local_id,
        email: body.email,
        display_name: body.display_name.filter(|n| !n.is_empty()),
        id_token: body.id_token,
        refresh_token: Some(body.refresh_token),
        expires_at: Some(expiry(&body.expires_in)?),
    })
}

async fn refresh(config: &Config, session: &Session) -> Result<Session> {
    let refresh_token = session
        .refresh_token
        .as_deref()
        .context("The session has no refresh token")?;
    let api_key = config
        .store()
        .api_key
        .as_deref()
        .context("The config file has no web API key")?;

    let form = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("grant_type", "refresh_token")
        .append_pair("refresh_token", refresh_token)
        .finish();
    let response = http_client(config)?
        .post(REFRESH_URL)
        .query(&[("key", api_key)])
        .header(
            reqwest::header::CONTENT_TYPE,
            "application/x-www-form-urlencoded",
        )
        .body(form)
        .send()
        .await
        .context("Unable to reach the token service")?;

    if !response.status().is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(anyhow!(sign_in_failure(&body)));
    }
    let body: RefreshResponse = response
        .json()
        .await
        .context("Unable to read the token refresh response")?;

    Ok(Session {
        user_id: body.user_id,
        id_token: body.id_token,
        refresh_token: Some(body.refresh_token),
        expires_at: Some(expiry(&body.expires_in)?),
        ..session.clone()
    })
}

/// `expires_in` is a number of seconds, sent as a string.
fn expiry(expires_in: &str) -> Result<DateTime<Utc>> {
    let secs: i64 = expires_in
        .parse()
        .with_context(|| format!("Invalid token lifetime '{expires_in}'"))?;
    Ok(Utc::now() + Duration::seconds(secs))
}

/// A readable message for an Identity Toolkit error response.
fn sign_in_failure(body: &str) -> String {
    let code = serde_json::from_str::<AuthErrorBody>(body)
        .map(|b| b.error.message)
        .unwrap_or_default();
    // Codes can carry a detail after a colon, e.g. "TOO_MANY_ATTEMPTS_TRY_LATER : ...".
    let code = code.split(':').next().unwrap_or_default().trim();
    match code {
        "EMAIL_NOT_FOUND" | "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS" => {
            "Invalid email or password.".to_string()
        }
        "INVALID_EMAIL" => "The email address is not valid.".to_string(),
        "USER_DISABLED" => "This account has been disabled.".to_string(),
        "TOO_MANY_ATTEMPTS_TRY_LATER" => {
            "Too many failed attempts. Please try again later.".to_string()
        }
        "TOKEN_EXPIRED" | "INVALID_REFRESH_TOKEN" | "USER_NOT_FOUND" => {
            "The session is no longer valid.".to_string()
        }
        "" => format!("Sign-in failed: {body}"),
        other => format!("Sign-in failed: {other}"),
    }
}
