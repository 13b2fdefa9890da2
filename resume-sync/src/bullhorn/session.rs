use reqwest::Client;
use serde::Deserialize;
use std::fmt;
use tracing::{info, instrument, warn};

use super::oauth::{self, Credentials, Grant, TokenResponse};
use crate::config::BullhornConfig;
use crate::upstream::{self, Result, UpstreamError};

const LOGIN_REQUEST: &str = "Bullhorn login";
const MAX_LOGIN_ATTEMPTS: u32 = 2;

/// A Bullhorn REST session: the `BhRestToken` and the per-session REST base URL.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    pub rest_token: String,
    pub rest_url: String,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("rest_token", &"<redacted>")
            .field("rest_url", &self.rest_url)
            .finish()
    }
}

impl Session {
    /// Both members must be present before any REST call.
    pub fn ensure_valid(&self) -> Result<()> {
        if self.rest_token.is_empty() || self.rest_url.is_empty() {
            return Err(UpstreamError::MissingSession);
        }
        Ok(())
    }

    /// `{rest_url}/{path}`; `rest_url` usually already ends in a slash.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.rest_url.trim_end_matches('/'), path.trim_start_matches('/'))
    }
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    #[serde(rename = "BhRestToken", default)]
    bh_rest_token: Option<String>,
    #[serde(rename = "restUrl", default)]
    rest_url: Option<String>,
}

/// Acquires Bullhorn sessions from the configured OAuth credentials.
#[derive(Clone)]
pub struct SessionManager {
    http: Client,
    no_redirect: Client,
    config: BullhornConfig,
}

impl SessionManager {
    /// `no_redirect` is used only for the headless authorize walk and must not follow redirects.
    pub fn new(http: Client, no_redirect: Client, config: BullhornConfig) -> Self {
        Self {
            http,
            no_redirect,
            config,
        }
    }

    /// A fresh session. A 401/403 from the login call restarts the whole acquisition, once.
    #[instrument(skip(self), err)]
    pub async fn acquire_session(&self) -> Result<Session> {
        let mut attempt = 1;
        loop {
            let access_token = self.access_token().await?;
            match self.login(&access_token).await {
                Err(e) if e.is_auth_failure() && attempt < MAX_LOGIN_ATTEMPTS => {
                    warn!(attempt, status = ?e.status(), "Bullhorn login rejected, acquiring a new session");
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    /// One refresh-token exchange, without the authorization-code fallback or login.
    pub async fn exchange_refresh_token(&self) -> Result<TokenResponse> {
        let credentials = Credentials::from_config(&self.config)?;
        oauth::exchange_token(
            &self.http,
            &self.config,
            &credentials,
            Grant::RefreshToken(credentials.refresh_token),
        )
        .await
    }

    async fn access_token(&self) -> Result<String> {
        let credentials = Credentials::from_config(&self.config)?;

        let token = match oauth::exchange_token(
            &self.http,
            &self.config,
            &credentials,
            Grant::RefreshToken(credentials.refresh_token),
        )
        .await
        {
            Ok(token) => token,
            Err(e) if e.oauth_error().as_deref() == Some("invalid_grant") => {
                let Some((username, password)) = self.config.fallback_login() else {
                    return Err(e);
                };
                warn!("Bullhorn refresh token rejected (invalid_grant), falling back to headless login");
                let code =
                    oauth::authorize_headless(&self.no_redirect, &self.config, credentials.client_id, username, password)
                        .await?;
                oauth::exchange_token(&self.http, &self.config, &credentials, Grant::AuthorizationCode(&code)).await?
            }
            Err(e) => return Err(e),
        };

        if let Some(rotated) = token.refresh_token.as_deref()
            && !rotated.is_empty()
            && rotated != credentials.refresh_token
        {
            warn!("Bullhorn refresh token rotated. Update BULLHORN_REFRESH_TOKEN to avoid auth failures.");
        }

        token
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| UpstreamError::InvalidResponse {
                operation: "Bullhorn token request",
                message: "missing access_token".to_string(),
            })
    }

    async fn login(&self, access_token: &str) -> Result<Session> {
        let request = self
            .http
            .get(self.config.login_url())
            .query(&[("version", "*"), ("access_token", access_token)]);
        let response = upstream::send(request, LOGIN_REQUEST).await?;
        let login: LoginResponse = upstream::json(response, LOGIN_REQUEST).await?;

        match (login.bh_rest_token, login.rest_url) {
            (Some(rest_token), Some(rest_url)) if !rest_token.is_empty() && !rest_url.is_empty() => {
                info!(rest_url = %rest_url, "Acquired Bullhorn session");
                Ok(Session { rest_token, rest_url })
            }
            _ => Err(UpstreamError::InvalidResponse {
                operation: LOGIN_REQUEST,
                message: "missing BhRestToken or restUrl".to_string(),
            }),
        }
    }
}
