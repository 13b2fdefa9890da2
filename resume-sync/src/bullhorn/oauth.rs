use reqwest::{Client, header::LOCATION};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

use crate::config::BullhornConfig;
use crate::upstream::{self, Result, UpstreamError};

const TOKEN_REQUEST: &str = "Bullhorn token request";
const AUTHORIZE_REQUEST: &str = "Bullhorn authorize request";

/// Body of a successful `/oauth/token` call.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenResponse {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Seconds until the access token expires
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub token_type: Option<String>,
}

#[derive(Debug, Clone, Copy)]
pub enum Grant<'a> {
    RefreshToken(&'a str),
    AuthorizationCode(&'a str),
}

impl Grant<'_> {
    fn form_fields(&self) -> [(&'static str, &str); 2] {
        match *self {
            Grant::RefreshToken(token) => [("grant_type", "refresh_token"), ("refresh_token", token)],
            Grant::AuthorizationCode(code) => [("grant_type", "authorization_code"), ("code", code)],
        }
    }
}

/// Client id, secret and refresh token; all three are required for any session.
#[derive(Clone, Copy)]
pub struct Credentials<'a> {
    pub client_id: &'a str,
    pub client_secret: &'a str,
    pub refresh_token: &'a str,
}

impl<'a> Credentials<'a> {
    pub fn from_config(config: &'a BullhornConfig) -> Result<Self> {
        let present = |value: &'a Option<String>| value.as_deref().filter(|v| !v.is_empty());
        match (
            present(&config.client_id),
            present(&config.client_secret),
            present(&config.refresh_token),
        ) {
            (Some(client_id), Some(client_secret), Some(refresh_token)) => Ok(Self {
                client_id,
                client_secret,
                refresh_token,
            }),
            _ => Err(UpstreamError::MissingOAuthConfig),
        }
    }
}

/// Form-encoded POST to `{oauth}/token`.
#[instrument(skip_all, err)]
pub async fn exchange_token(
    http: &Client,
    config: &BullhornConfig,
    credentials: &Credentials<'_>,
    grant: Grant<'_>,
) -> Result<TokenResponse> {
    let mut form: Vec<(&str, &str)> = vec![
        ("client_id", credentials.client_id),
        ("client_secret", credentials.client_secret),
    ];
    form.extend(grant.form_fields());
    if let Some(redirect_uri) = config.redirect_uri.as_deref() {
        form.push(("redirect_uri", redirect_uri));
    }

    let request = http.post(config.oauth_endpoint("token")).form(&form);
    let response = upstream::send(request, TOKEN_REQUEST).await?;
    upstream::json(response, TOKEN_REQUEST).await
}

/// Log in through `{oauth}/authorize` with a username and password and return the authorization
/// code Bullhorn redirects back with. `no_redirect` must not follow redirects itself.
#[instrument(skip_all, err)]
pub async fn authorize_headless(
    no_redirect: &Client,
    config: &BullhornConfig,
    client_id: &str,
    username: &str,
    password: &str,
) -> Result<String> {
    let mut start = config.oauth_endpoint("authorize");
    {
        let mut query = start.query_pairs_mut();
        query
            .append_pair("client_id", client_id)
            .append_pair("response_type", "code")
            .append_pair("action", "Login")
            .append_pair("username", username)
            .append_pair("password", password);
        if let Some(redirect_uri) = config.redirect_uri.as_deref() {
            query.append_pair("redirect_uri", redirect_uri);
        }
    }

    follow_redirects_for_code(no_redirect, start, config.max_redirect_hops, config.redirect_hop_delay).await
}

/// Walk `Location` headers from `start` until one carries a `code` query parameter.
///
/// Makes at most `max_hops` requests. A 4xx/5xx answer is an upstream error; a response without
/// `Location`, or running out of hops, is [`UpstreamError::MissingAuthCode`].
pub async fn follow_redirects_for_code(
    no_redirect: &Client,
    start: Url,
    max_hops: u32,
    hop_delay: Duration,
) -> Result<String> {
    let mut current = start;

    for hop in 0..max_hops {
        let response = no_redirect
            .get(current.clone())
            .send()
            .await
            .map_err(|source| UpstreamError::transport(AUTHORIZE_REQUEST, source))?;

        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            return Err(upstream::failure(response, AUTHORIZE_REQUEST).await);
        }

        let Some(location) = response.headers().get(LOCATION).and_then(|v| v.to_str().ok()) else {
            return Err(UpstreamError::MissingAuthCode {
                status: Some(status.as_u16()),
            });
        };

        let next = current.join(location).map_err(|e| UpstreamError::InvalidResponse {
            operation: AUTHORIZE_REQUEST,
            message: format!("unusable redirect location {location:?}: {e}"),
        })?;

        if let Some((_, code)) = next.query_pairs().find(|(key, value)| key == "code" && !value.is_empty()) {
            debug!(hop, "Received Bullhorn authorization code");
            return Ok(code.into_owned());
        }

        debug!(hop, host = next.host_str().unwrap_or_default(), "Following Bullhorn authorize redirect");
        current = next;
        tokio::time::sleep(hop_delay).await;
    }

    Err(UpstreamError::MissingAuthCode { status: None })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(server: &MockServer) -> BullhornConfig {
        BullhornConfig {
            auth_url: server.uri().parse().unwrap(),
            client_id: Some("client".to_string()),
            client_secret: Some("secret".to_string()),
            refresh_token: Some("refresh-1".to_string()),
            redirect_hop_delay: Duration::from_millis(1),
            ..Default::default()
        }
    }

    fn no_redirect() -> Client {
        Client::builder().redirect(reqwest::redirect::Policy::none()).build().unwrap()
    }

    #[test]
    fn test_credentials_require_all_three() {
        let mut bullhorn = BullhornConfig {
            client_id: Some("client".to_string()),
            client_secret: Some("secret".to_string()),
            refresh_token: Some(String::new()),
            ..Default::default()
        };
        assert!(matches!(
            Credentials::from_config(&bullhorn),
            Err(UpstreamError::MissingOAuthConfig)
        ));

        bullhorn.refresh_token = Some("refresh".to_string());
        let credentials = Credentials::from_config(&bullhorn).unwrap();
        assert_eq!(credentials.refresh_token, "refresh");
    }

    #[test_log::test(tokio::test)]
    async fn test_refresh_token_exchange() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .and(body_string_contains("grant_type=refresh_token"))
            .and(body_string_contains("refresh_token=refresh-1"))
            .and(body_string_contains("client_id=client"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "access-1",
                "refresh_token": "refresh-2",
                "expires_in": 600,
                "token_type": "Bearer"
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let bullhorn = config(&mock_server);
        let credentials = Credentials::from_config(&bullhorn).unwrap();
        let token = exchange_token(
            &Client::new(),
            &bullhorn,
            &credentials,
            Grant::RefreshToken(credentials.refresh_token),
        )
        .await
        .unwrap();

        assert_eq!(token.access_token.as_deref(), Some("access-1"));
        assert_eq!(token.refresh_token.as_deref(), Some("refresh-2"));
        assert_eq!(token.expires_in, Some(600));
    }

    #[tokio::test]
    async fn test_authorization_code_exchange_sends_redirect_uri() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .and(body_string_contains("grant_type=authorization_code"))
            .and(body_string_contains("code=abc"))
            .and(body_string_contains("redirect_uri=https%3A%2F%2Fexample.com%2Fcb"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access_token": "access-2"})))
            .expect(1)
            .mount(&mock_server)
            .await;

        let mut bullhorn = config(&mock_server);
        bullhorn.redirect_uri = Some("https://example.com/cb".to_string());
        let credentials = Credentials::from_config(&bullhorn).unwrap();
        let token = exchange_token(&Client::new(), &bullhorn, &credentials, Grant::AuthorizationCode("abc"))
            .await
            .unwrap();

        assert_eq!(token.access_token.as_deref(), Some("access-2"));
    }

    #[tokio::test]
    async fn test_headless_authorize_follows_relative_redirects() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/oauth/authorize"))
            .and(query_param("client_id", "client"))
            .and(query_param("response_type", "code"))
            .and(query_param("action", "Login"))
            .and(query_param("username", "api.user"))
            .and(query_param("password", "p@ss word"))
            .respond_with(ResponseTemplate::new(302).insert_header("Location", "/oauth/consent?step=2"))
            .expect(1)
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/oauth/consent"))
            .respond_with(
                ResponseTemplate::new(307).insert_header("Location", "https://example.com/cb?code=xyz%3D%3D&state=1"),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let bullhorn = config(&mock_server);
        let code = authorize_headless(&no_redirect(), &bullhorn, "client", "api.user", "p@ss word")
            .await
            .unwrap();

        assert_eq!(code, "xyz==");
    }

    #[tokio::test]
    async fn test_missing_location_reports_status() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/oauth/authorize"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>login form</html>"))
            .mount(&mock_server)
            .await;

        let bullhorn = config(&mock_server);
        let err = authorize_headless(&no_redirect(), &bullhorn, "client", "user", "pass")
            .await
            .unwrap_err();

        assert!(matches!(err, UpstreamError::MissingAuthCode { status: Some(200) }));
    }

    #[tokio::test]
    async fn test_redirect_loop_stops_after_max_hops() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/loop"))
            .respond_with(ResponseTemplate::new(302).insert_header("Location", "/loop"))
            .expect(3)
            .mount(&mock_server)
            .await;

        let start: Url = format!("{}/loop", mock_server.uri()).parse().unwrap();
        let err = follow_redirects_for_code(&no_redirect(), start, 3, Duration::from_millis(1))
            .await
            .unwrap_err();

        assert!(matches!(err, UpstreamError::MissingAuthCode { status: None }));
    }

    #[tokio::test]
    async fn test_authorize_rejection_is_upstream_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/oauth/authorize"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({"error": "invalid_client"})))
            .mount(&mock_server)
            .await;

        let bullhorn = config(&mock_server);
        let err = authorize_headless(&no_redirect(), &bullhorn, "client", "user", "pass")
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(400));
        assert_eq!(err.oauth_error().as_deref(), Some("invalid_client"));
    }
}
