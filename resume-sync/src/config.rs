//! Application configuration management.
//!
//! Configuration is loaded from an optional YAML file with environment variable overrides. The
//! file path defaults to `config.yaml` but can be specified via `-f` flag or the
//! `RESUME_SYNC_CONFIG` environment variable.
//!
//! ## Loading Priority
//!
//! Sources are merged in the following order (later sources override earlier ones):
//!
//! 1. **YAML config file** - Base configuration (default: `config.yaml`, may be absent)
//! 2. **Prefixed environment variables** - `RESUME_SYNC_` variables, with `__` separating nested
//!    keys (`RESUME_SYNC_BULLHORN__CLIENT_ID`)
//! 3. **Operator variables** - The bare names used by existing deployments
//!    (`HUBSPOT_PRIVATE_APP_TOKEN`, `BULLHORN_CLIENT_ID`, ...), see [`OPERATOR_ENV`]
//!
//! ## Environment Variable Examples
//!
//! ```bash
//! # Shared secret expected in the `resume-sync-api-key` header
//! RESUME_SYNC_API_KEY=s3cret
//!
//! # Operator credentials
//! HUBSPOT_PRIVATE_APP_TOKEN=pat-na1-...
//! BULLHORN_CLIENT_ID=...
//! BULLHORN_CLIENT_SECRET=...
//! BULLHORN_REFRESH_TOKEN=...
//!
//! # Nested overrides
//! RESUME_SYNC_PORT=8080
//! RESUME_SYNC_BULLHORN__REDIRECT_HOP_DELAY=500ms
//! ```
//!
//! Operator credentials are deliberately optional here: a missing HubSpot token or shared secret
//! is reported on each inbound request, and missing Bullhorn OAuth credentials fail the affected
//! events, so a partially configured deployment still answers health checks.

use clap::Parser;
use std::fmt;
use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};
use url::Url;

use crate::errors::Error;

/// Bare environment variable names and the configuration keys they populate.
pub const OPERATOR_ENV: &[(&str, &str)] = &[
    ("HUBSPOT_PRIVATE_APP_TOKEN", "hubspot.access_token"),
    ("BULLHORN_CLIENT_ID", "bullhorn.client_id"),
    ("BULLHORN_CLIENT_SECRET", "bullhorn.client_secret"),
    ("BULLHORN_REFRESH_TOKEN", "bullhorn.refresh_token"),
    ("BULLHORN_REDIRECT_URI", "bullhorn.redirect_uri"),
    ("BULLHORN_USERNAME", "bullhorn.username"),
    ("BULLHORN_PASSWORD", "bullhorn.password"),
    ("BULLHORN_AUTH_URL", "bullhorn.auth_url"),
    ("BULLHORN_REST_BASE_URL", "bullhorn.rest_base_url"),
    ("BULLHORN_FILE_TYPE", "bullhorn.file_type"),
];

/// Command line arguments.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file
    #[arg(short = 'f', long, env = "RESUME_SYNC_CONFIG", default_value = "config.yaml")]
    pub config: String,

    /// Validate configuration and exit without starting the server.
    #[arg(long)]
    pub validate: bool,

    /// Exchange the configured Bullhorn refresh token once and report the result.
    #[arg(long, conflicts_with = "replay")]
    pub check_token: bool,

    /// Process a webhook payload file (or a sample `resume` event when no file is given)
    /// without starting the server, printing the per-event results.
    #[arg(long, value_name = "FILE")]
    pub replay: Option<Option<PathBuf>>,
}

/// Main application configuration.
///
/// All fields have defaults defined in the `Default` implementation. `Debug` redacts credentials.
#[derive(Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// HTTP server host to bind to
    pub host: String,
    /// HTTP server port to bind to
    pub port: u16,
    /// Shared secret callers must present in the `resume-sync-api-key` header
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Enable OpenTelemetry OTLP export for distributed tracing
    pub enable_otel_export: bool,
    /// Source platform (contacts and stored files)
    pub hubspot: HubSpotConfig,
    /// Destination platform (candidates, categories, candidate files)
    pub bullhorn: BullhornConfig,
    /// Which webhook events are acted on
    pub sync: SyncConfig,
}

#[derive(Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct HubSpotConfig {
    /// Base URL for the CRM and file manager APIs
    pub api_base_url: Url,
    /// Private app token used as a bearer credential
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
}

impl Default for HubSpotConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://api.hubapi.com".parse().expect("valid default URL"),
            access_token: None,
        }
    }
}

/// How a category association is written onto a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CategoryPayload {
    /// `{"categoryID": <id>}` - sets the candidate's primary category
    #[default]
    CategoryId,
    /// `{"categories": {"add": [<id>]}}` - appends to the to-many association
    CategoriesAdd,
}

#[derive(Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct BullhornConfig {
    /// OAuth server; `/oauth` is appended unless already present
    pub auth_url: Url,
    /// Host serving `/rest-services/login`
    pub rest_base_url: Url,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_uri: Option<String>,
    /// Username for the authorization-code fallback when the refresh token is rejected
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// File type label attached to uploaded candidate files
    pub file_type: String,
    /// Shape of the candidate category update
    pub category_payload: CategoryPayload,
    /// Upper bound on redirects followed while waiting for an authorization code
    pub max_redirect_hops: u32,
    /// Pause between redirect hops
    #[serde(with = "humantime_serde")]
    pub redirect_hop_delay: Duration,
}

impl Default for BullhornConfig {
    fn default() -> Self {
        Self {
            auth_url: "https://auth.bullhornstaffing.com".parse().expect("valid default URL"),
            rest_base_url: "https://rest.bullhornstaffing.com".parse().expect("valid default URL"),
            client_id: None,
            client_secret: None,
            refresh_token: None,
            redirect_uri: None,
            username: None,
            password: None,
            file_type: "Talent Resume".to_string(),
            category_payload: CategoryPayload::default(),
            max_redirect_hops: 5,
            redirect_hop_delay: Duration::from_millis(200),
        }
    }
}

impl BullhornConfig {
    /// `{auth_url}/oauth/{leaf}`, without doubling an `/oauth` the configured URL already ends in.
    pub fn oauth_endpoint(&self, leaf: &str) -> Url {
        let mut url = self.auth_url.clone();
        let ends_in_oauth = url
            .path_segments()
            .and_then(|mut segments| segments.rfind(|s| !s.is_empty()))
            == Some("oauth");
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty();
            if !ends_in_oauth {
                path.push("oauth");
            }
            path.push(leaf);
        }
        url
    }

    pub fn login_url(&self) -> Url {
        let mut url = self.rest_base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(["rest-services", "login"]);
        }
        url
    }

    /// Username and password, when both are set.
    pub fn fallback_login(&self) -> Option<(&str, &str)> {
        match (self.username.as_deref(), self.password.as_deref()) {
            (Some(user), Some(pass)) if !user.is_empty() && !pass.is_empty() => Some((user, pass)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct SyncConfig {
    /// Only events of this subscription type are processed
    pub subscription_type: String,
    /// Contact property holding the resume file reference
    pub resume_property: String,
    /// Contact properties naming a category, in priority order
    pub category_fields: Vec<String>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            subscription_type: "object.propertyChange".to_string(),
            resume_property: "resume".to_string(),
            category_fields: ["creative", "content", "marketing", "technical", "strategicoperational", "emerging"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8787,
            api_key: None,
            enable_otel_export: false,
            hubspot: HubSpotConfig::default(),
            bullhorn: BullhornConfig::default(),
            sync: SyncConfig::default(),
        }
    }
}

/// `Some("<redacted>")` for a configured secret, so logs show whether it is set.
fn redacted(secret: &Option<String>) -> Option<&'static str> {
    secret.as_ref().map(|_| "<redacted>")
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("api_key", &redacted(&self.api_key))
            .field("enable_otel_export", &self.enable_otel_export)
            .field("hubspot", &self.hubspot)
            .field("bullhorn", &self.bullhorn)
            .field("sync", &self.sync)
            .finish()
    }
}

impl fmt::Debug for HubSpotConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HubSpotConfig")
            .field("api_base_url", &self.api_base_url.as_str())
            .field("access_token", &redacted(&self.access_token))
            .finish()
    }
}

impl fmt::Debug for BullhornConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BullhornConfig")
            .field("auth_url", &self.auth_url.as_str())
            .field("rest_base_url", &self.rest_base_url.as_str())
            .field("client_id", &self.client_id)
            .field("client_secret", &redacted(&self.client_secret))
            .field("refresh_token", &redacted(&self.refresh_token))
            .field("redirect_uri", &self.redirect_uri)
            .field("username", &self.username)
            .field("password", &redacted(&self.password))
            .field("file_type", &self.file_type)
            .field("category_payload", &self.category_payload)
            .field("max_redirect_hops", &self.max_redirect_hops)
            .field("redirect_hop_delay", &self.redirect_hop_delay)
            .finish()
    }
}

impl Config {
    #[allow(clippy::result_large_err)]
    pub fn load(args: &Args) -> Result<Self, figment::Error> {
        let config: Self = Self::figment(args).extract()?;
        config.validate().map_err(|e| figment::Error::from(e.to_string()))?;
        Ok(config)
    }

    /// Validate the configuration for consistency
    pub fn validate(&self) -> Result<(), Error> {
        let sync = &self.sync;
        if sync.resume_property.trim().is_empty() {
            return Err(Error::Configuration {
                message: "Config validation: sync.resume_property cannot be empty".to_string(),
            });
        }

        if sync.category_fields.is_empty() {
            return Err(Error::Configuration {
                message: "Config validation: sync.category_fields must name at least one contact property".to_string(),
            });
        }

        if let Some(field) = sync.category_fields.iter().find(|f| f.trim().is_empty()) {
            return Err(Error::Configuration {
                message: format!("Config validation: sync.category_fields contains a blank entry ({field:?})"),
            });
        }

        if sync.category_fields.contains(&sync.resume_property) {
            return Err(Error::Configuration {
                message: format!(
                    "Config validation: '{}' cannot be both the resume property and a category field",
                    sync.resume_property
                ),
            });
        }

        if self.bullhorn.max_redirect_hops == 0 {
            return Err(Error::Configuration {
                message: "Config validation: bullhorn.max_redirect_hops must be at least 1".to_string(),
            });
        }

        if self.bullhorn.file_type.trim().is_empty() {
            return Err(Error::Configuration {
                message: "Config validation: bullhorn.file_type cannot be empty".to_string(),
            });
        }

        Ok(())
    }

    pub fn figment(args: &Args) -> Figment {
        let mut figment = Figment::new()
            .merge(Yaml::file(&args.config))
            .merge(Env::prefixed("RESUME_SYNC_").ignore(&["CONFIG"]).split("__"));

        for &(name, key) in OPERATOR_ENV {
            figment = figment.merge(Env::raw().only(&[name]).map(move |_| key.into()));
        }

        figment
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
