//! # resume-sync: HubSpot to Bullhorn resume and category sync
//!
//! `resume-sync` receives HubSpot contact property-change webhooks and mirrors two kinds of change
//! onto the matching Bullhorn candidate: a new resume file, and a category classification taken
//! from one of several "expertise" contact properties.
//!
//! ## Request Flow
//!
//! A delivery arrives at `POST /resume-sync` as a JSON array of events (or a single event object),
//! optionally base64 encoded. After the shared secret is checked, the events are processed strictly
//! in order by [`sync::EventDispatcher`]. For each tracked event it:
//!
//! 1. fetches the contact from HubSpot ([`hubspot`])
//! 2. acquires a fresh Bullhorn REST session ([`bullhorn::SessionManager`])
//! 3. finds the candidate whose email matches the contact's
//! 4. applies the category, or downloads the resume from HubSpot's file manager and uploads it to
//!    the candidate's files
//!
//! Every event yields a result record describing what was applied, skipped or failed; the
//! delivery itself only fails on authorization, missing configuration or an undecodable body.
//!
//! ## Modules
//!
//! - [`config`]: figment configuration (YAML file plus environment)
//! - [`api`]: the webhook handler and its request/response models
//! - [`sync`]: per-event orchestration
//! - [`hubspot`], [`bullhorn`]: the two platform clients
//! - [`resume`]: parsing stored file references, naming and typing uploaded files
//! - [`upstream`]: error handling shared by all outbound calls
//! - [`telemetry`]: tracing and optional OTLP export

pub mod api;
pub mod bullhorn;
pub mod config;
pub mod errors;
pub mod hubspot;
pub mod resume;
pub mod sync;
pub mod telemetry;
pub mod upstream;

#[cfg(test)]
mod test_utils;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use reqwest::Client;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

pub use config::Config;

/// Shared state handed to every request.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// Outbound client for every platform call
    pub http: Client,
    /// Outbound client that never follows redirects, for the Bullhorn headless authorize walk
    pub no_redirect: Client,
}

impl AppState {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        Ok(Self {
            config: Arc::new(config),
            http: build_http_client()?,
            no_redirect: build_no_redirect_client()?,
        })
    }
}

pub fn build_http_client() -> anyhow::Result<Client> {
    Ok(Client::builder().user_agent(user_agent()).build()?)
}

pub fn build_no_redirect_client() -> anyhow::Result<Client> {
    Ok(Client::builder()
        .user_agent(user_agent())
        .redirect(reqwest::redirect::Policy::none())
        .build()?)
}

fn user_agent() -> String {
    format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
}

/// Webhook receiver at `/resume-sync` (POST only) plus `/healthz`.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(
            "/resume-sync",
            post(api::handlers::resume_sync::resume_sync).fallback(api::handlers::resume_sync::method_not_allowed),
        )
        .route("/healthz", get(|| async { "OK" }))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// The HTTP server: [`Application::new`] wires up state and routes, [`Application::serve`] binds
/// and runs until the shutdown future resolves.
pub struct Application {
    router: Router,
    config: Arc<Config>,
}

impl Application {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        debug!("Starting resume-sync with configuration: {:#?}", config);
        let state = AppState::new(config)?;
        let config = state.config.clone();
        Ok(Self {
            router: build_router(state),
            config,
        })
    }

    #[cfg(test)]
    pub fn into_test_server(self) -> axum_test::TestServer {
        axum_test::TestServer::new(self.router.into_make_service()).expect("Failed to create test server")
    }

    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!(
            "resume-sync listening on http://{}, webhook at http://localhost:{}/resume-sync",
            bind_addr, self.config.port
        );

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("Server stopped");
        telemetry::shutdown_telemetry();
        Ok(())
    }
}
