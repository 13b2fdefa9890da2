use anyhow::Context;
use clap::Parser;
use resume_sync::{
    Application, Config,
    api::models::events::parse_events,
    bullhorn::SessionManager,
    build_http_client, build_no_redirect_client,
    sync::EventDispatcher,
    telemetry,
};
use std::path::Path;

/// Event replayed by `--replay` when no payload file is given.
const SAMPLE_EVENT: &str = r#"[{"subscriptionType":"object.propertyChange","objectId":100133051,"propertyName":"resume"}]"#;

/// Wait for shutdown signal (SIGTERM or Ctrl+C)
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c().await.expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, shutting down gracefully...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, shutting down gracefully...");
        },
    }
}

async fn check_token(config: &Config) -> anyhow::Result<()> {
    let sessions = SessionManager::new(build_http_client()?, build_no_redirect_client()?, config.bullhorn.clone());
    let token = sessions.exchange_refresh_token().await?;

    let rotated = token
        .refresh_token
        .as_deref()
        .is_some_and(|t| Some(t) != config.bullhorn.refresh_token.as_deref());
    match token.expires_in {
        Some(secs) => println!("Refresh token accepted; access token expires in {secs}s."),
        None => println!("Refresh token accepted."),
    }
    if rotated {
        println!("Bullhorn issued a new refresh token; update BULLHORN_REFRESH_TOKEN.");
    }
    Ok(())
}

async fn replay(config: &Config, file: Option<&Path>) -> anyhow::Result<()> {
    let payload = match file {
        Some(path) => tokio::fs::read(path)
            .await
            .with_context(|| format!("reading {}", path.display()))?,
        None => SAMPLE_EVENT.as_bytes().to_vec(),
    };
    let events = parse_events(&payload).context("Invalid JSON payload")?;

    let hubspot_token = config
        .hubspot
        .access_token
        .as_deref()
        .filter(|t| !t.is_empty())
        .context("Missing HUBSPOT_PRIVATE_APP_TOKEN")?;

    let dispatcher = EventDispatcher::from_config(config, build_http_client()?, build_no_redirect_client()?, hubspot_token);
    let results = dispatcher.process_events(&events).await;
    println!("{}", serde_json::to_string_pretty(&results)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Install rustls crypto provider before anything else that might build a TLS client
    rustls::crypto::aws_lc_rs::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    let args = resume_sync::config::Args::parse();
    let config = Config::load(&args)?;

    if args.validate {
        println!("Configuration is valid.");
        return Ok(());
    }

    telemetry::init_telemetry(config.enable_otel_export)?;
    tracing::debug!("{:?}", args);

    if args.check_token {
        return check_token(&config).await;
    }

    if let Some(file) = &args.replay {
        return replay(&config, file.as_deref()).await;
    }

    Application::new(config)?.serve(shutdown_signal()).await
}
