//! `electrotheme run`: keep the configured surfaces in sync until stopped.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use electrotheme_client::agent::StyleAgent;
use electrotheme_client::header_filter::apply_security_policy_option;
use electrotheme_client::style::{FileSurface, InMemoryRegistry};
use electrotheme_client::ws::WsTransport;

use crate::config::AgentConfig;

/// Run the agent until Ctrl-C or SIGTERM.
///
/// # Errors
///
/// Returns error if the session cannot be started.
pub async fn run(config: AgentConfig) -> Result<()> {
    let registry = Arc::new(InMemoryRegistry::new());
    for surface in &config.surfaces {
        let surface = FileSurface::from(surface);
        info!(path = %surface.path().display(), "Registered surface");
        registry.register(Arc::new(surface));
    }
    if registry.is_empty() {
        warn!("No surfaces configured, style updates will only be logged");
    }

    // The CLI host has no response pipeline to filter.
    apply_security_policy_option(&config.client, None);

    let transport = Arc::new(WsTransport::new(config.client.connect_timeout()));
    let agent = StyleAgent::new(&config.client, transport, registry);

    info!(
        endpoint = %config.client.endpoint,
        identity = %config.client.identity,
        "Starting style agent"
    );

    agent
        .run(shutdown_signal())
        .await
        .context("Style agent failed")?;

    Ok(())
}

/// Resolves on Ctrl-C or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
