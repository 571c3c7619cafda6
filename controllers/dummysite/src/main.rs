//! DummySite Controller
//!
//! Watches `DummySite` custom resources and, for each one, mirrors the HTML
//! at `spec.website_url` into the cluster: a ConfigMap holding the page, an
//! nginx Deployment serving it, and a ClusterIP Service in front. The
//! in-cluster address is reported on `status.url`.

mod controller;
mod ensure;
mod error;
mod reconciler;
mod resources;
mod shutdown;
mod status;
#[cfg(test)]
mod test_utils;
mod watcher;

use anyhow::Context;
use clap::Parser;
use controller::Controller;
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "dummysite-controller", version, about)]
struct Args {
    /// Path to a kubeconfig file (uses in-cluster config when not set)
    #[arg(long)]
    kubeconfig: Option<PathBuf>,

    /// Namespace to watch (watches all namespaces when not set)
    #[arg(long)]
    namespace: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    info!("Starting DummySite controller");
    info!(
        "  Namespace: {}",
        args.namespace.as_deref().unwrap_or("all namespaces")
    );

    let client = build_client(args.kubeconfig.as_deref()).await?;

    let (trigger, shutdown_rx) = shutdown::channel();
    tokio::spawn(async move {
        wait_for_signal().await;
        info!("Shutdown signal received, stopping controller");
        trigger.trigger();
    });

    let controller = Controller::new(client, args.namespace, shutdown_rx)
        .await
        .context("failed to create controller")?;
    controller.run().await.context("controller error")?;

    Ok(())
}

async fn build_client(kubeconfig: Option<&Path>) -> anyhow::Result<Client> {
    let client = match kubeconfig {
        Some(path) => {
            let kubeconfig = Kubeconfig::read_from(path)
                .with_context(|| format!("failed to read kubeconfig at {}", path.display()))?;
            let config =
                Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
                    .await
                    .context("failed to build config from kubeconfig")?;
            Client::try_from(config)?
        }
        None => Client::try_default()
            .await
            .context("failed to get in-cluster config")?,
    };
    Ok(client)
}

/// Resolves on SIGINT or SIGTERM.
async fn wait_for_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                let _ = ctrl_c.await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = ctrl_c.await;
    }
}
