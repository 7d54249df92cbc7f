/*
 *  Copyright 2025 Colliery Software
 *
 *  Licensed under the Apache License, Version 2.0 (the "License");
 *  you may not use this file except in compliance with the License.
 *  You may obtain a copy of the License at
 *
 *      http://www.apache.org/licenses/LICENSE-2.0
 *
 *  Unless required by applicable law or agreed to in writing, software
 *  distributed under the License is distributed on an "AS IS" BASIS,
 *  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 *  See the License for the specific language governing permissions and
 *  limitations under the License.
 */

//! cantus-server binary: configuration, logging, worker bootstrap, and the
//! HTTP listener with graceful shutdown.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use cantus::gateway::SubmissionGateway;
use cantus::queue::{ProcessQueue, UploadQueue};
use cantus::webhook::CallbackClient;
use cantus::worker::{ProcessWorker, ShutdownHandle, UploadWorker};

use cantus_server::api::{build_router, AppState};
use cantus_server::config::CantusConfig;
use cantus_server::engine::CommandSynthesizer;
use cantus_server::object_store::FsArtifactStore;

#[derive(Parser, Debug)]
#[command(name = "cantus-server", about = "Voice synthesis pipeline server")]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long, env = "CANTUS_CONFIG")]
    config: Option<PathBuf>,

    /// Override the configured bind address (host:port).
    #[arg(long)]
    bind: Option<String>,

    /// Log at debug level regardless of configuration.
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = CantusConfig::load(cli.config.as_deref())?;

    let _log_guard = init_logging(&config, cli.verbose)?;
    info!("Starting cantus-server");

    for dir in [
        &config.engine.output_dir,
        &config.engine.temp_dir,
        &config.storage.public_dir,
    ] {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create directory {}", dir.display()))?;
    }

    let metrics_handle = PrometheusBuilder::new()
        .install_recorder()
        .context("Failed to install metrics recorder")?;

    // Shared pipeline state.
    let process_queue = Arc::new(ProcessQueue::in_memory());
    let upload_queue = Arc::new(UploadQueue::in_memory());
    let gateway = Arc::new(SubmissionGateway::new(
        process_queue.clone(),
        config.engine.supported_languages.clone(),
    ));
    let callbacks = Arc::new(
        CallbackClient::new(config.retry_policy())
            .map_err(|e| anyhow::anyhow!("Failed to build callback client: {e}"))?,
    );

    let http = reqwest::Client::new();
    let synthesizer = Arc::new(CommandSynthesizer::new(&config.engine, http));
    let artifact_store = Arc::new(FsArtifactStore::new(&config.storage));

    let shutdown = ShutdownHandle::new();
    let worker_config = config.worker_config();

    let process_worker = ProcessWorker::new(
        process_queue.clone(),
        upload_queue.clone(),
        synthesizer,
        callbacks.clone(),
        worker_config.clone(),
        shutdown.clone(),
    );
    let upload_worker = UploadWorker::new(
        upload_queue.clone(),
        artifact_store,
        callbacks,
        worker_config,
        shutdown.clone(),
    );

    let process_handle = tokio::spawn(async move { process_worker.run().await });
    let upload_handle = tokio::spawn(async move { upload_worker.run().await });

    let state = AppState {
        gateway,
        process_queue,
        upload_queue,
        metrics: Some(metrics_handle),
    };
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .layer(RequestBodyLimitLayer::new(config.server.max_body_bytes));

    let bind = cli
        .bind
        .unwrap_or_else(|| format!("{}:{}", config.server.bind_address, config.server.port));
    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("Failed to bind {bind}"))?;
    info!("Listening on {}", bind);

    let signal_shutdown = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            info!("Received shutdown signal, finishing current tasks");
            signal_shutdown.shutdown();
        })
        .await
        .context("Server error")?;

    // Workers observe the flag on their next iteration and drain in-flight
    // work before returning.
    let _ = process_handle.await;
    let _ = upload_handle.await;
    info!("cantus-server stopped gracefully");

    Ok(())
}

/// Console logging, plus daily-rotated files when a log directory is
/// configured. Returns the appender guard so buffered lines flush on exit.
fn init_logging(
    config: &CantusConfig,
    verbose: bool,
) -> anyhow::Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let level = if verbose {
        "debug".to_string()
    } else {
        config.logging.level.clone()
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let registry = tracing_subscriber::registry().with(filter);

    match &config.logging.dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
            let appender = tracing_appender::rolling::daily(dir, "cantus-server.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);

            let file_layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false);
            if config.logging.json {
                registry
                    .with(tracing_subscriber::fmt::layer())
                    .with(file_layer.json())
                    .init();
            } else {
                registry
                    .with(tracing_subscriber::fmt::layer())
                    .with(file_layer)
                    .init();
            }
            Ok(Some(guard))
        }
        None => {
            if config.logging.json {
                registry.with(tracing_subscriber::fmt::layer().json()).init();
            } else {
                registry.with(tracing_subscriber::fmt::layer()).init();
            }
            Ok(None)
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(_) => std::future::pending().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
