use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::TcpListener;
use tokio::signal;
use tokio_util::sync::CancellationToken;

use rs_sqs_dispatch::api::{AppState, create_app};
use rs_sqs_dispatch::client::create_sqs_client;
use rs_sqs_dispatch::config::Settings;
use rs_sqs_dispatch::gateway::SqsGateway;
use rs_sqs_dispatch::processor::SimulatedProcessor;
use rs_sqs_dispatch::receiver::{Dispatcher, PollRegistry};
use rs_sqs_dispatch::telemetry::init_tracing;

/// HTTP bridge to SQS with background poll loops.
#[derive(Parser, Debug)]
#[command(name = "rs-sqs-dispatch", version)]
struct Args {
    /// Shared-credentials profile.
    #[arg(long, env = "AWS_PROFILE")]
    profile: Option<String>,

    /// AWS region.
    #[arg(long, env = "AWS_REGION")]
    region: Option<String>,

    /// Override the SQS endpoint (e.g. LocalStack).
    #[arg(long)]
    endpoint_url: Option<String>,

    /// Port to listen on.
    #[arg(long)]
    port: Option<u16>,

    /// Queues to poll in addition to those in the configuration.
    #[arg(long = "poll", value_name = "QUEUE_NAME")]
    poll_queues: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut settings = Settings::new().context("failed to load configuration")?;
    if let Some(profile) = args.profile {
        settings.aws.profile = profile;
    }
    if let Some(region) = args.region {
        settings.aws.region = region;
    }
    if args.endpoint_url.is_some() {
        settings.aws.endpoint_url = args.endpoint_url;
    }
    if let Some(port) = args.port {
        settings.server.port = port;
    }
    settings.poll.queues.extend(args.poll_queues);

    init_tracing(settings.log.json);
    tracing::info!(profile = %settings.aws.profile, region = %settings.aws.region, "configuration loaded");

    let gateway = Arc::new(SqsGateway::new(create_sqs_client(&settings.aws).await));
    let processor = Arc::new(SimulatedProcessor::new(
        settings.simulated_processing_duration(),
    ));
    let dispatcher = Dispatcher::new(gateway, processor, &settings.worker_config());

    let shutdown = CancellationToken::new();
    let polls = Arc::new(PollRegistry::with_shutdown_token(
        dispatcher.clone(),
        settings.poll_config(),
        shutdown.clone(),
    ));

    for queue_name in &settings.poll.queues {
        if let Err(e) = polls.start(queue_name).await {
            tracing::error!(queue = %queue_name, error = %e, "failed to start polling");
        }
    }

    let app = create_app(AppState {
        dispatcher,
        polls: polls.clone(),
        receive_options: settings.dispatch_receive_options(),
        send_delay: settings.send_delay(),
    });

    let addr = settings.server_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!("Starting server on address {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await?;

    polls.shutdown().await;
    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down"),
        _ = terminate => tracing::info!("Received terminate signal, shutting down"),
        _ = shutdown.cancelled() => {}
    }

    shutdown.cancel();
}
