//! One-shot send/receive against a single queue.
//!
//! ```text
//! sqs-cli send "hello"
//! sqs-cli --queue orders receive 5
//! ```

use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use rs_sqs_dispatch::client::create_sqs_client;
use rs_sqs_dispatch::config::AwsSettings;
use rs_sqs_dispatch::gateway::{QueueGateway, ReceiveOptions, SqsGateway};
use rs_sqs_dispatch::telemetry::init_tracing;

#[derive(Parser, Debug)]
#[command(name = "sqs-cli", version)]
struct Cli {
    /// Queue name.
    #[arg(long, default_value = "queue1")]
    queue: String,

    #[arg(long, env = "AWS_PROFILE", default_value = "default")]
    profile: String,

    #[arg(long, env = "AWS_REGION", default_value = "us-east-1")]
    region: String,

    #[arg(long)]
    endpoint_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Send one message.
    #[command(alias = "sendMessage")]
    Send {
        message: String,

        /// Delay before the message becomes visible, in seconds.
        #[arg(long, default_value_t = 10)]
        delay_secs: u64,
    },

    /// Receive up to COUNT messages and print them. Nothing is deleted.
    #[command(alias = "receiveMessage")]
    Receive {
        #[arg(default_value_t = 1, value_parser = clap::value_parser!(i32).range(1..=10))]
        count: i32,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing(false);
    let cli = Cli::parse();

    let client = create_sqs_client(&AwsSettings {
        profile: cli.profile,
        region: cli.region,
        endpoint_url: cli.endpoint_url,
    })
    .await;
    let gateway = SqsGateway::new(client);
    let address = gateway
        .resolve_address(&cli.queue)
        .await
        .with_context(|| format!("unable to find queue {}", cli.queue))?;

    match cli.command {
        Command::Send {
            message,
            delay_secs,
        } => {
            let receipt = gateway
                .send(&address, &message, Duration::from_secs(delay_secs))
                .await?;
            println!("{}", serde_json::to_string_pretty(&receipt)?);
        }
        Command::Receive { count } => {
            let batch = gateway
                .receive(
                    &address,
                    ReceiveOptions {
                        max_messages: count,
                        ..ReceiveOptions::default()
                    },
                )
                .await?;
            println!("{}", serde_json::to_string_pretty(&batch)?);
        }
    }

    Ok(())
}
