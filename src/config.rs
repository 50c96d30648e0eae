//! Application settings.
//!
//! Layered, lowest precedence first: built-in defaults, `config/default.*`,
//! `config/{RUN_MODE}.*`, then `SQS_DISPATCH__SECTION__KEY` environment
//! variables (a `.env` file is loaded first if present). For example
//! `SQS_DISPATCH__POLL__QUEUES=orders,invoices`.

use std::env;
use std::ops::RangeInclusive;
use std::time::Duration;

use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;

use crate::gateway::ReceiveOptions;
use crate::receiver::backoff::BackoffConfig;
use crate::receiver::{PollConfig, ReceiveFailurePolicy, WorkerConfig};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub aws: AwsSettings,
    pub poll: PollSettings,
    pub dispatch: DispatchSettings,
    pub worker: WorkerSettings,
    pub processor: ProcessorSettings,
    pub log: LogSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        ServerSettings {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AwsSettings {
    /// Shared-credentials profile name.
    pub profile: String,
    pub region: String,
    /// Overrides the service endpoint, e.g. for a local emulator.
    pub endpoint_url: Option<String>,
}

impl Default for AwsSettings {
    fn default() -> Self {
        AwsSettings {
            profile: "default".to_string(),
            region: "us-east-1".to_string(),
            endpoint_url: None,
        }
    }
}

/// Messages a single receive call may ask the queue service for.
pub const RECEIVE_BATCH_SIZE: RangeInclusive<i32> = 1..=10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicyKind {
    Stop,
    Retry,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PollSettings {
    /// Queue names polled from startup.
    pub queues: Vec<String>,
    pub batch_size: i32,
    pub visibility_timeout_secs: u64,
    pub wait_time_secs: u64,
    pub empty_backoff_secs: u64,
    pub inter_batch_delay_secs: u64,
    pub on_receive_error: FailurePolicyKind,
    pub max_consecutive_failures: u32,
    pub retry_initial_delay_ms: u64,
    pub retry_max_delay_ms: u64,
}

impl Default for PollSettings {
    fn default() -> Self {
        PollSettings {
            queues: Vec::new(),
            batch_size: 10,
            visibility_timeout_secs: 60,
            wait_time_secs: 0,
            empty_backoff_secs: 60,
            inter_batch_delay_secs: 30,
            on_receive_error: FailurePolicyKind::Retry,
            max_consecutive_failures: 5,
            retry_initial_delay_ms: 1_000,
            retry_max_delay_ms: 60_000,
        }
    }
}

/// Settings for the request-triggered send and receive paths.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DispatchSettings {
    pub receive_batch_size: i32,
    pub visibility_timeout_secs: u64,
    pub send_delay_secs: u64,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        DispatchSettings {
            receive_batch_size: 10,
            visibility_timeout_secs: 60,
            send_delay_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WorkerSettings {
    /// 0 disables the limit.
    pub max_in_flight: usize,
    pub processing_timeout_secs: Option<u64>,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        WorkerSettings {
            max_in_flight: 64,
            processing_timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProcessorSettings {
    pub simulated_duration_secs: u64,
}

impl Default for ProcessorSettings {
    fn default() -> Self {
        ProcessorSettings {
            simulated_duration_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    pub json: bool,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(
                Environment::with_prefix("SQS_DISPATCH")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("poll.queues"),
            )
            .build()?
            .try_deserialize::<Settings>()?
            .validated()
    }

    /// Parses settings from a TOML document, on top of the defaults.
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?
            .try_deserialize::<Settings>()?
            .validated()
    }

    fn validated(self) -> Result<Self, ConfigError> {
        check_batch_size("poll.batch_size", self.poll.batch_size)?;
        check_batch_size("dispatch.receive_batch_size", self.dispatch.receive_batch_size)?;
        Ok(self)
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn poll_config(&self) -> PollConfig {
        let poll = &self.poll;
        let failure_policy = match poll.on_receive_error {
            FailurePolicyKind::Stop => ReceiveFailurePolicy::Stop,
            FailurePolicyKind::Retry => ReceiveFailurePolicy::Retry {
                backoff: BackoffConfig {
                    initial_delay: Duration::from_millis(poll.retry_initial_delay_ms),
                    max_delay: Duration::from_millis(poll.retry_max_delay_ms),
                    multiplier: 2.0,
                },
                max_consecutive_failures: poll.max_consecutive_failures,
            },
        };

        PollConfig {
            receive: ReceiveOptions {
                max_messages: poll.batch_size,
                visibility_timeout: Duration::from_secs(poll.visibility_timeout_secs),
                wait_time: Duration::from_secs(poll.wait_time_secs),
            },
            empty_backoff: Duration::from_secs(poll.empty_backoff_secs),
            inter_batch_delay: Duration::from_secs(poll.inter_batch_delay_secs),
            failure_policy,
        }
    }

    pub fn worker_config(&self) -> WorkerConfig {
        WorkerConfig {
            max_in_flight: Some(self.worker.max_in_flight).filter(|limit| *limit > 0),
            processing_timeout: self.worker.processing_timeout_secs.map(Duration::from_secs),
        }
    }

    /// Receive options for the on-demand `GET /message` path.
    pub fn dispatch_receive_options(&self) -> ReceiveOptions {
        ReceiveOptions {
            max_messages: self.dispatch.receive_batch_size,
            visibility_timeout: Duration::from_secs(self.dispatch.visibility_timeout_secs),
            wait_time: Duration::ZERO,
        }
    }

    pub fn send_delay(&self) -> Duration {
        Duration::from_secs(self.dispatch.send_delay_secs)
    }

    pub fn simulated_processing_duration(&self) -> Duration {
        Duration::from_secs(self.processor.simulated_duration_secs)
    }
}

fn check_batch_size(key: &str, value: i32) -> Result<(), ConfigError> {
    if RECEIVE_BATCH_SIZE.contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::Message(format!(
            "{key} must be between {} and {}, got {value}",
            RECEIVE_BATCH_SIZE.start(),
            RECEIVE_BATCH_SIZE.end()
        )))
    }
}
