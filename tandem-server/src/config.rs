//! Server configuration

use std::env;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tandem_common::{FriendRequest, RequestStatus, UserId};

use crate::cli::CliArgs;

/// What happens when B sends a request to A while A's request to B exists.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ReciprocalPolicy {
    /// Fail with `DuplicateRequest`.
    #[default]
    Reject,
    /// Accept the pending request from the other side.
    AutoAccept,
}

/// Which accepted requests are reported back to the viewer as notifications.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum AcceptedDirection {
    /// Requests the viewer sent that the other side accepted.
    #[default]
    SentByViewer,
    /// Requests the viewer received and accepted.
    ReceivedByViewer,
}

impl AcceptedDirection {
    pub fn matches(&self, request: &FriendRequest, viewer: &UserId) -> bool {
        request.status == RequestStatus::Accepted
            && match self {
                AcceptedDirection::SentByViewer => &request.sender == viewer,
                AcceptedDirection::ReceivedByViewer => &request.recipient == viewer,
            }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SocialPolicy {
    pub reciprocal: ReciprocalPolicy,
    pub accepted_direction: AcceptedDirection,
    /// Retries for transactions failing with an I/O error.
    pub max_tx_retries: u32,
}

impl Default for SocialPolicy {
    fn default() -> Self {
        Self {
            reciprocal: ReciprocalPolicy::default(),
            accepted_direction: AcceptedDirection::default(),
            max_tx_retries: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,

    /// Database directory. A temporary database is used when unset.
    pub data_dir: Option<PathBuf>,

    /// Header carrying the authenticated user id, set by the upstream auth gateway.
    pub auth_header: String,

    pub policy: SocialPolicy,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            data_dir: None,
            auth_header: "x-authenticated-user".to_string(),
            policy: SocialPolicy::default(),
        }
    }
}

fn parse_enum<T: ValueEnum>(name: &str, value: &str) -> Result<T> {
    T::from_str(value, true).map_err(|err| anyhow!("invalid {name} '{value}': {err}"))
}

impl ServerConfig {
    /// Load configuration from CLI arguments and environment variables.
    /// CLI arguments take precedence over environment variables.
    pub fn from_cli_and_env(cli_args: CliArgs) -> Result<Self> {
        let mut config = Self::default();

        if let Some(host) = cli_args.host {
            config.host = host;
        } else if let Ok(host) = env::var("TANDEM_HOST") {
            config.host = host;
        }

        if let Some(port) = cli_args.port {
            config.port = port;
        } else if let Ok(port) = env::var("TANDEM_PORT") {
            config.port = port.parse().context("invalid TANDEM_PORT")?;
        }

        if let Some(dir) = cli_args.data_dir {
            config.data_dir = Some(dir);
        } else if let Ok(dir) = env::var("TANDEM_DATA_DIR") {
            config.data_dir = Some(PathBuf::from(dir));
        }

        if let Some(header) = cli_args.auth_header {
            config.auth_header = header;
        } else if let Ok(header) = env::var("TANDEM_AUTH_HEADER") {
            config.auth_header = header;
        }
        config.auth_header = config.auth_header.to_ascii_lowercase();

        if let Some(policy) = cli_args.reciprocal_policy {
            config.policy.reciprocal = policy;
        } else if let Ok(policy) = env::var("TANDEM_RECIPROCAL_POLICY") {
            config.policy.reciprocal = parse_enum("TANDEM_RECIPROCAL_POLICY", &policy)?;
        }

        if let Some(direction) = cli_args.accepted_direction {
            config.policy.accepted_direction = direction;
        } else if let Ok(direction) = env::var("TANDEM_ACCEPTED_DIRECTION") {
            config.policy.accepted_direction =
                parse_enum("TANDEM_ACCEPTED_DIRECTION", &direction)?;
        }

        if let Some(retries) = cli_args.max_tx_retries {
            config.policy.max_tx_retries = retries;
        } else if let Ok(retries) = env::var("TANDEM_TX_RETRIES") {
            config.policy.max_tx_retries = retries.parse().context("invalid TANDEM_TX_RETRIES")?;
        }

        Ok(config)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
