use std::path::PathBuf;

use clap::Parser;

use crate::config::{AcceptedDirection, ReciprocalPolicy};

/// Social graph server for language exchange partners.
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "tandem-server", version, about)]
pub struct CliArgs {
    /// Address to bind
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Database directory; a temporary database is used when omitted
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Header carrying the authenticated user id
    #[arg(long)]
    pub auth_header: Option<String>,

    /// Handling of a request sent back to someone who already requested you
    #[arg(long, value_enum)]
    pub reciprocal_policy: Option<ReciprocalPolicy>,

    /// Which accepted requests show up as notifications
    #[arg(long, value_enum)]
    pub accepted_direction: Option<AcceptedDirection>,

    /// Retries for transactions failing on I/O
    #[arg(long)]
    pub max_tx_retries: Option<u32>,

    /// Log filter, e.g. "info" or "tandem_server=debug"
    #[arg(long)]
    pub log_level: Option<String>,
}

impl CliArgs {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
