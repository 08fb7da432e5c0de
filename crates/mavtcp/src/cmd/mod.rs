use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Subcommand};
use mavtcp_frame::Identity;
use mavtcp_link::{ConnectionUrl, LinkConfig, ServerConfig};

use crate::exit::{link_error, CliError, CliResult, INTERNAL};
use crate::output::OutputFormat;

pub mod echo;
pub mod listen;
pub mod send;
pub mod version;

/// How long event loops wait before re-checking the Ctrl-C flag.
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Rebroadcast every received frame.
    Echo(EchoArgs),
    /// Send frames to a server.
    Send(SendArgs),
    /// Print received frames.
    Listen(ListenArgs),
    /// Show version information.
    Version(VersionArgs),
}

/// Settings shared by every subcommand.
#[derive(Debug, Clone, Copy)]
pub struct Session {
    pub format: OutputFormat,
    pub identity: Identity,
}

impl Session {
    pub fn link_config(&self) -> LinkConfig {
        LinkConfig::default().with_identity(self.identity)
    }

    pub fn server_config(&self) -> ServerConfig {
        ServerConfig::default().with_link(self.link_config())
    }
}

pub fn run(command: Command, session: Session) -> CliResult<i32> {
    match command {
        Command::Echo(args) => echo::run(args, session),
        Command::Send(args) => send::run(args, session),
        Command::Listen(args) => listen::run(args, session),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct EchoArgs {
    /// Link URL (`tcp://host:port` or `tcp-l://host:port`).
    pub url: String,
    /// Exit after echoing N frames.
    #[arg(long)]
    pub count: Option<usize>,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Server URL (`tcp://host:port`).
    pub url: String,
    /// Message id to send. Default: HEARTBEAT.
    #[arg(long, default_value = "0")]
    pub msgid: u32,
    /// Payload as hex (e.g. "0102ff").
    #[arg(long, conflicts_with = "data")]
    pub hex: Option<String>,
    /// Payload as a raw string.
    #[arg(long, conflicts_with = "hex")]
    pub data: Option<String>,
    /// Send MAVLink v2 frames instead of v1.
    #[arg(long)]
    pub v2: bool,
    /// Number of frames to send.
    #[arg(long, default_value = "1")]
    pub repeat: usize,
    /// Maximum time to wait for the frames to be written (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub timeout: String,
}

#[derive(Args, Debug)]
pub struct ListenArgs {
    /// Link URL (`tcp://host:port` or `tcp-l://host:port`).
    pub url: String,
    /// Only print these message ids (comma-separated).
    #[arg(long, value_delimiter = ',')]
    pub msgid: Option<Vec<u32>>,
    /// Exit after printing N frames.
    #[arg(long)]
    pub count: Option<usize>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

pub fn parse_url(url: &str) -> CliResult<ConnectionUrl> {
    url.parse().map_err(|err| link_error("invalid url", err))
}

pub fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
