mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;
use mavtcp_frame::Identity;
use mavtcp_link::DEFAULT_IDENTITY;

use crate::cmd::{Command, Session};
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "mavtcp", version, about = "MAVLink over TCP")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "info", global = true)]
    log_level: LogLevel,

    /// System id this link sends as.
    #[arg(long, env = "MAVTCP_SYSTEM_ID", default_value_t = DEFAULT_IDENTITY.system_id, global = true)]
    system_id: u8,

    /// Component id this link sends as.
    #[arg(long, env = "MAVTCP_COMPONENT_ID", default_value_t = DEFAULT_IDENTITY.component_id, global = true)]
    component_id: u8,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let session = Session {
        format: cli.format.unwrap_or_else(OutputFormat::default_for_stdout),
        identity: Identity::new(cli.system_id, cli.component_id),
    };

    match cmd::run(cli.command, session) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}
