use mavtcp_frame::MAX_CHANNELS;
use mavtcp_link::{DEFAULT_IDENTITY, DEFAULT_PORT};

use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("mavtcp {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: mavtcp");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!("target: {}", option_env!("MAVTCP_BUILD_TARGET").unwrap_or("unknown"));
    println!("profile: {}", option_env!("MAVTCP_BUILD_PROFILE").unwrap_or("unknown"));
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!("features: async={}, cli=true", cfg!(feature = "async"));
    println!("default_port: {DEFAULT_PORT}");
    println!("default_identity: {DEFAULT_IDENTITY}");
    println!("channels: {MAX_CHANNELS}");

    Ok(SUCCESS)
}
