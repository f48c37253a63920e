//! Core library for the `fiberscope` CLI.
//!
//! Snapshots of React component state arrive over a WebSocket relay, are
//! appended to a [`timeline::TimelineStore`], and can be scrubbed, played
//! back and diffed against their predecessor.

pub mod adapters;
pub mod cli;
pub mod commands;
pub mod config;
pub mod context;
pub mod diff;
pub mod logging;
pub mod metrics;
pub mod normalize;
pub mod playback;
pub mod ports;
pub mod relay;
pub mod session;
pub mod snapshot;
pub mod timeline;

use clap::error::ErrorKind;
use clap::Parser;

/// Run the CLI with the provided arguments.
///
/// # Errors
///
/// Returns an error string when argument parsing fails or command execution fails.
pub fn run<I, T>(args: I) -> Result<(), String>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let cli = match cli::Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            print!("{err}");
            return Ok(());
        }
        Err(err) => return Err(err.to_string()),
    };
    config::load_dotenv();
    logging::init(cli.verbose);
    commands::dispatch(&cli.command)
}
