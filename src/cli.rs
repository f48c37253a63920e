//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::playback::Speed;

/// Top-level CLI parser for `fiberscope`.
#[derive(Debug, Parser)]
#[command(
    name = "fiberscope",
    version,
    about = "Record, scrub and diff React component state snapshots"
)]
pub struct Cli {
    /// Log at debug level unless FIBERSCOPE_LOG or RUST_LOG is set.
    #[arg(short, long, global = true)]
    pub verbose: bool,
    /// The command to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Supported top-level subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the WebSocket relay between the app and viewers.
    Relay {
        /// Interface to bind [env: FIBERSCOPE_HOST, default: 127.0.0.1].
        #[arg(long)]
        host: Option<String>,
        /// Port to bind [env: FIBERSCOPE_PORT, default: 8080].
        #[arg(long)]
        port: Option<u16>,
        /// Do not echo frames back to a client that is alone on the relay.
        #[arg(long)]
        no_echo: bool,
    },
    /// Connect to a relay and print each snapshot as it arrives.
    Watch {
        /// Relay URL [env: FIBERSCOPE_URL, default: ws://127.0.0.1:8080].
        #[arg(long)]
        url: Option<String>,
        /// Save the received snapshots to a session file.
        #[arg(long, value_name = "FILE")]
        record: Option<PathBuf>,
    },
    /// Inspect a recorded session.
    Inspect {
        /// Session file written by `watch --record`.
        path: PathBuf,
        /// Show the snapshot at this index instead of the last one.
        #[arg(long, allow_negative_numbers = true)]
        at: Option<i64>,
        /// Play the session back frame by frame.
        #[arg(long)]
        play: bool,
        /// Playback speed [env: FIBERSCOPE_SPEED, default: normal].
        #[arg(long, value_enum)]
        speed: Option<Speed>,
    },
}

#[cfg(test)]
mod tests {
    use super::{Cli, Command};
    use crate::playback::Speed;
    use clap::Parser;

    #[test]
    fn parses_relay_flags() {
        let cli = Cli::parse_from(["fiberscope", "relay", "--port", "9000", "--no-echo"]);
        assert!(matches!(
            cli.command,
            Command::Relay {
                host: None,
                port: Some(9000),
                no_echo: true
            }
        ));
    }

    #[test]
    fn parses_watch_with_record() {
        let cli = Cli::parse_from(["fiberscope", "-v", "watch", "--record", "out.yaml"]);
        assert!(cli.verbose);
        let Command::Watch { url, record } = cli.command else {
            panic!("expected watch")
        };
        assert!(url.is_none());
        assert_eq!(record.unwrap().to_str(), Some("out.yaml"));
    }

    #[test]
    fn parses_inspect_options() {
        let cli = Cli::parse_from([
            "fiberscope",
            "inspect",
            "s.yaml",
            "--at",
            "-1",
            "--play",
            "--speed",
            "fast",
        ]);
        let Command::Inspect {
            at, play, speed, ..
        } = cli.command
        else {
            panic!("expected inspect")
        };
        assert_eq!(at, Some(-1));
        assert!(play);
        assert_eq!(speed, Some(Speed::Fast));
    }

    #[test]
    fn rejects_unknown_speed() {
        let args = ["fiberscope", "inspect", "s.yaml", "--speed", "warp"];
        assert!(Cli::try_parse_from(args).is_err());
    }
}
