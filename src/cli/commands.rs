//! CLI command definitions using clap.
//!
//! Subcommands either decode a raw product file directly or talk to a
//! running daemon, depending on whether the path names a file or a
//! socket:
//! - daemon: start/stop a daemon serving one decoded volume
//! - data / corrected: print one sweep of one data type
//! - ray-headers / sweep-headers / volume-headers: print headers
//! - exit: ask a daemon to shut down

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// sigmet_raw - read Sigmet/IRIS raw product volumes
#[derive(Parser, Debug)]
#[command(name = "sigmet_raw")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Main subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Daemon management commands
    Daemon {
        #[command(subcommand)]
        command: DaemonCommands,
    },

    /// Print one sweep of one data type
    Data {
        /// Write raw float32 instead of text
        #[arg(short = 'b')]
        binary: bool,

        /// Data type abbreviation, e.g. DB_DBZ
        data_type: String,

        /// Sweep index
        sweep: u32,

        /// Raw product file or daemon socket
        path: PathBuf,
    },

    /// Print one sweep of one data type with corrections applied
    Corrected {
        /// Write raw float32 instead of text
        #[arg(short = 'b')]
        binary: bool,

        /// Data type abbreviation, e.g. DB_DBZ
        data_type: String,

        /// Sweep index
        sweep: u32,

        /// Raw product file or daemon socket
        path: PathBuf,
    },

    /// Print ray headers for one sweep or "all"
    RayHeaders {
        /// Sweep index or "all"
        sweep: String,

        /// Data type abbreviation; defaults to the volume's first type
        data_type: Option<String>,

        /// Raw product file or daemon socket
        path: PathBuf,
    },

    /// Print sweep headers
    SweepHeaders {
        /// Raw product file or daemon socket
        path: PathBuf,
    },

    /// Print volume headers
    VolumeHeaders {
        /// Raw product file or daemon socket
        path: PathBuf,
    },

    /// Ask the daemon at the socket to exit
    Exit {
        /// Daemon socket
        path: PathBuf,
    },
}

/// Daemon management subcommands
#[derive(Subcommand, Debug)]
pub enum DaemonCommands {
    /// Decode a volume and serve it on a socket (foreground)
    Start {
        /// Socket path to create
        socket: PathBuf,

        /// Raw product file to decode
        volume: PathBuf,
    },

    /// Stop the daemon serving the given socket
    Stop {
        /// Socket path of the running daemon
        socket: PathBuf,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_data_command() {
        let cli = Cli::try_parse_from(["sigmet_raw", "data", "DB_DBZ", "0", "vol.raw"]).unwrap();
        match cli.command {
            Commands::Data {
                binary,
                data_type,
                sweep,
                path,
            } => {
                assert!(!binary);
                assert_eq!(data_type, "DB_DBZ");
                assert_eq!(sweep, 0);
                assert_eq!(path, PathBuf::from("vol.raw"));
            }
            _ => panic!("expected data command"),
        }
    }

    #[test]
    fn test_data_binary_flag() {
        let cli = Cli::try_parse_from(["sigmet_raw", "data", "-b", "DB_VEL", "2", "vol.raw"]).unwrap();
        match cli.command {
            Commands::Data { binary, sweep, .. } => {
                assert!(binary);
                assert_eq!(sweep, 2);
            }
            _ => panic!("expected data command"),
        }
    }

    #[test]
    fn test_ray_headers_all_without_type() {
        let cli = Cli::try_parse_from(["sigmet_raw", "ray-headers", "all", "vol.raw"]).unwrap();
        match cli.command {
            Commands::RayHeaders {
                sweep,
                data_type,
                path,
            } => {
                assert_eq!(sweep, "all");
                assert!(data_type.is_none());
                assert_eq!(path, PathBuf::from("vol.raw"));
            }
            _ => panic!("expected ray-headers command"),
        }
    }

    #[test]
    fn test_ray_headers_with_type() {
        let cli =
            Cli::try_parse_from(["sigmet_raw", "ray-headers", "1", "DB_DBZ", "/tmp/s.sock"]).unwrap();
        match cli.command {
            Commands::RayHeaders {
                sweep, data_type, ..
            } => {
                assert_eq!(sweep, "1");
                assert_eq!(data_type.as_deref(), Some("DB_DBZ"));
            }
            _ => panic!("expected ray-headers command"),
        }
    }

    #[test]
    fn test_daemon_start() {
        let cli =
            Cli::try_parse_from(["sigmet_raw", "daemon", "start", "/tmp/s.sock", "vol.raw"]).unwrap();
        match cli.command {
            Commands::Daemon {
                command: DaemonCommands::Start { socket, volume },
            } => {
                assert_eq!(socket, PathBuf::from("/tmp/s.sock"));
                assert_eq!(volume, PathBuf::from("vol.raw"));
            }
            _ => panic!("expected daemon start command"),
        }
    }

    #[test]
    fn test_daemon_stop() {
        let cli = Cli::try_parse_from(["sigmet_raw", "daemon", "stop", "/tmp/s.sock"]).unwrap();
        match cli.command {
            Commands::Daemon {
                command: DaemonCommands::Stop { socket },
            } => {
                assert_eq!(socket, PathBuf::from("/tmp/s.sock"));
            }
            _ => panic!("expected daemon stop command"),
        }
    }

    #[test]
    fn test_exit_command() {
        let cli = Cli::try_parse_from(["sigmet_raw", "exit", "/tmp/s.sock"]).unwrap();
        assert!(matches!(cli.command, Commands::Exit { .. }));
    }

    #[test]
    fn test_missing_subcommand_fails() {
        assert!(Cli::try_parse_from(["sigmet_raw"]).is_err());
    }

    #[test]
    fn test_help_works() {
        Cli::command().debug_assert();
    }
}
