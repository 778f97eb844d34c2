//! CLI module for filmsearch.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};

/// filmsearch - Film recommendations from your own catalog
///
/// Indexes a film catalog and answers natural-language requests with
/// recommendations grounded in the films it retrieves.
#[derive(Parser, Debug)]
#[command(name = "filmsearch")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ask for film recommendations
    Ask {
        /// What you are in the mood for
        query: String,

        /// Number of films to retrieve (default from config)
        #[arg(short, long)]
        k: Option<usize>,

        /// LLM model to use for response generation
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Show the films retrieval would hand to the model
    Search {
        /// Search query
        query: String,

        /// Maximum number of results (default from config)
        #[arg(short, long)]
        k: Option<usize>,
    },

    /// Import films from a JSON file
    Index {
        /// JSON array of film records
        file: String,
    },

    /// List indexed films
    List,

    /// Start HTTP API server
    Serve {
        /// Host to bind to (default from config)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to (default from config)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Write the default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ask_with_options() {
        let cli = Cli::parse_from(["filmsearch", "-vv", "ask", "films about pets", "-k", "3"]);
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Ask { query, k, model } => {
                assert_eq!(query, "films about pets");
                assert_eq!(k, Some(3));
                assert!(model.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_config_init() {
        let cli = Cli::parse_from(["filmsearch", "config", "init", "--force"]);
        assert!(matches!(
            cli.command,
            Commands::Config {
                action: ConfigAction::Init { force: true }
            }
        ));
    }
}
