//! CLI module for docqa.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};

/// docqa - question answering over a folder of text documents
///
/// Index `.txt` files into a local vector store, then ask questions answered
/// by a language model from the most relevant passages.
#[derive(Parser, Debug)]
#[command(name = "docqa")]
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
    /// Chunk, embed, and index every document in the input directory
    Index {
        /// Drop the collection before indexing
        #[arg(long)]
        reset: bool,

        /// Input directory (overrides ingest.input_dir)
        #[arg(short, long)]
        input: Option<String>,

        /// Collection to index into (overrides vector_store.collection)
        #[arg(long)]
        collection: Option<String>,
    },

    /// Ask a question about the indexed documents
    Ask {
        /// The question to ask
        question: String,

        /// Prompt template to answer with
        #[arg(short, long)]
        template: Option<String>,

        /// Show the passages the answer was based on
        #[arg(long)]
        sources: bool,
    },

    /// Search for relevant passages without generating an answer
    Search {
        /// Search query
        query: String,

        /// Maximum number of results
        #[arg(short, long, default_value = "5")]
        limit: usize,
    },

    /// Transcribe a recorded question and answer it
    Listen {
        /// Audio file with the spoken question
        audio: String,

        /// Prompt template to answer with
        #[arg(short, long)]
        template: Option<String>,
    },

    /// Start the HTTP API server
    Serve {
        /// Host to bind to (overrides server.host)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to (overrides server.port)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// List available prompt templates
    Templates,

    /// List indexed collections
    Collections,

    /// Check configuration and model endpoint
    Doctor,

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

    /// Open configuration file in editor
    Edit,

    /// Show configuration file path
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_ask() {
        let cli = Cli::parse_from(["docqa", "-vv", "ask", "Where is the Eiffel Tower?", "-t", "friendly"]);
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Ask { question, template, sources } => {
                assert_eq!(question, "Where is the Eiffel Tower?");
                assert_eq!(template.as_deref(), Some("friendly"));
                assert!(!sources);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_index_reset() {
        let cli = Cli::parse_from(["docqa", "index", "--reset", "--input", "./docs"]);
        assert!(matches!(
            cli.command,
            Commands::Index { reset: true, input: Some(ref dir), collection: None } if dir == "./docs"
        ));
    }
}
