//! CLI module for ragbot
//!
//! Argument parsing for the `ragbot` binary. Uses clap for parsing and
//! owo-colors (through [`output`]) for terminal output.

pub mod output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::llm::structured::DEFAULT_TARGET_LANG;

/// ragbot - retrieval-augmented question answering
///
/// Ingests a text corpus into a vector index and answers questions grounded
/// in the retrieved passages.
#[derive(Parser, Debug)]
#[command(
    name = "ragbot",
    version,
    about = "ragbot - retrieval-augmented question answering server",
    long_about = "Chunks, embeds and indexes a document collection, then answers questions\n\
                  grounded in the passages retrieved for them.\n\n\
                  Run without arguments to start the HTTP server.",
    after_help = "EXAMPLES:\n    \
                  ragbot                              # Start the server\n    \
                  ragbot ingest                       # Rebuild the collection from SOURCE_FILE_PATH\n    \
                  ragbot ingest --source notes.txt    # Ingest a different file\n    \
                  ragbot ask \"什么是普氏野马?\"          # One-shot question\n    \
                  ragbot translate stallion           # Translation with an example sentence\n    \
                  ragbot report --file notes.txt      # Weekly report from work notes\n    \
                  ragbot config --validate            # Check the effective configuration"
)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "ragbot.toml", global = true)]
    pub config: PathBuf,

    /// Enable verbose output (debug logging)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP server (default)
    Serve {
        /// Override the bind host
        #[arg(long)]
        host: Option<String>,

        /// Override the bind port
        #[arg(long)]
        port: Option<u16>,
    },

    /// Rebuild a collection from a source document
    ///
    /// The collection is deleted and recreated, so re-running with the same
    /// file never duplicates chunks.
    Ingest {
        /// Source document (defaults to SOURCE_FILE_PATH)
        #[arg(short, long)]
        source: Option<PathBuf>,

        /// Target collection (defaults to CHROMA_COLLECTION)
        #[arg(long)]
        collection: Option<String>,

        /// Maximum chunk length in characters
        #[arg(long)]
        chunk_size: Option<usize>,

        /// Characters shared by consecutive chunks
        #[arg(long)]
        chunk_overlap: Option<usize>,
    },

    /// Ask a single question and print the answer with its sources
    Ask {
        /// The question
        question: String,
    },

    /// Translate a word or sentence and show an example sentence
    Translate {
        /// Text to translate
        #[arg(default_value = "Hello world")]
        text: String,

        /// Target language
        #[arg(short, long = "to", default_value = DEFAULT_TARGET_LANG)]
        target_lang: String,
    },

    /// Turn a week of work notes into a Markdown report
    Report {
        /// Work notes
        #[arg(required_unless_present = "file", conflicts_with = "file")]
        notes: Option<String>,

        /// Read the notes from a file instead
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Show the effective configuration (secrets redacted)
    Config {
        /// Only validate, print nothing on success
        #[arg(long)]
        validate: bool,
    },
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_no_subcommand_means_serve() {
        let cli = Cli::try_parse_from(["ragbot"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.config, PathBuf::from("ragbot.toml"));
    }

    #[test]
    fn test_ingest_overrides() {
        let cli = Cli::try_parse_from([
            "ragbot",
            "ingest",
            "--source",
            "data/other.txt",
            "--chunk-size",
            "500",
            "--chunk-overlap",
            "50",
        ])
        .unwrap();

        match cli.command {
            Some(Commands::Ingest {
                source,
                collection,
                chunk_size,
                chunk_overlap,
            }) => {
                assert_eq!(source, Some(PathBuf::from("data/other.txt")));
                assert_eq!(collection, None);
                assert_eq!(chunk_size, Some(500));
                assert_eq!(chunk_overlap, Some(50));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["ragbot", "ask", "hi", "--no-color", "-c", "x.toml"]).unwrap();
        assert!(cli.no_color);
        assert_eq!(cli.config, PathBuf::from("x.toml"));
        assert!(matches!(cli.command, Some(Commands::Ask { question }) if question == "hi"));
    }

    #[test]
    fn test_translate_defaults() {
        let cli = Cli::try_parse_from(["ragbot", "translate"]).unwrap();
        match cli.command {
            Some(Commands::Translate { text, target_lang }) => {
                assert_eq!(text, "Hello world");
                assert_eq!(target_lang, DEFAULT_TARGET_LANG);
            }
            other => panic!("unexpected command: {other:?}"),
        }

        let cli = Cli::try_parse_from(["ragbot", "translate", "马", "--to", "English"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::Translate { ref text, ref target_lang }) if text == "马" && target_lang == "English"
        ));
    }

    #[test]
    fn test_report_needs_notes_or_file() {
        assert!(Cli::try_parse_from(["ragbot", "report"]).is_err());
        assert!(Cli::try_parse_from(["ragbot", "report", "周五上线", "--file", "n.txt"]).is_err());

        let cli = Cli::try_parse_from(["ragbot", "report", "-f", "notes.txt"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::Report { notes: None, file: Some(ref f) }) if f == &PathBuf::from("notes.txt")
        ));
    }
}
