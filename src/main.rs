use std::path::PathBuf;

use clap::{Parser, Subcommand};
use wordlens::Result;
use wordlens::commands::{
    analyze_file, check_health, compare_words, delete_cached_analysis, find_similar, inspect_file,
    lookup_word, show_cached_analysis,
};
use wordlens::config::{run_interactive_config, show_config};
use wordlens::highlight::HighlightMode;

#[derive(Parser)]
#[command(name = "wordlens")]
#[command(about = "Interactive word highlighting and similarity over analyzed text")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure the analysis service connection and highlighting
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Check that the analysis service is reachable
    Health,
    /// Analyze a text file and print its statistics
    Analyze {
        /// Text file to analyze (txt, text, log, md, json or csv)
        file: PathBuf,
        /// Skip word embeddings; similarity will be unavailable
        #[arg(long)]
        no_embeddings: bool,
    },
    /// List the words most similar to WORD within a text file
    Similar {
        /// Text file to analyze
        file: PathBuf,
        /// Word to compare against the rest of the vocabulary
        word: String,
    },
    /// Interactively hover words and inspect highlights
    Inspect {
        /// Text file to analyze
        file: PathBuf,
        /// Highlight mode to start in, e.g. "co-occurrence" or "similarity"
        #[arg(long)]
        mode: Option<HighlightMode>,
    },
    /// Look up the embedding of a single word
    Word {
        /// Word to look up
        word: String,
    },
    /// Compare two words with the service's embedding model
    Compare {
        word1: String,
        word2: String,
    },
    /// Work with analyses cached by the service
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Rebuild a document from a cached analysis and its source file
    Show {
        /// Cache key printed by `analyze`
        key: String,
        /// The text file the analysis was made from
        file: PathBuf,
    },
    /// Remove a cached analysis
    Delete {
        /// Cache key printed by `analyze`
        key: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Config { show } => {
            if show {
                show_config()?;
            } else {
                run_interactive_config()?;
            }
        }
        Commands::Health => {
            check_health().await?;
        }
        Commands::Analyze {
            file,
            no_embeddings,
        } => {
            analyze_file(file, !no_embeddings).await?;
        }
        Commands::Similar { file, word } => {
            find_similar(file, &word).await?;
        }
        Commands::Inspect { file, mode } => {
            inspect_file(file, mode).await?;
        }
        Commands::Word { word } => {
            lookup_word(&word).await?;
        }
        Commands::Compare { word1, word2 } => {
            compare_words(&word1, &word2).await?;
        }
        Commands::Cache { action } => match action {
            CacheAction::Show { key, file } => {
                show_cached_analysis(&key, file).await?;
            }
            CacheAction::Delete { key } => {
                delete_cached_analysis(&key).await?;
            }
        },
    }

    Ok(())
}
