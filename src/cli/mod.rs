//! CLI command definitions and parsing
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "archive-search",
    version,
    about = "Query toolkit for a photo archive search service",
    long_about = "archive-search parses free-text and URL search queries, compiles them into \
                  backend graph queries, plans paged result windows and renders highlighted \
                  excerpts showing why a text matched a query."
)]
pub struct Cli {
    /// Global config file path (defaults to ~/.config/archive-search/config.toml)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Parse free search text, e.g. `dekade:1950 autor:"Meier, Hans" schnee`
    Parse {
        /// Search text
        text: String,

        /// Show the parsed query in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Parse a URL query string, e.g. `?query=schnee&dekade=1950`
    Url {
        /// Query string, with or without the leading '?'
        query_string: String,

        /// Show the parsed query in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Print the backend query compiled from search text
    Compile {
        /// Search text
        text: String,
    },

    /// Show which backend pages a result window needs
    Plan {
        /// Index of the first result
        #[arg(short, long)]
        start: usize,

        /// Number of results
        #[arg(short = 'n', long)]
        count: usize,

        /// Backend page size (defaults to the configured one)
        #[arg(short, long)]
        page_size: Option<usize>,
    },

    /// Highlight where search terms occur in a text
    Justify {
        /// Text to search in
        text: String,

        /// Search term, may be repeated
        #[arg(short, long = "term", required = true)]
        terms: Vec<String>,

        /// Characters of context around each match (defaults to the configured one)
        #[arg(short = 'n', long)]
        context_length: Option<usize>,
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
    Show {
        /// Show only a specific section
        #[arg(short, long, value_parser = ["backend", "session", "justification"])]
        section: Option<String>,
    },

    /// Validate configuration file
    Validate {
        /// Path to config file (defaults to standard location)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Initialize default configuration
    Init {
        /// Force overwrite existing config
        #[arg(short, long)]
        force: bool,
    },
}

impl Cli {
    /// Parse CLI arguments from command line
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
