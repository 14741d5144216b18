use archive_search::backend::PagePlan;
use archive_search::cli::{Cli, Commands, ConfigAction};
use archive_search::compiler::{compile, with_offset};
use archive_search::config::Config;
use archive_search::error::{ArchiveError, Result};
use archive_search::justification::JustificationBuilder;
use archive_search::query::{Query, ResolvedQuery};
use std::path::PathBuf;

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse_args();

    // Initialize logging
    init_logging(cli.verbose);

    // Handle commands
    match cli.command {
        Commands::Parse { text, json } => {
            cmd_parse(&text, json)?;
        }
        Commands::Url { query_string, json } => {
            cmd_url(&query_string, json)?;
        }
        Commands::Compile { text } => {
            cmd_compile(&text);
        }
        Commands::Plan {
            start,
            count,
            page_size,
        } => {
            cmd_plan(cli.config, start, count, page_size)?;
        }
        Commands::Justify {
            text,
            terms,
            context_length,
        } => {
            cmd_justify(cli.config, &text, &terms, context_length)?;
        }
        Commands::Config { action } => {
            cmd_config(cli.config, action)?;
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("archive_search=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("archive_search=info"))
    };

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn cmd_parse(text: &str, json: bool) -> Result<()> {
    match Query::parse_free_text(text) {
        Some(query) => print_query(&query, json),
        None => {
            println!("Empty query");
            Ok(())
        }
    }
}

fn cmd_url(query_string: &str, json: bool) -> Result<()> {
    match Query::parse_url(query_string)? {
        Some(query) => print_query(&query, json),
        None => {
            println!("Empty query");
            Ok(())
        }
    }
}

fn print_query(query: &Query, json: bool) -> Result<()> {
    if json {
        let json = serde_json::to_string_pretty(query).map_err(|e| ArchiveError::Json {
            source: e,
            context: "Failed to serialize query".to_string(),
        })?;
        println!("{}", json);
        return Ok(());
    }

    println!("Search text:  {}", query.to_canonical_search_text());
    println!("Link text:    {}", query.to_link_display_text());
    println!("URL:          {}", query.to_url());
    println!("Description:  {}", query.to_description());
    Ok(())
}

fn cmd_compile(text: &str) {
    let query = Query::parse_free_text(text).unwrap_or_default();
    if query.author().is_some() {
        tracing::warn!("Author names are not resolved offline, the author filter is left out");
    }
    print!("{}", compile(&ResolvedQuery::unresolved(query)));
}

fn cmd_plan(
    config_path: Option<PathBuf>,
    start: usize,
    count: usize,
    page_size: Option<usize>,
) -> Result<()> {
    let page_size = match page_size {
        Some(page_size) => page_size,
        None => load_config(config_path)?.backend.page_size,
    };
    let plan = PagePlan::new(start, count, page_size)?;

    println!("Window:        [{}, {})", start, start + count);
    println!("Page size:     {}", plan.page_size);
    println!("Pages:         {}..{}", plan.pages().start, plan.pages().end);
    println!("Leading waste: {}", plan.leading_waste);
    for page in plan.pages() {
        println!("  {}", with_offset("", page).trim());
    }
    Ok(())
}

fn cmd_justify(
    config_path: Option<PathBuf>,
    text: &str,
    terms: &[String],
    context_length: Option<usize>,
) -> Result<()> {
    let config = load_config(config_path)?;
    let mut builder = JustificationBuilder::from(&config.justification);
    if let Some(context_length) = context_length {
        builder.context_length = context_length;
    }

    let rendered = builder.justify(terms, text);
    if rendered.is_empty() {
        println!("No term occurs in the text");
    } else {
        println!("{}", rendered);
    }
    Ok(())
}

fn cmd_config(config_path: Option<PathBuf>, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show { section } => {
            let config = load_config(config_path)?;
            let mut value = serde_json::to_value(&config).map_err(|e| ArchiveError::Json {
                source: e,
                context: "Failed to serialize config".to_string(),
            })?;

            if let Some(section) = section {
                value = value
                    .get(&section)
                    .cloned()
                    .ok_or_else(|| ArchiveError::Config(format!("Unknown section: {}", section)))?;
            }

            let json = serde_json::to_string_pretty(&value).map_err(|e| ArchiveError::Json {
                source: e,
                context: "Failed to serialize config".to_string(),
            })?;
            println!("{}", json);
        }
        ConfigAction::Validate { file } => {
            let path = match file.or(config_path) {
                Some(path) => path,
                None => Config::default_path()?,
            };
            let config = Config::load(&path)?;
            println!("✓ Configuration is valid");
            println!("  Schema version: {}", config.meta.schema_version);
        }
        ConfigAction::Init { force } => {
            let path = match config_path {
                Some(path) => path,
                None => Config::default_path()?,
            };

            if path.exists() && !force {
                println!("Configuration file already exists at: {}", path.display());
                println!("Use --force to overwrite");
                return Ok(());
            }

            Config::default().save(&path)?;
            println!("✓ Configuration initialized at: {}", path.display());
        }
    }

    Ok(())
}

fn load_config(config_path: Option<PathBuf>) -> Result<Config> {
    let path = match config_path {
        Some(path) => path,
        None => Config::default_path()?,
    };

    if !path.exists() {
        tracing::warn!(
            "Config file not found, using defaults. Run 'archive-search config init' to create one."
        );
        return Ok(Config::default());
    }

    Config::load(&path)
}
