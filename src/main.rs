use anyhow::{Context, Result};
use arxiv_digest::config::{default_config_path, find_config_file, load_config, Config};
use arxiv_digest::export::ExportFormat;
use arxiv_digest::models::presets::{merge_selection, CATEGORY_PRESETS, KEYWORD_PRESETS};
use arxiv_digest::models::{BooleanOp, SearchRequest, SortChoice};
use arxiv_digest::pipeline::{Pipeline, SearchError};
use arxiv_digest::ui::{self, EnrichProgress, Status, TableLayout};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::time::Instant;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// arXiv Digest - search arXiv and translate and summarize every abstract
#[derive(Parser, Debug)]
#[command(name = "arxiv-digest")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Search arXiv, then translate and summarize each abstract", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging (-v for debug, -vv for trace)
    #[arg(long, short, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Output format
    #[arg(long, short, value_enum, global = true, default_value_t = OutputFormat::Auto)]
    output: OutputFormat,

    /// Configuration file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log line format (overrides the config file)
    #[arg(long, value_enum, global = true)]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

/// Output format for results
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFormat {
    /// Automatic based on terminal (table if TTY, JSON otherwise)
    Auto,
    /// Title and summaries as a table
    Table,
    /// All five columns as a table
    Wide,
    /// JSON format (machine-readable)
    Json,
    /// Plain text format
    Plain,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum LogFormat {
    Text,
    Json,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Operator {
    And,
    Or,
}

impl From<Operator> for BooleanOp {
    fn from(op: Operator) -> Self {
        match op {
            Operator::And => BooleanOp::And,
            Operator::Or => BooleanOp::Or,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum FileFormat {
    Csv,
    Json,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Search arXiv and enrich every result
    #[command(alias = "s")]
    Search {
        /// Comma-separated keywords, e.g. "LLM, Multimodal"
        keywords: String,

        /// Operator joining the keywords
        #[arg(long, value_enum, default_value_t = Operator::Or)]
        keywords_op: Operator,

        /// Add a keyword suggestion from `presets` (repeatable)
        #[arg(long = "pick", value_name = "KEYWORD")]
        picked_keywords: Vec<String>,

        /// Comma-separated arXiv categories, e.g. "cs.AI, cs.CL"
        #[arg(long, short, default_value = "")]
        categories: String,

        /// Operator joining the categories
        #[arg(long, value_enum, default_value_t = Operator::Or)]
        categories_op: Operator,

        /// Add a category suggestion from `presets` (repeatable)
        #[arg(long = "pick-category", value_name = "CATEGORY")]
        picked_categories: Vec<String>,

        /// Maximum number of results
        #[arg(long, short, default_value_t = 10, allow_negative_numbers = true)]
        max_results: i64,

        /// Sort code 1-5 or menu label; unknown values use submitted date, newest first
        #[arg(long, default_value = "3")]
        sort: String,

        /// Entries enriched simultaneously (overrides the config file)
        #[arg(long)]
        concurrency: Option<usize>,

        /// Target language for translations (overrides the config file)
        #[arg(long)]
        language: Option<String>,

        /// Export file format (overrides the config file)
        #[arg(long, value_enum)]
        format: Option<FileFormat>,

        /// Directory to write the export into (overrides the config file)
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Do not write an export file
        #[arg(long)]
        no_export: bool,
    },

    /// List suggested keywords, categories and sort choices
    Presets,

    /// Write a configuration file with the default settings
    InitConfig {
        /// Destination (default: user config directory)
        path: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

fn init_tracing(cli: &Cli, config: &Config) {
    let level = match (cli.quiet, cli.verbose) {
        (true, _) => "error",
        (false, 0) => config.logging.level.as_str(),
        (false, 1) => "debug",
        (false, _) => "trace",
    };
    let env_filter = EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| format!("arxiv_digest={}", level)),
    );

    let json = match cli.log_format {
        Some(format) => format == LogFormat::Json,
        None => config.logging.format.eq_ignore_ascii_case("json"),
    };

    let registry = tracing_subscriber::registry().with(env_filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() {
    let code = match run().await {
        Ok(()) => 0,
        Err(err) => {
            let code = err
                .downcast_ref::<SearchError>()
                .map(SearchError::exit_code)
                .or_else(|| err.downcast_ref::<config::ConfigError>().map(|_| 2))
                .unwrap_or(1);
            ui::print_status(Status::Error, &format!("{:#}", err));
            code
        }
    };
    std::process::exit(code);
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().or_else(find_config_file);
    let config = match &config_path {
        Some(path) => load_config(Some(path.as_path()))
            .with_context(|| format!("failed to load config file {}", path.display()))?,
        None => load_config(None).context("failed to load configuration")?,
    };

    init_tracing(&cli, &config);
    if let Some(path) = &config_path {
        tracing::info!("Using config file: {}", path.display());
    }

    match &cli.command {
        Commands::Search {
            keywords,
            keywords_op,
            picked_keywords,
            categories,
            categories_op,
            picked_categories,
            max_results,
            sort,
            concurrency,
            language,
            format,
            output_dir,
            no_export,
        } => {
            let mut config = config.clone();
            if let Some(workers) = concurrency {
                config.enrichment.concurrency = *workers;
            }
            if let Some(language) = language {
                config.enrichment.target_language = language.clone();
            }
            if let Some(format) = format {
                config.export.format = match format {
                    FileFormat::Csv => ExportFormat::Csv,
                    FileFormat::Json => ExportFormat::Json,
                };
            }
            if let Some(dir) = output_dir {
                config.export.directory = dir.clone();
            }
            if *no_export {
                config.export.format = ExportFormat::None;
            }

            let keywords = merge_selection(keywords, &as_strs(picked_keywords));
            let categories = merge_selection(categories, &as_strs(picked_categories));
            let request = SearchRequest::from_input(&keywords, &categories)
                .keywords_op((*keywords_op).into())
                .categories_op((*categories_op).into())
                .max_results(*max_results)
                .sort(SortChoice::parse(sort));

            run_search(&cli, &config, &request).await
        }

        Commands::Presets => {
            print_presets(cli.output);
            Ok(())
        }

        Commands::InitConfig { path, force } => {
            let path = path.clone().unwrap_or_else(default_config_path);
            if path.exists() && !force {
                anyhow::bail!(
                    "{} already exists (use --force to overwrite)",
                    path.display()
                );
            }
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
            let contents = Config::default().to_toml()?;
            std::fs::write(&path, contents)
                .with_context(|| format!("failed to write {}", path.display()))?;
            if !cli.quiet {
                ui::print_status(Status::Success, &format!("Wrote {}", path.display()));
            }
            Ok(())
        }

        Commands::Completions { shell } => {
            clap_complete::generate(*shell, &mut Cli::command(), "arxiv-digest", &mut std::io::stdout());
            Ok(())
        }
    }
}

fn as_strs(values: &[String]) -> Vec<&str> {
    values.iter().map(String::as_str).collect()
}

async fn run_search(cli: &Cli, config: &Config, request: &SearchRequest) -> Result<()> {
    let mut pipeline = Pipeline::from_config(config)?;

    let progress = EnrichProgress::new();
    if !cli.quiet && ui::is_terminal() {
        pipeline = pipeline.on_progress(progress.hook());
    }

    // Attached by from_config; kept here only to report where it wrote
    let exporter = config.export.exporter();

    if !cli.quiet {
        ui::print_status(
            Status::Search,
            &format!("Searching arXiv for \"{}\" ({})", request.keyword_label(), request.sort.label()),
        );
    }

    let started = Instant::now();
    let ctrl_c = async {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };
    let result = pipeline.search_until(request, ctrl_c).await;
    progress.finish();
    let table = result?;

    if table.is_empty() {
        if !cli.quiet {
            ui::print_status(Status::Warning, "No results found");
        }
        return Ok(());
    }

    if !cli.quiet {
        ui::print_search_header(
            &request.keyword_label(),
            table.len(),
            table.fallback_count(),
            started.elapsed(),
        );
    }

    let format = match cli.output {
        OutputFormat::Auto if ui::is_terminal() => OutputFormat::Table,
        OutputFormat::Auto => OutputFormat::Json,
        other => other,
    };
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(table.rows())?),
        OutputFormat::Plain => print!("{}", ui::render_plain(&table)),
        OutputFormat::Wide => println!("{}", ui::render_table(&table, TableLayout::Full)),
        OutputFormat::Table | OutputFormat::Auto => {
            println!("{}", ui::render_table(&table, TableLayout::Compact))
        }
    }

    if let (Some(exporter), false) = (&exporter, cli.quiet) {
        let path = exporter.path_for(&request.keyword_label())?;
        ui::print_status(Status::Success, &format!("Saved {}", path.display()));
    }
    Ok(())
}

fn print_presets(output: OutputFormat) {
    if output == OutputFormat::Json {
        let sorts: Vec<_> = SortChoice::ALL
            .iter()
            .map(|choice| serde_json::json!({ "code": choice.code(), "label": choice.label() }))
            .collect();
        let presets = serde_json::json!({
            "keywords": KEYWORD_PRESETS,
            "categories": CATEGORY_PRESETS,
            "sort": sorts,
        });
        println!("{}", presets);
        return;
    }

    ui::print_section("Keywords");
    for keyword in KEYWORD_PRESETS {
        println!("  {}", keyword);
    }
    ui::print_section("Categories");
    for category in CATEGORY_PRESETS {
        println!("  {}", category);
    }
    ui::print_section("Sort");
    for choice in SortChoice::ALL {
        println!("  {}  {}", choice.code(), choice.label());
    }
}
