//! elisio-ui - command-line client for the Elisio scansion server
//!
//! Browses the author/opus/book/poem/verse hierarchy, requests scans,
//! manages scan batches and runs the admin operations of a superuser session.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use elisio_common::config::{
    default_config_locations, write_toml_config, ClientConfig, ConfigResolver, LoggingConfig,
    TomlConfig,
};
use elisio_common::events::EventBus;
use elisio_common::models::{
    Level, NewAuthor, NewMetadata, NewOpus, SelectOption, VerseMetadata, VerseType,
};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::info;
use tracing_subscriber::EnvFilter;

use elisio_ui::batch::{BatchBuilder, CriterionRow};
use elisio_ui::scan::{self, ScanQuery, ScanSource, ScanView};
use elisio_ui::selector::ALL_LABEL;
use elisio_ui::verse::validate_verse_number;
use elisio_ui::{spawn_selector, CorpusApi, HttpApi, Outcome, UiState};

#[derive(Debug, Parser)]
#[command(name = "elisio-ui", version, about = "Elisio verse scansion client")]
struct Cli {
    /// Server root URL (overrides ELISIO_SERVER_URL and the config file)
    #[arg(long, global = true)]
    server: Option<String>,

    /// Config file (overrides ELISIO_CONFIG)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List authors
    Authors,
    /// List the works of an author
    Works { author: i64 },
    /// List the books of a work
    Books { opus: i64 },
    /// List the poems of a book
    Poems { book: i64 },
    /// Show one verse of a poem
    Verse { poem: i64, number: String },
    /// Scan a stored verse or free text
    Scan(ScanArgs),
    /// Load a random verse and select its whole hierarchy
    Random,
    /// Print the criteria for rows written as author/opus/book/poem[@relation]
    Criteria {
        #[arg(required = true)]
        rows: Vec<String>,
        /// Save the criteria to the current session
        #[arg(long)]
        save: bool,
    },
    #[command(subcommand)]
    Batch(BatchCommand),
    #[command(subcommand)]
    Admin(AdminCommand),
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Debug, Args)]
struct ScanArgs {
    #[arg(long, requires = "verse", conflicts_with = "text")]
    poem: Option<i64>,
    #[arg(long, requires = "poem")]
    verse: Option<u32>,
    #[arg(long)]
    text: Option<String>,
    /// UNKNOWN, HEXAMETER, PENTAMETER or HENDECASYLLABUS
    #[arg(long, default_value = "UNKNOWN")]
    verse_type: VerseType,
    /// Scan without the server's word dictionary
    #[arg(long)]
    no_dict: bool,
}

#[derive(Debug, Subcommand)]
enum BatchCommand {
    /// List the session user's batches
    List,
    /// Save the session's pending items as a batch
    Save,
    Delete { id: i64 },
    Run { id: i64 },
    /// Drop the session's pending verses
    Clear,
    /// Drop one pending verse by its hash
    DeleteVerse { hash: String },
}

#[derive(Debug, Subcommand)]
enum AdminCommand {
    SyncFiles,
    SyncDb,
    Users,
    AddAuthor(AddAuthorArgs),
    AddOpus(AddOpusArgs),
}

#[derive(Debug, Args)]
struct AddAuthorArgs {
    #[arg(long)]
    full_name: String,
    #[arg(long)]
    short_name: String,
    #[arg(long)]
    abbreviation: String,
    #[arg(long)]
    period: i64,
    #[arg(long, allow_hyphen_values = true)]
    birth_year: i32,
    #[arg(long, allow_hyphen_values = true)]
    dying_year: i32,
    #[arg(long, allow_hyphen_values = true)]
    floruit_start: i32,
    #[arg(long, allow_hyphen_values = true)]
    floruit_end: i32,
}

#[derive(Debug, Args)]
struct AddOpusArgs {
    #[arg(long)]
    full_name: String,
    #[arg(long)]
    abbreviation: String,
    #[arg(long, default_value = "")]
    alternative_name: String,
    #[arg(long)]
    author: i64,
    #[arg(long, allow_hyphen_values = true)]
    publication: i32,
    #[arg(long)]
    genre: i64,
}

#[derive(Debug, Subcommand)]
enum ConfigCommand {
    /// Write a config file with default values
    Init {
        /// Replace an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let resolver = ConfigResolver::new()
        .with_server_url(cli.server.clone())
        .with_config_path(cli.config.clone());
    let config = resolver.resolve();

    init_tracing(&config.logging)?;
    info!(
        "elisio-ui v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    info!("Server: {}", config.server_url);

    if let Command::Config(ConfigCommand::Init { force }) = &cli.command {
        return init_config(&resolver, &config, *force);
    }

    let api = HttpApi::new(&config)?;
    match cli.command {
        Command::Authors => {
            let authors = api.authors().await?;
            print_options(authors.iter().map(SelectOption::from));
        }
        Command::Works { author } => {
            let opera = api.opera(author).await?;
            print_options(opera.iter().map(SelectOption::from));
        }
        Command::Books { opus } => {
            let books = api.books(opus).await?;
            print_options(books.iter().map(SelectOption::from));
        }
        Command::Poems { book } => {
            let poems = api.poems(book).await?;
            print_options(poems.iter().map(SelectOption::from));
        }
        Command::Verse { poem, number } => {
            let max = api.max_verse_number(poem).await?;
            let number = validate_verse_number(&number, Some(max))?;
            print_verse(&api.verse(poem, number).await?);
        }
        Command::Scan(args) => run_scan(&api, args).await?,
        Command::Random => run_random(api, &config).await?,
        Command::Criteria { rows, save } => {
            let builder = rows
                .iter()
                .map(|row| row.parse::<CriterionRow>())
                .collect::<Result<BatchBuilder, _>>()?;
            println!("{}", serde_json::to_string_pretty(&builder.criteria())?);
            if save {
                let count = builder.submit(&api).await?;
                println!("Saved {} criteria", count);
            }
        }
        Command::Batch(command) => run_batch(&api, command).await?,
        Command::Admin(command) => run_admin(&api, command).await?,
        Command::Config(_) => {}
    }

    Ok(())
}

fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))
        .context("invalid log level")?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match &logging.file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("cannot open log file {}", path.display()))?;
            builder.with_ansi(false).with_writer(Mutex::new(file)).init();
        }
        None => builder.with_writer(std::io::stderr).init(),
    }
    Ok(())
}

fn init_config(resolver: &ConfigResolver, config: &ClientConfig, force: bool) -> Result<()> {
    let path = match resolver.config_path() {
        Some(path) => path,
        None => default_config_locations()
            .into_iter()
            .next()
            .context("no config directory on this platform")?,
    };
    if path.exists() && !force {
        bail!("{} already exists (use --force to replace it)", path.display());
    }

    let toml = TomlConfig {
        server_url: Some(config.server_url.clone()),
        request_timeout_secs: Some(config.request_timeout.as_secs()),
        event_capacity: Some(config.event_capacity),
        logging: config.logging.clone(),
        ..Default::default()
    };
    write_toml_config(&toml, &path)?;
    println!("Wrote {}", path.display());
    Ok(())
}

fn print_options(options: impl Iterator<Item = SelectOption>) {
    println!("{:>8}  {}", "all", ALL_LABEL);
    for option in options {
        println!("{:>8}  {}", option.id, option.label);
    }
}

fn print_verse(metadata: &VerseMetadata) {
    println!("{:>4}  {}  [{}]", metadata.verse.number, metadata.verse.text, metadata.verse.verse_type);
}

async fn run_scan(api: &HttpApi, args: ScanArgs) -> Result<()> {
    let source = match (args.poem, args.verse, args.text) {
        (Some(poem_id), Some(verse_number), None) => ScanSource::Database { poem_id, verse_number },
        (None, None, Some(text)) => ScanSource::Text(text),
        _ => bail!("give either --poem and --verse, or --text"),
    };
    let query = ScanQuery::new(source, args.verse_type, !args.no_dict)?;

    let mut view = ScanView::default();
    view.apply(&scan::dispatch(api, &query).await?);
    match (&view.text, view.zeleny_display(), &view.error) {
        (Some(text), zeleny, _) => {
            println!("{}", text);
            if let Some(zeleny) = zeleny {
                println!("zeleny: {}", zeleny);
            }
        }
        (None, _, Some(error)) => println!("scan failed: {}", error),
        _ => println!("scan failed"),
    }
    Ok(())
}

async fn run_random(api: HttpApi, config: &ClientConfig) -> Result<()> {
    let handle = spawn_selector(Arc::new(api), EventBus::new(config.event_capacity));
    match handle.restore_random_verse().await? {
        Outcome::Applied => {}
        other => bail!("could not load a random verse: {:?}", other),
    }

    let state: UiState = handle.snapshot().await?;
    for level in Level::ALL {
        let selected = state.selection.selected(level);
        let label = state
            .selection
            .level(level)
            .options
            .iter()
            .find(|o| Some(o.id) == selected.id())
            .map(|o| o.label.as_str())
            .unwrap_or(ALL_LABEL);
        println!("{:>7}: {} ({})", level, label, selected);
    }
    if let Some(verse) = &state.verse {
        println!(
            "  verse: {} of {}  {}  [{}]",
            verse.number,
            state.selection.max_verse_number().unwrap_or(0),
            verse.text,
            verse.verse_type
        );
    }
    Ok(())
}

async fn run_batch(api: &HttpApi, command: BatchCommand) -> Result<()> {
    match command {
        BatchCommand::List => {
            for batch in api.batches().await? {
                let created = batch
                    .created_at()
                    .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_else(|| batch.timing.clone());
                let items = match batch.items_at_creation {
                    Some(at_creation) => format!("{}/{}", batch.items_now, at_creation),
                    None => batch.items_now.to_string(),
                };
                let scans = batch
                    .scans
                    .as_ref()
                    .map(|s| format!("{} scans, latest {}", s.number, s.recent))
                    .unwrap_or_default();
                println!("{:>6}  {}  {}  items {}  {}", batch.id, batch.name, created, items, scans);
            }
        }
        BatchCommand::Save => api.save_batch().await?,
        BatchCommand::Delete { id } => api.delete_batch(id).await?,
        BatchCommand::Run { id } => api.run_batch(id).await?,
        BatchCommand::Clear => api.clear_current_session().await?,
        BatchCommand::DeleteVerse { hash } => api.delete_session_verse(&hash).await?,
    }
    Ok(())
}

async fn run_admin(api: &HttpApi, command: AdminCommand) -> Result<()> {
    match command {
        AdminCommand::SyncFiles => api.sync_files().await?,
        AdminCommand::SyncDb => api.sync_db().await?,
        AdminCommand::Users => {
            for member in api.members().await? {
                let fields = &member.fields;
                println!(
                    "{:>6}  {:<20} joined {}  last login {}{}{}",
                    member.pk,
                    fields.username,
                    fields.date_joined.as_deref().unwrap_or("-"),
                    fields.last_login.as_deref().unwrap_or("never"),
                    if fields.is_superuser { "  superuser" } else { "" },
                    if fields.is_active { "" } else { "  inactive" },
                );
            }
        }
        AdminCommand::AddAuthor(args) => {
            let author = NewAuthor {
                full_name: args.full_name,
                short_name: args.short_name,
                abbreviation: args.abbreviation,
                period: args.period,
                birth_year: args.birth_year,
                dying_year: args.dying_year,
                floruit_start: args.floruit_start,
                floruit_end: args.floruit_end,
            };
            api.post_metadata(&NewMetadata::Author(author)).await?;
        }
        AdminCommand::AddOpus(args) => {
            let opus = NewOpus {
                full_name: args.full_name,
                abbreviation: args.abbreviation,
                alternative_name: args.alternative_name,
                author: args.author,
                publication: args.publication,
                genre: args.genre,
            };
            api.post_metadata(&NewMetadata::Opus(opus)).await?;
        }
    }
    Ok(())
}
