//! `sprite`: refresh the atlas cache and browse the sprite catalog.

mod error;
mod output;

use crate::error::{ErrorKind, Result};
use clap::{Parser, Subcommand};
use exn::{OptionExt, ResultExt};
use sprite_cache::{AtlasCache, PopulationMode};
use sprite_catalog::{CatalogSnapshot, paginate};
use sprite_config::Config;
use sprite_fetch::{Fetcher, ReqwestClient};
use sprite_service::{AtlasService, Notice, Notifier, RefreshOutcome};
use sprite_storage::backend::LocalBackend;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "sprite", about = "Browse the sprites packed into game texture atlases", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Configuration file, merged over the platform config directory
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Mirror the atlas definitions of a game version and rebuild the catalog
    Refresh {
        /// Game version id, e.g. 1.21.4
        #[arg(long)]
        version: Option<String>,
        /// How atlas files get into the cache (automatic, manual, objects)
        #[arg(long)]
        mode: Option<PopulationMode>,
    },
    /// List cached atlases
    Atlases {
        #[arg(long, default_value_t = 1)]
        page: usize,
    },
    /// List the sprite groups of one atlas
    View {
        atlas: String,
        #[arg(long, default_value_t = 1)]
        page: usize,
    },
    /// List every sprite in one group
    Preview { atlas: String, group: String },
    /// Complete a partial atlas name
    Suggest { partial: String },
}

/// Prints notices to stdout.
struct ConsoleNotifier;
impl Notifier for ConsoleNotifier {
    fn notify(&self, notice: Notice) {
        match notice {
            Notice::Failed(_) => eprintln!("{notice}"),
            _ => println!("{notice}"),
        }
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env("SPRITE_LOG").unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::debug!(error = ?e, "command failed");
            eprintln!("error: {}", &*e);
            ExitCode::FAILURE
        },
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref()).or_raise(|| ErrorKind::Config)?;
    match cli.command {
        Command::Refresh { version, mode } => {
            let version = version.or_else(|| config.version.clone()).ok_or_raise(|| ErrorKind::NoVersion)?;
            let service = open(&config, version, mode.unwrap_or(config.population))?;
            refresh(&service, &ConsoleNotifier).await
        },
        Command::Atlases { page } => {
            let snapshot = bootstrap(&config).await?;
            let page = paginate(snapshot.atlases(), page, config.page_size);
            print!("{}", output::atlases(&snapshot, &page));
            Ok(())
        },
        Command::View { atlas, page } => {
            let snapshot = bootstrap(&config).await?;
            let atlas = snapshot.lookup_atlas(&atlas).ok_or_raise(|| ErrorKind::UnknownAtlas(atlas.clone()))?;
            let page = paginate(atlas.groups(), page, config.page_size);
            print!("{}", output::groups(atlas, &page));
            Ok(())
        },
        Command::Preview { atlas, group } => {
            let snapshot = bootstrap(&config).await?;
            let entry = snapshot.lookup_atlas(&atlas).ok_or_raise(|| ErrorKind::UnknownAtlas(atlas.clone()))?;
            let found = entry.lookup_group(&group).ok_or_raise(|| ErrorKind::UnknownGroup {
                atlas: entry.id().to_string(),
                group: group.clone(),
            })?;
            print!("{}", output::preview(entry, found));
            Ok(())
        },
        Command::Suggest { partial } => {
            let snapshot = bootstrap(&config).await?;
            for suggestion in snapshot.suggest_atlases(&partial) {
                println!("{suggestion}");
            }
            Ok(())
        },
    }
}

fn open(config: &Config, version: String, mode: PopulationMode) -> Result<AtlasService> {
    let root = std::path::absolute(&config.cache_dir).or_raise(|| ErrorKind::Setup)?;
    let backend = LocalBackend::new("cache", root).or_raise(|| ErrorKind::Setup)?;
    let timeouts = config.timeouts();
    let client = ReqwestClient::new(timeouts.connect).or_raise(|| ErrorKind::Setup)?;
    let fetcher = Fetcher::new(Arc::new(client), timeouts);
    let cache = AtlasCache::new(Arc::new(backend), fetcher, config.endpoints());
    Ok(AtlasService::new(cache, version, mode))
}

/// Catalog rebuilt from disk; empty if nothing has been refreshed yet.
async fn bootstrap(config: &Config) -> Result<Arc<CatalogSnapshot>> {
    let version = config.version.clone().unwrap_or_default();
    let service = open(config, version, config.population)?;
    let snapshot = service.bootstrap_from_cache().await.map_err(|e| {
        let reason = (*e).to_string();
        e.raise(ErrorKind::Service(reason))
    })?;
    Ok(snapshot.unwrap_or_default())
}

async fn refresh(service: &AtlasService, notifier: &dyn Notifier) -> Result<()> {
    notifier.notify(Notice::Started);
    match service.refresh().await {
        Ok(RefreshOutcome::Completed { atlases, sprites }) => {
            notifier.notify(Notice::Completed { atlases, sprites });
            Ok(())
        },
        Ok(RefreshOutcome::AlreadyRunning) => {
            notifier.notify(Notice::AlreadyRunning);
            Ok(())
        },
        Err(e) => {
            let reason = (*e).to_string();
            notifier.notify(Notice::Failed(reason.clone()));
            Err(e.raise(ErrorKind::Service(reason)))
        },
    }
}
