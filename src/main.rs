use std::path::PathBuf;
use std::thread;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use log::{debug, info};
use tokio::sync::broadcast;

use archive_artwork::artwork_item::{ArtworkItem, ChannelArtwork, PlaylistArtwork, VideoArtwork};
use archive_artwork::artwork_store::{
    ArtworkOutcome, ArtworkStore, CachePathOptions, ChannelArtUrls, EntityId,
};
use archive_artwork::config::Config;
use archive_artwork::config_persistence::{default_config_path, load_or_create_config};
use archive_artwork::image_fetcher::ImageFetcher;
use archive_artwork::index::{lookup_item, IndexCollection, SqliteIndex};
use archive_artwork::jobs::{ArtworkManager, ArtworkService, BusJobQueue, JobQueue};
use archive_artwork::protocol::{ArtworkJob, ArtworkMessage, JobSummary, Message};

#[derive(Parser, Debug)]
#[clap(name = "archive-artwork", version, about = "Artwork cache maintenance for the archive")]
struct CliArgs {
    /// Path to the TOML configuration file. Created with defaults if missing.
    #[clap(long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level regardless of the configured level.
    #[clap(long, short, global = true)]
    verbose: bool,

    /// Run jobs through the bus worker instead of inline.
    #[clap(long, global = true)]
    queued: bool,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch artwork for every active entity that has none cached.
    DownloadMissing,
    /// Embed cached video thumbnails into their media files.
    SyncEmbedded,
    /// Download artwork for one entity.
    Download {
        #[clap(value_enum)]
        kind: EntityKind,
        id: String,
        /// Thumbnail (or channel icon) URL; looked up in the index when omitted.
        #[clap(long)]
        url: Option<String>,
        #[clap(long)]
        banner_url: Option<String>,
        #[clap(long)]
        skip_existing: bool,
    },
    /// Delete cached artwork for one entity.
    Delete {
        #[clap(value_enum)]
        kind: EntityKind,
        id: String,
    },
    /// Print a blurred preview of a cached video thumbnail as a data URI.
    Blur { id: String },
    /// Print the cache path of a video thumbnail.
    Path { id: String },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum EntityKind {
    Video,
    Channel,
    Playlist,
}

impl EntityKind {
    fn collection(self) -> IndexCollection {
        match self {
            EntityKind::Video => IndexCollection::Videos,
            EntityKind::Channel => IndexCollection::Channels,
            EntityKind::Playlist => IndexCollection::Playlists,
        }
    }
}

fn init_logging(verbose: bool) {
    let mut clog = colog::default_builder();
    clog.filter(None, log::LevelFilter::Trace);
    clog.init();
    log::set_max_level(if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    });

    std::panic::set_hook(Box::new(|panic_info| {
        let current_thread = std::thread::current();
        let thread_name = current_thread.name().unwrap_or("unnamed");
        log::error!("panic in thread '{}': {}", thread_name, panic_info);
    }));
}

fn load_config(path: Option<PathBuf>) -> Result<Config> {
    let path = match path {
        Some(path) => path,
        None => default_config_path().context("Could not determine config directory")?,
    };
    load_or_create_config(&path)
        .with_context(|| format!("Failed to load config from {}", path.display()))
}

fn build_service(config: &Config) -> Result<ArtworkService<SqliteIndex>> {
    let index = SqliteIndex::open(&config.index.database_path).with_context(|| {
        format!(
            "Failed to open index at {}",
            config.index.database_path.display()
        )
    })?;
    let store = ArtworkStore::new(config, ImageFetcher::new(config));
    Ok(ArtworkService::new(config.clone(), store, index))
}

fn item_from_args(
    kind: EntityKind,
    id: EntityId,
    url: Option<String>,
    banner_url: Option<String>,
) -> ArtworkItem {
    match kind {
        EntityKind::Video => ArtworkItem::Video(VideoArtwork { id, thumb_url: url }),
        EntityKind::Channel => ArtworkItem::Channel(ChannelArtwork {
            id,
            urls: ChannelArtUrls {
                icon: url,
                banner: banner_url,
            },
            fallback_override: None,
        }),
        EntityKind::Playlist => ArtworkItem::Playlist(PlaylistArtwork { id, thumb_url: url }),
    }
}

fn run_job(service: ArtworkService<SqliteIndex>, job: ArtworkJob, queued: bool) -> Result<JobSummary> {
    if !queued {
        return Ok(service.execute(&job)?);
    }

    let (bus_sender, _) = broadcast::channel(1024);
    let mut manager = ArtworkManager::new(bus_sender.subscribe(), bus_sender.clone(), service);
    let worker = thread::Builder::new()
        .name("artwork-manager".to_string())
        .spawn(move || manager.run())
        .context("Failed to spawn artwork worker")?;

    let handle = BusJobQueue::new(bus_sender.clone()).enqueue(job)?;
    debug!("Enqueued {} job_id={}", handle.name(), handle.job_id());
    let result = handle.wait();

    let _ = bus_sender.send(Message::Artwork(ArtworkMessage::Shutdown));
    if worker.join().is_err() {
        anyhow::bail!("Artwork worker panicked");
    }
    Ok(result?)
}

fn describe_outcome(outcome: &ArtworkOutcome) -> String {
    match outcome {
        ArtworkOutcome::Written { path, source } => {
            format!("written ({:?}) {}", source, path.display())
        }
        ArtworkOutcome::Skipped { path } => format!("skipped {}", path.display()),
        ArtworkOutcome::Unavailable { path } => format!("unavailable {}", path.display()),
    }
}

fn print_summary(summary: &JobSummary) {
    match summary {
        JobSummary::Validation(report) => {
            for collection in &report.collections {
                println!(
                    "{}: scanned={} written={} skipped={} unavailable={} failed={}{}",
                    collection.collection,
                    collection.scanned,
                    collection.written,
                    collection.skipped,
                    collection.unavailable,
                    collection.failed,
                    collection
                        .scan_error
                        .as_deref()
                        .map(|error| format!(" scan_error={error}"))
                        .unwrap_or_default()
                );
            }
        }
        JobSummary::Embedding(report) => {
            println!(
                "embedded {}/{} thumbnail(s)",
                report.embedded, report.total
            );
            for failure in &report.failures {
                println!(
                    "  {} ({}): {}",
                    failure.youtube_id,
                    failure.media_path.display(),
                    failure.reason
                );
            }
        }
        JobSummary::Downloaded {
            id,
            outcomes,
            failures,
        } => {
            for outcome in outcomes {
                println!("{id}: {}", describe_outcome(outcome));
            }
            for failure in failures {
                println!("{id}: failed: {failure}");
            }
        }
        JobSummary::Deleted { id, removed } => println!("{id}: removed {removed} file(s)"),
    }
}

fn main() -> Result<()> {
    let args = CliArgs::parse();
    init_logging(args.verbose);

    let config = load_config(args.config)?;
    if !args.verbose {
        log::set_max_level(config.logging.level_filter());
    }
    info!(
        "Using cache at {}, index at {}",
        config.application.cache_dir.display(),
        config.index.database_path.display()
    );

    let service = build_service(&config)?;
    let job = match args.command {
        Command::DownloadMissing => ArtworkJob::DownloadMissingArtwork,
        Command::SyncEmbedded => ArtworkJob::SyncEmbeddedThumbnails,
        Command::Download {
            kind,
            id,
            url,
            banner_url,
            skip_existing,
        } => {
            let item = if url.is_some() || banner_url.is_some() {
                item_from_args(kind, id.parse::<EntityId>()?, url, banner_url)
            } else {
                lookup_item(service.index(), kind.collection(), &id)?
            };
            ArtworkJob::DownloadArtwork {
                item,
                skip_existing,
            }
        }
        Command::Delete { kind, id } => ArtworkJob::DeleteArtwork {
            item: item_from_args(kind, id.parse::<EntityId>()?, None, None),
        },
        Command::Blur { id } => {
            println!("{}", service.store().blurred_preview(&id.parse::<EntityId>()?)?);
            return Ok(());
        }
        Command::Path { id } => {
            let path = service.store().video_thumb_path(
                &id.parse::<EntityId>()?,
                CachePathOptions {
                    absolute: true,
                    create_folder: false,
                },
            )?;
            println!("{}", path.display());
            return Ok(());
        }
    };

    let summary = run_job(service, job, args.queued)?;
    print_summary(&summary);
    Ok(())
}
