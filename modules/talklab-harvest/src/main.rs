use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use talklab_common::{HarvestConfig, PlaylistEntry, SortMode, TalkRecord};
use talklab_harvest::analyzer::ProsodyAnalyzer;
use talklab_harvest::assets::{BatchItem, BatchRunner, YtDlpFetcher};
use talklab_harvest::enrich::Enricher;
use talklab_harvest::playlist::{self, YtDlpPlaylist};
use talklab_harvest::traits::CatalogApi;
use talklab_harvest::{listing, merge, store};
use ted_client::TedClient;

#[derive(Parser)]
#[command(name = "talklab", about = "Harvest talk metadata and build prosody datasets")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Harvest the talk catalog: listing, enrichment, audio, analysis, merge.
    Talks {
        /// How many talks to collect.
        count: usize,
        /// Listing order: `popular` or `newest`.
        sort: String,
        /// How many talks to download and analyze at once.
        #[arg(default_value_t = 5)]
        batch_size: usize,
    },
    /// Analyze a remote playlist instead of the talk catalog.
    Playlist {
        /// Playlist URL to enumerate.
        url: String,
        /// How many entries to download and analyze at once.
        #[arg(default_value_t = 4)]
        batch_size: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("talklab=info".parse()?))
        .init();

    let cli = Cli::parse();
    let config = HarvestConfig::from_env();
    config.ensure_dirs().context("failed to create artifact dirs")?;

    match cli.command {
        Command::Talks {
            count,
            sort,
            batch_size,
        } => {
            let sort: SortMode = sort.parse().map_err(|e: String| anyhow::anyhow!(e))?;
            run_talks(&config, count, sort, batch_size).await
        }
        Command::Playlist { url, batch_size } => run_playlist(&config, &url, batch_size).await,
    }
}

async fn run_talks(
    config: &HarvestConfig,
    count: usize,
    sort: SortMode,
    batch_size: usize,
) -> Result<()> {
    let client = TedClient::new(&config.search_url, &config.site_url, config.page_size);
    let api: &dyn CatalogApi = &client;

    // Stage 1: listing
    let slugs = listing::collect_slugs(
        api,
        count,
        sort,
        config.page_size as usize,
        config.listing_workers,
    )
    .await?;
    store::write_json(&config.slugs_path(), &slugs)?;

    // Stage 2: enrichment. Reads the persisted slug list — each stage only
    // consumes the previous stage's artifact.
    let slugs: Vec<String> = store::read_json(&config.slugs_path())?;
    let enricher = Enricher::new(api).await?;
    let records = enricher.enrich_all(&slugs, config.enrich_workers).await;
    store::write_json(&config.talks_path(), &records)?;

    // Stage 3: batched audio + analysis
    let records: Vec<TalkRecord> = store::read_json(&config.talks_path())?;
    let items = BatchItem::from_talks(&records);
    info!(
        records = records.len(),
        with_stream = items.len(),
        "Starting asset batches"
    );
    let fetcher = YtDlpFetcher::new(config);
    let analyzer = ProsodyAnalyzer::new(&config.analyzer_bin);
    BatchRunner::new(&fetcher, &analyzer, config, "slug")
        .run_batches(&items, batch_size)
        .await?;

    // Stage 4: merge
    merge::merge(
        config,
        "slug",
        &config.talks_path(),
        &config.final_talks_path(count, sort),
    )?;

    Ok(())
}

async fn run_playlist(config: &HarvestConfig, url: &str, batch_size: usize) -> Result<()> {
    // Stage 1: enumerate
    let index = YtDlpPlaylist::new(&config.ytdlp_bin);
    let entries = playlist::collect_entries(&index, url).await?;
    store::write_json(&config.playlist_path(), &entries)?;

    // Stage 2: batched audio + analysis
    let entries: Vec<PlaylistEntry> = store::read_json(&config.playlist_path())?;
    let items = BatchItem::from_playlist(&entries);
    let fetcher = YtDlpFetcher::new(config);
    let analyzer = ProsodyAnalyzer::new(&config.analyzer_bin);
    BatchRunner::new(&fetcher, &analyzer, config, "title")
        .run_batches(&items, batch_size)
        .await?;

    // Stage 3: merge
    merge::merge(
        config,
        "title",
        &config.playlist_path(),
        &config.final_playlist_path(),
    )?;

    Ok(())
}
