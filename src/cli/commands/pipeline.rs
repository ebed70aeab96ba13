//! Crawl and download commands.

use std::sync::Arc;

use console::style;
use tokio::sync::mpsc;

use vidacquire::config::Settings;
use vidacquire::metadata_log;
use vidacquire::models::{Session, VideoRecord};
use vidacquire::normalize::normalize;
use vidacquire::scrapers::{BrowserFetcher, ListingExtractor};
use vidacquire::storage::CollisionPolicy;
use vidacquire::services::{
    ConcurrencyDispatcher, DownloadConfig, DownloadEvent, DownloadResolver, ListingCrawler,
    SessionStore, StreamingDownloader,
};

use crate::cli::helpers::print_summary;
use crate::cli::progress::{progress_println, DownloadProgress};

fn new_fetcher(settings: &Settings) -> BrowserFetcher {
    BrowserFetcher::new(
        settings.browser.clone(),
        settings.listing.clone(),
        settings.login.clone(),
    )
}

/// Crawl, extract and normalize; writes `log.csv`. Returns the fetcher for reuse.
async fn crawl_records(
    settings: &Settings,
    start_url: &str,
    max_pages: usize,
) -> anyhow::Result<(BrowserFetcher, Vec<VideoRecord>)> {
    let extractor = ListingExtractor::new(&settings.listing)?;

    println!("{} Crawling {}", style("→").cyan(), start_url);
    let mut crawler = ListingCrawler::new(new_fetcher(settings)).with_settle(settings.settle);
    let pages = match crawler.crawl(start_url, max_pages).await {
        Ok(pages) => pages,
        Err(e) => {
            crawler.fetcher_mut().close().await;
            return Err(e.into());
        }
    };

    let records = normalize(extractor.extract_all(&pages));
    println!(
        "{} {} pages, {} records",
        style("✓").green(),
        pages.len(),
        records.len()
    );

    metadata_log::write_log(&settings.metadata_log_path(), &records)?;
    Ok((crawler.into_fetcher(), records))
}

/// Crawl the listing and write the metadata log.
pub async fn cmd_crawl(settings: &Settings, start_url: &str, max_pages: usize) -> anyhow::Result<()> {
    let (mut fetcher, _) = crawl_records(settings, start_url, max_pages).await?;
    fetcher.close().await;
    println!(
        "{} Wrote {}",
        style("✓").green(),
        settings.metadata_log_path().display()
    );
    Ok(())
}

/// Crawl, then resolve and download every record.
pub async fn cmd_run(
    settings: &Settings,
    start_url: &str,
    max_pages: usize,
    concurrency: Option<usize>,
    collision: Option<CollisionPolicy>,
) -> anyhow::Result<()> {
    let (mut fetcher, records) = crawl_records(settings, start_url, max_pages).await?;
    let collision = collision.unwrap_or(settings.collision);
    let result =
        download_records(settings, &mut fetcher, start_url, records, concurrency, collision).await;
    fetcher.close().await;
    result
}

async fn download_records(
    settings: &Settings,
    fetcher: &mut BrowserFetcher,
    start_url: &str,
    records: Vec<VideoRecord>,
    concurrency: Option<usize>,
    collision: CollisionPolicy,
) -> anyhow::Result<()> {
    if records.is_empty() {
        println!("{} Nothing to download", style("!").yellow());
        return Ok(());
    }

    let session = obtain_session(settings, fetcher, start_url).await?;

    let resolver = fetcher.link_resolver(settings.resolver.clone()).await?;
    let resolver = DownloadResolver::new(Arc::new(resolver)).with_timeout(settings.resolve_timeout);
    let downloader = StreamingDownloader::new(
        &DownloadConfig::default().with_collision(collision),
    )?;

    let (event_tx, mut event_rx) = mpsc::channel::<DownloadEvent>(100);
    let dispatcher = ConcurrencyDispatcher::new(resolver, Arc::new(downloader), &settings.output_path)
        .with_collision(collision)
        .with_events(event_tx);

    let limit = concurrency.unwrap_or(settings.concurrency).max(1);
    let mut progress = DownloadProgress::new(records.len() as u64);
    let display = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            progress.handle(event);
        }
        progress.finish();
    });

    println!(
        "{} Downloading {} records ({} at a time) to {}",
        style("→").cyan(),
        records.len(),
        limit,
        settings.output_path.display()
    );
    let results = dispatcher.run(records, Arc::new(session), limit).await;

    // Closes the event channel so the display task can finish
    drop(dispatcher);
    let _ = display.await;

    print_summary(&results);
    Ok(())
}

/// Persisted session, logging in first when there is none.
///
/// Credentials are only required when a login actually has to happen.
pub(super) async fn obtain_session(
    settings: &Settings,
    fetcher: &mut BrowserFetcher,
    login_fallback: &str,
) -> anyhow::Result<Session> {
    let store = SessionStore::new(&settings.session_file).with_expiry_check(settings.check_expiry);

    match settings.credentials(login_fallback) {
        Ok(credentials) => Ok(store.ensure(fetcher, &credentials).await?),
        Err(missing) => match store.current().await? {
            Some(session) => Ok(session),
            None => {
                progress_println(&format!(
                    "{} No saved session in {}",
                    style("✗").red(),
                    store.path().display()
                ));
                Err(missing.into())
            }
        },
    }
}
