//! Brand → listing → detail traversal.

use std::time::Duration;

use rand::Rng;
use tracing::{error, info, warn};

use crate::brand_scraper::{brand_index_url, listing_url, parse_brand_index, parse_listing};
use crate::config::CrawlSettings;
use crate::coordinator::{BatchReport, Coordinator};
use crate::error::SessionError;
use crate::media::MediaDownloader;
use crate::models::Brand;
use crate::pipeline::DetailPipeline;
use crate::session::{BrowserHandle, PageSession};
use crate::store::ProductStore;
use crate::translator::Translator;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CrawlStats {
    pub brands_found: usize,
    pub brands_processed: usize,
    /// Brands whose first listing page could not be loaded.
    pub brands_failed: usize,
    pub pages_visited: usize,
    pub products_found: usize,
    pub products: BatchReport,
}

pub struct Crawler<B, St, T> {
    browser: B,
    pipeline: DetailPipeline<St, T>,
    coordinator: Coordinator,
}

impl<B, St, T> Crawler<B, St, T>
where
    B: BrowserHandle,
    St: ProductStore,
    T: Translator,
{
    pub fn new(browser: B, store: St, translator: T, media: MediaDownloader, settings: CrawlSettings) -> Self {
        let coordinator = Coordinator::new(settings.workers);
        Self {
            browser,
            pipeline: DetailPipeline::new(store, translator, media, settings),
            coordinator,
        }
    }

    pub fn into_browser(self) -> B {
        self.browser
    }

    fn settings(&self) -> &CrawlSettings {
        self.pipeline.settings()
    }

    /// Crawl every brand. Failures are logged and counted, never returned.
    pub async fn run(&self) -> CrawlStats {
        let mut stats = CrawlStats::default();

        let mut index_session = match self.browser.open_context().await {
            Ok(session) => session,
            Err(e) => {
                error!("Could not open browsing context: {}", e);
                return stats;
            }
        };

        let brands = match self.brands(&mut index_session).await {
            Ok(brands) => brands,
            Err(e) => {
                error!("Failed to fetch brand index: {}", e);
                close_quietly(index_session).await;
                return stats;
            }
        };
        stats.brands_found = brands.len();
        if brands.is_empty() {
            warn!("No brands to crawl");
        }

        let limit = self.settings().max_brands.unwrap_or(usize::MAX).min(brands.len());
        info!("Found {} brands, crawling {}", brands.len(), limit);

        for (index, brand) in brands.iter().take(limit).enumerate() {
            info!("[{}/{}] Processing brand {}", index + 1, limit, brand.name);
            self.crawl_brand(&mut index_session, brand, &mut stats).await;

            if index + 1 < limit {
                let delay = jittered(self.settings().delay_between_brands);
                if !delay.is_zero() {
                    info!("Waiting {}ms before next brand", delay.as_millis());
                    tokio::time::sleep(delay).await;
                }
            }
        }

        close_quietly(index_session).await;
        log_summary(&stats);
        stats
    }

    async fn brands(&self, session: &mut B::Session) -> Result<Vec<Brand>, SessionError> {
        let settings = self.settings();
        if !settings.brand_urls.is_empty() {
            return Ok(settings.brand_urls.iter().map(|url| brand_from_url(url)).collect());
        }

        let url = brand_index_url(&settings.base_url);
        info!("Fetching brand index {}", url);
        let markup = session.navigate(&url, settings.navigation_timeout).await?;
        Ok(parse_brand_index(&markup, &settings.base_url))
    }

    async fn crawl_brand(&self, session: &mut B::Session, brand: &Brand, stats: &mut CrawlStats) {
        let settings = self.settings();
        let mut brand_report = BatchReport::default();
        let mut page = 1u32;

        loop {
            if settings.max_pages.is_some_and(|max| page > max) {
                info!("Reached page limit for {}", brand.name);
                break;
            }

            let url = listing_url(&brand.url, page);
            let markup = match session.navigate(&url, settings.navigation_timeout).await {
                Ok(markup) => markup,
                Err(e) => {
                    warn!("Failed to load listing page {} of {}: {}", page, brand.name, e);
                    if page == 1 {
                        stats.brands_failed += 1;
                        return;
                    }
                    break;
                }
            };
            stats.pages_visited += 1;

            let listing = parse_listing(&markup, &settings.base_url, page);
            if listing.product_urls.is_empty() {
                info!("No products on page {} of {}, brand finished", page, brand.name);
                break;
            }
            info!("Page {} of {}: {} products", page, brand.name, listing.product_urls.len());
            stats.products_found += listing.product_urls.len();

            let batch = self
                .coordinator
                .run_batch(&self.browser, &self.pipeline, &listing.product_urls)
                .await;
            brand_report.merge(batch);

            if !listing.has_next {
                break;
            }
            page += 1;
        }

        info!(
            "Brand {} done: {} stored, {} skipped, {} dropped, {} failed",
            brand.name,
            brand_report.stored(),
            brand_report.skipped,
            brand_report.dropped,
            brand_report.failed
        );
        stats.brands_processed += 1;
        stats.products.merge(brand_report);
    }
}

/// A brand named after the last path segment of its page URL.
pub fn brand_from_url(url: &str) -> Brand {
    let name = url
        .split(['?', '#'])
        .next()
        .unwrap_or(url)
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(url);
    Brand {
        name: name.replace(['_', '-'], " "),
        url: url.to_string(),
    }
}

/// `base` plus up to 25% random jitter.
fn jittered(base: Duration) -> Duration {
    let base_ms = u64::try_from(base.as_millis()).unwrap_or(u64::MAX);
    if base_ms == 0 {
        return base;
    }
    let extra = rand::thread_rng().gen_range(0..=base_ms / 4);
    Duration::from_millis(base_ms.saturating_add(extra))
}

async fn close_quietly<S: PageSession>(session: S) {
    if let Err(e) = session.close().await {
        warn!("Failed to close browsing context: {}", e);
    }
}

fn log_summary(stats: &CrawlStats) {
    info!("Crawl complete");
    info!("  Brands processed: {}/{}", stats.brands_processed, stats.brands_found);
    info!("  Brands failed: {}", stats.brands_failed);
    info!("  Listing pages visited: {}", stats.pages_visited);
    info!("  Products found: {}", stats.products_found);
    info!("  Inserted: {}", stats.products.inserted);
    info!("  Replaced: {}", stats.products.replaced);
    info!("  Skipped (existing): {}", stats.products.skipped);
    info!("  Dropped (incomplete): {}", stats.products.dropped);
    info!("  Failed: {}", stats.products.failed);
}
