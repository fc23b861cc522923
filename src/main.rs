use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use parfumo_scraper::browser::ChromiumBrowser;
use parfumo_scraper::{Config, Crawler, GoogleTranslator, MediaDownloader, MongoStore, Passthrough, Translator};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("parfumo_scraper=info")))
        .init();

    let config = Config::parse();
    let settings = config.crawl_settings();

    info!("Configuration:");
    info!("  Base URL: {}", settings.base_url);
    info!("  Database: {} / {}", config.database, config.collection);
    info!("  Image directory: {}", config.image_dir.display());
    info!("  Parallel contexts: {}", settings.workers);
    info!("  Max brands: {}", settings.max_brands.map_or("ALL".to_string(), |n| n.to_string()));
    info!("  Max pages per brand: {}", settings.max_pages.map_or("ALL".to_string(), |n| n.to_string()));
    info!("  Force recrawl: {}", settings.force_recrawl);
    info!("  Translate to: {}", if config.translate { settings.target_lang.as_str() } else { "off" });

    let store = MongoStore::connect(&config.connection_string(), &config.database, &config.collection)
        .await
        .context("failed to connect to MongoDB")?;
    if let Err(e) = store.create_indexes().await {
        warn!("Could not create indexes: {}", e);
    }
    let store = Arc::new(store);
    let initial_count = store.count().await.unwrap_or(0);
    info!("Products in database: {}", initial_count);

    let translator: Arc<dyn Translator> = if config.translate {
        Arc::new(GoogleTranslator::new(config.translate_url.clone()).context("failed to build translator")?)
    } else {
        Arc::new(Passthrough)
    };
    let media = MediaDownloader::new(config.image_dir.clone()).context("failed to build image downloader")?;

    let browser = ChromiumBrowser::launch(&config.chromium_options())
        .await
        .context("failed to start browser")?;

    let crawler = Crawler::new(browser, Arc::clone(&store), translator, media, settings);
    let stats = crawler.run().await;
    crawler.into_browser().shutdown().await;

    let final_count = store.count().await.unwrap_or(initial_count);
    info!(
        "Products in database: {} ({} new this run)",
        final_count,
        final_count.saturating_sub(initial_count)
    );
    info!("Stored {} of {} products found", stats.products.stored(), stats.products_found);

    Ok(())
}
