//! Run configuration.
//!
//! Every option can be given on the command line or through the environment
//! (a `.env` file is loaded first by the binary).

use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Parser};

use crate::browser::ChromiumOptions;
use crate::store::atlas_connection_string;

pub const DEFAULT_BASE_URL: &str = "https://www.parfumo.com";
pub const DEFAULT_MONGODB_URI: &str = "mongodb://localhost:27017/";

/// Knobs of the crawl itself, independent of how the collaborators are built.
#[derive(Debug, Clone)]
pub struct CrawlSettings {
    /// Site origin; listing links and description hrefs are resolved against it.
    pub base_url: String,
    /// Parallel browsing contexts per listing page.
    pub workers: usize,
    pub max_brands: Option<usize>,
    pub max_pages: Option<u32>,
    /// Crawl only these brand pages instead of the brand index.
    pub brand_urls: Vec<String>,
    /// Re-extract and replace records that already exist.
    pub force_recrawl: bool,
    pub target_lang: String,
    pub navigation_timeout: Duration,
    /// How long to wait for the product header after navigation.
    pub render_timeout: Duration,
    /// Bounded wait for each optional UI reveal.
    pub reveal_timeout: Duration,
    pub delay_between_brands: Duration,
}

impl CrawlSettings {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            workers: 4,
            max_brands: None,
            max_pages: None,
            brand_urls: Vec::new(),
            force_recrawl: false,
            target_lang: "ru".to_string(),
            navigation_timeout: Duration::from_secs(300),
            render_timeout: Duration::from_secs(10),
            reveal_timeout: Duration::from_secs(4),
            delay_between_brands: Duration::from_secs(5),
        }
    }
}

impl Default for CrawlSettings {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

#[derive(Debug, Clone, Parser)]
#[command(name = "parfumo_scraper", version, about = "Crawl the catalog into MongoDB")]
pub struct Config {
    #[arg(long, env = "BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Full connection string; takes precedence over the Atlas credentials.
    #[arg(long, env = "MONGODB_URI")]
    pub mongodb_uri: Option<String>,
    #[arg(long, env = "MONGO_DB_USERNAME")]
    pub mongo_username: Option<String>,
    #[arg(long, env = "MONGO_DB_PASSWORD", hide_env_values = true)]
    pub mongo_password: Option<String>,
    #[arg(long, env = "MONGO_DB_DOMAIN_NAME")]
    pub mongo_domain: Option<String>,
    #[arg(long, env = "MONGO_DB_DATABASE_NAME", default_value = "parfumo")]
    pub database: String,
    #[arg(long, env = "COLLECTION_NAME", default_value = "perfumes")]
    pub collection: String,

    /// Directory downloaded images are written to.
    #[arg(long, env = "IMAGE_DIR", default_value = "images")]
    pub image_dir: PathBuf,

    #[arg(long, env = "PARALLEL_THREADS", default_value_t = 4)]
    pub workers: usize,
    #[arg(long, env = "MAX_BRANDS")]
    pub max_brands: Option<usize>,
    #[arg(long, env = "MAX_PAGES")]
    pub max_pages: Option<u32>,
    /// Brand page URL to crawl instead of the brand index (repeatable).
    #[arg(long = "brand", env = "BRAND_URLS", value_delimiter = ',')]
    pub brand_urls: Vec<String>,
    #[arg(long, env = "FORCE_RECRAWL")]
    pub force_recrawl: bool,

    #[arg(long, env = "TARGET_LANG", default_value = "ru")]
    pub target_lang: String,
    #[arg(long, env = "TRANSLATE", default_value_t = true, action = ArgAction::Set)]
    pub translate: bool,
    #[arg(long, env = "TRANSLATE_URL", default_value = crate::translator::GOOGLE_TRANSLATE_URL)]
    pub translate_url: String,

    #[arg(long, env = "NAVIGATION_TIMEOUT_SECS", default_value_t = 300)]
    pub navigation_timeout_secs: u64,
    #[arg(long, env = "RENDER_TIMEOUT_SECS", default_value_t = 10)]
    pub render_timeout_secs: u64,
    #[arg(long, env = "REVEAL_TIMEOUT_MS", default_value_t = 4000)]
    pub reveal_timeout_ms: u64,
    #[arg(long, env = "DELAY_BETWEEN_BRANDS_MS", default_value_t = 5000)]
    pub delay_between_brands_ms: u64,

    #[arg(long, env = "HEADLESS", default_value_t = true, action = ArgAction::Set)]
    pub headless: bool,
    #[arg(long, env = "CHROME_EXECUTABLE")]
    pub chrome_executable: Option<PathBuf>,
    /// DevTools URL of an already running browser.
    #[arg(long, env = "BROWSER_URL")]
    pub browser_url: Option<String>,
}

impl Config {
    pub fn connection_string(&self) -> String {
        if let Some(uri) = &self.mongodb_uri {
            return uri.clone();
        }
        match (&self.mongo_username, &self.mongo_password, &self.mongo_domain) {
            (Some(user), Some(password), Some(domain)) => atlas_connection_string(user, password, domain),
            _ => DEFAULT_MONGODB_URI.to_string(),
        }
    }

    pub fn crawl_settings(&self) -> CrawlSettings {
        CrawlSettings {
            workers: self.workers.max(1),
            max_brands: self.max_brands,
            max_pages: self.max_pages,
            brand_urls: self.brand_urls.iter().filter(|u| !u.trim().is_empty()).cloned().collect(),
            force_recrawl: self.force_recrawl,
            target_lang: self.target_lang.clone(),
            navigation_timeout: Duration::from_secs(self.navigation_timeout_secs),
            render_timeout: Duration::from_secs(self.render_timeout_secs),
            reveal_timeout: Duration::from_millis(self.reveal_timeout_ms),
            delay_between_brands: Duration::from_millis(self.delay_between_brands_ms),
            ..CrawlSettings::new(self.base_url.clone())
        }
    }

    pub fn chromium_options(&self) -> ChromiumOptions {
        ChromiumOptions {
            headless: self.headless,
            executable: self.chrome_executable.clone(),
            remote_url: self.browser_url.clone(),
        }
    }
}
