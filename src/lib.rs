pub mod brand_scraper;
pub mod browser;
pub mod config;
pub mod coordinator;
pub mod crawler;
pub mod error;
pub mod extractor;
pub mod media;
pub mod models;
pub mod pipeline;
pub mod session;
pub mod store;
pub mod translator;
pub mod utils;

// Re-export main types
pub use brand_scraper::{listing_url, parse_brand_index, parse_listing, ListingPage};
pub use config::{Config, CrawlSettings};
pub use coordinator::{BatchReport, Coordinator};
pub use crawler::{CrawlStats, Crawler};
pub use error::{RequiredField, ScrapeError, SessionError, StoreError};
pub use extractor::{parse_detail, DetailPage, Extractor};
pub use media::MediaDownloader;
pub use models::{AssetReference, AssetRole, Brand, ProductRecord};
pub use pipeline::{DetailOutcome, DetailPipeline};
pub use session::{BrowserHandle, PageSession};
pub use store::{MongoStore, ProductStore, UpsertOutcome};
pub use translator::{GoogleTranslator, Passthrough, Translator};
