//! In-memory browser and store used by the crawl tests.
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use scraper::{Html, Selector};

use parfumo_scraper::brand_scraper::listing_url;
use parfumo_scraper::error::{SessionError, StoreError};
use parfumo_scraper::extractor::{SIMILAR_BUTTON, TAGS_BUTTON};
use parfumo_scraper::models::ProductRecord;
use parfumo_scraper::session::{BrowserHandle, PageSession};
use parfumo_scraper::store::{ProductStore, UpsertOutcome};
use parfumo_scraper::CrawlSettings;

pub const BASE: &str = "https://www.parfumo.com";
pub const BRAND_URL: &str = "https://www.parfumo.com/Perfumes/Creed";

/// A page plus the fragments its UI controls reveal when clicked.
#[derive(Debug, Clone, Default)]
pub struct FakePage {
    pub markup: String,
    pub reveals: Vec<(String, String)>,
}

impl FakePage {
    pub fn new(markup: impl Into<String>) -> Self {
        Self {
            markup: markup.into(),
            reveals: Vec::new(),
        }
    }

    pub fn reveal(mut self, button: &str, fragment: impl Into<String>) -> Self {
        self.reveals.push((button.to_string(), fragment.into()));
        self
    }

    fn render(&self, clicked: &HashSet<String>) -> String {
        let mut extra = String::new();
        for (button, fragment) in &self.reveals {
            if clicked.contains(button) {
                extra.push_str(fragment);
            }
        }
        match self.markup.rfind("</body>") {
            Some(at) => format!("{}{}{}", &self.markup[..at], extra, &self.markup[at..]),
            None => format!("{}{}", self.markup, extra),
        }
    }
}

#[derive(Default)]
struct SiteState {
    pages: HashMap<String, FakePage>,
    timeouts: HashSet<String>,
    visits: Vec<String>,
    max_contexts: Option<usize>,
    opened: usize,
    closed: usize,
}

/// Scripted site shared by every context of a [`FakeBrowser`].
#[derive(Clone, Default)]
pub struct FakeBrowser {
    state: Arc<Mutex<SiteState>>,
}

impl FakeBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(&self, url: &str, page: FakePage) -> &Self {
        self.state.lock().unwrap().pages.insert(url.to_string(), page);
        self
    }

    /// Navigation to `url` times out.
    pub fn time_out(&self, url: &str) -> &Self {
        self.state.lock().unwrap().timeouts.insert(url.to_string());
        self
    }

    /// Refuse to open more than `n` contexts in total.
    pub fn limit_contexts(&self, n: usize) -> &Self {
        self.state.lock().unwrap().max_contexts = Some(n);
        self
    }

    pub fn visits(&self) -> Vec<String> {
        self.state.lock().unwrap().visits.clone()
    }

    pub fn visited(&self, url: &str) -> bool {
        self.state.lock().unwrap().visits.iter().any(|v| v == url)
    }

    pub fn opened(&self) -> usize {
        self.state.lock().unwrap().opened
    }

    pub fn closed(&self) -> usize {
        self.state.lock().unwrap().closed
    }
}

#[async_trait]
impl BrowserHandle for FakeBrowser {
    type Session = FakeSession;

    async fn open_context(&self) -> Result<FakeSession, SessionError> {
        let mut state = self.state.lock().unwrap();
        if state.max_contexts.is_some_and(|max| state.opened >= max) {
            return Err(SessionError::Browser("context limit reached".to_string()));
        }
        state.opened += 1;
        Ok(FakeSession {
            state: Arc::clone(&self.state),
            current: FakePage::default(),
            clicked: HashSet::new(),
        })
    }
}

pub struct FakeSession {
    state: Arc<Mutex<SiteState>>,
    current: FakePage,
    clicked: HashSet<String>,
}

impl FakeSession {
    fn rendered(&self) -> String {
        self.current.render(&self.clicked)
    }
}

#[async_trait]
impl PageSession for FakeSession {
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<String, SessionError> {
        let page = {
            let mut state = self.state.lock().unwrap();
            state.visits.push(url.to_string());
            if state.timeouts.contains(url) {
                return Err(SessionError::NavigationTimeout {
                    url: url.to_string(),
                    timeout,
                });
            }
            state
                .pages
                .get(url)
                .cloned()
                .unwrap_or_else(|| FakePage::new("<html><body></body></html>"))
        };
        self.current = page;
        self.clicked.clear();
        Ok(self.rendered())
    }

    async fn wait_for(&mut self, selector: &str, _timeout: Duration) -> bool {
        let Ok(parsed) = Selector::parse(selector) else {
            return false;
        };
        let document = Html::parse_document(&self.rendered());
        let found = document.select(&parsed).next().is_some();
        found
    }

    async fn markup(&mut self) -> Result<String, SessionError> {
        Ok(self.rendered())
    }

    async fn run_script(&mut self, _script: &str) -> Result<(), SessionError> {
        Ok(())
    }

    async fn click(&mut self, selector: &str) -> Result<(), SessionError> {
        if self.current.reveals.iter().any(|(button, _)| button == selector) {
            self.clicked.insert(selector.to_string());
            Ok(())
        } else {
            Err(SessionError::ElementNotFound(selector.to_string()))
        }
    }

    async fn close(self) -> Result<(), SessionError> {
        self.state.lock().unwrap().closed += 1;
        Ok(())
    }
}

#[derive(Default)]
struct StoreState {
    records: HashMap<String, ProductRecord>,
    writes: usize,
    exists_calls: usize,
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<StoreState>,
    fail_writes: bool,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing_writes() -> Arc<Self> {
        Arc::new(Self {
            fail_writes: true,
            ..Self::default()
        })
    }

    pub fn get(&self, id: &str) -> Option<ProductRecord> {
        self.state.lock().unwrap().records.get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.state.lock().unwrap().records.len()
    }

    pub fn writes(&self) -> usize {
        self.state.lock().unwrap().writes
    }

    pub fn exists_calls(&self) -> usize {
        self.state.lock().unwrap().exists_calls
    }
}

#[async_trait]
impl ProductStore for MemoryStore {
    async fn exists(&self, id: &str) -> Result<bool, StoreError> {
        let mut state = self.state.lock().unwrap();
        state.exists_calls += 1;
        Ok(state.records.contains_key(id))
    }

    async fn upsert(&self, record: &ProductRecord) -> Result<UpsertOutcome, StoreError> {
        if self.fail_writes {
            return Err(StoreError::Other("write refused".to_string()));
        }
        let mut state = self.state.lock().unwrap();
        state.writes += 1;
        match state.records.insert(record.id.clone(), record.clone()) {
            Some(_) => Ok(UpsertOutcome::Replaced),
            None => Ok(UpsertOutcome::Inserted),
        }
    }
}

/// Settings for a crawl of [`BRAND_URL`] only, without delays.
pub fn settings() -> CrawlSettings {
    let mut settings = CrawlSettings::new(BASE);
    settings.brand_urls = vec![BRAND_URL.to_string()];
    settings.workers = 2;
    settings.delay_between_brands = Duration::ZERO;
    settings.render_timeout = Duration::from_millis(50);
    settings.reveal_timeout = Duration::from_millis(50);
    settings
}

pub fn product_url(slug: &str) -> String {
    format!("{}/{}", BRAND_URL, slug)
}

/// Listing page `page` of [`BRAND_URL`] linking to `slugs`, optionally with a pager link to the next page.
pub fn listing_page(slugs: &[&str], page: u32, has_next: bool) -> (String, FakePage) {
    let mut body = String::new();
    for slug in slugs {
        body.push_str(&format!(
            r#"<div class="col-normal"><div class="name"><a href="/Perfumes/Creed/{}">{}</a></div></div>"#,
            slug, slug
        ));
    }
    if has_next {
        body.push_str(&format!(
            r#"<div class="numbers"><div><a href="/Perfumes/Creed?current_page={}">next</a></div></div>"#,
            page + 1
        ));
    }
    (
        listing_url(BRAND_URL, page),
        FakePage::new(format!("<html><body>{}</body></html>", body)),
    )
}

/// Detail markup for product `id` called `name`, with an optional image host.
pub fn product_markup(id: &str, name: &str, image_host: Option<&str>) -> String {
    let images = match image_host {
        Some(host) => format!(
            r#"<img class="p-main-img" itemprop="image" src="{host}/img/{id}_main.jpg">
               <div id="p_imagery_holder"><a class="imagery_item" href="{host}/img/{id}_extra.png"></a></div>"#,
            host = host,
            id = id
        ),
        None => String::new(),
    };
    format!(
        r#"<html><head><meta property="og:image" content="https://pimages.parfumo.de/720/{id}_img-1_creed.jpg"></head>
        <body>
          <h1 class="p_name_h1" itemprop="name">{name}<span itemprop="brand"><span itemprop="name">Creed</span></span></h1>
          <span itemprop="description">A fresh scent.</span>
          <div class="s-circle-container"><div class="text-xs grey">Fruity</div></div>
          <span class="label_a">2010</span>
          {images}
          <div class="action_similar" data-type="all">Show all</div>
          <div class="action_inspiration" data-type="tags">Tags</div>
        </body></html>"#,
        id = id,
        name = name,
        images = images
    )
}

/// A product page whose controls reveal `similar` ids and `tags`.
pub fn product_page(id: &str, name: &str, image_host: Option<&str>, similar: &[&str], tags: &[&str]) -> FakePage {
    let similar_fragment: String = similar
        .iter()
        .map(|s| format!(r#"<div class="sim_item" data-s_id="{}"></div>"#, s))
        .collect();
    let tag_links: String = tags
        .iter()
        .map(|t| format!(r#"<a class="inline-block text-lg grey" href="/tags/{t}">{t}</a>"#, t = t))
        .collect();
    FakePage::new(product_markup(id, name, image_host))
        .reveal(SIMILAR_BUTTON, similar_fragment)
        .reveal(TAGS_BUTTON, format!(r#"<div id="tags_holder">{}</div>"#, tag_links))
}
