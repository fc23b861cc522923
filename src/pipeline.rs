//! The unit of work for one detail page.

use tracing::{debug, info};

use crate::config::CrawlSettings;
use crate::error::{RequiredField, ScrapeError};
use crate::extractor::{
    parse_detail, parse_id_from_markup, parse_similar_ids, parse_tags, Extractor, NAME_HEADER, SIMILAR_BUTTON,
    SIMILAR_ITEM, TAGS_BUTTON, TAG_LINKS,
};
use crate::media::MediaDownloader;
use crate::models::AssetRole;
use crate::session::{attempt_reveal, PageSession};
use crate::store::{ProductStore, UpsertOutcome};
use crate::translator::Translator;

/// What happened to one detail page that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetailOutcome {
    Stored { id: String, outcome: UpsertOutcome },
    /// The record already existed; nothing was extracted or written.
    Skipped { id: String },
}

/// Navigates, extracts, downloads and stores one product.
pub struct DetailPipeline<St, T> {
    store: St,
    translator: T,
    media: MediaDownloader,
    settings: CrawlSettings,
}

impl<St, T> DetailPipeline<St, T>
where
    St: ProductStore,
    T: Translator,
{
    pub fn new(store: St, translator: T, media: MediaDownloader, settings: CrawlSettings) -> Self {
        Self {
            store,
            translator,
            media,
            settings,
        }
    }

    pub fn settings(&self) -> &CrawlSettings {
        &self.settings
    }

    /// Process `url` in `session`.
    ///
    /// The id comes from the page metadata and is checked against the store
    /// before any other field is parsed, so a known product costs one
    /// navigation only.
    pub async fn process<P>(&self, session: &mut P, url: &str) -> Result<DetailOutcome, ScrapeError>
    where
        P: PageSession + ?Sized,
    {
        let settings = &self.settings;

        let mut markup = session.navigate(url, settings.navigation_timeout).await?;
        if session.wait_for(NAME_HEADER, settings.render_timeout).await {
            markup = session.markup().await?;
        } else {
            debug!("Product header did not render on {}", url);
        }

        let id = parse_id_from_markup(&markup).ok_or_else(|| ScrapeError::MissingRequiredField {
            url: url.to_string(),
            field: RequiredField::Id,
        })?;

        if !settings.force_recrawl {
            let exists = self.store.exists(&id).await.map_err(|source| ScrapeError::StoreRead {
                url: url.to_string(),
                id: id.clone(),
                source,
            })?;
            if exists {
                info!("Product {} already exists, skipping", id);
                return Ok(DetailOutcome::Skipped { id });
            }
        }

        let page = parse_detail(&markup, &settings.base_url).map_err(|field| ScrapeError::MissingRequiredField {
            url: url.to_string(),
            field,
        })?;

        let extractor = Extractor::new(&self.translator, &settings.target_lang);
        let main_image_url = page.main_image_url.clone();
        let additional_image_urls = page.additional_image_urls.clone();
        let mut record = extractor.localize(page, url).await;

        if let Some(image_url) = &main_image_url {
            record.main_image = self.media.download(image_url, &record.name, AssetRole::Main, None).await;
        }
        for (index, image_url) in additional_image_urls.iter().enumerate() {
            let reference = self
                .media
                .download(image_url, &record.name, AssetRole::Additional, Some(index))
                .await;
            if let Some(reference) = reference {
                record.additional_images.push(reference);
            }
        }

        if !attempt_reveal(session, SIMILAR_BUTTON, SIMILAR_ITEM, settings.reveal_timeout).await {
            debug!("Similar products not revealed on {}", url);
        }
        match session.markup().await {
            Ok(current) => markup = current,
            Err(e) => debug!("Keeping earlier markup for similar products of {}: {}", url, e),
        }
        record.similar_ids = parse_similar_ids(&markup);

        if attempt_reveal(session, TAGS_BUTTON, TAG_LINKS, settings.reveal_timeout).await {
            match session.markup().await {
                Ok(current) => {
                    let tags = parse_tags(&current);
                    record.tags = extractor.localize_tags(&tags).await;
                }
                Err(e) => debug!("Could not re-read tags of {}: {}", url, e),
            }
        } else {
            debug!("Tags section not found on {}", url);
        }

        let outcome = self.store.upsert(&record).await.map_err(|source| ScrapeError::StoreWrite {
            url: url.to_string(),
            id: id.clone(),
            source,
        })?;

        Ok(DetailOutcome::Stored { id, outcome })
    }
}
