//! Detail-page extraction.
//!
//! Parsing is synchronous and works on a markup snapshot ([`parse_detail`]);
//! translation happens afterwards in [`Extractor::localize`], so no parsed
//! document is held across an await point. Every optional field degrades to
//! an empty or absent value when its element is missing.

use chrono::Utc;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use crate::error::RequiredField;
use crate::models::{DescriptionLink, Notes, ProductRecord, Review, NO_RATING, UNKNOWN_BRAND};
use crate::translator::{Translator, AUTO};
use crate::utils::{absolute_url, four_digit_year, id_from_image_url, strip_origin};

/// Product header; its presence means the detail page has rendered.
pub const NAME_HEADER: &str = r#"h1.p_name_h1[itemprop="name"]"#;

/// Control that expands the similar-items list.
pub const SIMILAR_BUTTON: &str = r#"div.action_similar[data-type="all"]"#;
pub const SIMILAR_ITEM: &str = "div.sim_item";

/// Control that renders the tag cloud.
pub const TAGS_BUTTON: &str = r#"div.action_inspiration[data-type="tags"]"#;
pub const TAG_LINKS: &str = "div#tags_holder a.inline-block.text-lg.grey";

/// Source language of the product type label. It renders in French whatever the site locale.
pub const TYPE_SOURCE_LANG: &str = "fr";

const BRAND_NAME: &str = r#"span[itemprop="brand"] span[itemprop="name"]"#;
const OG_IMAGE: &str = r#"meta[property="og:image"]"#;
const DESCRIPTION: &str = r#"span[itemprop="description"]"#;
const TOP_NOTES: &str = "div.pyramid_block.nb_t .clickable_note_img";
const HEART_NOTES: &str = "div.pyramid_block.nb_m .clickable_note_img";
const BASE_NOTES: &str = "div.pyramid_block.nb_b .clickable_note_img";
const FLAT_NOTES: &str = "div.notes_list div.nb_n span.clickable_note_img";
const RATING: &str = r#"div.barfiller_element[data-type="bottle"] .bold.green"#;
const GENDER_ICON: &str = "div.p_gender_big i";
const ACCORDS: &str = "div.s-circle-container div.text-xs.grey";
const RELEASE_LABEL: &str = "span.label_a";
const TYPE_LABEL: &str = "span.p_con.label_a.pointer.upper";
const MAIN_IMAGE: &str = r#"img.p-main-img[itemprop="image"]"#;
const ADDITIONAL_IMAGES: &str = "div#p_imagery_holder a.imagery_item";
const REVIEWS: &str = "article.review";
const REVIEW_TITLE: &str = r#"div.text-lg.bold span[itemprop="name"]"#;
const REVIEW_BODY: &str = r#"div[itemprop="reviewBody"] div.leading-7"#;
const SECTION_HEADINGS: &str = "h2.text-lg.bold";

/// Parse a CSS selector. An invalid selector behaves like one that matches nothing.
pub fn selector(css: &str) -> Option<Selector> {
    match Selector::parse(css) {
        Ok(s) => Some(s),
        Err(e) => {
            debug!("Invalid selector {}: {:?}", css, e);
            None
        }
    }
}

/// Trimmed text content of an element.
pub fn element_text(element: &ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

fn select_first<'a>(scope: &'a Html, css: &str) -> Option<ElementRef<'a>> {
    let s = selector(css)?;
    let first = scope.select(&s).next();
    first
}

fn select_texts(scope: &Html, css: &str) -> Vec<String> {
    let Some(s) = selector(css) else {
        return Vec::new();
    };
    let texts: Vec<String> = scope.select(&s).map(|e| element_text(&e)).collect();
    texts
}

fn select_non_empty_texts(scope: &Html, css: &str) -> Vec<String> {
    select_texts(scope, css).into_iter().filter(|t| !t.is_empty()).collect()
}

/// How the release label was read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReleaseLabel {
    /// A four-digit year, stored verbatim.
    Year(String),
    /// Any other label, stored translated.
    Label(String),
}

/// Untranslated contents of a detail page.
#[derive(Debug, Clone, PartialEq)]
pub struct DetailPage {
    pub id: String,
    pub name: String,
    pub brand: String,
    pub description: Option<String>,
    pub description_links: Vec<DescriptionLink>,
    pub notes: Notes,
    pub rating: String,
    pub gender: Option<String>,
    pub release: Option<ReleaseLabel>,
    pub kind: Option<String>,
    pub accords: Vec<String>,
    pub main_image_url: Option<String>,
    pub additional_image_urls: Vec<String>,
    pub reviews: Vec<Review>,
    pub perfumers: Vec<String>,
}

/// Parse a rendered detail page.
///
/// Fails only when the page has no product name or no id-bearing image
/// metadata; such a page produces no record.
pub fn parse_detail(markup: &str, base_url: &str) -> Result<DetailPage, RequiredField> {
    let document = Html::parse_document(markup);

    let header = select_first(&document, NAME_HEADER).ok_or(RequiredField::Name)?;
    let name = header_name(&header).ok_or(RequiredField::Name)?;
    let brand = selector(BRAND_NAME)
        .and_then(|s| header.select(&s).next().map(|e| element_text(&e)))
        .filter(|b| !b.is_empty())
        .unwrap_or_else(|| UNKNOWN_BRAND.to_string());

    let id = parse_id(&document).ok_or(RequiredField::Id)?;

    let (description, description_links) = match parse_description(&document, base_url) {
        Some((text, links)) => (Some(text), links),
        None => (None, Vec::new()),
    };

    Ok(DetailPage {
        id,
        name,
        brand,
        description,
        description_links,
        notes: parse_notes(&document),
        rating: select_first(&document, RATING)
            .map(|e| element_text(&e))
            .unwrap_or_else(|| NO_RATING.to_string()),
        gender: parse_gender(&document),
        release: select_first(&document, RELEASE_LABEL).map(|e| {
            let label = element_text(&e);
            match four_digit_year(&label) {
                Some(year) => ReleaseLabel::Year(year),
                None => ReleaseLabel::Label(label),
            }
        }),
        kind: select_first(&document, TYPE_LABEL)
            .map(|e| element_text(&e))
            .filter(|k| !k.is_empty()),
        accords: select_texts(&document, ACCORDS),
        main_image_url: select_first(&document, MAIN_IMAGE)
            .and_then(|e| e.value().attr("src"))
            .and_then(|src| absolute_url(base_url, src)),
        additional_image_urls: parse_attr_urls(&document, ADDITIONAL_IMAGES, "href", base_url),
        reviews: parse_reviews(&document),
        perfumers: parse_perfumers(&document),
    })
}

/// Cheap id lookup from the page metadata alone.
pub fn parse_id_from_markup(markup: &str) -> Option<String> {
    parse_id(&Html::parse_document(markup))
}

fn parse_id(document: &Html) -> Option<String> {
    select_first(document, OG_IMAGE)
        .and_then(|e| e.value().attr("content"))
        .and_then(id_from_image_url)
}

/// The header's own text, without the nested brand span.
fn header_name(header: &ElementRef<'_>) -> Option<String> {
    header
        .children()
        .filter_map(|node| node.value().as_text())
        .map(|text| text.trim())
        .find(|text| !text.is_empty())
        .map(str::to_string)
}

fn parse_description(document: &Html, base_url: &str) -> Option<(String, Vec<DescriptionLink>)> {
    let element = select_first(document, DESCRIPTION)?;

    let mut links = Vec::new();
    if let Some(a) = selector("a") {
        for link in element.select(&a) {
            links.push(DescriptionLink {
                text: element_text(&link),
                href: strip_origin(link.value().attr("href").unwrap_or_default(), base_url),
            });
        }
    }

    let mut text = String::new();
    flatten_text(element, &mut text);
    Some((text.trim().to_string(), links))
}

/// Append the text of `element`, with every link replaced by its trimmed text.
fn flatten_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            out.push_str(text);
        } else if let Some(child_element) = ElementRef::wrap(child) {
            if child_element.value().name() == "a" {
                out.push_str(&element_text(&child_element));
            } else {
                flatten_text(child_element, out);
            }
        }
    }
}

/// Union of the pyramid layout and the flat list layout.
fn parse_notes(document: &Html) -> Notes {
    Notes {
        top: select_texts(document, TOP_NOTES),
        heart: select_texts(document, HEART_NOTES),
        base: select_texts(document, BASE_NOTES),
        additional: select_non_empty_texts(document, FLAT_NOTES),
    }
}

fn parse_gender(document: &Html) -> Option<String> {
    select_first(document, GENDER_ICON)
        .and_then(|icon| icon.value().attr("class"))
        .and_then(|classes| classes.split_whitespace().nth(1))
        .map(str::to_string)
}

fn parse_attr_urls(document: &Html, css: &str, attr: &str, base_url: &str) -> Vec<String> {
    let Some(s) = selector(css) else {
        return Vec::new();
    };
    let urls: Vec<String> = document
        .select(&s)
        .filter_map(|e| e.value().attr(attr))
        .filter_map(|href| absolute_url(base_url, href))
        .collect();
    urls
}

/// Reviews with both a title and a body. Half-present reviews are skipped.
fn parse_reviews(document: &Html) -> Vec<Review> {
    let (Some(reviews), Some(title_sel), Some(body_sel)) =
        (selector(REVIEWS), selector(REVIEW_TITLE), selector(REVIEW_BODY))
    else {
        return Vec::new();
    };

    let found: Vec<Review> = document
        .select(&reviews)
        .filter_map(|review| {
            let title = review.select(&title_sel).next()?;
            let body = review.select(&body_sel).next()?;
            Some(Review {
                title: element_text(&title),
                body: element_text(&body),
            })
        })
        .collect();
    found
}

/// Links in the `div.w-100` right after a "Perfumer"/"Perfumers" heading.
fn parse_perfumers(document: &Html) -> Vec<String> {
    let (Some(headings), Some(links)) = (selector(SECTION_HEADINGS), selector("a")) else {
        return Vec::new();
    };

    let mut perfumers = Vec::new();
    for heading in document.select(&headings) {
        if !element_text(&heading).contains("Perfumer") {
            continue;
        }
        let Some(sibling) = heading.next_siblings().find_map(ElementRef::wrap) else {
            continue;
        };
        let is_list = sibling.value().name() == "div" && sibling.value().classes().any(|c| c == "w-100");
        if is_list {
            perfumers.extend(sibling.select(&links).map(|a| element_text(&a)));
        }
    }
    perfumers
}

/// Declared ids of the similar-item markers currently in the page.
pub fn parse_similar_ids(markup: &str) -> Vec<String> {
    let document = Html::parse_document(markup);
    let Some(s) = selector(SIMILAR_ITEM) else {
        return Vec::new();
    };
    let ids: Vec<String> = document
        .select(&s)
        .filter_map(|item| item.value().attr("data-s_id"))
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect();
    ids
}

/// Untranslated tag labels currently in the page.
pub fn parse_tags(markup: &str) -> Vec<String> {
    select_texts(&Html::parse_document(markup), TAG_LINKS)
}

/// Applies translation to parsed pages.
pub struct Extractor<'a, T: ?Sized> {
    translator: &'a T,
    target_lang: &'a str,
}

impl<'a, T: Translator + ?Sized> Extractor<'a, T> {
    pub fn new(translator: &'a T, target_lang: &'a str) -> Self {
        Self {
            translator,
            target_lang,
        }
    }

    /// Translate the free-text fields of `page` into a record.
    ///
    /// The returned record has no assets, similar ids or tags; those need
    /// network or browser work and are filled in by the detail pipeline.
    pub async fn localize(&self, page: DetailPage, url: &str) -> ProductRecord {
        let lang = self.target_lang;
        let t = self.translator;

        let description = match page.description {
            Some(text) => Some(t.translate(&text, lang, AUTO).await),
            None => None,
        };
        let notes = Notes {
            top: t.translate_all(&page.notes.top, lang, AUTO).await,
            heart: t.translate_all(&page.notes.heart, lang, AUTO).await,
            base: t.translate_all(&page.notes.base, lang, AUTO).await,
            additional: t.translate_all(&page.notes.additional, lang, AUTO).await,
        };
        let release_year = match page.release {
            Some(ReleaseLabel::Year(year)) => Some(year),
            Some(ReleaseLabel::Label(label)) => Some(t.translate(&label, lang, AUTO).await),
            None => None,
        };
        let kind = match page.kind {
            Some(kind) => Some(t.translate(&kind, lang, TYPE_SOURCE_LANG).await),
            None => None,
        };
        let accords = t.translate_all(&page.accords, lang, AUTO).await;

        let mut reviews = Vec::with_capacity(page.reviews.len());
        for review in &page.reviews {
            reviews.push(Review {
                title: t.translate(&review.title, lang, AUTO).await,
                body: t.translate(&review.body, lang, AUTO).await,
            });
        }
        let perfumers = t.translate_all(&page.perfumers, lang, AUTO).await;

        ProductRecord {
            id: page.id,
            name: page.name,
            brand: page.brand,
            url: url.to_string(),
            description,
            description_links: page.description_links,
            notes,
            rating: page.rating,
            gender: page.gender,
            release_year,
            kind,
            accords,
            main_image: None,
            additional_images: Vec::new(),
            reviews,
            perfumers,
            similar_ids: Vec::new(),
            tags: Vec::new(),
            scraped_at: Utc::now(),
        }
    }

    pub async fn localize_tags(&self, tags: &[String]) -> Vec<String> {
        self.translator.translate_all(tags, self.target_lang, AUTO).await
    }
}
