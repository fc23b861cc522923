use std::collections::HashSet;

use scraper::Html;

use crate::extractor::{element_text, selector};
use crate::models::Brand;
use crate::utils::absolute_url;

/// Facet filters applied to every listing page: grid view, name order, all genders.
pub const LISTING_FACETS: &str = "v=grid&o=n_asc&g_f=1&g_m=1&g_u=1";

const BRAND_LINKS: &str = "div.brands_list a[href]";
const PRODUCT_LINKS: &str = "div.col-normal div.name a[href]";

/// One page of a brand's product listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingPage {
    /// Absolute detail-page URLs, in page order, without duplicates.
    pub product_urls: Vec<String>,
    /// Whether the pager links to the following page.
    pub has_next: bool,
}

pub fn brand_index_url(base_url: &str) -> String {
    format!("{}/Brands/c", base_url.trim_end_matches('/'))
}

/// URL of listing page `page` (1-based) for a brand.
pub fn listing_url(brand_url: &str, page: u32) -> String {
    let separator = if brand_url.contains('?') { '&' } else { '?' };
    format!("{}{}current_page={}&{}", brand_url, separator, page, LISTING_FACETS)
}

/// Extract brand links from the brand index page.
pub fn parse_brand_index(html: &str, base_url: &str) -> Vec<Brand> {
    let document = Html::parse_document(html);
    let Some(links) = selector(BRAND_LINKS) else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    let mut brands = Vec::new();
    for element in document.select(&links) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        let Some(url) = absolute_url(base_url, href) else {
            continue;
        };
        if seen.insert(url.clone()) {
            brands.push(Brand {
                name: element_text(&element),
                url,
            });
        }
    }
    brands
}

/// Extract product links and the next-page control from listing page `page`.
pub fn parse_listing(html: &str, base_url: &str, page: u32) -> ListingPage {
    let document = Html::parse_document(html);

    let mut seen = HashSet::new();
    let mut product_urls = Vec::new();
    if let Some(links) = selector(PRODUCT_LINKS) {
        for element in document.select(&links) {
            let url = element
                .value()
                .attr("href")
                .and_then(|href| absolute_url(base_url, href));
            if let Some(url) = url {
                if seen.insert(url.clone()) {
                    product_urls.push(url);
                }
            }
        }
    }

    let next_css = format!("div.numbers div a[href*=\"current_page={}\"]", page + 1);
    let has_next = selector(&next_css)
        .map(|next| document.select(&next).next().is_some())
        .unwrap_or(false);

    ListingPage { product_urls, has_next }
}
