//! Front-page link discovery.
//!
//! Scans every `a[href]` on a seed page and keeps the links that point at
//! recent articles on the same site. Origin-relative links like
//! `/2024/05/06/world/story` are resolved against the seed origin; absolute links
//! are kept only when they share that origin.
//!
//! # Known limitation
//!
//! Deduplication is exact string equality on the resolved URL. Two links that
//! reach the same article through different spellings (query order, trailing
//! slash, fragment) are kept as distinct candidates.

use chrono::NaiveDate;
use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};
use url::Url;

use crate::models::RawPage;

static ANCHOR_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a[href]").expect("anchor selector is valid"));

static DATED_PATH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"/(\d{4})/(\d{2})/(\d{2})(?:/|$)").expect("dated path pattern is valid")
});

/// Decides whether a candidate URL is recent enough to ingest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RecencyFilter {
    /// Accept every same-origin link.
    Any,
    /// Accept paths with a segment exactly equal to `token`, e.g. a year.
    PathSegment { token: String },
    /// Accept paths containing `text` anywhere.
    PathSubstring { text: String },
    /// Accept paths carrying a `/YYYY/MM/DD/` date within `from..=to`.
    DateRange { from: NaiveDate, to: NaiveDate },
}

impl Default for RecencyFilter {
    fn default() -> Self {
        RecencyFilter::PathSegment {
            token: "2024".to_string(),
        }
    }
}

impl RecencyFilter {
    pub fn matches(&self, url: &Url) -> bool {
        let path = url.path();
        match self {
            RecencyFilter::Any => true,
            RecencyFilter::PathSegment { token } => path.split('/').any(|seg| seg == token),
            RecencyFilter::PathSubstring { text } => path.contains(text.as_str()),
            RecencyFilter::DateRange { from, to } => {
                path_date(path).is_some_and(|date| *from <= date && date <= *to)
            }
        }
    }
}

/// Pull the first `/YYYY/MM/DD/` date out of a URL path.
fn path_date(path: &str) -> Option<NaiveDate> {
    let caps = DATED_PATH.captures(path)?;
    let year = caps[1].parse().ok()?;
    let month = caps[2].parse().ok()?;
    let day = caps[3].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Extracts candidate article links from one HTML page.
///
/// Extraction is pure: no network or file access happens here.
#[derive(Debug, Clone)]
pub struct LinkExtractor {
    base: Url,
    recency: RecencyFilter,
}

impl LinkExtractor {
    /// Create an extractor for pages served from `base_url`'s origin.
    pub fn new(base_url: &str, recency: RecencyFilter) -> Result<Self, url::ParseError> {
        Ok(Self {
            base: Url::parse(base_url)?,
            recency,
        })
    }

    /// Extract candidate links from a fetched seed page.
    pub fn extract_page(&self, page: &RawPage) -> Vec<String> {
        self.extract(&page.html_content)
    }

    /// Return every same-origin, recent, distinct article URL in first-seen order.
    #[instrument(level = "info", skip_all, fields(base = %self.base))]
    pub fn extract(&self, html: &str) -> Vec<String> {
        let document = Html::parse_document(html);

        let mut anchors = 0usize;
        let links: Vec<String> = document
            .select(&ANCHOR_SELECTOR)
            .filter_map(|element| {
                anchors += 1;
                let href = element.value().attr("href")?;
                let resolved = self.resolve(href);
                if resolved.is_none() {
                    debug!(%href, "Skipping unresolvable href");
                }
                resolved
            })
            .filter(|url| url.origin() == self.base.origin())
            .filter(|url| self.recency.matches(url))
            .map(String::from)
            .unique()
            .collect();

        info!(anchors, count = links.len(), "Extracted candidate links");
        debug!(urls = ?links, "Candidate links");
        links
    }

    /// Resolve an `href` to an absolute URL.
    ///
    /// Origin-relative hrefs (single leading slash) join the base; absolute
    /// http(s) URLs are parsed as-is. Protocol-relative (`//host/...`),
    /// document-relative, and non-http hrefs resolve to `None`.
    fn resolve(&self, href: &str) -> Option<Url> {
        let href = href.trim();
        if href.starts_with("//") {
            return None;
        }
        if href.starts_with('/') {
            return self.base.join(href).ok();
        }
        let url = Url::parse(href).ok()?;
        matches!(url.scheme(), "http" | "https").then_some(url)
    }
}
