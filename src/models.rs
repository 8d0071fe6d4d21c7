//! Data models for pages, articles, and ingestion results.
//!
//! This module defines the core data structures passed between stages:
//! - [`RawPage`]: A fetched seed page, consumed once by the link extractor
//! - [`ArticleFields`]: What a [`DocumentFetcher`](crate::scrapers::fetcher::DocumentFetcher) returns for one URL
//! - [`Document`]: An ingested article, immutable once created
//! - [`IngestionResult`]: The succeeded/failed partition of one ingestion batch

use crate::errors::FetchError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A seed page as fetched from the network.
#[derive(Debug, Clone)]
pub struct RawPage {
    /// The URL the page was retrieved from. Its origin is the base for link resolution.
    pub source_url: String,
    /// The raw HTML.
    pub html_content: String,
}

/// Raw article fields produced by a fetcher before they are bound to a URL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArticleFields {
    pub title: String,
    pub authors: Vec<String>,
    pub publish_date: Option<DateTime<Utc>>,
    pub body_text: String,
}

/// A successfully ingested news article.
///
/// Fields are private so a document cannot change once the pipeline has built it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    url: String,
    title: String,
    authors: Vec<String>,
    publish_date: Option<DateTime<Utc>>,
    body_text: String,
}

impl Document {
    pub fn new(url: impl Into<String>, fields: ArticleFields) -> Self {
        Self {
            url: url.into(),
            title: fields.title,
            authors: fields.authors,
            publish_date: fields.publish_date,
            body_text: fields.body_text,
        }
    }

    /// The article URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// The article headline.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Bylines in the order they appeared.
    pub fn authors(&self) -> &[String] {
        &self.authors
    }

    pub fn publish_date(&self) -> Option<DateTime<Utc>> {
        self.publish_date
    }

    /// The article text.
    pub fn body_text(&self) -> &str {
        &self.body_text
    }
}

/// A candidate link that could not be ingested, with the classified reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedLink {
    pub url: String,
    pub reason: FetchError,
}

/// The outcome of ingesting one batch of candidate links.
///
/// Every input URL lands in exactly one of `succeeded` or `failed`, and both
/// sequences keep the relative order of the input.
#[derive(Debug, Clone, Default)]
pub struct IngestionResult {
    pub succeeded: Vec<Document>,
    pub failed: Vec<FailedLink>,
}

impl IngestionResult {
    /// Number of links covered by this result.
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    /// Consume the result, handing the documents downstream.
    pub fn into_documents(self) -> Vec<Document> {
        self.succeeded
    }
}
