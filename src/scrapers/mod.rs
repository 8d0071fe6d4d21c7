//! Article discovery and retrieval.
//!
//! Scraping follows a two-phase pattern:
//!
//! 1. **Indexing**: [`links`] discovers candidate article URLs on a seed page
//! 2. **Fetching**: [`fetcher`] downloads each URL and [`article`] parses it
//!
//! | Module | Role | Notes |
//! |--------|------|-------|
//! | [`links`] | Link extraction | Pure; same-origin + recency filter + dedup |
//! | [`article`] | Article parsing | Title, bylines, publish date, paragraphs |
//! | [`fetcher`] | HTTP capability | `reqwest` client, optional retry decorator |

pub mod article;
pub mod fetcher;
pub mod links;
