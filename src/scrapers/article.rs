//! Article page parsing.
//!
//! Turns one article's HTML into [`ArticleFields`]. Metadata comes from the
//! usual places news sites put it (Open Graph tags, `meta` bylines, `<time>`),
//! and the body is the text of the article's paragraphs.

use chrono::{DateTime, NaiveDate, Utc};
use itertools::Itertools;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};

use crate::errors::FetchError;
use crate::models::ArticleFields;

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("static selector is valid")
}

static OG_TITLE: Lazy<Selector> = Lazy::new(|| selector(r#"meta[property="og:title"]"#));
static TITLE: Lazy<Selector> = Lazy::new(|| selector("title"));
static HEADLINE: Lazy<Selector> = Lazy::new(|| selector("h1, .headline--lite"));
static AUTHOR_META: Lazy<Selector> = Lazy::new(|| {
    selector(r#"meta[name="author"], meta[property="article:author"]"#)
});
static DATE_META: Lazy<Selector> = Lazy::new(|| {
    selector(
        r#"meta[property="article:published_time"], meta[name="pubdate"], meta[itemprop="datePublished"]"#,
    )
});
static TIME: Lazy<Selector> = Lazy::new(|| selector("time[datetime]"));
static BODY_CANDIDATES: Lazy<Vec<Selector>> = Lazy::new(|| {
    vec![
        selector("article p"),
        selector(".article--lite p"),
        selector(".article__content p"),
        selector("p"),
    ]
});

/// Parse an article page.
///
/// # Errors
///
/// Returns a [`FetchErrorKind::ParseFailure`](crate::errors::FetchErrorKind::ParseFailure)
/// when no body text can be found.
pub fn parse_article(html: &str) -> Result<ArticleFields, FetchError> {
    let document = Html::parse_document(html);

    let body_text = extract_body(&document);
    if body_text.is_empty() {
        return Err(FetchError::parse_failure("article body is empty"));
    }

    Ok(ArticleFields {
        title: extract_title(&document),
        authors: extract_authors(&document),
        publish_date: extract_publish_date(&document),
        body_text,
    })
}

fn extract_title(document: &Html) -> String {
    let og = document
        .select(&OG_TITLE)
        .filter_map(|el| el.value().attr("content"))
        .map(collapse_whitespace)
        .find(|t| !t.is_empty());

    og.or_else(|| first_text(document, &TITLE))
        .or_else(|| first_text(document, &HEADLINE))
        .unwrap_or_default()
}

fn extract_authors(document: &Html) -> Vec<String> {
    document
        .select(&AUTHOR_META)
        .filter_map(|el| el.value().attr("content"))
        // article:author is sometimes a profile URL rather than a name
        .filter(|content| !content.starts_with("http"))
        .flat_map(|content| {
            content
                .split(',')
                .flat_map(|part| part.split(" and "))
                .map(collapse_whitespace)
                .collect::<Vec<_>>()
        })
        .filter(|name| !name.is_empty())
        .unique()
        .collect()
}

fn extract_publish_date(document: &Html) -> Option<DateTime<Utc>> {
    document
        .select(&DATE_META)
        .filter_map(|el| el.value().attr("content"))
        .chain(
            document
                .select(&TIME)
                .filter_map(|el| el.value().attr("datetime")),
        )
        .find_map(parse_date)
}

/// Parse an RFC 3339 timestamp or a bare `YYYY-MM-DD` date (taken as midnight UTC).
pub fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    let date_part = raw.get(..10)?;
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
        .ok()?
        .and_hms_opt(0, 0, 0)
        .map(|naive| naive.and_utc())
}

fn extract_body(document: &Html) -> String {
    for candidate in BODY_CANDIDATES.iter() {
        let paragraphs: Vec<String> = document
            .select(candidate)
            .map(element_text)
            .filter(|p| !p.is_empty())
            .collect();
        if !paragraphs.is_empty() {
            return paragraphs.join("\n");
        }
    }
    String::new()
}

fn first_text(document: &Html, selector: &Selector) -> Option<String> {
    document
        .select(selector)
        .map(element_text)
        .find(|t| !t.is_empty())
}

fn element_text(element: ElementRef<'_>) -> String {
    collapse_whitespace(&element.text().collect::<Vec<_>>().join(" "))
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::FetchErrorKind;
    use chrono::TimeZone;

    const ARTICLE: &str = r#"
        <html>
            <head>
                <title>Fallback title | CNN</title>
                <meta property="og:title" content="Senate passes  budget bill">
                <meta name="author" content="Jane Roe, John Doe and Ann Lee">
                <meta property="article:author" content="https://www.cnn.com/profiles/jane-roe">
                <meta property="article:published_time" content="2024-05-06T14:30:00-04:00">
            </head>
            <body>
                <nav><p>Menu</p></nav>
                <article>
                    <p>The Senate passed the budget bill late Monday.</p>
                    <p>   The vote was   51 to 49. </p>
                    <p></p>
                </article>
            </body>
        </html>
    "#;

    #[test]
    fn test_parse_full_article() {
        let fields = parse_article(ARTICLE).unwrap();
        assert_eq!(fields.title, "Senate passes budget bill");
        assert_eq!(fields.authors, vec!["Jane Roe", "John Doe", "Ann Lee"]);
        assert_eq!(
            fields.publish_date,
            Utc.with_ymd_and_hms(2024, 5, 6, 18, 30, 0).single()
        );
        assert_eq!(
            fields.body_text,
            "The Senate passed the budget bill late Monday.\nThe vote was 51 to 49."
        );
    }

    #[test]
    fn test_title_falls_back_to_title_tag_then_headline() {
        let html = "<html><head><title> Plain title </title></head><body><p>x</p></body></html>";
        assert_eq!(parse_article(html).unwrap().title, "Plain title");

        let html = "<html><body><h1 class=\"headline--lite\">Lite headline</h1><p>x</p></body></html>";
        assert_eq!(parse_article(html).unwrap().title, "Lite headline");
    }

    #[test]
    fn test_cnn_lite_layout() {
        let html = r#"
            <div class="headline--lite">Lite headline</div>
            <div class="article--lite"><p>First.</p><p>Second.</p></div>
        "#;
        let fields = parse_article(html).unwrap();
        assert_eq!(fields.body_text, "First.\nSecond.");
        assert!(fields.authors.is_empty());
        assert!(fields.publish_date.is_none());
    }

    #[test]
    fn test_empty_body_is_parse_failure() {
        let err = parse_article("<html><head><title>t</title></head><body></body></html>")
            .unwrap_err();
        assert_eq!(err.kind, FetchErrorKind::ParseFailure);
    }

    #[test]
    fn test_time_element_date() {
        let html = r#"<p>Body</p><time datetime="2024-03-01">March 1</time>"#;
        let fields = parse_article(html).unwrap();
        assert_eq!(
            fields.publish_date,
            Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).single()
        );
    }

    #[test]
    fn test_parse_date_rejects_garbage() {
        assert!(parse_date("yesterday").is_none());
        assert!(parse_date("").is_none());
        assert!(parse_date("2024-02-30").is_none());
    }
}
