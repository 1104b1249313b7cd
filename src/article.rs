//! Defines the [`Article`] record and the [`Store`] that holds the article
//! collection for the life of a document. Records arrive as JSON (see
//! [`Store::from_json`]) and are validated here, at the boundary, so that the
//! rest of the crate can rely on every [`Article`] having a unique filename
//! and a parsed date.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;
use tracing::warn;

/// The image shown for cards whose article has no `imageUrl`.
pub const PLACEHOLDER_IMAGE: &str = "images/placeholders/article.svg";

/// The thumbnail shown for sidebar items whose article has no `thumbnailUrl`.
pub const PLACEHOLDER_THUMBNAIL: &str = "images/placeholders/article-thumb.svg";

/// Articles are shared between the store, the active listing and lifecycle
/// events without being copied.
pub type ArticleRef = Rc<Article>;

/// A validated article record.
#[derive(Clone, Debug, PartialEq)]
pub struct Article {
    /// The content identity. Unique across a [`Store`].
    pub filename: String,
    pub title: String,
    pub author: String,
    pub category: String,
    pub excerpt: String,

    /// The publication date as it appeared in the source data.
    pub date_text: String,

    /// The parsed publication date, used for sorting and time windows.
    pub date: DateTime<Utc>,

    /// Zero or more topics; the union over all articles forms the facets.
    pub topics: Vec<String>,
    pub featured: bool,
    pub trending: bool,
    pub image_url: Option<String>,
    pub thumbnail_url: Option<String>,

    /// Estimated reading time in minutes.
    pub read_time: Option<u32>,
}

impl Article {
    /// The card image, falling back to [`PLACEHOLDER_IMAGE`].
    pub fn image(&self) -> &str {
        self.image_url.as_deref().unwrap_or(PLACEHOLDER_IMAGE)
    }

    /// The sidebar thumbnail, falling back to [`PLACEHOLDER_THUMBNAIL`].
    pub fn thumbnail(&self) -> &str {
        self.thumbnail_url.as_deref().unwrap_or(PLACEHOLDER_THUMBNAIL)
    }

    /// The detail-page URL. See [`crate::url::detail_url`].
    pub fn url(&self) -> String {
        crate::url::detail_url(&self.filename)
    }

    /// The date formatted for display, e.g. `March 4, 2025`.
    pub fn display_date(&self) -> String {
        format_date(&self.date)
    }
}

/// The wire shape of an article. Required fields are optional here so that
/// a record missing one is reported by name.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawArticle {
    filename: Option<String>,
    title: Option<String>,
    #[serde(default)]
    author: String,
    #[serde(default)]
    category: String,
    #[serde(default)]
    excerpt: String,
    date: Option<String>,
    #[serde(default)]
    topics: Vec<String>,
    #[serde(default)]
    featured: bool,
    #[serde(default)]
    trending: bool,
    image_url: Option<String>,
    thumbnail_url: Option<String>,
    read_time: Option<u32>,
}

impl RawArticle {
    /// Decodes one record of the document. A field of the wrong type (say, a
    /// scalar `topics`) fails this record only.
    fn from_value(record: Value) -> Result<RawArticle> {
        let filename = record
            .get("filename")
            .and_then(Value::as_str)
            .map(str::to_owned);
        serde_json::from_value(record).map_err(|err| Error::InvalidRecord { filename, err })
    }

    fn validate(self) -> Result<Article> {
        let filename = match self.filename {
            Some(filename) if !filename.is_empty() => filename,
            _ => {
                return Err(Error::MissingField {
                    filename: None,
                    field: "filename",
                })
            }
        };
        let title = self.title.ok_or_else(|| Error::MissingField {
            filename: Some(filename.clone()),
            field: "title",
        })?;
        let date_text = self.date.ok_or_else(|| Error::MissingField {
            filename: Some(filename.clone()),
            field: "date",
        })?;
        let date = parse_date(&date_text).ok_or_else(|| Error::InvalidDate {
            filename: filename.clone(),
            date: date_text.clone(),
        })?;
        Ok(Article {
            filename,
            title,
            author: self.author,
            category: self.category,
            excerpt: self.excerpt,
            date_text,
            date,
            topics: self.topics,
            featured: self.featured,
            trending: self.trending,
            image_url: self.image_url.filter(|url| !url.is_empty()),
            thumbnail_url: self.thumbnail_url.filter(|url| !url.is_empty()),
            read_time: self.read_time.filter(|&minutes| minutes > 0),
        })
    }
}

/// The in-memory article collection. Populated once per document life and
/// never mutated afterwards.
#[derive(Clone, Debug)]
pub struct Store {
    articles: Rc<[ArticleRef]>,
}

impl Default for Store {
    fn default() -> Self {
        Store::from_articles(Vec::new())
    }
}

impl Store {
    /// Parses a JSON array of article records. Malformed JSON fails the whole
    /// document; individual records that fail validation (wrongly typed or
    /// missing fields, unparseable dates, repeated filenames) are logged and
    /// dropped.
    pub fn from_json(json: &str) -> Result<Store> {
        let records: Vec<Value> = serde_json::from_str(json)?;
        let mut seen: HashSet<String> = HashSet::new();
        let mut articles: Vec<ArticleRef> = Vec::with_capacity(records.len());
        for record in records {
            let article = match RawArticle::from_value(record).and_then(RawArticle::validate) {
                Ok(article) => article,
                Err(err) => {
                    warn!(%err, "dropping article record");
                    continue;
                }
            };
            if !seen.insert(article.filename.clone()) {
                let err = Error::DuplicateFilename(article.filename);
                warn!(%err, "dropping article record");
                continue;
            }
            articles.push(Rc::new(article));
        }
        Ok(Store { articles: articles.into() })
    }

    pub fn from_articles(articles: Vec<Article>) -> Store {
        Store {
            articles: articles.into_iter().map(Rc::new).collect(),
        }
    }

    pub fn articles(&self) -> &[ArticleRef] {
        &self.articles
    }

    /// A cheap handle on the whole collection, as carried by
    /// [`crate::events::Event::ArticlesLoaded`].
    pub fn shared(&self) -> Rc<[ArticleRef]> {
        Rc::clone(&self.articles)
    }

    pub fn len(&self) -> usize {
        self.articles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.articles.is_empty()
    }
}

/// Parses the date formats found in article data. Dates without an offset are
/// taken to be UTC; a bare date is midnight UTC.
pub fn parse_date(input: &str) -> Option<DateTime<Utc>> {
    let input = input.trim();
    if let Ok(date) = DateTime::parse_from_rfc3339(input) {
        return Some(date.with_timezone(&Utc));
    }
    for format in &["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(input, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    let naive = NaiveDate::parse_from_str(input, "%Y-%m-%d").ok()?;
    Some(Utc.from_utc_datetime(&naive.and_hms_opt(0, 0, 0)?))
}

/// Formats a date as `Month D, YYYY`.
pub fn format_date(date: &DateTime<Utc>) -> String {
    date.format("%B %-d, %Y").to_string()
}

/// The result of a fallible article-loading operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents a problem loading article data.
#[derive(Debug)]
pub enum Error {
    /// Returned when the article document isn't a valid JSON array of
    /// records.
    Json(serde_json::Error),

    /// Returned when a record doesn't have the shape of an article, e.g. a
    /// field of the wrong type.
    InvalidRecord {
        filename: Option<String>,
        err: serde_json::Error,
    },

    /// Returned when a record lacks a required field.
    MissingField {
        filename: Option<String>,
        field: &'static str,
    },

    /// Returned when a record's date can't be parsed.
    InvalidDate { filename: String, date: String },

    /// Returned when a filename appears more than once.
    DuplicateFilename(String),
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Json(err) => write!(f, "parsing articles: {}", err),
            Error::InvalidRecord {
                filename: Some(filename),
                err,
            } => write!(f, "article `{}` is invalid: {}", filename, err),
            Error::InvalidRecord { filename: None, err } => {
                write!(f, "article record is invalid: {}", err)
            }
            Error::MissingField {
                filename: Some(filename),
                field,
            } => write!(f, "article `{}` is missing `{}`", filename, field),
            Error::MissingField { filename: None, field } => {
                write!(f, "article is missing `{}`", field)
            }
            Error::InvalidDate { filename, date } => {
                write!(f, "article `{}` has an invalid date `{}`", filename, date)
            }
            Error::DuplicateFilename(filename) => {
                write!(f, "article filename `{}` appears more than once", filename)
            }
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Json(err) => Some(err),
            Error::InvalidRecord { err, .. } => Some(err),
            Error::MissingField { .. } => None,
            Error::InvalidDate { .. } => None,
            Error::DuplicateFilename(_) => None,
        }
    }
}

impl From<serde_json::Error> for Error {
    /// Converts a [`serde_json::Error`] into an [`Error`]. It allows us to use
    /// the `?` operator for [`serde_json`] deserialization functions.
    fn from(err: serde_json::Error) -> Error {
        Error::Json(err)
    }
}

#[cfg(test)]
pub mod fixtures {
    //! Builders for articles in tests.

    use super::*;

    /// Builds an article dated `date` (`YYYY-MM-DD`) with sensible defaults
    /// for everything else.
    pub fn article(filename: &str, date: &str, topics: &[&str]) -> Article {
        Article {
            filename: filename.to_owned(),
            title: format!("Title of {}", filename),
            author: "Ada Byron".to_owned(),
            category: "Engineering".to_owned(),
            excerpt: format!("An excerpt about {}.", filename),
            date_text: date.to_owned(),
            date: parse_date(date).unwrap_or_else(Utc::now),
            topics: topics.iter().map(|t| (*t).to_owned()).collect(),
            featured: false,
            trending: false,
            image_url: None,
            thumbnail_url: None,
            read_time: None,
        }
    }

    /// `count` articles named `a00`, `a01`, ... one day apart, newest first,
    /// starting from 2025-01-31.
    pub fn dated_series(count: usize) -> Vec<Article> {
        (0..count)
            .map(|i| {
                let date = NaiveDate::from_ymd_opt(2025, 1, 31)
                    .and_then(|d| d.checked_sub_signed(chrono::Duration::days(i as i64)))
                    .map(|d| d.format("%Y-%m-%d").to_string())
                    .unwrap_or_default();
                article(&format!("a{:02}", i), &date, &[])
            })
            .collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const ARTICLES: &str = r#"[
        {
            "filename": "borrowing",
            "title": "Borrowing Without Tears",
            "author": "Ferris",
            "category": "Rust",
            "excerpt": "A gentle tour.",
            "date": "2025-03-04",
            "topics": ["Rust", "Memory"],
            "featured": true,
            "readTime": 7,
            "imageUrl": "images/borrowing.png"
        },
        {
            "filename": "goroutines.html",
            "title": "Goroutines at Scale",
            "author": "Gopher",
            "category": "Go",
            "excerpt": "Channels everywhere.",
            "date": "2025-02-11T08:30:00Z",
            "trending": true
        }
    ]"#;

    #[test]
    fn test_from_json() -> Result<()> {
        let store = Store::from_json(ARTICLES)?;
        assert_eq!(2, store.len());

        let borrowing = &store.articles()[0];
        assert_eq!("borrowing", borrowing.filename);
        assert_eq!(vec!["Rust", "Memory"], borrowing.topics);
        assert!(borrowing.featured);
        assert_eq!(Some(7), borrowing.read_time);
        assert_eq!("images/borrowing.png", borrowing.image());
        assert_eq!(PLACEHOLDER_THUMBNAIL, borrowing.thumbnail());

        let goroutines = &store.articles()[1];
        assert!(goroutines.topics.is_empty());
        assert!(goroutines.trending);
        assert_eq!(PLACEHOLDER_IMAGE, goroutines.image());
        assert_eq!("narticles/goroutines.html", goroutines.url());
        Ok(())
    }

    #[test]
    fn test_malformed_json_is_an_error() {
        match Store::from_json("[{\"filename\": ") {
            Err(Error::Json(_)) => {}
            other => panic!("wanted a JSON error, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_records_are_dropped() -> Result<()> {
        let store = Store::from_json(
            r#"[
                {"filename": "ok", "title": "Ok", "date": "2025-01-01"},
                {"filename": "bad-date", "title": "Bad", "date": "next tuesday"},
                {"title": "No filename", "date": "2025-01-01"},
                {"filename": "ok", "title": "Again", "date": "2025-01-02"}
            ]"#,
        )?;
        let filenames: Vec<&str> = store.articles().iter().map(|a| a.filename.as_str()).collect();
        assert_eq!(vec!["ok"], filenames);
        assert_eq!("Ok", store.articles()[0].title);
        Ok(())
    }

    #[test]
    fn test_wrongly_typed_records_are_dropped() -> Result<()> {
        let store = Store::from_json(
            r#"[
                {"filename": "ok", "title": "Ok", "date": "2025-01-01", "topics": ["Rust"]},
                {"filename": "scalar-topics", "title": "T", "date": "2025-01-01", "topics": "Rust"},
                {"filename": "text-read-time", "title": "R", "date": "2025-01-01", "readTime": "5"},
                "not even an object"
            ]"#,
        )?;
        assert_eq!(1, store.len());
        assert_eq!("ok", store.articles()[0].filename);
        Ok(())
    }

    #[test]
    fn test_invalid_record_names_its_filename() {
        let err = RawArticle::from_value(serde_json::json!({"filename": "x", "topics": "Rust"}))
            .err()
            .map(|err| err.to_string())
            .unwrap_or_default();
        assert!(err.starts_with("article `x` is invalid: "), "{}", err);
    }

    #[test]
    fn test_parse_date_formats() {
        let midnight = Utc.with_ymd_and_hms(2025, 3, 4, 0, 0, 0).single();
        assert_eq!(midnight, parse_date("2025-03-04"));
        assert_eq!(midnight, parse_date("2025-03-04T00:00:00"));
        assert_eq!(midnight, parse_date("2025-03-04 00:00:00"));
        assert_eq!(midnight, parse_date("2025-03-04T02:00:00+02:00"));
        assert_eq!(None, parse_date("04/03/2025"));
    }

    #[test]
    fn test_format_date() {
        let date = parse_date("2025-03-04").unwrap_or_else(Utc::now);
        assert_eq!("March 4, 2025", format_date(&date));
    }
}
