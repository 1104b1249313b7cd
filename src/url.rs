//! Page identifiers and the URLs derived from them. A [`PageId`] names a
//! content fragment (`content/{page}.html`); it is derived from a URL path by
//! [`PageId::from_path`], which is the only place that knows how paths map to
//! pages.

use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

const HTML_EXTENSION: &str = ".html";

/// The identifier of the canonical home page. Both `/` and `/index.html`
/// resolve to it.
pub const HOME_PAGE: &str = "home";

/// The link offered by the error panel when a fragment can't be loaded.
pub const HOME_LINK: &str = "index.html";

/// The directory that detail pages live in, relative to the site root.
pub const ARTICLES_DIRECTORY: &str = "narticles";

/// Identifies a content fragment. Two [`PageId`]s are equal iff they load the
/// same fragment.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageId(String);

impl PageId {
    /// Wraps a page identifier verbatim. Use [`PageId::from_path`] for
    /// anything that came out of a URL.
    pub fn new<S: Into<String>>(id: S) -> PageId {
        PageId(id.into())
    }

    /// The canonical home page.
    pub fn home() -> PageId {
        PageId(HOME_PAGE.to_owned())
    }

    /// Derives the page identifier for a URL path: the last path segment with
    /// everything from its first `.` stripped. An empty segment and `index`
    /// both map to [`HOME_PAGE`].
    pub fn from_path(path: &str) -> PageId {
        let segment = path.rsplit('/').next().unwrap_or_default();
        let stem = segment.split('.').next().unwrap_or_default();
        match stem {
            "" | "index" => PageId::home(),
            _ => PageId(stem.to_owned()),
        }
    }

    /// Resolves `href` against `base` and derives the page identifier from the
    /// resulting path, ignoring any query or fragment. Falls back to treating
    /// `href` as a bare path when it can't be joined.
    pub fn from_href(base: &Url, href: &str) -> PageId {
        match base.join(href) {
            Ok(url) => PageId::from_path(url.path()),
            Err(_) => PageId::from_path(
                href.split(|c| c == '?' || c == '#')
                    .next()
                    .unwrap_or_default(),
            ),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_home(&self) -> bool {
        self.0 == HOME_PAGE
    }

    /// The URL of this page's content fragment, relative to the site root.
    pub fn fragment_url(&self) -> String {
        format!("content/{}{}", self.0, HTML_EXTENSION)
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PageId {
    fn from(id: &str) -> PageId {
        PageId::new(id)
    }
}

/// Returns the detail-page URL for an article's `filename`. The `.html`
/// extension is appended only when it isn't already there, so applying this
/// to its own output's file name changes nothing.
pub fn detail_url(filename: &str) -> String {
    if filename.ends_with(HTML_EXTENSION) {
        format!("{}/{}", ARTICLES_DIRECTORY, filename)
    } else {
        format!("{}/{}{}", ARTICLES_DIRECTORY, filename, HTML_EXTENSION)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_page_from_root() {
        assert_eq!(PageId::home(), PageId::from_path("/"));
        assert_eq!(PageId::home(), PageId::from_path(""));
    }

    #[test]
    fn test_page_from_index() {
        assert_eq!(PageId::home(), PageId::from_path("/index.html"));
        assert_eq!(PageId::home(), PageId::from_path("/blog/index"));
    }

    #[test]
    fn test_page_from_named_fragment() {
        assert_eq!(PageId::from("home"), PageId::from_path("/home.html"));
        assert_eq!(PageId::from("contact"), PageId::from_path("/contact.html"));
        assert_eq!(PageId::from("about"), PageId::from_path("about.html"));
    }

    #[test]
    fn test_page_strips_from_first_dot() {
        assert_eq!(PageId::from("archive"), PageId::from_path("/archive.min.html"));
    }

    #[test]
    fn test_page_from_directory_path() {
        assert_eq!(PageId::home(), PageId::from_path("/blog/"));
    }

    #[test]
    fn test_page_from_href() -> Result<(), url::ParseError> {
        let base = Url::parse("https://aetherview.example/")?;
        assert_eq!(PageId::from("contact"), PageId::from_href(&base, "contact.html"));
        assert_eq!(PageId::from("contact"), PageId::from_href(&base, "/contact.html?ref=nav#form"));
        assert_eq!(PageId::home(), PageId::from_href(&base, "https://aetherview.example/"));
        Ok(())
    }

    #[test]
    fn test_fragment_url() {
        assert_eq!("content/about.html", PageId::from("about").fragment_url());
    }

    #[test]
    fn test_detail_url_appends_extension_once() {
        assert_eq!("narticles/rust-ownership.html", detail_url("rust-ownership"));
        assert_eq!("narticles/rust-ownership.html", detail_url("rust-ownership.html"));
    }
}
