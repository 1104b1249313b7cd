//! Builds HTML fragments for the catalog and the router. Everything here is a
//! pure function of its arguments; text and attribute values are escaped with
//! [`pulldown_cmark`]'s escapers.

use crate::article::Article;
use crate::filter::{Criteria, Facet, TimeWindow};
use crate::pagination::PageControl;
use crate::url::HOME_LINK;
use pulldown_cmark::escape::{self, escape_href, escape_html};
use std::borrow::Cow;
use std::fmt::{self, Display, Write};
use std::io;

/// The maximum excerpt length, in characters, for list items.
pub const EXCERPT_MAX_LENGTH: usize = 400;

/// The id of the placeholder shown while a fragment is being fetched.
pub const LOADING_INDICATOR_ID: &str = "page-loading-indicator";

/// Lets [`pulldown_cmark`]'s escapers write into a [`fmt::Formatter`].
struct Adaptor<'a, T> {
    formatter: &'a mut T,
    result: fmt::Result,
}

impl<T> Adaptor<'_, T> {
    fn handle_result(&mut self, result: fmt::Result) -> io::Result<()> {
        match result {
            Ok(_) => Ok(()),
            Err(e) => {
                self.result = result;
                Err(io::Error::new(io::ErrorKind::Other, e))
            }
        }
    }
}

impl<T: fmt::Write> escape::StrWrite for Adaptor<'_, T> {
    fn write_str(&mut self, s: &str) -> io::Result<()> {
        let result = self.formatter.write_str(s);
        self.handle_result(result)
    }

    fn write_fmt(&mut self, args: fmt::Arguments) -> io::Result<()> {
        let result = self.formatter.write_fmt(args);
        self.handle_result(result)
    }
}

/// Displays text with HTML special characters escaped. Safe inside element
/// content and double-quoted attributes.
pub struct EscapeHtml<'a>(pub &'a str);

impl Display for EscapeHtml<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut adaptor = Adaptor {
            formatter: f,
            result: Ok(()),
        };
        let _ = escape_html(&mut adaptor, self.0);
        adaptor.result
    }
}

/// Displays a URL escaped for use in an `href` or `src` attribute.
pub struct EscapeHref<'a>(pub &'a str);

impl Display for EscapeHref<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut adaptor = Adaptor {
            formatter: f,
            result: Ok(()),
        };
        let _ = escape_href(&mut adaptor, self.0);
        adaptor.result
    }
}

/// The card variants.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CardStyle {
    Standard,

    /// The lead card of the featured section.
    Featured,

    /// No excerpt, read-time badge or "Continue Reading" link.
    Compact,
}

impl CardStyle {
    fn class(self) -> &'static str {
        match self {
            CardStyle::Standard => "card",
            CardStyle::Featured => "card featured",
            CardStyle::Compact => "card compact",
        }
    }
}

/// Renders an article as a card.
pub fn card(article: &Article, style: CardStyle) -> String {
    let url = article.url();
    let compact = style == CardStyle::Compact;
    let mut html = String::new();
    let _ = write!(
        html,
        r#"<article class="{}"><div class="card-image"><a href="{}"><img src="{}" alt="{}"></a></div>"#,
        style.class(),
        EscapeHref(&url),
        EscapeHref(article.image()),
        EscapeHtml(&article.title),
    );
    let _ = write!(
        html,
        r#"<div class="card-content"><div class="card-meta"><span class="category">{}</span><span class="date">{}</span>"#,
        EscapeHtml(&article.category),
        article.display_date(),
    );
    if let (false, Some(minutes)) = (compact, article.read_time) {
        let _ = write!(html, r#"<span class="read-time">{} min read</span>"#, minutes);
    }
    let _ = write!(
        html,
        r#"</div><h3 class="card-title"><a href="{}">{}</a></h3>"#,
        EscapeHref(&url),
        EscapeHtml(&article.title),
    );
    if !compact {
        let _ = write!(
            html,
            r#"<p class="card-excerpt">{}</p><a href="{}" class="read-more">Continue Reading</a>"#,
            EscapeHtml(&article.excerpt),
            EscapeHref(&url),
        );
    }
    html.push_str("</div></article>");
    html
}

/// Renders an article as an entry of the listings grid. The excerpt is cut to
/// `excerpt_length` characters.
pub fn list_item(article: &Article, excerpt_length: usize) -> String {
    let url = article.url();
    let mut html = String::new();
    let _ = write!(
        html,
        r#"<article class="article-card"><div class="article-image"><img src="{}" alt="{}"></div>"#,
        EscapeHref(article.image()),
        EscapeHtml(&article.title),
    );
    let _ = write!(
        html,
        r#"<div class="article-content"><h3><a href="{}">{}</a></h3><div class="article-meta"><span class="article-date">{}</span>"#,
        EscapeHref(&url),
        EscapeHtml(&article.title),
        article.display_date(),
    );
    if let Some(minutes) = article.read_time {
        let _ = write!(html, r#"<span class="article-read-time">{} min read</span>"#, minutes);
    }
    let _ = write!(
        html,
        r#"</div><p class="article-excerpt">{}</p><div class="article-tags">"#,
        EscapeHtml(&truncate_excerpt(&article.excerpt, excerpt_length)),
    );
    for topic in &article.topics {
        let _ = write!(html, r##"<a href="#" class="article-tag">{}</a>"##, EscapeHtml(topic));
    }
    html.push_str("</div></div></article>");
    html
}

/// Renders an article as an entry of the popular-posts sidebar.
pub fn sidebar_item(article: &Article) -> String {
    format!(
        r#"<li><a href="{}"><img src="{}" alt="{}"><div><h4>{}</h4></div></a></li>"#,
        EscapeHref(&article.url()),
        EscapeHref(article.thumbnail()),
        EscapeHtml(&article.title),
        EscapeHtml(&article.title),
    )
}

/// Cuts `text` to `max` characters and marks the cut with `...`. Text that
/// already fits comes back borrowed.
pub fn truncate_excerpt(text: &str, max: usize) -> Cow<'_, str> {
    match text.char_indices().nth(max) {
        None => Cow::Borrowed(text),
        Some((end, _)) => Cow::Owned(format!("{}...", &text[..end])),
    }
}

/// Renders the contents of the page-number container.
pub fn page_numbers(controls: &[PageControl]) -> String {
    let mut html = String::new();
    for control in controls {
        let _ = match control {
            PageControl::Page { number, active: true } => write!(
                html,
                r##"<a href="#" class="active" data-page-number="{0}">{0}</a>"##,
                number
            ),
            PageControl::Page { number, active: false } => {
                write!(html, r##"<a href="#" data-page-number="{0}">{0}</a>"##, number)
            }
            PageControl::Ellipsis => {
                write!(html, r#"<span class="pagination-ellipsis">...</span>"#)
            }
        };
    }
    html
}

/// Renders one checkbox per topic facet. The original topic name is kept in
/// `data-topic-name` since that's what filtering compares against.
pub fn facet_options(facets: &[Facet]) -> String {
    let mut html = String::new();
    for facet in facets {
        let _ = write!(
            html,
            r#"<label class="filter-option"><input type="checkbox" name="category" value="{}" data-topic-name="{}"> {}</label>"#,
            EscapeHtml(&facet.value),
            EscapeHtml(&facet.name),
            EscapeHtml(&facet.name),
        );
    }
    html
}

/// Why the listings grid has nothing to show.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoResults<'a> {
    /// The catalog itself is empty.
    Empty,

    /// A search for the given term matched nothing.
    Search(&'a str),

    /// The selected filters matched nothing.
    Filters,
}

impl NoResults<'_> {
    /// The block for `criteria` matching nothing: a search on its own offers
    /// to clear the search, anything else to clear the filters.
    pub fn for_criteria(criteria: &Criteria) -> NoResults<'_> {
        let search_only = criteria.topics.is_empty() && criteria.window == TimeWindow::All;
        if search_only && !criteria.search.is_empty() {
            NoResults::Search(&criteria.search)
        } else {
            NoResults::Filters
        }
    }
}

pub fn no_results(reason: NoResults) -> String {
    match reason {
        NoResults::Empty => r#"<div class="no-results"><h3>No articles found</h3><p>There are no articles available at this time.</p></div>"#.to_owned(),
        NoResults::Search(term) => format!(
            r#"<div class="no-results"><h3>No articles found</h3><p>No articles match your search term: "{}"</p><button class="btn btn-primary reset-search-btn">Clear Search</button></div>"#,
            EscapeHtml(term),
        ),
        NoResults::Filters => r#"<div class="no-results"><h3>No articles found</h3><p>No articles match your current filter selections.</p><button class="btn btn-primary clear-filters-btn">Clear All Filters</button></div>"#.to_owned(),
    }
}

pub fn no_featured() -> &'static str {
    r#"<div class="no-featured"><p>No featured articles available at this time.</p></div>"#
}

pub fn no_latest() -> &'static str {
    r#"<div class="no-latest"><p>No recent articles available.</p></div>"#
}

pub fn no_trending() -> &'static str {
    r#"<li class="no-trending"><p>No trending articles at this time.</p></li>"#
}

pub fn loading_indicator() -> String {
    format!(
        r#"<div class="loading-indicator" id="{}"><div class="spinner"></div><p>Loading content...</p></div>"#,
        LOADING_INDICATOR_ID
    )
}

/// The inline panel shown when a fragment can't be loaded. Offers a link back
/// to the home page.
pub fn error_panel(detail: &str) -> String {
    format!(
        r#"<div class="error-message"><h2>Oops! Something went wrong</h2><p>We couldn't load the requested page. Please try again later.</p><p class="error-details">{}</p><a href="{}" class="btn btn-primary">Return to Home</a></div>"#,
        EscapeHtml(detail),
        HOME_LINK,
    )
}
