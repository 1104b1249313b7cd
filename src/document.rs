//! The DOM seam. [`Document`] is everything the router and catalog need from
//! the host page, expressed as typed operations over the fixed set of
//! [`Region`]s they touch. [`MemoryDocument`] is a headless implementation
//! used by the CLI and the tests.

use crate::pagination::ScrollMetrics;
use crate::render::LOADING_INDICATOR_ID;
use crate::scripts::ScriptNode;
use crate::url::PageId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};

/// The history entry pushed for each navigation. Entries created outside the
/// router (such as the initial one) carry no page.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryState {
    pub page: Option<PageId>,
}

/// The parts of a page the catalog reads or writes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Region {
    /// `.articles-grid`, the listings.
    ArticlesGrid,

    /// `.pagination`, the whole pagination block.
    Pagination,

    /// `.pagination-prev`.
    PaginationPrevious,

    /// `.pagination-next`.
    PaginationNext,

    /// `.pagination-numbers`, the page-number container.
    PaginationNumbers,

    /// `#category-filters`, the topic checkboxes.
    CategoryFilters,

    /// `#results-number`.
    ResultsCount,

    /// `.results-header`, where filter messages appear.
    ResultsHeader,

    /// `#featured .card-grid`.
    FeaturedGrid,

    /// `.more-articles`.
    LatestArticles,

    /// `.popular-posts`.
    PopularPosts,
}

impl Region {
    /// The selector this region is found by in the host page.
    pub fn selector(self) -> &'static str {
        match self {
            Region::ArticlesGrid => ".articles-grid",
            Region::Pagination => ".pagination",
            Region::PaginationPrevious => ".pagination .pagination-prev",
            Region::PaginationNext => ".pagination .pagination-next",
            Region::PaginationNumbers => ".pagination .pagination-numbers",
            Region::CategoryFilters => "#category-filters",
            Region::ResultsCount => "#results-number",
            Region::ResultsHeader => ".results-header",
            Region::FeaturedGrid => "#featured .card-grid",
            Region::LatestArticles => ".more-articles",
            Region::PopularPosts => ".popular-posts",
        }
    }

    /// The markup that shows a fragment contains this region. The pagination
    /// controls live inside the pagination block, so they share its marker.
    fn marker(self) -> &'static str {
        match self {
            Region::ArticlesGrid => "articles-grid",
            Region::Pagination
            | Region::PaginationPrevious
            | Region::PaginationNext
            | Region::PaginationNumbers => "pagination",
            Region::CategoryFilters => r#"id="category-filters""#,
            Region::ResultsCount => r#"id="results-number""#,
            Region::ResultsHeader => "results-header",
            Region::FeaturedGrid => r#"id="featured""#,
            Region::LatestArticles => "more-articles",
            Region::PopularPosts => "popular-posts",
        }
    }
}

/// The tone of a transient filter message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MessageKind {
    Info,
    Success,
    Warning,
    Error,
}

impl MessageKind {
    /// The modifier class, e.g. `filter-message-success`.
    pub fn class(self) -> &'static str {
        match self {
            MessageKind::Info => "filter-message-info",
            MessageKind::Success => "filter-message-success",
            MessageKind::Warning => "filter-message-warning",
            MessageKind::Error => "filter-message-error",
        }
    }
}

/// A status line shown in the results header for a few seconds.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FilterMessage {
    pub text: String,
    pub kind: MessageKind,
}

impl FilterMessage {
    pub fn new<S: Into<String>>(text: S, kind: MessageKind) -> FilterMessage {
        FilterMessage {
            text: text.into(),
            kind,
        }
    }
}

/// What the router and catalog need from the host page.
pub trait Document {
    // --- Content container (`#site-content`) ---

    fn content(&self) -> &str;

    /// Replaces the container's markup. Scripts in `html` don't run.
    fn set_content(&mut self, html: &str);

    /// Inserts and runs a rebuilt script element.
    fn execute_script(&mut self, script: &ScriptNode);

    // --- Window ---

    fn push_history(&mut self, state: &HistoryState, url: &str);

    /// Marks the navigation links for `page` active and clears the rest.
    fn set_active_nav(&mut self, page: &PageId);

    fn set_ads_visible(&mut self, visible: bool);

    /// Hides every `.loading-indicator` still on the page.
    fn hide_loading_indicators(&mut self);

    fn scroll_metrics(&self) -> ScrollMetrics;

    fn scroll_to(&mut self, y: f64);

    // --- Catalog regions ---

    fn has_region(&self, region: Region) -> bool;

    fn set_region_html(&mut self, region: Region, html: &str);

    fn set_region_text(&mut self, region: Region, text: &str);

    fn set_region_visible(&mut self, region: Region, visible: bool);

    fn set_region_disabled(&mut self, region: Region, disabled: bool);

    /// Shows `message` in the results header, replacing any message already
    /// there.
    fn show_message(&mut self, id: u64, message: &FilterMessage);

    /// Removes the message with `id` if it's still showing.
    fn remove_message(&mut self, id: u64);

    // --- Filter controls ---

    /// The original topic names of the checked category checkboxes.
    fn checked_topics(&self) -> Vec<String>;

    /// The value of the checked time radio, if any.
    fn selected_time_window(&self) -> Option<String>;

    /// The trimmed search input.
    fn search_term(&self) -> String;

    /// Unchecks every topic, selects `all` and empties the search inputs.
    fn reset_controls(&mut self);
}

/// Layout constants for [`MemoryDocument`]'s height model.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Layout {
    pub viewport_height: f64,

    /// The height of everything that isn't a listings card.
    pub chrome_height: f64,

    /// The height added per `<article` in the listings grid.
    pub card_height: f64,
}

impl Default for Layout {
    fn default() -> Self {
        Layout {
            viewport_height: 800.0,
            chrome_height: 1200.0,
            card_height: 300.0,
        }
    }
}

/// A headless [`Document`]. A region exists when the current content markup
/// carries its marker; everything written to the document is kept for
/// inspection.
#[derive(Debug, Default)]
pub struct MemoryDocument {
    content: String,
    regions: HashMap<Region, String>,
    hidden: HashSet<Region>,
    disabled: HashSet<Region>,
    message: Option<(u64, FilterMessage)>,
    pub layout: Layout,
    scroll_y: f64,
    loading_indicators_hidden: bool,

    /// Every script the document was asked to run, in order.
    pub executed: Vec<ScriptNode>,

    /// Every pushed history entry with its URL.
    pub history: Vec<(HistoryState, String)>,
    pub active_nav: Option<PageId>,
    pub ads_visible: Option<bool>,

    // control state
    checked: BTreeSet<String>,
    time_window: Option<String>,
    search: String,
}

impl MemoryDocument {
    pub fn new() -> MemoryDocument {
        MemoryDocument::default()
    }

    /// The last markup or text written to `region`.
    pub fn region(&self, region: Region) -> Option<&str> {
        self.regions.get(&region).map(String::as_str)
    }

    pub fn is_hidden(&self, region: Region) -> bool {
        self.hidden.contains(&region)
    }

    pub fn is_disabled(&self, region: Region) -> bool {
        self.disabled.contains(&region)
    }

    pub fn message(&self) -> Option<&FilterMessage> {
        self.message.as_ref().map(|(_, message)| message)
    }

    pub fn scroll_y(&self) -> f64 {
        self.scroll_y
    }

    pub fn loading_indicators_hidden(&self) -> bool {
        self.loading_indicators_hidden
    }

    pub fn check_topic(&mut self, topic: &str) {
        self.checked.insert(topic.to_owned());
    }

    pub fn uncheck_topic(&mut self, topic: &str) {
        self.checked.remove(topic);
    }

    pub fn select_time_window(&mut self, value: &str) {
        self.time_window = Some(value.to_owned());
    }

    pub fn type_search(&mut self, term: &str) {
        self.search = term.to_owned();
    }

    /// The number of listings cards currently in the grid.
    fn card_count(&self) -> usize {
        self.regions
            .get(&Region::ArticlesGrid)
            .map_or(0, |grid| grid.matches("<article").count())
    }
}

impl Document for MemoryDocument {
    fn content(&self) -> &str {
        &self.content
    }

    fn set_content(&mut self, html: &str) {
        self.content = html.to_owned();
        self.regions.clear();
        self.hidden.clear();
        self.disabled.clear();
        self.message = None;
        self.loading_indicators_hidden = false;
    }

    fn execute_script(&mut self, script: &ScriptNode) {
        self.executed.push(script.clone());
    }

    fn push_history(&mut self, state: &HistoryState, url: &str) {
        self.history.push((state.clone(), url.to_owned()));
    }

    fn set_active_nav(&mut self, page: &PageId) {
        self.active_nav = Some(page.clone());
    }

    fn set_ads_visible(&mut self, visible: bool) {
        self.ads_visible = Some(visible);
    }

    fn hide_loading_indicators(&mut self) {
        self.loading_indicators_hidden = true;
    }

    fn scroll_metrics(&self) -> ScrollMetrics {
        ScrollMetrics {
            scroll_y: self.scroll_y,
            viewport_height: self.layout.viewport_height,
            document_height: self.layout.chrome_height
                + self.layout.card_height * self.card_count() as f64,
        }
    }

    fn scroll_to(&mut self, y: f64) {
        self.scroll_y = y.max(0.0).min(self.scroll_metrics().max_scroll());
    }

    fn has_region(&self, region: Region) -> bool {
        self.content.contains(region.marker())
    }

    fn set_region_html(&mut self, region: Region, html: &str) {
        self.regions.insert(region, html.to_owned());
    }

    fn set_region_text(&mut self, region: Region, text: &str) {
        self.regions.insert(region, text.to_owned());
    }

    fn set_region_visible(&mut self, region: Region, visible: bool) {
        if visible {
            self.hidden.remove(&region);
        } else {
            self.hidden.insert(region);
        }
    }

    fn set_region_disabled(&mut self, region: Region, disabled: bool) {
        if disabled {
            self.disabled.insert(region);
        } else {
            self.disabled.remove(&region);
        }
    }

    fn show_message(&mut self, id: u64, message: &FilterMessage) {
        if self.has_region(Region::ResultsHeader) {
            self.message = Some((id, message.clone()));
        }
    }

    fn remove_message(&mut self, id: u64) {
        if matches!(self.message, Some((current, _)) if current == id) {
            self.message = None;
        }
    }

    fn checked_topics(&self) -> Vec<String> {
        self.checked.iter().cloned().collect()
    }

    fn selected_time_window(&self) -> Option<String> {
        self.time_window.clone()
    }

    fn search_term(&self) -> String {
        self.search.trim().to_owned()
    }

    fn reset_controls(&mut self) {
        self.checked.clear();
        self.time_window = Some("all".to_owned());
        self.search.clear();
    }
}

impl MemoryDocument {
    /// True while the content is just the fragment-loading placeholder.
    pub fn is_loading(&self) -> bool {
        self.content.contains(LOADING_INDICATOR_ID)
    }
}
