//! The article catalog as it lives on a page. [`Catalog`] fetches the article
//! collection once per document life, renders the curated sections and the
//! listings grid, and owns the listing state: the active filtered and sorted
//! sequence, the pagination over it, and the criteria that produced it.
//!
//! The active sequence is the only thing pagination slices. Every filter,
//! search, sort or clear replaces it wholesale and goes back to page 1.

use crate::article::{self, ArticleRef, Store};
use crate::document::{FilterMessage, MessageKind, Region};
use crate::events::{Context, Event, EventKind, Listener};
use crate::fetch::FetchError;
use crate::filter::{self, Criteria, SortKey, TimeWindow};
use crate::pagination::{Pagination, PAGE_SIZE};
use crate::render::{self, CardStyle, NoResults, EXCERPT_MAX_LENGTH, LOADING_INDICATOR_ID};
use crate::timers::{Task, MESSAGE_LIFETIME_MS};
use crate::url::PageId;
use std::fmt;
use tracing::{debug, error, info, warn};

/// Where the catalog fetches its articles from.
pub const ARTICLES_URL: &str = "/data/articles.json";

/// The number of articles in the featured section.
const FEATURED_COUNT: usize = 3;

/// The number of compact cards in the latest-articles list.
const LATEST_COUNT: usize = 2;

/// The number of entries in the popular-posts sidebar.
const POPULAR_COUNT: usize = 3;

#[derive(Debug)]
pub enum Error {
    /// The request for the dataset failed outright.
    Fetch(FetchError),

    /// The dataset request answered with a non-2xx status.
    Status(u16),

    /// The dataset isn't a valid article collection.
    Parse(article::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Fetch(err) => write!(f, "Fetching articles: {}", err),
            Error::Status(status) => write!(f, "Failed to load articles: {}", status),
            Error::Parse(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Fetch(err) => Some(err),
            Error::Status(_) => None,
            Error::Parse(err) => Some(err),
        }
    }
}

impl From<FetchError> for Error {
    fn from(err: FetchError) -> Error {
        Error::Fetch(err)
    }
}

impl From<article::Error> for Error {
    fn from(err: article::Error) -> Error {
        Error::Parse(err)
    }
}

/// The articles module for one document life.
pub struct Catalog {
    store: Store,
    loaded: bool,
    page: Option<PageId>,
    active: Vec<ArticleRef>,
    pagination: Pagination,
    criteria: Criteria,
    sort: Option<SortKey>,
    page_size: usize,
    excerpt_length: usize,
    next_message: u64,
}

impl Default for Catalog {
    fn default() -> Self {
        Catalog::new(PAGE_SIZE, EXCERPT_MAX_LENGTH)
    }
}

impl Catalog {
    pub fn new(page_size: usize, excerpt_length: usize) -> Catalog {
        Catalog {
            store: Store::default(),
            loaded: false,
            page: None,
            active: Vec::new(),
            pagination: Pagination::new(0, page_size),
            criteria: Criteria::default(),
            sort: None,
            page_size: page_size.max(1),
            excerpt_length,
            next_message: 0,
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Whether the collection has been fetched in this document life.
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// The sequence pagination currently slices.
    pub fn active(&self) -> &[ArticleRef] {
        &self.active
    }

    pub fn pagination(&self) -> Pagination {
        self.pagination
    }

    pub fn criteria(&self) -> &Criteria {
        &self.criteria
    }

    /// Fetches the collection unless it's already loaded, publishing
    /// [`Event::ArticlesLoaded`] on success. A failure leaves the catalog
    /// empty and is retried on the next call.
    pub fn load_articles(&mut self, cx: &mut Context) -> Result<(), Error> {
        if self.loaded {
            debug!("articles already loaded");
            return Ok(());
        }
        match self.fetch_articles(cx) {
            Ok(store) => {
                info!(count = store.len(), "loaded articles");
                self.store = store;
                self.loaded = true;
                cx.events.publish(Event::ArticlesLoaded(self.store.shared()));
                Ok(())
            }
            Err(err) => {
                error!(%err, "error loading articles");
                Err(err)
            }
        }
    }

    fn fetch_articles(&self, cx: &mut Context) -> Result<Store, Error> {
        let response = cx.fetcher.fetch(ARTICLES_URL)?;
        if !response.is_success() {
            return Err(Error::Status(response.status));
        }
        Ok(Store::from_json(&response.body)?)
    }

    /// Renders whatever catalog regions the current page has. The listings
    /// are only initialized on the home page.
    pub fn init_components(&mut self, cx: &mut Context) {
        self.init_featured(cx);
        self.init_latest(cx);
        self.init_popular(cx);
        if self.page.as_ref().map_or(false, PageId::is_home) {
            self.init_listings(cx);
        }
    }

    fn init_featured(&self, cx: &mut Context) {
        if !cx.document.has_region(Region::FeaturedGrid) {
            return;
        }
        let featured: Vec<&ArticleRef> = self
            .store
            .articles()
            .iter()
            .filter(|a| a.featured)
            .take(FEATURED_COUNT)
            .collect();
        let html = if featured.is_empty() {
            render::no_featured().to_owned()
        } else {
            featured
                .iter()
                .enumerate()
                .map(|(i, a)| {
                    let style = if i == 0 { CardStyle::Featured } else { CardStyle::Standard };
                    render::card(a, style)
                })
                .collect()
        };
        cx.document.set_region_html(Region::FeaturedGrid, &html);
    }

    fn init_latest(&self, cx: &mut Context) {
        if !cx.document.has_region(Region::LatestArticles) {
            return;
        }
        let mut latest: Vec<ArticleRef> = self
            .store
            .articles()
            .iter()
            .filter(|a| !a.featured)
            .cloned()
            .collect();
        filter::sort(&mut latest, SortKey::Newest);
        latest.truncate(LATEST_COUNT);
        let html = if latest.is_empty() {
            render::no_latest().to_owned()
        } else {
            latest.iter().map(|a| render::card(a, CardStyle::Compact)).collect()
        };
        cx.document.set_region_html(Region::LatestArticles, &html);
    }

    fn init_popular(&self, cx: &mut Context) {
        if !cx.document.has_region(Region::PopularPosts) {
            return;
        }
        let html: String = self
            .store
            .articles()
            .iter()
            .filter(|a| a.trending)
            .take(POPULAR_COUNT)
            .map(|a| render::sidebar_item(a))
            .collect();
        let html = if html.is_empty() { render::no_trending().to_owned() } else { html };
        cx.document.set_region_html(Region::PopularPosts, &html);
    }

    /// Shows the whole collection newest first, on page 1, and rebuilds the
    /// topic checkboxes.
    pub fn init_listings(&mut self, cx: &mut Context) {
        if !cx.document.has_region(Region::ArticlesGrid) {
            return;
        }
        self.criteria = Criteria::default();
        self.sort = None;
        self.replace_active(newest_first(self.store.articles()));
        self.pagination = self.pagination.at(1);
        self.render_page(cx);
        self.populate_facets(cx);
    }

    fn populate_facets(&self, cx: &mut Context) {
        if !cx.document.has_region(Region::CategoryFilters) || self.store.is_empty() {
            return;
        }
        let facets = filter::facets(self.store.articles());
        cx.document.set_region_html(Region::CategoryFilters, &render::facet_options(&facets));
        debug!(count = facets.len(), "populated category filters");
    }

    fn replace_active(&mut self, active: Vec<ArticleRef>) {
        self.pagination = Pagination::new(active.len(), self.page_size);
        self.active = active;
    }

    /// Renders page `page` of the active sequence, keeping the reader's
    /// distance from the bottom of the document once layout settles.
    pub fn display_page(&mut self, page: usize, cx: &mut Context) {
        if !cx.document.has_region(Region::ArticlesGrid) {
            return;
        }
        let distance = cx.document.scroll_metrics().distance_from_bottom();
        self.pagination = self.pagination.at(page);
        self.render_page(cx);
        cx.timers.schedule(0, Task::RestoreScroll { distance });
    }

    /// Renders the current page into the grid and the pagination block.
    fn render_page(&self, cx: &mut Context) {
        let visible = self.pagination.slice(&self.active);
        if visible.is_empty() {
            cx.document
                .set_region_html(Region::ArticlesGrid, &render::no_results(NoResults::Empty));
        } else {
            let html: String = visible
                .iter()
                .map(|a| render::list_item(a, self.excerpt_length))
                .collect();
            cx.document.set_region_html(Region::ArticlesGrid, &html);
            cx.document
                .set_region_text(Region::ResultsCount, &self.active.len().to_string());
        }
        self.update_pagination(cx);
    }

    fn update_pagination(&self, cx: &mut Context) {
        if !cx.document.has_region(Region::Pagination) {
            return;
        }
        if !self.pagination.is_visible() {
            cx.document.set_region_visible(Region::Pagination, false);
            return;
        }
        cx.document.set_region_visible(Region::Pagination, true);
        cx.document
            .set_region_disabled(Region::PaginationPrevious, self.pagination.previous_disabled());
        cx.document
            .set_region_disabled(Region::PaginationNext, self.pagination.next_disabled());
        cx.document.set_region_html(
            Region::PaginationNumbers,
            &render::page_numbers(&self.pagination.controls()),
        );
    }

    fn show_no_results(&self, reason: NoResults, cx: &mut Context) {
        cx.document.set_region_html(Region::ArticlesGrid, &render::no_results(reason));
        if cx.document.has_region(Region::Pagination) {
            cx.document.set_region_visible(Region::Pagination, false);
        }
    }

    fn show_message(&mut self, text: String, kind: MessageKind, cx: &mut Context) {
        self.next_message += 1;
        let id = self.next_message;
        cx.document.show_message(id, &FilterMessage::new(text, kind));
        cx.timers.schedule(MESSAGE_LIFETIME_MS, Task::DismissMessage { id });
    }

    /// Filters the whole collection by `criteria` and shows page 1 of the
    /// result. Returns the number of matches.
    pub fn apply_filters(&mut self, criteria: Criteria, cx: &mut Context) -> usize {
        if !cx.document.has_region(Region::ArticlesGrid) {
            return 0;
        }
        debug!(?criteria, "applying filters");
        let matches = filter::apply(self.store.articles(), &criteria, cx.now);
        let count = matches.len();
        self.criteria = criteria;
        self.replace_active(matches);
        if count > 0 {
            self.display_page(1, cx);
            let plural = if count == 1 { "" } else { "s" };
            self.show_message(
                format!("Found {} matching article{}", count, plural),
                MessageKind::Success,
                cx,
            );
        } else {
            self.show_no_results(NoResults::Filters, cx);
            self.show_message(
                "No articles match your filters".to_owned(),
                MessageKind::Warning,
                cx,
            );
        }
        count
    }

    /// Re-derives the criteria from the document's filter controls and
    /// applies them. The last chosen sort order is kept.
    pub fn apply_current_filters(&mut self, cx: &mut Context) -> usize {
        let window = match cx.document.selected_time_window() {
            None => TimeWindow::All,
            Some(value) => value.parse::<TimeWindow>().unwrap_or_else(|err| {
                warn!(%err, "ignoring time window");
                TimeWindow::All
            }),
        };
        let criteria = Criteria {
            topics: cx.document.checked_topics().into_iter().collect(),
            window,
            search: cx.document.search_term(),
            sort: self.sort,
        };
        self.apply_filters(criteria, cx)
    }

    /// Searches the whole collection for `query`, keeping the collection's
    /// order. A blank query does nothing. Returns the number of matches.
    pub fn search(&mut self, query: &str, cx: &mut Context) -> usize {
        let query = query.trim();
        if query.is_empty() || !cx.document.has_region(Region::ArticlesGrid) {
            return 0;
        }
        let criteria = Criteria::search(query);
        let matches = filter::apply(self.store.articles(), &criteria, cx.now);
        let count = matches.len();
        self.criteria = criteria;
        self.replace_active(matches);
        let kind = if count > 0 {
            self.display_page(1, cx);
            MessageKind::Success
        } else {
            self.show_no_results(NoResults::Search(query), cx);
            MessageKind::Warning
        };
        self.show_message(
            format!(r#"Found {} matching articles for "{}""#, count, query),
            kind,
            cx,
        );
        count
    }

    /// Resets the controls and shows the whole collection newest first.
    pub fn clear_filters(&mut self, cx: &mut Context) {
        if !cx.document.has_region(Region::ArticlesGrid) {
            return;
        }
        cx.document.reset_controls();
        self.criteria = Criteria::default();
        self.sort = None;
        self.replace_active(newest_first(self.store.articles()));
        self.display_page(1, cx);
        self.show_message("Filters cleared".to_owned(), MessageKind::Success, cx);
    }

    /// Re-applies the current criteria ordered by `key` and goes back to page
    /// 1.
    pub fn sort(&mut self, key: SortKey, cx: &mut Context) {
        if !cx.document.has_region(Region::ArticlesGrid) {
            return;
        }
        self.sort = Some(key);
        self.criteria.sort = Some(key);
        let sorted = filter::apply(self.store.articles(), &self.criteria, cx.now);
        self.replace_active(sorted);
        if self.active.is_empty() && !self.criteria.is_unfiltered() {
            self.show_no_results(NoResults::for_criteria(&self.criteria), cx);
        } else {
            self.display_page(1, cx);
        }
    }

    /// Shows page `page`. Pages outside `1..=total_pages` are ignored, since
    /// no control offers them.
    pub fn go_to_page(&mut self, page: usize, cx: &mut Context) -> bool {
        if page == 0 || page > self.pagination.total_pages() {
            debug!(page, total = self.pagination.total_pages(), "ignoring out-of-range page");
            return false;
        }
        self.display_page(page, cx);
        true
    }

    pub fn next_page(&mut self, cx: &mut Context) -> bool {
        if self.pagination.next_disabled() {
            return false;
        }
        self.display_page(self.pagination.page + 1, cx);
        true
    }

    pub fn previous_page(&mut self, cx: &mut Context) -> bool {
        if self.pagination.previous_disabled() {
            return false;
        }
        self.display_page(self.pagination.page - 1, cx);
        true
    }

    /// Handles the deferred work the catalog scheduled.
    pub fn run_task(&mut self, task: &Task, cx: &mut Context) {
        match task {
            Task::RestoreScroll { distance } => {
                let target = cx.document.scroll_metrics().restore(*distance);
                cx.document.scroll_to(target);
            }
            Task::DismissMessage { id } => cx.document.remove_message(*id),
            Task::InitialLoadCheck => {
                if self.loaded && !cx.document.content().contains(LOADING_INDICATOR_ID) {
                    debug!("content already present, initializing components");
                    self.init_components(cx);
                }
            }
            Task::HideLoadingIndicators => cx.document.hide_loading_indicators(),
        }
    }
}

fn newest_first(articles: &[ArticleRef]) -> Vec<ArticleRef> {
    let mut sorted = articles.to_vec();
    filter::sort(&mut sorted, SortKey::Newest);
    sorted
}

impl Listener for Catalog {
    fn interests(&self) -> &'static [EventKind] {
        &[EventKind::PageLoaded, EventKind::ArticlesLoaded]
    }

    fn on_event(&mut self, event: &Event, cx: &mut Context) {
        match event {
            Event::PageLoaded(page) => {
                self.page = Some(page.clone());
                if self.loaded {
                    self.init_components(cx);
                } else {
                    // Initialization follows from ArticlesLoaded.
                    if let Err(err) = self.load_articles(cx) {
                        debug!(%err, "listings wait for the next page load");
                    }
                }
            }
            Event::ArticlesLoaded(_) => self.init_components(cx),
            Event::ConfigLoaded(_) => {}
        }
    }
}
