//! One document life. A [`Site`] owns the host (document, fetcher, event bus
//! and timers) alongside the [`Router`] and the [`Catalog`], and is the only
//! place lifecycle events are dispatched and timer tasks run.

use crate::catalog::Catalog;
use crate::config::{SiteConfig, SITE_CONFIG_URL};
use crate::document::{Document, HistoryState};
use crate::events::{deliver, Context, Event, EventBus};
use crate::fetch::Fetcher;
use crate::filter::SortKey;
use crate::router::{self, NavLink, Outcome, Router};
use crate::timers::{Task, Timers, INITIAL_LOAD_CHECK_MS, LOADING_SAFETY_TIMEOUT_MS};
use chrono::{DateTime, Utc};
use std::rc::Rc;
use tracing::{debug, warn};
use url::Url;

/// How far the document had got when the site booted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReadyState {
    /// Still parsing; the catalog initializes from the lifecycle events.
    Loading,

    /// Already interactive; a short deferred check guards against having
    /// missed the first page load.
    Interactive,
}

/// Everything the components share. Kept apart from the components so a
/// [`Context`] can borrow it while a component is borrowed mutably.
pub struct Host<D, F> {
    pub document: D,
    pub fetcher: F,
    pub events: EventBus,
    pub timers: Timers,
    clock: Option<DateTime<Utc>>,
}

impl<D: Document, F: Fetcher> Host<D, F> {
    fn context(&mut self) -> Context<'_> {
        Context {
            now: self.clock.unwrap_or_else(Utc::now),
            document: &mut self.document,
            fetcher: &mut self.fetcher,
            events: &mut self.events,
            timers: &mut self.timers,
        }
    }
}

pub struct Site<D, F> {
    host: Host<D, F>,
    router: Router,
    catalog: Catalog,
    config: Option<Rc<SiteConfig>>,
}

impl<D: Document, F: Fetcher> Site<D, F> {
    pub fn new(document: D, fetcher: F, base: Url) -> Site<D, F> {
        Site {
            host: Host {
                document,
                fetcher,
                events: EventBus::new(),
                timers: Timers::new(),
                clock: None,
            },
            router: Router::new(base),
            catalog: Catalog::default(),
            config: None,
        }
    }

    /// Replaces the catalog, e.g. to use a different page size.
    pub fn with_catalog(mut self, catalog: Catalog) -> Site<D, F> {
        self.catalog = catalog;
        self
    }

    /// Keeps a log of every dispatched event, see [`EventBus::log`].
    pub fn record_events(mut self) -> Site<D, F> {
        self.host.events = EventBus::recording();
        self
    }

    /// Pins the time filters measure from.
    pub fn freeze_clock(&mut self, now: DateTime<Utc>) {
        self.host.clock = Some(now);
    }

    pub fn document(&self) -> &D {
        &self.host.document
    }

    pub fn document_mut(&mut self) -> &mut D {
        &mut self.host.document
    }

    pub fn fetcher(&self) -> &F {
        &self.host.fetcher
    }

    pub fn events(&self) -> &EventBus {
        &self.host.events
    }

    pub fn timers(&self) -> &Timers {
        &self.host.timers
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn config(&self) -> Option<&SiteConfig> {
        self.config.as_deref()
    }

    /// Starts the document life at `location`: loads its fragment, the site
    /// configuration and the article collection, and schedules the
    /// start-up safety tasks.
    pub fn boot(&mut self, location: &str, ready: ReadyState) -> router::Result<Outcome> {
        let outcome = self.router.start(location, &mut self.host.context());
        self.load_config();
        if let Err(err) = self.catalog.load_articles(&mut self.host.context()) {
            debug!(%err, "articles will be fetched again on the next page load");
        }
        self.host
            .timers
            .schedule(LOADING_SAFETY_TIMEOUT_MS, Task::HideLoadingIndicators);
        if ready == ReadyState::Interactive {
            self.host
                .timers
                .schedule(INITIAL_LOAD_CHECK_MS, Task::InitialLoadCheck);
        }
        self.dispatch();
        outcome
    }

    fn load_config(&mut self) {
        let config = match self.host.fetcher.fetch(SITE_CONFIG_URL) {
            Ok(response) if response.is_success() => SiteConfig::from_json(&response.body)
                .map_err(|err| warn!(%err, "error parsing site config"))
                .ok(),
            Ok(response) => {
                warn!(status = response.status, "site config unavailable");
                None
            }
            Err(err) => {
                warn!(%err, "error loading site config");
                None
            }
        };
        if let Some(config) = config {
            let config = Rc::new(config);
            self.config = Some(Rc::clone(&config));
            self.host.events.publish(Event::ConfigLoaded(config));
        }
    }

    pub fn click(&mut self, link: &NavLink) -> router::Result<Outcome> {
        let outcome = self.router.click(link, &mut self.host.context());
        self.dispatch();
        outcome
    }

    pub fn pop_state(&mut self, state: Option<&HistoryState>) -> router::Result<Outcome> {
        let outcome = self.router.pop_state(state, &mut self.host.context());
        self.dispatch();
        outcome
    }

    /// Re-reads the filter controls and applies them.
    pub fn apply_current_filters(&mut self) -> usize {
        let count = self.catalog.apply_current_filters(&mut self.host.context());
        self.dispatch();
        count
    }

    pub fn search(&mut self, query: &str) -> usize {
        let count = self.catalog.search(query, &mut self.host.context());
        self.dispatch();
        count
    }

    pub fn clear_filters(&mut self) {
        self.catalog.clear_filters(&mut self.host.context());
        self.dispatch();
    }

    pub fn sort(&mut self, key: SortKey) {
        self.catalog.sort(key, &mut self.host.context());
        self.dispatch();
    }

    pub fn go_to_page(&mut self, page: usize) -> bool {
        let moved = self.catalog.go_to_page(page, &mut self.host.context());
        self.dispatch();
        moved
    }

    pub fn next_page(&mut self) -> bool {
        let moved = self.catalog.next_page(&mut self.host.context());
        self.dispatch();
        moved
    }

    pub fn previous_page(&mut self) -> bool {
        let moved = self.catalog.previous_page(&mut self.host.context());
        self.dispatch();
        moved
    }

    /// Lets `ms` milliseconds pass, running every task that falls due along
    /// the way, including ones scheduled by earlier tasks.
    pub fn advance(&mut self, ms: u64) {
        let deadline = self.host.timers.now().saturating_add(ms);
        while let Some(task) = self.host.timers.pop_due(deadline) {
            self.run_task(&task);
            self.dispatch();
        }
    }

    /// Runs the zero-delay tasks, i.e. lets the current turn finish.
    pub fn settle(&mut self) {
        self.advance(0);
    }

    fn run_task(&mut self, task: &Task) {
        debug!(?task, "running task");
        self.catalog.run_task(task, &mut self.host.context());
    }

    /// Hands queued events to their subscribers until the queue is empty.
    fn dispatch(&mut self) {
        while let Some(event) = self.host.events.next() {
            debug!(kind = ?event.kind(), "dispatching event");
            let mut cx = self.host.context();
            deliver(&mut self.router, &event, &mut cx);
            deliver(&mut self.catalog, &event, &mut cx);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::document::{MemoryDocument, Region};
    use crate::events::EventKind;
    use crate::fetch::MemoryFetcher;
    use crate::url::PageId;
    use chrono::TimeZone;

    const HOME: &str = r#"<div class="results-header"><span id="results-number"></span></div><div id="category-filters"></div><div class="articles-grid"><div class="loading-indicator"></div></div><nav class="pagination"></nav><script src="/js/index.js"></script>"#;

    fn articles_json(count: usize) -> String {
        let records: Vec<String> = (0..count)
            .map(|i| {
                format!(
                    r#"{{"filename": "post-{i:02}", "title": "Post {i}", "author": "Ferris", "category": "Rust", "excerpt": "Number {i}.", "date": "2025-01-{day:02}", "topics": ["{topic}"]}}"#,
                    i = i,
                    day = 28 - i,
                    topic = if i % 3 == 0 { "Rust" } else { "Go" },
                )
            })
            .collect();
        format!("[{}]", records.join(","))
    }

    fn site(count: usize) -> Site<MemoryDocument, MemoryFetcher> {
        let fetcher = MemoryFetcher::new()
            .with("content/home.html", HOME)
            .with("content/about.html", "<h2>About</h2>")
            .with(crate::catalog::ARTICLES_URL, articles_json(count))
            .with(SITE_CONFIG_URL, r#"{"features": {"displayAds": true}}"#);
        let mut site = Site::new(
            MemoryDocument::new(),
            fetcher,
            Url::parse("https://aetherview.test/").unwrap(),
        )
        .record_events();
        site.freeze_clock(Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap());
        site
    }

    #[test]
    fn test_boot_renders_listings() -> router::Result<()> {
        let mut site = site(8);
        site.boot("/index.html", ReadyState::Loading)?;

        assert_eq!(
            vec![EventKind::PageLoaded, EventKind::ConfigLoaded, EventKind::ArticlesLoaded],
            site.events().kinds()
        );
        assert_eq!(1, site.fetcher().count(crate::catalog::ARTICLES_URL));
        assert_eq!(Some(true), site.document().ads_visible);
        assert_eq!(8, site.catalog().active().len());
        let grid = site.document().region(Region::ArticlesGrid).unwrap_or_default();
        assert_eq!(6, grid.matches("<article").count());
        assert!(site.document().region(Region::CategoryFilters).is_some());
        assert!(!site.document().is_hidden(Region::Pagination));
        Ok(())
    }

    #[test]
    fn test_navigation_reuses_articles() -> router::Result<()> {
        let mut site = site(8);
        site.boot("/", ReadyState::Loading)?;
        site.click(&NavLink::new("about.html"))?;
        site.click(&NavLink::new("index.html"))?;

        assert_eq!(1, site.fetcher().count(crate::catalog::ARTICLES_URL));
        assert_eq!(1, site.router().loaded_scripts().len());
        let index_runs = site
            .document()
            .executed
            .iter()
            .filter(|script| script.attribute("src") == Some("/js/index.js"))
            .count();
        assert_eq!(1, index_runs);
        assert_eq!(8, site.catalog().active().len());
        assert_eq!(&PageId::home(), site.router().current());
        Ok(())
    }

    #[test]
    fn test_navigating_home_starts_at_the_top() -> router::Result<()> {
        let mut site = site(8);
        site.boot("/about.html", ReadyState::Loading)?;
        site.settle();
        site.click(&NavLink::new("index.html"))?;
        site.settle();
        assert_eq!(6, site.catalog().pagination().slice(site.catalog().active()).len());
        assert_eq!(0.0, site.document().scroll_y());

        // Paging still keeps the distance from the bottom.
        site.document_mut().scroll_to(1500.0);
        assert!(site.next_page());
        site.settle();
        assert!(site.document().scroll_y() < 1500.0);
        Ok(())
    }

    #[test]
    fn test_filtering_through_the_site() -> router::Result<()> {
        let mut site = site(8);
        site.boot("/", ReadyState::Loading)?;

        site.document_mut().check_topic("Rust");
        assert_eq!(3, site.apply_current_filters());
        assert!(site.document().message().is_some());
        site.advance(crate::timers::MESSAGE_LIFETIME_MS);
        assert!(site.document().message().is_none());

        site.clear_filters();
        assert_eq!(8, site.catalog().active().len());
        assert!(site.next_page());
        assert_eq!(2, site.catalog().pagination().page);
        assert!(!site.next_page());
        assert!(site.previous_page());

        site.sort(SortKey::Oldest);
        assert_eq!("post-07", site.catalog().active()[0].filename);
        Ok(())
    }

    #[test]
    fn test_safety_timeout_hides_indicators() -> router::Result<()> {
        let mut site = site(2);
        site.boot("/", ReadyState::Loading)?;
        site.advance(2999);
        assert!(!site.document().loading_indicators_hidden());
        site.advance(1);
        assert!(site.document().loading_indicators_hidden());
        Ok(())
    }

    #[test]
    fn test_interactive_boot_checks_again() -> router::Result<()> {
        let mut site = site(2);
        site.boot("/", ReadyState::Interactive)?;
        assert!(site.timers().tasks().contains(&&Task::InitialLoadCheck));
        site.document_mut().set_region_html(Region::ArticlesGrid, "");
        site.advance(INITIAL_LOAD_CHECK_MS);
        let grid = site.document().region(Region::ArticlesGrid).unwrap_or_default();
        assert_eq!(2, grid.matches("<article").count());
        Ok(())
    }

    #[test]
    fn test_missing_config_hides_ads() -> router::Result<()> {
        let fetcher = MemoryFetcher::new().with("content/about.html", "<h2>About</h2>");
        let mut site = Site::new(
            MemoryDocument::new(),
            fetcher,
            Url::parse("https://aetherview.test/").unwrap(),
        )
        .record_events();
        site.boot("/about.html", ReadyState::Loading)?;
        assert_eq!(Some(false), site.document().ads_visible);
        assert!(site.config().is_none());
        assert!(!site.catalog().is_loaded());
        assert_eq!(vec![EventKind::PageLoaded], site.events().kinds());
        // The failed dataset fetch is retried on the next page load.
        let _ = site.click(&NavLink::new("/contact.html"));
        site.click(&NavLink::new("/about.html"))?;
        assert_eq!(3, site.fetcher().count(crate::catalog::ARTICLES_URL));
        Ok(())
    }
}
