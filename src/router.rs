//! Intercepted navigation. The [`Router`] turns link clicks and history
//! entries into fragment loads, swaps the fetched markup into the content
//! container, replays the fragment's scripts and announces the new page on
//! the lifecycle bus.
//!
//! A load is split in two so that overlapping navigations can be modeled:
//! [`Router::begin`] shows the loading placeholder and hands out a
//! [`PendingLoad`] stamped with a sequence number, and [`Router::complete`]
//! applies the response only if no later load has begun since.

use crate::config::SiteConfig;
use crate::document::HistoryState;
use crate::events::{Context, Event, EventKind, Listener};
use crate::fetch::{FetchError, Response};
use crate::render;
use crate::scripts::{self, LoadedScripts};
use crate::url::PageId;
use std::fmt;
use std::rc::Rc;
use tracing::{debug, error, info, warn};
use url::Url;

/// A navigation anchor as found in the page.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NavLink {
    pub href: String,

    /// The `data-page` attribute, which wins over the href when present.
    pub data_page: Option<String>,
}

impl NavLink {
    pub fn new<S: Into<String>>(href: S) -> NavLink {
        NavLink {
            href: href.into(),
            data_page: None,
        }
    }

    pub fn with_page<S: Into<String>>(mut self, page: S) -> NavLink {
        self.data_page = Some(page.into());
        self
    }
}

/// A fragment load that has shown its placeholder and awaits a response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingLoad {
    pub seq: u64,
    pub page: PageId,
    pub url: String,
}

/// What a navigation ended up doing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// The fragment was swapped in.
    Loaded {
        page: PageId,
        scripts_run: usize,
        scripts_skipped: usize,
    },

    /// Nothing to do: the target is already showing, or the history entry
    /// names no page.
    Unchanged,

    /// A later navigation began before this response arrived, so it was
    /// dropped.
    Superseded,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// The fragment request answered with a non-2xx status.
    NotFound { page: PageId, status: u16 },

    /// The fragment request failed outright.
    Network { page: PageId, message: String },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::NotFound { status, .. } => write!(f, "Page not found. Status: {}", status),
            Error::Network { message, .. } => write!(f, "Failed to fetch: {}", message),
        }
    }
}

impl std::error::Error for Error {}

impl Error {
    pub fn page(&self) -> &PageId {
        match self {
            Error::NotFound { page, .. } | Error::Network { page, .. } => page,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// The navigation state for one document life.
pub struct Router {
    base: Url,
    current: PageId,
    seq: u64,
    loaded: LoadedScripts,
    config: Option<Rc<SiteConfig>>,
}

impl Router {
    /// A router resolving hrefs against `base`, starting on the home page.
    pub fn new(base: Url) -> Router {
        Router {
            base,
            current: PageId::home(),
            seq: 0,
            loaded: LoadedScripts::default(),
            config: None,
        }
    }

    pub fn current(&self) -> &PageId {
        &self.current
    }

    /// The external scripts executed so far.
    pub fn loaded_scripts(&self) -> &LoadedScripts {
        &self.loaded
    }

    /// The page a link leads to.
    pub fn resolve(&self, link: &NavLink) -> PageId {
        match link.data_page.as_deref() {
            Some(page) if !page.is_empty() => PageId::new(page),
            _ => PageId::from_href(&self.base, &link.href),
        }
    }

    /// Loads the page for the document's initial `location` without touching
    /// history.
    pub fn start(&mut self, location: &str, cx: &mut Context) -> Result<Outcome> {
        let page = PageId::from_href(&self.base, location);
        info!(%page, location, "starting router");
        self.current = page.clone();
        self.load(page, cx)
    }

    /// Follows an intercepted link. Clicking the current page does nothing.
    pub fn click(&mut self, link: &NavLink, cx: &mut Context) -> Result<Outcome> {
        let page = self.resolve(link);
        if page == self.current {
            debug!(%page, "already on page, not reloading");
            return Ok(Outcome::Unchanged);
        }
        cx.document.push_history(
            &HistoryState {
                page: Some(page.clone()),
            },
            &link.href,
        );
        self.current = page.clone();
        let outcome = self.load(page.clone(), cx);
        cx.document.set_active_nav(&page);
        outcome
    }

    /// Handles back/forward navigation. Entries without a page are ignored.
    pub fn pop_state(&mut self, state: Option<&HistoryState>, cx: &mut Context) -> Result<Outcome> {
        let page = match state.and_then(|state| state.page.clone()) {
            Some(page) => page,
            None => {
                debug!("history entry carries no page, ignoring");
                return Ok(Outcome::Unchanged);
            }
        };
        let outcome = self.load(page.clone(), cx);
        cx.document.set_active_nav(&page);
        outcome
    }

    /// Fetches and applies `page` in one go.
    pub fn load(&mut self, page: PageId, cx: &mut Context) -> Result<Outcome> {
        let pending = self.begin(page, cx);
        let response = cx.fetcher.fetch(&pending.url);
        self.complete(pending, response, cx)
    }

    /// Starts loading `page`: replaces the content with the loading
    /// placeholder and supersedes any load still pending.
    pub fn begin(&mut self, page: PageId, cx: &mut Context) -> PendingLoad {
        self.seq += 1;
        cx.document.set_content(&render::loading_indicator());
        let url = page.fragment_url();
        debug!(%page, seq = self.seq, %url, "loading content");
        PendingLoad {
            seq: self.seq,
            page,
            url,
        }
    }

    /// Applies the response to `pending`. Stale responses are dropped
    /// without touching the document; failures show the error panel.
    pub fn complete(
        &mut self,
        pending: PendingLoad,
        response: std::result::Result<Response, FetchError>,
        cx: &mut Context,
    ) -> Result<Outcome> {
        if pending.seq != self.seq {
            warn!(
                page = %pending.page,
                seq = pending.seq,
                latest = self.seq,
                "discarding stale response"
            );
            return Ok(Outcome::Superseded);
        }

        let body = match check(&pending.page, response) {
            Ok(body) => body,
            Err(err) => {
                error!(page = %pending.page, %err, "error loading content");
                cx.document.set_content(&render::error_panel(&err.to_string()));
                return Err(err);
            }
        };

        let replay = scripts::replay(&body, &mut self.loaded);
        cx.document.set_content(&replay.markup);
        for script in &replay.scripts {
            cx.document.execute_script(script);
        }

        self.toggle_ads(cx);
        self.current = pending.page.clone();
        cx.document.set_active_nav(&pending.page);
        cx.document.scroll_to(0.0);
        cx.events.publish(Event::PageLoaded(pending.page.clone()));

        info!(
            page = %pending.page,
            scripts = replay.scripts.len(),
            skipped = replay.skipped,
            "page loaded"
        );
        Ok(Outcome::Loaded {
            page: pending.page,
            scripts_run: replay.scripts.len(),
            scripts_skipped: replay.skipped,
        })
    }

    /// Shows ad slots only when the last loaded config asks for them.
    fn toggle_ads(&self, cx: &mut Context) {
        let visible = self
            .config
            .as_ref()
            .map_or(false, |config| config.features.display_ads);
        cx.document.set_ads_visible(visible);
    }
}

fn check(page: &PageId, response: std::result::Result<Response, FetchError>) -> Result<String> {
    match response {
        Ok(response) if response.is_success() => Ok(response.body),
        Ok(response) => Err(Error::NotFound {
            page: page.clone(),
            status: response.status,
        }),
        Err(err) => Err(Error::Network {
            page: page.clone(),
            message: err.to_string(),
        }),
    }
}

impl Listener for Router {
    fn interests(&self) -> &'static [EventKind] {
        &[EventKind::ConfigLoaded]
    }

    fn on_event(&mut self, event: &Event, cx: &mut Context) {
        if let Event::ConfigLoaded(config) = event {
            self.config = Some(Rc::clone(config));
            self.toggle_ads(cx);
        }
    }
}
