//! The network seam. Everything the router and catalog download goes through a
//! [`Fetcher`]: [`FsFetcher`] serves a site directory from disk and
//! [`MemoryFetcher`] serves canned responses for tests.

use std::collections::HashMap;
use std::fmt;
use std::path::{Component, Path, PathBuf};

/// A completed HTTP-like exchange. Any status is a valid [`Response`]; callers
/// decide what a non-2xx status means for them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub body: String,
}

impl Response {
    pub fn ok<S: Into<String>>(body: S) -> Response {
        Response {
            status: 200,
            body: body.into(),
        }
    }

    pub fn not_found() -> Response {
        Response {
            status: 404,
            body: String::new(),
        }
    }

    /// True for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Downloads resources by URL. One call is one attempt; there is no retry.
pub trait Fetcher {
    fn fetch(&mut self, url: &str) -> Result<Response, FetchError>;
}

/// Returned when no response could be obtained at all.
#[derive(Debug)]
pub enum FetchError {
    /// The URL can't be served (e.g. it escapes the site directory).
    InvalidUrl(String),

    /// The transport failed.
    Io(std::io::Error),
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FetchError::InvalidUrl(url) => write!(f, "invalid URL `{}`", url),
            FetchError::Io(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for FetchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FetchError::InvalidUrl(_) => None,
            FetchError::Io(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for FetchError {
    /// Converts a [`std::io::Error`] into a [`FetchError`]. It allows us to
    /// use the `?` operator for fallible I/O functions.
    fn from(err: std::io::Error) -> FetchError {
        FetchError::Io(err)
    }
}

/// Serves URLs from a site directory. Both `content/home.html` and
/// `/data/articles.json` resolve relative to `root`; a missing file is a 404.
pub struct FsFetcher {
    root: PathBuf,
}

impl FsFetcher {
    pub fn new<P: Into<PathBuf>>(root: P) -> FsFetcher {
        FsFetcher { root: root.into() }
    }

    /// Maps a URL path onto the site directory, refusing anything that would
    /// climb out of it.
    fn resolve(&self, url: &str) -> Result<PathBuf, FetchError> {
        let path = url.split(|c| c == '?' || c == '#').next().unwrap_or_default();
        let relative = Path::new(path.trim_start_matches('/'));
        if relative
            .components()
            .any(|component| !matches!(component, Component::Normal(_) | Component::CurDir))
        {
            return Err(FetchError::InvalidUrl(url.to_owned()));
        }
        Ok(self.root.join(relative))
    }
}

impl Fetcher for FsFetcher {
    fn fetch(&mut self, url: &str) -> Result<Response, FetchError> {
        let path = self.resolve(url)?;
        match std::fs::read_to_string(&path) {
            Ok(body) => Ok(Response::ok(body)),
            Err(err) => match err.kind() {
                std::io::ErrorKind::NotFound => Ok(Response::not_found()),
                _ => Err(FetchError::Io(err)),
            },
        }
    }
}

/// Serves canned responses and records every requested URL. Unknown URLs are
/// 404s; URLs marked with [`MemoryFetcher::fail`] are transport failures.
#[derive(Default)]
pub struct MemoryFetcher {
    responses: HashMap<String, Response>,
    failures: HashMap<String, String>,
    requests: Vec<String>,
}

impl MemoryFetcher {
    pub fn new() -> MemoryFetcher {
        MemoryFetcher::default()
    }

    /// Serves `body` with status 200 at `url`.
    pub fn with<S: Into<String>>(mut self, url: &str, body: S) -> MemoryFetcher {
        self.insert(url, Response::ok(body));
        self
    }

    pub fn insert(&mut self, url: &str, response: Response) {
        self.responses.insert(url.to_owned(), response);
    }

    /// Makes requests for `url` fail with `message`.
    pub fn fail(&mut self, url: &str, message: &str) {
        self.failures.insert(url.to_owned(), message.to_owned());
    }

    /// Every URL requested so far, in order.
    pub fn requests(&self) -> &[String] {
        &self.requests
    }

    /// How many times `url` has been requested.
    pub fn count(&self, url: &str) -> usize {
        self.requests.iter().filter(|request| *request == url).count()
    }
}

impl Fetcher for MemoryFetcher {
    fn fetch(&mut self, url: &str) -> Result<Response, FetchError> {
        self.requests.push(url.to_owned());
        if let Some(message) = self.failures.get(url) {
            return Err(FetchError::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                message.clone(),
            )));
        }
        Ok(self.responses.get(url).cloned().unwrap_or_else(Response::not_found))
    }
}
