//! The filter/sort engine. [`apply`] maps the article collection plus a
//! [`Criteria`] value to a new ordered subset; nothing here mutates its input
//! or reads global state, so the same criteria at the same instant always
//! produce the same result.

use crate::article::{Article, ArticleRef};
use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// How far back the time filter reaches. Windows are fixed-width: a month is
/// always thirty days.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimeWindow {
    All,
    Day,
    Week,
    Month,
}

impl TimeWindow {
    /// The oldest instant an article may be dated to pass this window, or
    /// `None` for [`TimeWindow::All`].
    pub fn cutoff(self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            TimeWindow::All => None,
            TimeWindow::Day => Some(now - Duration::hours(24)),
            TimeWindow::Week => Some(now - Duration::hours(7 * 24)),
            TimeWindow::Month => Some(now - Duration::hours(30 * 24)),
        }
    }
}

impl Default for TimeWindow {
    fn default() -> Self {
        TimeWindow::All
    }
}

impl FromStr for TimeWindow {
    type Err = UnknownOption;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(TimeWindow::All),
            "day" => Ok(TimeWindow::Day),
            "week" => Ok(TimeWindow::Week),
            "month" => Ok(TimeWindow::Month),
            _ => Err(UnknownOption {
                kind: "time window",
                value: s.to_owned(),
            }),
        }
    }
}

/// The listing sort orders.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortKey {
    /// Most recent first. The default listings order.
    Newest,

    /// Least recent first.
    Oldest,

    /// Featured articles first, then trending ones, then most recent.
    Popular,

    /// Trending articles first, then most recent.
    Trending,
}

impl Default for SortKey {
    fn default() -> Self {
        SortKey::Newest
    }
}

impl FromStr for SortKey {
    type Err = UnknownOption;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "newest" => Ok(SortKey::Newest),
            "oldest" => Ok(SortKey::Oldest),
            "popular" => Ok(SortKey::Popular),
            "trending" => Ok(SortKey::Trending),
            _ => Err(UnknownOption {
                kind: "sort order",
                value: s.to_owned(),
            }),
        }
    }
}

/// Returned when a control value doesn't name a known [`TimeWindow`] or
/// [`SortKey`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownOption {
    kind: &'static str,
    value: String,
}

impl fmt::Display for UnknownOption {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "unknown {} `{}`", self.kind, self.value)
    }
}

impl std::error::Error for UnknownOption {}

/// One interaction's worth of filter settings. Rebuilt from the document's
/// controls every time, never patched.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Criteria {
    /// Keep articles carrying at least one of these topics. Empty means no
    /// topic filter.
    pub topics: BTreeSet<String>,
    pub window: TimeWindow,

    /// Case-insensitive substring to look for. Empty means no search.
    pub search: String,

    /// `None` keeps the collection's own order.
    pub sort: Option<SortKey>,
}

impl Criteria {
    /// Criteria that only search.
    pub fn search(term: &str) -> Criteria {
        Criteria {
            search: term.trim().to_owned(),
            ..Criteria::default()
        }
    }

    /// True when no filter narrows the collection.
    pub fn is_unfiltered(&self) -> bool {
        self.topics.is_empty() && self.window == TimeWindow::All && self.search.is_empty()
    }
}

/// Applies the topic, time and search filters in that order, then sorts if
/// `criteria.sort` asks for it. Returns a new sequence; `articles` is left
/// untouched.
pub fn apply(articles: &[ArticleRef], criteria: &Criteria, now: DateTime<Utc>) -> Vec<ArticleRef> {
    let cutoff = criteria.window.cutoff(now);
    let needle = criteria.search.to_lowercase();
    let mut result: Vec<ArticleRef> = articles
        .iter()
        .filter(|article| matches_topics(article, &criteria.topics))
        .filter(|article| cutoff.map_or(true, |cutoff| article.date >= cutoff))
        .filter(|article| needle.is_empty() || matches_search(article, &needle))
        .cloned()
        .collect();
    if let Some(key) = criteria.sort {
        sort(&mut result, key);
    }
    result
}

fn matches_topics(article: &Article, topics: &BTreeSet<String>) -> bool {
    topics.is_empty() || article.topics.iter().any(|topic| topics.contains(topic))
}

/// `needle` must already be lowercase.
fn matches_search(article: &Article, needle: &str) -> bool {
    let fields = [&article.title, &article.excerpt, &article.author, &article.category];
    fields.iter().any(|field| field.to_lowercase().contains(needle))
        || article.topics.iter().any(|topic| topic.to_lowercase().contains(needle))
}

/// Sorts in place. The sort is stable and every order breaks its ties by
/// date and then filename, so equal inputs always come out the same way.
pub fn sort(articles: &mut [ArticleRef], key: SortKey) {
    match key {
        SortKey::Newest => articles.sort_by(|a, b| {
            b.date
                .cmp(&a.date)
                .then_with(|| a.filename.cmp(&b.filename))
        }),
        SortKey::Oldest => articles.sort_by(|a, b| {
            a.date
                .cmp(&b.date)
                .then_with(|| a.filename.cmp(&b.filename))
        }),
        SortKey::Popular => articles.sort_by(|a, b| {
            b.featured
                .cmp(&a.featured)
                .then_with(|| b.trending.cmp(&a.trending))
                .then_with(|| b.date.cmp(&a.date))
                .then_with(|| a.filename.cmp(&b.filename))
        }),
        SortKey::Trending => articles.sort_by(|a, b| {
            b.trending
                .cmp(&a.trending)
                .then_with(|| b.date.cmp(&a.date))
                .then_with(|| a.filename.cmp(&b.filename))
        }),
    }
}

/// A topic filter option. `value` is the slug used as the checkbox value;
/// `name` is the original topic, which is what filtering matches on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Facet {
    pub name: String,
    pub value: String,
}

/// The union of all topics across `articles`, sorted by name.
pub fn facets(articles: &[ArticleRef]) -> Vec<Facet> {
    let names: BTreeSet<&str> = articles
        .iter()
        .flat_map(|article| article.topics.iter().map(String::as_str))
        .collect();
    names
        .into_iter()
        .map(|name| Facet {
            name: name.to_owned(),
            value: slug::slugify(name),
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::article::fixtures::{article, dated_series};
    use crate::article::Store;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).single().unwrap_or_else(Utc::now)
    }

    fn filenames(articles: &[ArticleRef]) -> Vec<&str> {
        articles.iter().map(|a| a.filename.as_str()).collect()
    }

    fn topics(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|n| (*n).to_owned()).collect()
    }

    fn ten_with_two_rust() -> Store {
        let mut articles = dated_series(10);
        articles[3].topics = vec!["Go".to_owned(), "Rust".to_owned()];
        articles[7].topics = vec!["Rust".to_owned()];
        articles[5].topics = vec!["Go".to_owned()];
        Store::from_articles(articles)
    }

    #[test]
    fn test_unfiltered_keeps_everything_in_order() {
        let store = ten_with_two_rust();
        let result = apply(store.articles(), &Criteria::default(), now());
        assert_eq!(filenames(store.articles()), filenames(&result));
    }

    #[test]
    fn test_topic_filter_keeps_relative_order() {
        let store = ten_with_two_rust();
        let criteria = Criteria {
            topics: topics(&["Rust"]),
            ..Criteria::default()
        };
        let result = apply(store.articles(), &criteria, now());
        assert_eq!(vec!["a03", "a07"], filenames(&result));
    }

    #[test]
    fn test_topic_filter_is_any_of() {
        let store = ten_with_two_rust();
        let criteria = Criteria {
            topics: topics(&["Rust", "Go"]),
            ..Criteria::default()
        };
        let result = apply(store.articles(), &criteria, now());
        assert_eq!(vec!["a03", "a05", "a07"], filenames(&result));
    }

    #[test]
    fn test_time_windows() {
        let store = Store::from_articles(vec![
            article("hour", "2025-01-31T23:00:00Z", &[]),
            article("days", "2025-01-27", &[]),
            article("weeks", "2025-01-10", &[]),
            article("months", "2024-11-01", &[]),
        ]);
        let run = |window| {
            let criteria = Criteria {
                window,
                ..Criteria::default()
            };
            filenames(&apply(store.articles(), &criteria, now()))
                .into_iter()
                .map(str::to_owned)
                .collect::<Vec<_>>()
        };
        assert_eq!(vec!["hour"], run(TimeWindow::Day));
        assert_eq!(vec!["hour", "days"], run(TimeWindow::Week));
        assert_eq!(vec!["hour", "days", "weeks"], run(TimeWindow::Month));
        assert_eq!(4, run(TimeWindow::All).len());
    }

    #[test]
    fn test_cutoff_is_inclusive() {
        let store = Store::from_articles(vec![article("edge", "2025-01-31T00:00:00Z", &[])]);
        let criteria = Criteria {
            window: TimeWindow::Day,
            ..Criteria::default()
        };
        assert_eq!(1, apply(store.articles(), &criteria, now()).len());
    }

    #[test]
    fn test_search_fields() {
        let mut by_title = article("by-title", "2025-01-01", &[]);
        by_title.title = "Fearless Concurrency".to_owned();
        let mut by_author = article("by-author", "2025-01-01", &[]);
        by_author.author = "Fearghal".to_owned();
        let mut by_category = article("by-category", "2025-01-01", &[]);
        by_category.category = "FEAR and loathing".to_owned();
        let by_topic = article("by-topic", "2025-01-01", &["fearlessness"]);
        let mut by_excerpt = article("by-excerpt", "2025-01-01", &[]);
        by_excerpt.excerpt = "Nothing to fear.".to_owned();
        let miss = article("miss", "2025-01-01", &["Rust"]);
        let store = Store::from_articles(vec![
            by_title,
            by_author,
            by_category,
            by_topic,
            by_excerpt,
            miss,
        ]);

        let result = apply(store.articles(), &Criteria::search("fear"), now());
        assert_eq!(
            vec!["by-title", "by-author", "by-category", "by-topic", "by-excerpt"],
            filenames(&result)
        );
    }

    #[test]
    fn test_search_is_case_insensitive() {
        let store = Store::from_articles(vec![
            article("go", "2025-01-01", &["Go"]),
            article("rust", "2025-01-01", &["Rust"]),
        ]);
        let upper = apply(store.articles(), &Criteria::search("Go"), now());
        let lower = apply(store.articles(), &Criteria::search("go"), now());
        assert_eq!(filenames(&upper), filenames(&lower));
        assert_eq!(vec!["go"], filenames(&lower));
    }

    #[test]
    fn test_filters_compose_and_are_idempotent() {
        let store = ten_with_two_rust();
        let criteria = Criteria {
            topics: topics(&["Rust", "Go"]),
            window: TimeWindow::Week,
            search: "a0".to_owned(),
            sort: Some(SortKey::Oldest),
        };
        let once = apply(store.articles(), &criteria, now());
        let twice = apply(store.articles(), &criteria, now());
        assert_eq!(filenames(&once), filenames(&twice));
        assert_eq!(vec!["a05", "a03"], filenames(&once));
        for article in &once {
            assert!(store.articles().iter().any(|a| a.filename == article.filename));
        }
    }

    #[test]
    fn test_input_is_not_mutated() {
        let store = ten_with_two_rust();
        let before = filenames(store.articles()).join(",");
        let criteria = Criteria {
            sort: Some(SortKey::Oldest),
            ..Criteria::default()
        };
        let _ = apply(store.articles(), &criteria, now());
        assert_eq!(before, filenames(store.articles()).join(","));
    }

    #[test]
    fn test_sort_orders_are_deterministic() {
        let mut featured = article("featured", "2025-01-01", &[]);
        featured.featured = true;
        let mut trending = article("trending", "2025-01-02", &[]);
        trending.trending = true;
        let plain_old = article("plain-old", "2025-01-03", &[]);
        let plain_new = article("plain-new", "2025-01-04", &[]);
        let store = Store::from_articles(vec![featured, trending, plain_old, plain_new]);

        let run = |key| {
            let mut v = store.articles().to_vec();
            sort(&mut v, key);
            v.iter().map(|a| a.filename.clone()).collect::<Vec<_>>()
        };
        assert_eq!(vec!["plain-new", "plain-old", "trending", "featured"], run(SortKey::Newest));
        assert_eq!(vec!["featured", "trending", "plain-old", "plain-new"], run(SortKey::Oldest));
        assert_eq!(vec!["featured", "trending", "plain-new", "plain-old"], run(SortKey::Popular));
        assert_eq!(vec!["trending", "plain-new", "plain-old", "featured"], run(SortKey::Trending));
        assert_eq!(run(SortKey::Popular), run(SortKey::Popular));
    }

    #[test]
    fn test_facets_are_sorted_and_slugged() {
        let store = Store::from_articles(vec![
            article("one", "2025-01-01", &["Web Development", "Rust"]),
            article("two", "2025-01-01", &["Rust", "Async IO"]),
        ]);
        let facets = facets(store.articles());
        let names: Vec<&str> = facets.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(vec!["Async IO", "Rust", "Web Development"], names);
        assert_eq!("web-development", facets[2].value);
    }

    #[test]
    fn test_parse_controls() {
        assert_eq!(Ok(TimeWindow::Week), "week".parse());
        assert_eq!(Ok(SortKey::Trending), "trending".parse());
        assert!("fortnight".parse::<TimeWindow>().is_err());
    }
}
