//! The trending maintenance rewrite. Runs offline against the article
//! dataset: every `trending` flag is cleared and then set again on the most
//! recent articles. The records are edited as raw JSON so fields this crate
//! doesn't model survive the rewrite.

use crate::article::parse_date;
use crate::config::{TrendingConfig, DEFAULT_TRENDING_COUNT};
use serde_json::Value;
use std::fmt;
use std::path::Path;
use tracing::info;

#[derive(Debug)]
pub enum Error {
    Io(std::io::Error),
    Json(serde_json::Error),

    /// The dataset isn't a JSON array.
    NotAnArray,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Io(err) => err.fmt(f),
            Error::Json(err) => err.fmt(f),
            Error::NotAnArray => write!(f, "article data must be a JSON array"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            Error::Json(err) => Some(err),
            Error::NotAnArray => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Error {
        Error::Io(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Error {
        Error::Json(err)
    }
}

/// What a rewrite did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// `autoUpdate` is off, so nothing was touched.
    Disabled,

    /// This many articles are now trending.
    Marked(usize),
}

/// The number of articles to mark: an explicit positive `count` wins, then
/// the configured count, then the default.
pub fn effective_count(config: &TrendingConfig, count: Option<usize>) -> usize {
    count
        .filter(|&count| count > 0)
        .or_else(|| Some(config.count).filter(|&count| count > 0))
        .unwrap_or(DEFAULT_TRENDING_COUNT)
}

/// Rewrites the `trending` flags of `articles` in place. Records are ranked
/// newest first; records without a parseable date rank last and ties keep
/// their dataset order. Featured records are passed over when the config
/// excludes them.
pub fn update(
    articles: &mut Value,
    config: &TrendingConfig,
    count: Option<usize>,
) -> Result<Outcome, Error> {
    if !config.auto_update {
        info!("auto-update of trending articles is disabled");
        return Ok(Outcome::Disabled);
    }
    let wanted = effective_count(config, count);
    let records = articles.as_array_mut().ok_or(Error::NotAnArray)?;

    let mut ranked: Vec<(usize, Option<chrono::DateTime<chrono::Utc>>)> = records
        .iter()
        .enumerate()
        .map(|(i, record)| (i, record.get("date").and_then(Value::as_str).and_then(parse_date)))
        .collect();
    // `None` sorts before `Some`, so compare reversed to put undated records
    // last while ordering the rest newest first.
    ranked.sort_by(|(_, a), (_, b)| b.cmp(a));

    for record in records.iter_mut() {
        if let Some(object) = record.as_object_mut() {
            object.insert("trending".to_owned(), Value::Bool(false));
        }
    }

    let mut marked = 0;
    for (i, _) in ranked {
        if marked >= wanted {
            break;
        }
        let object = match records[i].as_object_mut() {
            Some(object) => object,
            None => continue,
        };
        let featured = object.get("featured").and_then(Value::as_bool).unwrap_or(false);
        if config.exclude_featured && featured {
            continue;
        }
        object.insert("trending".to_owned(), Value::Bool(true));
        marked += 1;
    }
    info!(marked, wanted, "updated trending articles");
    Ok(Outcome::Marked(marked))
}

/// Runs [`update`] on the dataset at `path`, writing it back pretty-printed.
/// The file is left alone when the rewrite is disabled.
pub fn rewrite(
    path: &Path,
    config: &TrendingConfig,
    count: Option<usize>,
) -> Result<Outcome, Error> {
    let mut articles: Value = serde_json::from_str(&std::fs::read_to_string(path)?)?;
    let outcome = update(&mut articles, config, count)?;
    if let Outcome::Marked(_) = outcome {
        std::fs::write(path, serde_json::to_string_pretty(&articles)?)?;
    }
    Ok(outcome)
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    fn dataset() -> Value {
        json!([
            {"filename": "old", "date": "2024-06-01", "trending": true},
            {"filename": "newest", "date": "2025-03-01", "featured": true},
            {"filename": "middle", "date": "2025-01-15", "views": 42},
            {"filename": "recent", "date": "2025-02-20"},
            {"filename": "undated", "date": "soon"}
        ])
    }

    fn trending(articles: &Value) -> Vec<&str> {
        articles
            .as_array()
            .into_iter()
            .flatten()
            .filter(|a| a["trending"] == Value::Bool(true))
            .filter_map(|a| a["filename"].as_str())
            .collect()
    }

    #[test]
    fn test_marks_most_recent() -> Result<(), Error> {
        let mut articles = dataset();
        let outcome = update(&mut articles, &TrendingConfig::default(), None)?;
        assert_eq!(Outcome::Marked(3), outcome);
        assert_eq!(vec!["newest", "middle", "recent"], trending(&articles));
        assert_eq!(json!(42), articles[2]["views"]);
        assert_eq!(Value::Bool(false), articles[0]["trending"]);
        Ok(())
    }

    #[test]
    fn test_excludes_featured() -> Result<(), Error> {
        let mut articles = dataset();
        let config = TrendingConfig {
            exclude_featured: true,
            ..TrendingConfig::default()
        };
        assert_eq!(Outcome::Marked(2), update(&mut articles, &config, Some(2))?);
        assert_eq!(vec!["middle", "recent"], trending(&articles));
        Ok(())
    }

    #[test]
    fn test_count_larger_than_dataset() -> Result<(), Error> {
        let mut articles = dataset();
        let outcome = update(&mut articles, &TrendingConfig::default(), Some(10))?;
        assert_eq!(Outcome::Marked(5), outcome);
        Ok(())
    }

    #[test]
    fn test_disabled() -> Result<(), Error> {
        let mut articles = dataset();
        let config = TrendingConfig {
            auto_update: false,
            ..TrendingConfig::default()
        };
        assert_eq!(Outcome::Disabled, update(&mut articles, &config, Some(1))?);
        assert_eq!(dataset(), articles);
        Ok(())
    }

    #[test]
    fn test_effective_count() {
        let mut config = TrendingConfig::default();
        assert_eq!(3, effective_count(&config, None));
        assert_eq!(3, effective_count(&config, Some(0)));
        config.count = 5;
        assert_eq!(5, effective_count(&config, None));
        assert_eq!(1, effective_count(&config, Some(1)));
        config.count = 0;
        assert_eq!(DEFAULT_TRENDING_COUNT, effective_count(&config, None));
    }

    #[test]
    fn test_rewrite_file() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("articles.json");
        std::fs::write(&path, dataset().to_string())?;
        assert_eq!(Outcome::Marked(1), rewrite(&path, &TrendingConfig::default(), Some(1))?);
        let written: Value = serde_json::from_str(&std::fs::read_to_string(&path)?)?;
        assert_eq!(vec!["newest"], trending(&written));

        std::fs::write(&path, "{}")?;
        assert!(matches!(rewrite(&path, &TrendingConfig::default(), None), Err(Error::NotAnArray)));
        Ok(())
    }
}
