//! Two layers of configuration: the runtime [`SiteConfig`] the site serves at
//! `/data/config.json`, and the `aetherview.yaml` project file the CLI uses
//! to find the site on disk.

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs::File;
use std::path::{Path, PathBuf};
use url::Url;

/// The project file name searched for by [`Config::from_directory`].
pub const PROJECT_FILE: &str = "aetherview.yaml";

/// Where the site serves its runtime configuration.
pub const SITE_CONFIG_URL: &str = "/data/config.json";

/// The number of articles marked trending when nothing else says otherwise.
pub const DEFAULT_TRENDING_COUNT: usize = 3;

/// The runtime configuration object served by the site.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct SiteConfig {
    #[serde(default)]
    pub features: Features,

    #[serde(default)]
    pub trending: TrendingConfig,
}

impl SiteConfig {
    pub fn from_json(json: &str) -> serde_json::Result<SiteConfig> {
        serde_json::from_str(json)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Features {
    /// Whether ad slots are shown. Missing means hidden.
    #[serde(default)]
    pub display_ads: bool,
}

/// Settings for the trending maintenance rewrite.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendingConfig {
    #[serde(default = "auto_update_default")]
    pub auto_update: bool,

    #[serde(default = "count_default")]
    pub count: usize,

    /// Leave featured articles out of the trending set.
    #[serde(default)]
    pub exclude_featured: bool,
}

fn auto_update_default() -> bool {
    true
}

fn count_default() -> usize {
    DEFAULT_TRENDING_COUNT
}

impl Default for TrendingConfig {
    fn default() -> Self {
        TrendingConfig {
            auto_update: auto_update_default(),
            count: count_default(),
            exclude_featured: false,
        }
    }
}

#[derive(Deserialize)]
struct PageSize(usize);
impl Default for PageSize {
    fn default() -> Self {
        PageSize(crate::pagination::PAGE_SIZE)
    }
}

#[derive(Deserialize)]
struct ExcerptLength(usize);
impl Default for ExcerptLength {
    fn default() -> Self {
        ExcerptLength(crate::render::EXCERPT_MAX_LENGTH)
    }
}

#[derive(Deserialize)]
struct SiteDirectory(PathBuf);
impl Default for SiteDirectory {
    fn default() -> Self {
        SiteDirectory(PathBuf::from("www"))
    }
}

#[derive(Deserialize)]
struct Project {
    pub site_root: Url,

    #[serde(default)]
    pub site_directory: SiteDirectory,

    #[serde(default)]
    pub listing_page_size: PageSize,

    #[serde(default)]
    pub excerpt_length: ExcerptLength,
}

/// The resolved project settings.
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    /// The base URL hrefs are resolved against. Always ends in `/`.
    pub site_root: Url,

    /// The directory the site is served from.
    pub site_directory: PathBuf,
    pub listing_page_size: usize,
    pub excerpt_length: usize,
}

impl Config {
    /// Looks for `aetherview.yaml` in `dir` and then in each of its ancestors.
    pub fn from_directory(dir: &Path) -> Result<Config> {
        let path = dir.join(PROJECT_FILE);
        if path.exists() {
            match Config::from_project_file(&path) {
                Ok(config) => Ok(config),
                Err(e) => Err(anyhow!("Loading configuration: {:?}", e)),
            }
        } else {
            match dir.parent() {
                Some(parent) => Config::from_directory(parent),
                None => Err(anyhow!(
                    "Could not find `{}` in any parent directory",
                    PROJECT_FILE
                )),
            }
        }
    }

    pub fn from_project_file(path: &Path) -> Result<Config> {
        let file = File::open(path)
            .with_context(|| format!("Opening project file `{}`", path.display()))?;
        let project: Project = serde_yaml::from_reader(file)?;
        match path.parent() {
            None => Err(anyhow!(
                "Can't get parent directory for provided project file path '{:?}'",
                path
            )),
            Some(project_root) => {
                let mut site_root = project.site_root;
                if !site_root.path().ends_with('/') {
                    let path = format!("{}/", site_root.path());
                    site_root.set_path(&path);
                }
                Ok(Config {
                    site_root,
                    site_directory: project_root.join(project.site_directory.0),
                    listing_page_size: project.listing_page_size.0.max(1),
                    excerpt_length: project.excerpt_length.0,
                })
            }
        }
    }

    /// The article dataset on disk.
    pub fn articles_path(&self) -> PathBuf {
        self.site_directory.join("data").join("articles.json")
    }

    /// The runtime site configuration on disk.
    pub fn site_config_path(&self) -> PathBuf {
        self.site_directory.join("data").join("config.json")
    }

    /// Reads the runtime site configuration. A missing file means defaults.
    pub fn site_config(&self) -> Result<SiteConfig> {
        let path = self.site_config_path();
        if !path.exists() {
            return Ok(SiteConfig::default());
        }
        let json = std::fs::read_to_string(&path)
            .with_context(|| format!("Reading `{}`", path.display()))?;
        SiteConfig::from_json(&json).with_context(|| format!("Parsing `{}`", path.display()))
    }
}
