use aetherview::article::Store;
use aetherview::catalog::Catalog;
use aetherview::config::Config;
use aetherview::document::MemoryDocument;
use aetherview::fetch::FsFetcher;
use aetherview::filter::{self, Criteria, SortKey, TimeWindow};
use aetherview::pagination::Pagination;
use aetherview::render;
use aetherview::router::{NavLink, Outcome};
use aetherview::scripts::ScriptSource;
use aetherview::site::{ReadyState, Site};
use aetherview::trending;
use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use clap::{App, AppSettings, Arg, ArgMatches, SubCommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<()> {
    init_tracing();

    let matches = App::new("aetherview")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Browse and maintain an AetherView site from the command line")
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .arg(
            Arg::with_name("project")
                .long("project")
                .value_name("DIR")
                .takes_value(true)
                .help("Where to start looking for aetherview.yaml"),
        )
        .subcommand(
            SubCommand::with_name("list")
                .about("Prints a page of the article listings")
                .arg(
                    Arg::with_name("topic")
                        .long("topic")
                        .value_name("TOPIC")
                        .takes_value(true)
                        .multiple(true)
                        .number_of_values(1),
                )
                .arg(
                    Arg::with_name("time")
                        .long("time")
                        .takes_value(true)
                        .possible_values(&["all", "day", "week", "month"]),
                )
                .arg(Arg::with_name("search").long("search").takes_value(true))
                .arg(
                    Arg::with_name("sort")
                        .long("sort")
                        .takes_value(true)
                        .possible_values(&["newest", "oldest", "popular", "trending"]),
                )
                .arg(
                    Arg::with_name("page")
                        .long("page")
                        .takes_value(true)
                        .default_value("1"),
                ),
        )
        .subcommand(
            SubCommand::with_name("browse")
                .about("Boots the site and follows each link in turn")
                .arg(Arg::with_name("href").multiple(true).required(true)),
        )
        .subcommand(
            SubCommand::with_name("trending")
                .about("Marks the most recent articles as trending")
                .arg(Arg::with_name("count")),
        )
        .get_matches();

    let project_dir = match matches.value_of("project") {
        Some(dir) => PathBuf::from(dir),
        None => std::env::current_dir()?,
    };
    let config = Config::from_directory(&project_dir)?;

    match matches.subcommand() {
        ("list", Some(matches)) => list(&config, matches),
        ("browse", Some(matches)) => browse(&config, matches),
        ("trending", Some(matches)) => update_trending(&config, matches),
        (name, _) => Err(anyhow!("Unknown command `{}`", name)),
    }
}

/// Logs go to stderr; `AETHERVIEW_LOG_FORMAT=json` switches to JSON lines.
fn init_tracing() {
    let log_format = std::env::var("AETHERVIEW_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "aetherview=info".into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn list(config: &Config, matches: &ArgMatches) -> Result<()> {
    let path = config.articles_path();
    let json = std::fs::read_to_string(&path)
        .with_context(|| format!("Reading `{}`", path.display()))?;
    let store = Store::from_json(&json)?;

    let criteria = Criteria {
        topics: matches
            .values_of("topic")
            .map(|topics| topics.map(str::to_owned).collect())
            .unwrap_or_default(),
        window: matches
            .value_of("time")
            .map(str::parse::<TimeWindow>)
            .transpose()?
            .unwrap_or_default(),
        search: matches.value_of("search").unwrap_or_default().trim().to_owned(),
        sort: Some(
            matches
                .value_of("sort")
                .map(str::parse::<SortKey>)
                .transpose()?
                .unwrap_or_default(),
        ),
    };
    let page: usize = matches
        .value_of("page")
        .unwrap_or("1")
        .parse()
        .context("--page must be a positive number")?;

    let articles = filter::apply(store.articles(), &criteria, Utc::now());
    let pagination = Pagination::new(articles.len(), config.listing_page_size).at(page);
    let visible = pagination.slice(&articles);
    if visible.is_empty() {
        let reason = if store.is_empty() {
            render::NoResults::Empty
        } else {
            render::NoResults::for_criteria(&criteria)
        };
        println!("{}", render::no_results(reason));
        return Ok(());
    }
    for article in visible {
        println!("{}", render::list_item(article, config.excerpt_length));
    }
    if pagination.is_visible() {
        println!("{}", render::page_numbers(&pagination.controls()));
    }
    eprintln!(
        "page {} of {} ({} matching articles)",
        pagination.page,
        pagination.total_pages(),
        articles.len()
    );
    Ok(())
}

fn browse(config: &Config, matches: &ArgMatches) -> Result<()> {
    let mut site = Site::new(
        MemoryDocument::new(),
        FsFetcher::new(&config.site_directory),
        config.site_root.clone(),
    )
    .with_catalog(Catalog::new(config.listing_page_size, config.excerpt_length))
    .record_events();

    report("index.html", site.boot("index.html", ReadyState::Loading));
    site.settle();
    for href in matches.values_of("href").into_iter().flatten() {
        report(href, site.click(&NavLink::new(href)));
        site.settle();
    }

    for script in &site.document().executed {
        match script.source() {
            ScriptSource::External(src) => println!("script: {}", src),
            ScriptSource::Inline => println!("script: (inline, {} bytes)", script.text.len()),
        }
    }
    for event in site.events().log() {
        println!("event: {:?}", event.kind());
    }
    Ok(())
}

fn report(href: &str, outcome: aetherview::router::Result<Outcome>) {
    match outcome {
        Ok(Outcome::Loaded {
            page,
            scripts_run,
            scripts_skipped,
        }) => println!(
            "{}: loaded `{}` ({} scripts run, {} skipped)",
            href, page, scripts_run, scripts_skipped
        ),
        Ok(Outcome::Unchanged) => println!("{}: already showing", href),
        Ok(Outcome::Superseded) => println!("{}: superseded", href),
        Err(err) => println!("{}: failed to load `{}`: {}", href, err.page(), err),
    }
}

fn update_trending(config: &Config, matches: &ArgMatches) -> Result<()> {
    let count = matches
        .value_of("count")
        .map(str::parse::<usize>)
        .transpose()
        .context("COUNT must be a number")?;
    let site_config = config.site_config()?;
    let path = config.articles_path();
    match trending::rewrite(&path, &site_config.trending, count)
        .with_context(|| format!("Updating `{}`", path.display()))?
    {
        trending::Outcome::Disabled => println!("Auto-update trending is disabled in config."),
        trending::Outcome::Marked(marked) => {
            println!("Successfully marked {} articles as trending", marked)
        }
    }
    Ok(())
}
