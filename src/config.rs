use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context as _;
use clap::ValueEnum;
use regex::Regex;
use scraper::Selector;
use serde::{Deserialize, Serialize};

/// Ranking language category. Keys index into [`SiteConfig::categories`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Category {
    Chinese,
    Simplified,
    Foreign,
}

impl Category {
    pub fn key(self) -> &'static str {
        match self {
            Category::Chinese => "chinese",
            Category::Simplified => "simplified",
            Category::Foreign => "foreign",
        }
    }
}

/// Ranking time window in days. Keys index into [`SiteConfig::windows`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Window {
    #[value(name = "7")]
    Week,
    #[value(name = "30")]
    Month,
}

impl Window {
    pub fn key(self) -> &'static str {
        match self {
            Window::Week => "7",
            Window::Month => "30",
        }
    }
}

/// How to pick fields out of one listing fragment and its detail page.
///
/// Selectors are CSS; `price_pattern` must have one capture group for the
/// numeral. `author_marker` (plus an optional `author_separator` right
/// after it) tags the metadata item that carries the author names.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingSchema {
    pub container: String,
    pub link: String,
    pub title: String,
    pub author: String,
    pub author_marker: String,
    #[serde(default)]
    pub author_separator: String,
    pub price: String,
    pub price_pattern: String,
    pub description: String,
}

/// Site description: where the ranking pages live and what the listing
/// markup looks like. Loadable from JSON so the same pipeline can target
/// another listing site (or a test fixture server).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    pub base_url: String,
    pub window_param: String,
    pub categories: BTreeMap<String, String>,
    pub windows: BTreeMap<String, String>,
    pub listing: ListingSchema,
}

impl Default for SiteConfig {
    fn default() -> Self {
        let categories = [
            ("chinese", "books"),
            ("simplified", "china"),
            ("foreign", "fbooks"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_owned(), v.to_owned()))
        .collect();

        let windows = [("7", "7"), ("30", "30")]
            .into_iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect();

        Self {
            base_url: "https://www.books.com.tw/web/sys_saletopb/".to_owned(),
            window_param: "attribute".to_owned(),
            categories,
            windows,
            listing: ListingSchema {
                container: "div.type02_bd-a".to_owned(),
                link: "a[href*='products']".to_owned(),
                title: "h4 > a".to_owned(),
                author: "ul.msg > li:nth-child(1)".to_owned(),
                author_marker: "作者".to_owned(),
                author_separator: "：".to_owned(),
                price: "ul.msg > li.price_a".to_owned(),
                price_pattern: r"(\d+)元".to_owned(),
                description: "div.content".to_owned(),
            },
        }
    }
}

impl SiteConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("read site config: {}", path.display()))?;
        let config: Self = serde_json::from_str(&contents)
            .with_context(|| format!("parse site config: {}", path.display()))?;
        Ok(config)
    }

    pub fn category_segment(&self, category: Category) -> Option<&str> {
        self.categories.get(category.key()).map(String::as_str)
    }

    pub fn window_value(&self, window: Window) -> Option<&str> {
        self.windows.get(window.key()).map(String::as_str)
    }

    /// Parse every selector and pattern up front so a bad site description
    /// fails at startup, not mid-harvest.
    pub fn compile(self) -> anyhow::Result<CompiledSite> {
        let listing = &self.listing;
        let container = parse_selector("container", &listing.container)?;
        let link = parse_selector("link", &listing.link)?;
        let title = parse_selector("title", &listing.title)?;
        let author = parse_selector("author", &listing.author)?;
        let price = parse_selector("price", &listing.price)?;
        let description = parse_selector("description", &listing.description)?;

        let price_pattern = Regex::new(&listing.price_pattern)
            .with_context(|| format!("parse price pattern {:?}", listing.price_pattern))?;

        let mut marker = regex::escape(&listing.author_marker);
        if !listing.author_separator.is_empty() {
            marker.push_str(&format!("(?:{})?", regex::escape(&listing.author_separator)));
        }
        let author_marker = Regex::new(&marker)
            .with_context(|| format!("build author marker pattern {marker:?}"))?;

        Ok(CompiledSite {
            container,
            link,
            title,
            author,
            price,
            description,
            price_pattern,
            author_marker,
            config: self,
        })
    }
}

/// A [`SiteConfig`] with all selectors and patterns compiled.
pub struct CompiledSite {
    pub config: SiteConfig,
    pub container: Selector,
    pub link: Selector,
    pub title: Selector,
    pub author: Selector,
    pub price: Selector,
    pub description: Selector,
    pub price_pattern: Regex,
    pub author_marker: Regex,
}

fn parse_selector(name: &str, css: &str) -> anyhow::Result<Selector> {
    Selector::parse(css).map_err(|err| anyhow::anyhow!("parse {name} selector {css:?}: {err}"))
}
