use std::path::Path;
use std::time::Duration;

use anyhow::Context as _;
use reqwest::blocking::Client;
use scraper::Html;
use thiserror::Error;
use url::Url;

use crate::cli::HarvestArgs;
use crate::config::{Category, CompiledSite, SiteConfig, Window};
use crate::formats::BookRecord;
use crate::{detail, extract, formats, keywords};

#[derive(Debug, Error)]
pub enum HarvestError {
    /// The ranking page itself failed to load. Fatal for the harvest,
    /// reported once, never retried.
    #[error("ranking page unavailable: {url} (HTTP {status})")]
    PageUnavailable { url: String, status: u16 },

    #[error("site config has no mapping for category {0:?}")]
    UnknownCategory(Category),

    #[error("site config has no mapping for window {0:?}")]
    UnknownWindow(Window),

    #[error("bad ranking page address: {0}")]
    Address(#[from] url::ParseError),

    #[error("network error: {0}")]
    Request(#[from] reqwest::Error),
}

/// Harvests one ranking page into records. Holds no per-harvest state:
/// `harvest` returns its records, so one harvester serves many calls.
pub struct Harvester {
    client: Client,
    site: CompiledSite,
}

impl Harvester {
    pub fn new(config: SiteConfig) -> anyhow::Result<Self> {
        let site = config.compile().context("compile site config")?;
        let client = Client::builder()
            .user_agent(concat!("booktop/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(30))
            .build()
            .context("build http client")?;

        Ok(Self { client, site })
    }

    pub fn ranking_url(&self, category: Category, window: Window) -> Result<Url, HarvestError> {
        let segment = self
            .site
            .config
            .category_segment(category)
            .ok_or(HarvestError::UnknownCategory(category))?;
        let value = self
            .site
            .config
            .window_value(window)
            .ok_or(HarvestError::UnknownWindow(window))?;

        let mut base = self.site.config.base_url.clone();
        if !base.ends_with('/') {
            base.push('/');
        }
        let mut url = Url::parse(&base)?.join(&format!("{segment}/"))?;
        url.query_pairs_mut()
            .append_pair(&self.site.config.window_param, value);
        Ok(url)
    }

    /// Fetch the ranking page for `category`/`window` and harvest every
    /// listing fragment, in page (= ranking) order.
    pub fn harvest(
        &self,
        category: Category,
        window: Window,
    ) -> Result<Vec<BookRecord>, HarvestError> {
        let url = self.ranking_url(category, window)?;
        tracing::info!(%url, "fetch ranking page");

        let response = self.client.get(url.clone()).send()?;
        let status = response.status();
        if status != reqwest::StatusCode::OK {
            tracing::error!(%url, status = status.as_u16(), "ranking page unavailable");
            return Err(HarvestError::PageUnavailable {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text()?;
        Ok(self.records_from_ranking(&body, &url))
    }

    fn records_from_ranking(&self, html: &str, page_url: &Url) -> Vec<BookRecord> {
        let doc = Html::parse_document(html);
        let mut records = Vec::new();

        for (index, fragment) in doc.select(&self.site.container).enumerate() {
            let fields = match extract::listing_fields(fragment, &self.site, page_url) {
                Ok(fields) => fields,
                Err(err) => {
                    // Required field missing: skip the fragment, keep the rest
                    // of the harvest.
                    tracing::warn!(index, %err, "skipping malformed listing fragment");
                    continue;
                }
            };

            let intro = detail::fetch_description(&self.client, &self.site, &fields.link);
            let keywords = keywords::extract_keywords(&intro);

            records.push(BookRecord {
                title: fields.title,
                author: fields.author.into_option().unwrap_or_default(),
                price: fields.price.into_option(),
                link: fields.link,
                intro,
                keywords,
            });
        }

        records
    }
}

/// Harvest with an optional config file and record limit. Shared by the
/// `harvest` and `graph` subcommands.
pub fn harvest_records(
    category: Category,
    window: Window,
    config_path: Option<&str>,
    limit: Option<usize>,
) -> anyhow::Result<Vec<BookRecord>> {
    let config = match config_path {
        Some(path) => SiteConfig::load(Path::new(path))?,
        None => SiteConfig::default(),
    };

    let harvester = Harvester::new(config)?;
    let mut records = harvester
        .harvest(category, window)
        .context("harvest ranking page")?;
    if let Some(limit) = limit {
        records.truncate(limit);
    }

    tracing::info!(count = records.len(), "harvest complete");
    Ok(records)
}

pub fn run(args: HarvestArgs) -> anyhow::Result<()> {
    let records = harvest_records(args.category, args.window, args.config.as_deref(), args.limit)?;

    let stdout = std::io::stdout();
    formats::write_table(&records, &mut stdout.lock()).context("write table")?;

    if let Some(csv) = &args.csv {
        formats::write_csv(&records, Path::new(csv)).context("write csv")?;
    }

    Ok(())
}
