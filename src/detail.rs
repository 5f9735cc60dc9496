use std::sync::OnceLock;

use regex::Regex;
use reqwest::blocking::Client;
use scraper::Html;

use crate::config::CompiledSite;

/// Statuses the site serves detail content under. 484 is the site's own
/// restricted-but-servable code.
const SERVABLE_STATUSES: [u16; 2] = [200, 484];

/// Fetch and clean a detail page's description.
///
/// Every failure mode degrades to an empty string: an unreachable page, a
/// status outside the servable set, or a page without the description
/// container (age-gated books hide it behind a login). The harvest keeps
/// going either way.
pub fn fetch_description(client: &Client, site: &CompiledSite, url: &str) -> String {
    let response = match client.get(url).send() {
        Ok(response) => response,
        Err(err) => {
            tracing::warn!(%url, %err, "detail page request failed");
            return String::new();
        }
    };

    let status = response.status().as_u16();
    if !SERVABLE_STATUSES.contains(&status) {
        tracing::warn!(%url, status, "detail page unavailable");
        return String::new();
    }

    match response.text() {
        Ok(body) => description_from_html(&body, site),
        Err(err) => {
            tracing::warn!(%url, %err, "detail page body unreadable");
            String::new()
        }
    }
}

pub fn description_from_html(html: &str, site: &CompiledSite) -> String {
    let doc = Html::parse_document(html);
    match doc.select(&site.description).next() {
        Some(container) => clean_description(&container.text().collect::<String>()),
        None => String::new(),
    }
}

/// Collapse runs of newline, ideographic space and NBSP to nothing, then
/// trim the ends.
pub fn clean_description(text: &str) -> String {
    static GAPS: OnceLock<Regex> = OnceLock::new();
    let gaps = GAPS.get_or_init(|| Regex::new(r"[\n\u{3000}\u{00a0}]+").expect("gap pattern"));
    gaps.replace_all(text, "").trim().to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SiteConfig;

    #[test]
    fn cleaning_collapses_gap_runs() {
        assert_eq!(clean_description("哈\n\n囉\u{3000}世\u{a0}界"), "哈囉世界");
        assert_eq!(clean_description("  平常空格保留  "), "平常空格保留");
        assert_eq!(clean_description("\n\u{3000}\u{a0}"), "");
    }

    #[test]
    fn missing_container_yields_empty() -> anyhow::Result<()> {
        let site = SiteConfig::default().compile()?;
        let html = "<html><body><p>需要登入會員</p></body></html>";
        assert_eq!(description_from_html(html, &site), "");
        Ok(())
    }

    #[test]
    fn container_text_is_cleaned() -> anyhow::Result<()> {
        let site = SiteConfig::default().compile()?;
        let html = r#"<html><body>
            <div class="content">　本書介紹
機器學習。</div>
        </body></html>"#;
        assert_eq!(description_from_html(html, &site), "本書介紹機器學習。");
        Ok(())
    }
}
