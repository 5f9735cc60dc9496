use scraper::ElementRef;
use thiserror::Error;
use url::Url;

use crate::config::CompiledSite;

/// A structurally required field is missing from a listing fragment.
/// Fatal for that fragment; the harvester decides whether to skip it.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ListingError {
    #[error("listing fragment has no detail-page link")]
    MissingLink,
    #[error("listing fragment has no title")]
    MissingTitle,
}

/// Outcome of extracting an optional field.
///
/// `Absent` is the expected no-value case (a book with no listed author);
/// `Malformed` means the field was there but did not match its pattern.
/// Both collapse to the same output sentinel, but tests and callers can
/// tell them apart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue<T> {
    Present(T),
    Absent,
    Malformed,
}

impl<T> FieldValue<T> {
    pub fn into_option(self) -> Option<T> {
        match self {
            FieldValue::Present(value) => Some(value),
            FieldValue::Absent | FieldValue::Malformed => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ListingFields {
    pub title: String,
    pub author: FieldValue<String>,
    pub price: FieldValue<u32>,
    pub link: String,
}

/// Extract the ranking-page fields from one listing fragment.
pub fn listing_fields(
    fragment: ElementRef<'_>,
    site: &CompiledSite,
    page_url: &Url,
) -> Result<ListingFields, ListingError> {
    let href = fragment
        .select(&site.link)
        .next()
        .and_then(|anchor| anchor.value().attr("href"))
        .ok_or(ListingError::MissingLink)?;
    let link = resolve_href(page_url, href);

    let title = fragment
        .select(&site.title)
        .next()
        .map(|anchor| anchor.text().collect::<String>().trim().to_owned())
        .filter(|title| !title.is_empty())
        .ok_or(ListingError::MissingTitle)?;

    Ok(ListingFields {
        title,
        author: extract_author(fragment, site),
        price: extract_price(fragment, site),
        link,
    })
}

fn extract_author(fragment: ElementRef<'_>, site: &CompiledSite) -> FieldValue<String> {
    let Some(item) = fragment.select(&site.author).next() else {
        return FieldValue::Absent;
    };
    let text = item.text().collect::<String>();
    // The first metadata item is only the author line when it carries the
    // marker; otherwise the book has no listed author.
    if !text.contains(&site.config.listing.author_marker) {
        return FieldValue::Absent;
    }

    let name = site.author_marker.replace_all(&text, "").trim().to_owned();
    if name.is_empty() {
        FieldValue::Malformed
    } else {
        FieldValue::Present(name)
    }
}

fn extract_price(fragment: ElementRef<'_>, site: &CompiledSite) -> FieldValue<u32> {
    let Some(item) = fragment.select(&site.price).next() else {
        return FieldValue::Absent;
    };
    let text = item.text().collect::<String>();
    let Some(captures) = site.price_pattern.captures(&text) else {
        return FieldValue::Malformed;
    };

    match captures.get(1).and_then(|m| m.as_str().parse().ok()) {
        Some(price) => FieldValue::Present(price),
        None => FieldValue::Malformed,
    }
}

fn resolve_href(page_url: &Url, href: &str) -> String {
    match page_url.join(href) {
        Ok(url) => url.to_string(),
        Err(_) => href.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use scraper::Html;

    use super::*;
    use crate::config::SiteConfig;

    const PAGE_URL: &str = "https://www.books.com.tw/web/sys_saletopb/books/";

    fn fields_from(html: &str) -> Result<ListingFields, ListingError> {
        let site = SiteConfig::default().compile().expect("compile default site");
        let doc = Html::parse_document(html);
        let fragment = doc
            .select(&site.container)
            .next()
            .expect("listing container");
        listing_fields(fragment, &site, &Url::parse(PAGE_URL).expect("page url"))
    }

    fn listing(author_item: &str, price_item: &str) -> String {
        format!(
            r#"<div class="type02_bd-a">
                 <h4><a href="https://www.books.com.tw/products/0010900001">測試書名</a></h4>
                 <ul class="msg">{author_item}{price_item}</ul>
               </div>"#
        )
    }

    #[test]
    fn extracts_all_fields() -> anyhow::Result<()> {
        let html = listing("<li>作者：王小明</li>", r#"<li class="price_a">定價:350元</li>"#);
        let fields = fields_from(&html)?;

        assert_eq!(fields.title, "測試書名");
        assert_eq!(fields.author, FieldValue::Present("王小明".to_owned()));
        assert_eq!(fields.price, FieldValue::Present(350));
        assert_eq!(fields.link, "https://www.books.com.tw/products/0010900001");
        Ok(())
    }

    #[test]
    fn author_without_marker_is_absent() -> anyhow::Result<()> {
        let html = listing("<li>出版社：大塊文化</li>", r#"<li class="price_a">定價:350元</li>"#);
        let fields = fields_from(&html)?;
        assert_eq!(fields.author, FieldValue::Absent);
        Ok(())
    }

    #[test]
    fn discounted_price_takes_the_unit_suffixed_numeral() -> anyhow::Result<()> {
        let html = listing("<li>作者：王小明</li>", r#"<li class="price_a">79折199元</li>"#);
        let fields = fields_from(&html)?;
        assert_eq!(fields.price, FieldValue::Present(199));
        Ok(())
    }

    #[test]
    fn price_item_without_numeral_is_malformed() -> anyhow::Result<()> {
        let html = listing("<li>作者：王小明</li>", r#"<li class="price_a">電子書</li>"#);
        let fields = fields_from(&html)?;
        assert_eq!(fields.price, FieldValue::Malformed);
        assert_eq!(fields.price.clone().into_option(), None);
        Ok(())
    }

    #[test]
    fn missing_price_item_is_absent() -> anyhow::Result<()> {
        let html = listing("<li>作者：王小明</li>", "");
        let fields = fields_from(&html)?;
        assert_eq!(fields.price, FieldValue::Absent);
        Ok(())
    }

    #[test]
    fn missing_detail_link_is_fatal() {
        let html = r#"<div class="type02_bd-a">
            <h4><a href="https://www.books.com.tw/activity/sale">測試書名</a></h4>
        </div>"#;
        assert_eq!(fields_from(html).unwrap_err(), ListingError::MissingLink);
    }

    #[test]
    fn missing_title_is_fatal() {
        let html = r#"<div class="type02_bd-a">
            <a href="https://www.books.com.tw/products/0010900001">圖片連結</a>
        </div>"#;
        assert_eq!(fields_from(html).unwrap_err(), ListingError::MissingTitle);
    }

    #[test]
    fn relative_href_is_resolved_against_the_page() -> anyhow::Result<()> {
        let html = r#"<div class="type02_bd-a">
            <h4><a href="/products/0010900002">相對連結</a></h4>
        </div>"#;
        let fields = fields_from(html)?;
        assert_eq!(fields.link, "https://www.books.com.tw/products/0010900002");
        Ok(())
    }
}
