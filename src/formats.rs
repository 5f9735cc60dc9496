use std::path::Path;

use serde::{Deserialize, Serialize};

/// One harvested listing, in ranking-page order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookRecord {
    pub title: String,
    /// Empty when the listing shows no author.
    pub author: String,
    /// Absent when the price field carries no numeral.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<u32>,
    pub link: String,
    /// Cleaned detail-page description; empty when unavailable.
    pub intro: String,
    /// Up to ten keywords, highest salience first; empty when `intro` is.
    pub keywords: Vec<String>,
}

const COLUMNS: [&str; 6] = ["title", "author", "price", "link", "intro", "keywords"];
const WIDTHS: [usize; 6] = [28, 16, 5, 42, 36, 40];

/// Write the records as a fixed-column table, row order = input order.
pub fn write_table(records: &[BookRecord], out: &mut impl std::io::Write) -> std::io::Result<()> {
    let header: Vec<String> = COLUMNS
        .iter()
        .zip(WIDTHS)
        .map(|(name, width)| format!("{name:<width$}"))
        .collect();
    writeln!(out, "{}", header.join("  "))?;
    writeln!(out, "{}", "-".repeat(header.join("  ").len()))?;

    for record in records {
        let price = record
            .price
            .map(|p| p.to_string())
            .unwrap_or_default();
        let cells = [
            clip(&record.title, WIDTHS[0]),
            clip(&record.author, WIDTHS[1]),
            clip(&price, WIDTHS[2]),
            clip(&record.link, WIDTHS[3]),
            clip(&record.intro, WIDTHS[4]),
            clip(&record.keywords.join(" "), WIDTHS[5]),
        ];
        let row: Vec<String> = cells
            .iter()
            .zip(WIDTHS)
            .map(|(cell, width)| format!("{cell:<width$}"))
            .collect();
        writeln!(out, "{}", row.join("  "))?;
    }

    Ok(())
}

/// Write the records to a CSV file with the same fixed columns.
pub fn write_csv(records: &[BookRecord], path: &Path) -> anyhow::Result<()> {
    use anyhow::Context as _;

    if path.exists() {
        anyhow::bail!("csv output already exists: {}", path.display());
    }

    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("create csv output: {}", path.display()))?;
    writer.write_record(COLUMNS).context("write csv header")?;

    for record in records {
        let price = record
            .price
            .map(|p| p.to_string())
            .unwrap_or_default();
        writer
            .write_record([
                record.title.as_str(),
                record.author.as_str(),
                price.as_str(),
                record.link.as_str(),
                record.intro.as_str(),
                record.keywords.join(" ").as_str(),
            ])
            .context("write csv record")?;
    }

    writer.flush().context("flush csv output")?;
    Ok(())
}

fn clip(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_owned();
    }
    let mut clipped: String = text.chars().take(width.saturating_sub(1)).collect();
    clipped.push('…');
    clipped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(title: &str) -> BookRecord {
        BookRecord {
            title: title.to_owned(),
            author: "王小明".to_owned(),
            price: Some(350),
            link: "https://example.com/products/1".to_owned(),
            intro: "一本書".to_owned(),
            keywords: vec!["書".to_owned(), "閱讀".to_owned()],
        }
    }

    #[test]
    fn table_preserves_row_order() -> anyhow::Result<()> {
        let records = vec![record("第一本"), record("第二本")];
        let mut out = Vec::new();
        write_table(&records, &mut out)?;
        let text = String::from_utf8(out)?;

        let first = text.find("第一本").expect("first title present");
        let second = text.find("第二本").expect("second title present");
        assert!(first < second);
        assert!(text.starts_with("title"));
        Ok(())
    }

    #[test]
    fn absent_price_renders_empty() -> anyhow::Result<()> {
        let mut rec = record("無價");
        rec.price = None;
        let mut out = Vec::new();
        write_table(&[rec], &mut out)?;
        let text = String::from_utf8(out)?;
        assert!(!text.contains("None"));
        Ok(())
    }

    #[test]
    fn csv_refuses_to_overwrite() -> anyhow::Result<()> {
        let dir = tempfile::TempDir::new()?;
        let path = dir.path().join("books.csv");
        write_csv(&[record("一")], &path)?;
        let err = write_csv(&[record("二")], &path).unwrap_err();
        assert!(err.to_string().contains("already exists"));
        Ok(())
    }

    #[test]
    fn clip_is_char_safe() {
        assert_eq!(clip("中文字串很長很長", 5), "中文字串…");
        assert_eq!(clip("short", 10), "short");
    }
}
