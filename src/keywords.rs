use std::sync::OnceLock;

use jieba_rs::{Jieba, KeywordExtract as _, TfIdf};

/// At most this many keywords per description.
pub const TOP_KEYWORDS: usize = 10;

fn segmenter() -> &'static Jieba {
    static JIEBA: OnceLock<Jieba> = OnceLock::new();
    JIEBA.get_or_init(Jieba::new)
}

fn ranker() -> &'static TfIdf {
    static TFIDF: OnceLock<TfIdf> = OnceLock::new();
    TFIDF.get_or_init(TfIdf::default)
}

/// Top keywords of a description, highest TF-IDF salience first.
///
/// Deterministic for a fixed dictionary: the same text always yields the
/// same keywords. Empty input yields no keywords.
pub fn extract_keywords(text: &str) -> Vec<String> {
    if text.trim().is_empty() {
        return Vec::new();
    }

    ranker()
        .extract_keywords(segmenter(), text, TOP_KEYWORDS, Vec::new())
        .into_iter()
        .map(|keyword| keyword.keyword)
        .collect()
}
