use scraper::{ElementRef, Html, Selector};
use tracing::debug;

/// Untruncated values scanned out of a document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageMetadata {
    pub title: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
}

/// Metadata extractor, responsible for extracting preview information from webpage content
#[derive(Debug, Clone)]
pub struct MetadataExtractor {
    meta_selector: Selector,
    title_selector: Selector,
}

impl Default for MetadataExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl MetadataExtractor {
    pub fn new() -> Self {
        Self {
            meta_selector: selector("meta"),
            title_selector: selector("title"),
        }
    }

    pub fn extract(&self, html: &str) -> PageMetadata {
        let document = Html::parse_document(html);

        let title = self
            .meta_content(&document, "og:title")
            .or_else(|| self.title_text(&document));
        let description = self
            .meta_content(&document, "og:description")
            .or_else(|| self.meta_content(&document, "description"));
        let image_url = self.meta_content(&document, "og:image");

        debug!(
            has_title = title.is_some(),
            has_description = description.is_some(),
            has_image = image_url.is_some(),
            "Metadata extraction finished"
        );

        PageMetadata {
            title,
            description,
            image_url,
        }
    }

    /// First non-blank `content` of a `<meta>` whose `property` or `name`
    /// equals `key`, compared case-insensitively.
    fn meta_content(&self, document: &Html, key: &str) -> Option<String> {
        document
            .select(&self.meta_selector)
            .filter(|el| meta_key_matches(el, key))
            .filter_map(|el| el.value().attr("content"))
            .find_map(non_blank)
    }

    fn title_text(&self, document: &Html) -> Option<String> {
        document
            .select(&self.title_selector)
            .next()
            .and_then(|el| non_blank(&el.text().collect::<String>()))
    }
}

fn meta_key_matches(el: &ElementRef<'_>, key: &str) -> bool {
    ["property", "name"].iter().any(|attr| {
        el.value()
            .attr(attr)
            .is_some_and(|value| value.trim().eq_ignore_ascii_case(key))
    })
}

fn non_blank(s: &str) -> Option<String> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn selector(css: &str) -> Selector {
    // Only called with the literal tag names above.
    Selector::parse(css).unwrap_or_else(|_| unreachable!("invalid built-in selector: {css}"))
}
