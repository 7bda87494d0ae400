// Small helpers over scraper's DOM shared by the site routines.

use scraper::{ElementRef, Html, Selector};

/// Parse a selector known at compile time.
pub(crate) fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("valid selector")
}

/// Concatenated text of every descendant text node (DOM `textContent`).
pub(crate) fn text_of(element: ElementRef<'_>) -> String {
    element.text().collect()
}

/// Text of the first element matching `selector`, if any element matches.
pub(crate) fn first_text(root: ElementRef<'_>, selector: &Selector) -> Option<String> {
    root.select(selector).next().map(text_of)
}

/// Document `<title>` text, trimmed. Empty when the page has none.
pub(crate) fn document_title(doc: &Html) -> String {
    static TITLE: std::sync::LazyLock<Selector> = std::sync::LazyLock::new(|| selector("title"));
    doc.select(&TITLE)
        .next()
        .map(|el| text_of(el).trim().to_string())
        .unwrap_or_default()
}
