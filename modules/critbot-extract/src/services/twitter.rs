use std::sync::LazyLock;

use scraper::{Html, Selector};

use crate::dom::{first_text, selector, text_of};

/// Present once the tweet body has rendered.
pub const WAIT_SELECTOR: &str = r#"[data-testid="tweetText"]"#;

static AUTHOR: LazyLock<Selector> = LazyLock::new(|| selector(r#"[data-testid="User-Name"]"#));
static TWEET_TEXT: LazyLock<Selector> = LazyLock::new(|| selector(WAIT_SELECTOR));
static PHOTO: LazyLock<Selector> = LazyLock::new(|| selector(r#"[data-testid="tweetPhoto"]"#));
static QUOTED: LazyLock<Selector> =
    LazyLock::new(|| selector(r#"[data-testid="Tweet-public-conversation"]"#));

pub fn failure_notice(error: &str) -> String {
    format!("Failed to extract Tweet content: {error}")
}

/// Tweet author, text blocks, image count and quoted tweet as plain text.
pub fn extract(doc: &Html) -> String {
    let root = doc.root_element();

    let author = first_text(root, &AUTHOR).unwrap_or_else(|| "Unknown Author".to_string());

    let text = root
        .select(&TWEET_TEXT)
        .map(text_of)
        .collect::<Vec<_>>()
        .join("\n\n");

    let photos = root.select(&PHOTO).count();
    let images = if photos > 0 {
        format!("[Tweet contains {photos} image(s)]")
    } else {
        String::new()
    };

    let quoted = first_text(root, &QUOTED)
        .map(|q| format!("\n\nQuoted Tweet: {q}"))
        .unwrap_or_default();

    format!("Tweet by {author}\n\n{text}\n{images}{quoted}")
}
