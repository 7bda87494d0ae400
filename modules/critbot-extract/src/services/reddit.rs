use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};

use crate::dom::{first_text, selector};

/// Present once the post has rendered.
pub const WAIT_SELECTOR: &str = ".Post";

/// Comments beyond this are ignored.
const MAX_COMMENTS: usize = 5;

static TITLE: LazyLock<Selector> = LazyLock::new(|| selector("h1"));
static USER_LINK: LazyLock<Selector> = LazyLock::new(|| selector(r#"a[href*="/user/"]"#));
static BODY: LazyLock<Selector> =
    LazyLock::new(|| selector(r#".Post div[data-testid="post-content"]"#));
static COMMENT: LazyLock<Selector> = LazyLock::new(|| selector(".Comment"));
static COMMENT_TEXT: LazyLock<Selector> = LazyLock::new(|| selector(r#"[data-testid="comment"]"#));

pub fn failure_notice(error: &str) -> String {
    format!("Failed to extract Reddit content: {error}")
}

/// Post title, author, body and the first few comments as plain text.
pub fn extract(doc: &Html) -> String {
    let root = doc.root_element();

    let title = first_text(root, &TITLE).unwrap_or_else(|| "Unknown Post".to_string());
    let author = first_text(root, &USER_LINK).unwrap_or_else(|| "Unknown Author".to_string());
    let body = first_text(root, &BODY).unwrap_or_default();

    let comments = root
        .select(&COMMENT)
        .take(MAX_COMMENTS)
        .map(render_comment)
        .collect::<Vec<_>>()
        .join("\n\n");

    format!("Reddit Post: {title}\nBy: {author}\n\n{body}\n\nTop Comments:\n{comments}")
}

fn render_comment(comment: ElementRef<'_>) -> String {
    let author = first_text(comment, &USER_LINK)
        .filter(|a| !a.is_empty())
        .unwrap_or_else(|| "Unknown".to_string());
    let text = first_text(comment, &COMMENT_TEXT).unwrap_or_default();
    format!("{author}: {text}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn comment(author: &str, text: &str) -> String {
        format!(
            r#"<div class="Comment"><a href="/user/{author}/">{author}</a><div data-testid="comment">{text}</div></div>"#
        )
    }

    #[test]
    fn post_with_comments_keeps_first_five() {
        let comments: String = (1..=7).map(|i| comment(&format!("u{i}"), &format!("c{i}"))).collect();
        let html = format!(
            r#"<html><body><div class="Post">
                <h1>Big news</h1>
                <a href="/user/op/">op</a>
                <div data-testid="post-content">Body text</div>
            </div>{comments}</body></html>"#
        );
        let out = extract(&Html::parse_document(&html));

        assert!(out.starts_with("Reddit Post: Big news\nBy: op\n\nBody text\n\nTop Comments:\n"));
        assert!(out.ends_with("u1: c1\n\nu2: c2\n\nu3: c3\n\nu4: c4\n\nu5: c5"));
        assert!(!out.contains("u6"));
    }

    #[test]
    fn empty_page_uses_placeholders() {
        let out = extract(&Html::parse_document("<html><body></body></html>"));
        assert_eq!(
            out,
            "Reddit Post: Unknown Post\nBy: Unknown Author\n\n\n\nTop Comments:\n"
        );
    }

    #[test]
    fn comment_without_author_link_is_unknown() {
        let html = r#"<div class="Comment"><div data-testid="comment">orphan</div></div>"#;
        let out = extract(&Html::parse_document(html));
        assert!(out.ends_with("Top Comments:\nUnknown: orphan"));
    }
}
