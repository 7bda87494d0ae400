use std::sync::LazyLock;
use std::time::Duration;

use critbot_common::ExtractionResult;
use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};
use tracing::{debug, info};

use crate::dom::{document_title, selector};
use crate::error::{ExtractError, Result};
use crate::render::DESKTOP_USER_AGENT;

/// Subtrees whose text never counts as page content.
const SKIPPED_TAGS: &[&str] = &["script", "style", "nav", "footer"];

/// Likely main-content containers, most specific first.
const CONTAINER_SELECTORS: &[&str] = &["main", "article", ".content", "#content", ".post-content"];

static CONTAINERS: LazyLock<Vec<Selector>> =
    LazyLock::new(|| CONTAINER_SELECTORS.iter().map(|css| selector(css)).collect());
static BODY: LazyLock<Selector> = LazyLock::new(|| selector("body"));
static NEWLINE_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\n\s*)+").expect("valid regex"));

/// Plain HTTP GET + HTML parse. No JS execution.
pub struct StaticPageService {
    client: reqwest::Client,
}

impl StaticPageService {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(DESKTOP_USER_AGENT)
            .build()
            .map_err(|source| ExtractError::Fetch {
                url: String::new(),
                source,
            })?;
        Ok(Self { client })
    }

    /// Use a preconfigured client (tests point it at a local server).
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    pub async fn fetch(&self, url: &str) -> Result<ExtractionResult> {
        info!(url, "Static fetch");

        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| ExtractError::Fetch {
                url: url.to_string(),
                source,
            })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ExtractError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let html = resp.text().await.map_err(|source| ExtractError::Fetch {
            url: url.to_string(),
            source,
        })?;
        debug!(url, bytes = html.len(), "Static fetch complete");

        Ok(readable_text(&html))
    }
}

/// Title plus the readable text of the main container (or the body).
pub fn readable_text(html: &str) -> ExtractionResult {
    let doc = Html::parse_document(html);
    let title = document_title(&doc);

    let raw = CONTAINERS
        .iter()
        .find_map(|sel| {
            doc.select(sel)
                .filter(|el| !inside_skipped(*el))
                .map(visible_text)
                .find(|text| !text.trim().is_empty())
        })
        .or_else(|| doc.select(&BODY).next().map(visible_text))
        .unwrap_or_default();

    ExtractionResult {
        content: collapse_newlines(&raw),
        title,
    }
}

/// Every newline run (newline then any whitespace, repeated) becomes one
/// blank line; the result is trimmed.
pub fn collapse_newlines(text: &str) -> String {
    NEWLINE_RUNS.replace_all(text, "\n\n").trim().to_string()
}

fn is_skipped(el: ElementRef<'_>) -> bool {
    SKIPPED_TAGS.contains(&el.value().name())
}

fn inside_skipped(el: ElementRef<'_>) -> bool {
    el.ancestors()
        .filter_map(ElementRef::wrap)
        .any(is_skipped)
}

/// Text content with skipped subtrees removed.
fn visible_text(el: ElementRef<'_>) -> String {
    let mut out = String::new();
    push_text(el, &mut out);
    out
}

fn push_text(el: ElementRef<'_>, out: &mut String) {
    for child in el.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(_) => {
                if let Some(child_el) = ElementRef::wrap(child) {
                    if !is_skipped(child_el) {
                        push_text(child_el, out);
                    }
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefers_main_and_drops_scripts() {
        let html = r#"<html><head><title> Page </title></head><body>
            <nav>Menu</nav>
            <main>
                <h1>Heading</h1>
                <script>var x = 1;</script>
                <p>Paragraph</p>
            </main>
            <footer>Legal</footer>
        </body></html>"#;
        let result = readable_text(html);
        assert_eq!(result.title, "Page");
        assert_eq!(result.content, "Heading\n\nParagraph");
    }

    #[test]
    fn falls_back_to_body_without_container() {
        let html = "<html><body><div>Hello</div>\n\n\n<nav>x</nav><div>World</div></body></html>";
        let result = readable_text(html);
        assert_eq!(result.content, "Hello\n\nWorld");
        assert_eq!(result.title, "");
    }

    #[test]
    fn empty_container_is_skipped_for_next_selector() {
        let html = "<body><main>   </main><article>Story</article></body>";
        assert_eq!(readable_text(html).content, "Story");
    }

    #[test]
    fn container_inside_nav_does_not_count() {
        let html = r#"<body><nav><div class="content">Links</div></nav><div id="content">Real</div></body>"#;
        assert_eq!(readable_text(html).content, "Real");
    }

    #[test]
    fn collapse_turns_whitespace_runs_into_one_blank_line() {
        assert_eq!(collapse_newlines("  a\n   \n\t\nb\nc  "), "a\n\nb\n\nc");
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/missing")
            .with_status(404)
            .create_async()
            .await;

        let service = StaticPageService::new().unwrap();
        let err = service
            .fetch(&format!("{}/missing", server.url()))
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::Status { status: 404, .. }));
    }

    #[tokio::test]
    async fn fetch_parses_html() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/post")
            .with_status(200)
            .with_header("content-type", "text/html")
            .with_body("<html><head><title>Post</title></head><body><article>Body</article></body></html>")
            .create_async()
            .await;

        let service = StaticPageService::new().unwrap();
        let result = service.fetch(&format!("{}/post", server.url())).await.unwrap();
        assert_eq!(result.title, "Post");
        assert_eq!(result.content, "Body");
    }
}
