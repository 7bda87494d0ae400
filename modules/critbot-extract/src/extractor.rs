use std::sync::Arc;

use critbot_common::ExtractionResult;
use scraper::Html;
use tracing::{info, warn};

use crate::error::{ExtractError, Result};
use crate::render::{PageBackend, PageRenderer, RenderOptions, RenderedPage, WaitFor};
use crate::router::SiteKind;
use crate::services::page::StaticPageService;
use crate::services::{reddit, twitter};

/// Turns a URL into readable text. Client-rendered sites go through the
/// renderer when one is configured; everything else (and any render
/// failure) goes through a static fetch.
pub struct ContentExtractor {
    renderer: Option<Arc<dyn PageRenderer>>,
    page: StaticPageService,
    render_options: RenderOptions,
}

impl ContentExtractor {
    pub fn new(backend: PageBackend) -> Result<Self> {
        Ok(Self::with_parts(
            backend.into_renderer()?,
            StaticPageService::new()?,
            RenderOptions::default(),
        ))
    }

    pub fn with_parts(
        renderer: Option<Arc<dyn PageRenderer>>,
        page: StaticPageService,
        render_options: RenderOptions,
    ) -> Self {
        match &renderer {
            Some(r) => info!(renderer = r.name(), "Content extractor ready"),
            None => info!("Content extractor ready (rendering disabled)"),
        }
        Self {
            renderer,
            page,
            render_options,
        }
    }

    pub async fn extract(&self, url: &str) -> Result<ExtractionResult> {
        validate_url(url)?;
        let kind = SiteKind::classify(url);
        info!(url, kind = ?kind, "Extracting content");

        if kind.needs_rendering() {
            if let Some(renderer) = &self.renderer {
                let options = self
                    .render_options
                    .waiting_for(kind.wait_selector().map(WaitFor::new));

                match renderer.render(url, &options).await {
                    Ok(page) => return Ok(site_content(kind, page)),
                    Err(e) => {
                        warn!(
                            url,
                            renderer = renderer.name(),
                            error = %e,
                            "Render failed, falling back to static fetch"
                        );
                    }
                }
            }
        }

        self.page.fetch(url).await
    }
}

fn validate_url(url: &str) -> Result<()> {
    let parsed = url::Url::parse(url).map_err(|e| ExtractError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(ExtractError::InvalidUrl {
            url: url.to_string(),
            reason: format!("unsupported scheme {other}"),
        }),
    }
}

/// Run the site routine over a rendered page. A failed element wait turns
/// into a notice instead of an error.
fn site_content(kind: SiteKind, page: RenderedPage) -> ExtractionResult {
    let content = match (kind, page.wait_error.as_deref()) {
        (SiteKind::Social, Some(err)) => twitter::failure_notice(err),
        (SiteKind::Discussion, Some(err)) => reddit::failure_notice(err),
        (SiteKind::Social, None) => twitter::extract(&Html::parse_document(&page.html)),
        (SiteKind::Discussion, None) => reddit::extract(&Html::parse_document(&page.html)),
        (SiteKind::Generic, _) => {
            crate::services::page::readable_text(&page.html).content
        }
    };

    ExtractionResult {
        content,
        title: page.title,
    }
}
