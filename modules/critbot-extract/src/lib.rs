pub mod error;
pub mod extractor;
pub mod render;
pub mod router;
pub mod testing;
mod dom;
mod services;

pub use error::{ExtractError, RenderError, Result};
pub use extractor::ContentExtractor;
pub use render::{PageBackend, PageRenderer, RenderOptions, RenderedPage, WaitFor};
pub use router::SiteKind;
pub use services::page::StaticPageService;
