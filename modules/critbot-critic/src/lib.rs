pub mod chat;
pub mod critic;
pub mod labels;
pub mod parser;
pub mod prompts;
pub mod store;
pub mod testing;
pub mod traits;

pub use chat::ConversationPipeline;
pub use critic::{truncate_content, CritiquePipeline};
pub use parser::{parse_score, parse_summary, strip_summary, Score};
pub use prompts::PromptLoader;
pub use store::{sanitize_title, CritiqueStore};
pub use traits::PageExtractor;
