pub mod error;
pub mod openai;
pub mod traits;
pub mod util;

pub use error::AiError;
pub use openai::OpenAi;
pub use traits::{CompletionModel, CompletionRequest, Message, MessageRole};
pub use util::truncate_to_char_boundary;
