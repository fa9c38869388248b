pub mod chat;
pub mod traits;

pub use chat::ChatClient;
pub use traits::{ChatMessage, ChatRequest, Completion, CompletionSource, TextGenerator};
