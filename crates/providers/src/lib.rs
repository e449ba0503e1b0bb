pub mod anthropic;
pub mod error;
pub mod gemini;
mod http;
pub mod openai;
pub mod pricing;
pub mod provider;
pub mod types;

pub use anthropic::AnthropicClient;
pub use error::{ErrorKind, ProviderError, Result};
pub use gemini::GeminiClient;
pub use openai::OpenAiClient;
pub use pricing::ModelPrice;
pub use provider::{Provider, ProviderKind, ProviderRegistry};
pub use types::*;
