pub mod extractor;
pub mod llm;

pub use extractor::{BookingExtractor, ExtractorConfig};
pub use llm::{HttpLlmClient, LlmClient, LlmError, NoopLlmClient};
