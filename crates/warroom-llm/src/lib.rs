//! Hosted-LLM access: the Gemini HTTP client, attachment normalization,
//! and the ordered model fallback chain.

pub mod attachment;
pub mod chain;
pub mod client;

pub use attachment::{Attachment, AttachmentError, PromptPart};
pub use chain::{ChainError, GenerateBackend, ModelChain};
pub use client::{GeminiClient, GenerateError, GenerationRequest};
