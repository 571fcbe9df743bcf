//! LLM driver. Wraps a streaming `LlmProvider`
//! trait and Anthropic SSE implementation behind a synchronous
//! `call(system, user, phase)` facade; the engine never sees a stream.

pub mod anthropic;
pub mod driver;
pub mod provider;
pub mod types;

pub use anthropic::AnthropicProvider;
pub use driver::{LlmCallResult, LlmDriver};
pub use provider::{LlmError, LlmProvider, LlmResult, LlmStream};
pub use types::{LlmMessage, LlmRequest, StreamDelta, Usage};
