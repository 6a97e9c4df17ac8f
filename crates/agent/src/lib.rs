//! Message routing for the QueryStream chat proxy.
//!
//! Every inbound message takes one path:
//! 1. **Domain filter** (`scope`) - keyword gate; out-of-scope messages get a
//!    fixed redirect and never reach the model.
//! 2. **Prompt composition** (`prompt`) - knowledge block, recent transcript,
//!    style instructions and the user message, in that order.
//! 3. **Generation** (`llm`) - a single bounded call to the Gemini API.
//! 4. **Fallback** (`fallback`) - a static rule table answers whenever
//!    generation fails, so the user always gets text back.
//!
//! `runtime::ResponseResolver` ties the steps together and holds no mutable
//! state; history arrives with each call.

pub mod conversation;
pub mod fallback;
pub mod llm;
pub mod prompt;
pub mod runtime;
pub mod scope;

pub use llm::{GeminiClient, GenerationParams, LlmClient, LlmError};
pub use runtime::{Resolution, ResolutionOutcome, ResponseResolver, REDIRECT_MESSAGE};
pub use scope::{ScopeFilter, ScopeVerdict};
