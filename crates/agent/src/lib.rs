//! Handler collaborators and runtime wiring for the support assistant.
//!
//! The routing core decides who is asking and which handler answers. This crate supplies
//! the handlers themselves:
//!
//! - `handlers::billing` - the caller's own statement, short or detailed
//! - `handlers::network` - account status first, then diagnostics
//! - `handlers::plan` - usage-based plan recommendation
//! - `handlers::knowledge` - answers grounded in local documentation
//!
//! Amounts, plan choices and account status are computed from the store. The language
//! model only phrases them, and `guardrails` re-attaches any fact a reply drops.

pub mod guardrails;
pub mod handlers;
pub mod llm;
pub mod prompts;
pub mod retrieval;
pub mod runtime;

pub use handlers::{build_handler_set, HandlerContext};
pub use llm::{build_llm_client, LlmClient, LlmRequest};
pub use retrieval::{DocumentIndex, KnowledgeRetriever};
pub use runtime::{AccountView, AssistantRuntime};
