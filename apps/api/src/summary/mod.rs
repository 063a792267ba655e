// Daily summary: generation, validation, the per-date lock and the HTTP
// handlers that expose it. All LLM calls go through llm_client.

pub mod guard;
pub mod handlers;
pub mod prompts;
pub mod service;
pub mod summarizer;
pub mod validation;
