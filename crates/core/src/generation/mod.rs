//! # Generation
//!
//! The contract the orchestrator uses to reach the text generation service,
//! and its Gemini implementation.

pub mod client;
pub mod gemini;

#[cfg(test)]
pub(crate) mod testing;

pub use client::{
    CitationOrigin, Generation, GenerationClient, GenerationRequest, GroundingChunk,
    FAILURE_PREFIX, UNAVAILABLE_TEXT,
};
pub use gemini::GeminiClient;
