//! Streaming gateway in front of a local Ollama instance.
//!
//! The gateway admits a bounded number of concurrent generations, splits each
//! model's output into thinking and answer text as tokens arrive, and serves
//! the result over two API versions: a legacy cumulative-totals API and an
//! OpenAI-compatible chat completions API.

pub mod config;
pub mod core;
pub mod engine;
pub mod observability;
pub mod protocols;
pub mod reasoning_parser;
pub mod routers;
pub mod server;
pub mod session;
