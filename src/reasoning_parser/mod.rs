//! Incremental separation of "thinking" and "answer" content in a token stream.
//!
//! Reasoning models interleave intermediate reasoning with the user-facing
//! answer inside a single text stream, delimited by a fixed marker pair
//! (`<think>` / `</think>` by default). The parser here classifies that
//! stream chunk by chunk, no matter where the network happens to split it.

mod accumulator;
mod tag_split;

pub use accumulator::{ConsumeOutcome, ResponseAccumulator, ResponseTotals};
pub use tag_split::{ClassifiedSpan, SpanKind, TagDelimiters, TagSplitParser};
