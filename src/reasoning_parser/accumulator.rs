//! Per-session accumulation of classified output.

use serde::Serialize;

use super::tag_split::{SpanKind, TagDelimiters, TagSplitParser};

/// Classified text produced by one `consume` call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConsumeOutcome {
    pub thinking_delta: String,
    pub answer_delta: String,
}

impl ConsumeOutcome {
    pub fn is_empty(&self) -> bool {
        self.thinking_delta.is_empty() && self.answer_delta.is_empty()
    }
}

/// Running classified totals for one generation session.
///
/// `raw` always grows by the literal upstream token, regardless of how the
/// token was classified.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResponseTotals {
    pub thinking: String,
    pub answer: String,
    pub raw: String,
}

/// Wraps one [`TagSplitParser`] and exposes both the incremental delta for
/// the current token and the running totals, since different API versions
/// want one or the other.
///
/// Owned exclusively by one session; never shared across requests.
#[derive(Debug, Default)]
pub struct ResponseAccumulator {
    parser: TagSplitParser,
    totals: ResponseTotals,
}

impl ResponseAccumulator {
    pub fn new(delimiters: TagDelimiters) -> Self {
        Self {
            parser: TagSplitParser::new(delimiters),
            totals: ResponseTotals::default(),
        }
    }

    /// Feed the next upstream token through the parser, growing the totals
    /// and returning the newly classified deltas.
    pub fn consume(&mut self, token: &str) -> ConsumeOutcome {
        self.totals.raw.push_str(token);
        let mut outcome = ConsumeOutcome::default();
        for span in self.parser.feed(token) {
            match span.kind {
                SpanKind::Thinking => {
                    outcome.thinking_delta.push_str(&span.text);
                    self.totals.thinking.push_str(&span.text);
                }
                SpanKind::Answer => {
                    outcome.answer_delta.push_str(&span.text);
                    self.totals.answer.push_str(&span.text);
                }
            }
        }
        outcome
    }

    /// Flush any buffered partial-delimiter text at end of stream and fold it
    /// into the totals.
    pub fn finish(&mut self) -> ConsumeOutcome {
        let mut outcome = ConsumeOutcome::default();
        if let Some(span) = self.parser.finish() {
            match span.kind {
                SpanKind::Thinking => {
                    outcome.thinking_delta.push_str(&span.text);
                    self.totals.thinking.push_str(&span.text);
                }
                SpanKind::Answer => {
                    outcome.answer_delta.push_str(&span.text);
                    self.totals.answer.push_str(&span.text);
                }
            }
        }
        outcome
    }

    pub fn totals(&self) -> &ResponseTotals {
        &self.totals
    }

    pub fn thinking_total(&self) -> &str {
        &self.totals.thinking
    }

    pub fn answer_total(&self) -> &str {
        &self.totals.answer
    }

    pub fn raw_total(&self) -> &str {
        &self.totals.raw
    }
}
