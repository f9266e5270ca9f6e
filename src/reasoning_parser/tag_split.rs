//! Chunk-agnostic state machine that splits a text stream into thinking and
//! answer spans.

/// Classification of a span of generated text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpanKind {
    Thinking,
    Answer,
}

/// A contiguous run of text that has been conclusively classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedSpan {
    pub kind: SpanKind,
    pub text: String,
}

impl ClassifiedSpan {
    fn new(kind: SpanKind, text: String) -> Self {
        Self { kind, text }
    }
}

/// The marker pair that delimits a thinking region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagDelimiters {
    pub open: String,
    pub close: String,
}

impl Default for TagDelimiters {
    fn default() -> Self {
        Self {
            open: "<think>".to_string(),
            close: "</think>".to_string(),
        }
    }
}

impl TagDelimiters {
    pub fn new(open: impl Into<String>, close: impl Into<String>) -> Self {
        Self {
            open: open.into(),
            close: close.into(),
        }
    }
}

/// Incremental parser that classifies a token stream into alternating
/// thinking and answer regions.
///
/// The parser is fed arbitrary-sized chunks and emits spans for everything
/// that can be conclusively classified. Text that could still turn out to be
/// the start of a delimiter is buffered until more input arrives, so a marker
/// split across any number of chunks is recognized as a single marker.
///
/// Invariants:
/// - `pending` never contains a complete delimiter; it holds only the longest
///   suffix of buffered text that is a proper prefix of the delimiter being
///   searched for in the current mode.
/// - The mode flips only on a fully matched delimiter, never speculatively.
///
/// An unmatched closing marker is not an error; it is treated as ordinary
/// answer text (the open marker was never seen, so no mode flip happened and
/// the closing marker never matches).
#[derive(Debug)]
pub struct TagSplitParser {
    delimiters: TagDelimiters,
    in_thinking: bool,
    pending: String,
}

impl Default for TagSplitParser {
    fn default() -> Self {
        Self::new(TagDelimiters::default())
    }
}

impl TagSplitParser {
    pub fn new(delimiters: TagDelimiters) -> Self {
        Self {
            delimiters,
            in_thinking: false,
            pending: String::new(),
        }
    }

    /// Clear all state back to the initial answer mode with an empty buffer.
    pub fn reset(&mut self) {
        self.in_thinking = false;
        self.pending.clear();
    }

    /// Whether the parser is currently inside a thinking region.
    pub fn is_in_thinking(&self) -> bool {
        self.in_thinking
    }

    /// Feed the next chunk and return every span that can now be classified.
    ///
    /// Empty input returns an empty vector. Never blocks, never fails.
    pub fn feed(&mut self, chunk: &str) -> Vec<ClassifiedSpan> {
        if chunk.is_empty() && self.pending.is_empty() {
            return Vec::new();
        }
        self.pending.push_str(chunk);

        let mut spans = Vec::new();
        loop {
            let delimiter = if self.in_thinking {
                self.delimiters.close.clone()
            } else {
                self.delimiters.open.clone()
            };

            match self.pending.find(&delimiter) {
                Some(at) => {
                    if at > 0 {
                        spans.push(ClassifiedSpan::new(
                            self.mode(),
                            self.pending[..at].to_string(),
                        ));
                    }
                    self.pending.drain(..at + delimiter.len());
                    self.in_thinking = !self.in_thinking;
                }
                None => {
                    // Keep only the longest buffer suffix that could still
                    // grow into the delimiter; everything before it is final.
                    let carry = longest_prefix_suffix(&self.pending, &delimiter);
                    let emit = self.pending.len() - carry;
                    if emit > 0 {
                        let text: String = self.pending.drain(..emit).collect();
                        spans.push(ClassifiedSpan::new(self.mode(), text));
                    }
                    break;
                }
            }
        }
        spans
    }

    /// Flush the buffer at end of stream.
    ///
    /// Any retained partial-delimiter text is emitted in the current mode:
    /// a stream that ends inside an unterminated thinking region flushes the
    /// remainder as thinking rather than silently dropping it.
    pub fn finish(&mut self) -> Option<ClassifiedSpan> {
        if self.pending.is_empty() {
            return None;
        }
        let text = std::mem::take(&mut self.pending);
        Some(ClassifiedSpan::new(self.mode(), text))
    }

    fn mode(&self) -> SpanKind {
        if self.in_thinking {
            SpanKind::Thinking
        } else {
            SpanKind::Answer
        }
    }
}

/// Byte length of the longest proper prefix of `delimiter` that is a suffix
/// of `buf`.
///
/// Candidate lengths are the char boundaries of the delimiter, checked
/// longest first, so overlapping candidate start positions inside `buf` are
/// covered by the suffix comparison itself.
fn longest_prefix_suffix(buf: &str, delimiter: &str) -> usize {
    for (len, _) in delimiter.char_indices().rev() {
        if len > 0 && len <= buf.len() && buf.ends_with(&delimiter[..len]) {
            return len;
        }
    }
    0
}
