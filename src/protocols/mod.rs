//! Versioned API contracts and their chunk encoders.
//!
//! Each supported API version owns its wire types and a pure encoder that
//! maps session [`OutputEvent`]s to that version's chunk shape. Encoders keep
//! no state between calls; the accumulated totals are carried inside the
//! events themselves, which keeps every encoder unit-testable in isolation
//! from the parser.
//!
//! [`OutputEvent`]: crate::session::OutputEvent

pub mod chat;
pub mod legacy;
