pub mod gate;

pub use gate::{ConcurrencyGate, GateTicket};
