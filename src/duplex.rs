//! The duplex adapter: a single-threaded core, the task that drives it, and
//! the public handle.

mod actor;
mod state;
mod handle;

pub use state::{DuplexCore, ReadOutcome};
pub use handle::{Duplex, DuplexReader, DuplexWriter};
