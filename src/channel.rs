//! Capabilities and events of the two underlying channels.
//!
//! # Components
//!
//! - `PullSource` / `PushSink` / `PushSource`: what the duplex needs from its halves
//! - `Emitter` / `Subscription`: typed event delivery with unsubscribe-on-drop
//! - `WrappedSource`: turns a push-style source into a `PullSource`
//! - `WriteDone` / `WriteAck`: completion of a single forwarded write

mod capability;
mod emitter;
mod event;
mod wrap;
mod write_done;

pub use capability::{PullSource, PushSink, PushSource};
pub use emitter::{Emitter, Subscription};
pub use event::{DuplexEvent, Encoding, PushEvent, SinkEvent, SourceEvent};
pub use wrap::WrappedSource;
pub use write_done::{WriteAck, WriteDone};
