//! Join a write-only sink and a read-only source into one duplex channel.
//!
//! Writes on the [`Duplex`] go to the sink; reads pull from the source only
//! when the consumer asks. Completion of either side is propagated to the
//! other, and errors raised by either channel are re-raised on the duplex
//! unless `bubbleErrors` is turned off.

pub mod channel;
pub mod config;
pub mod duplex;
pub mod error;

pub use channel::{
    DuplexEvent, Emitter, Encoding, PullSource, PushEvent, PushSink, PushSource, SinkEvent,
    SourceEvent, Subscription, WrappedSource, WriteAck, WriteDone,
};
pub use config::{ConfigError, DuplexOptions};
pub use duplex::{Duplex, DuplexCore, DuplexReader, DuplexWriter, ReadOutcome};
pub use error::{DuplexError, DuplexResult, SharedError, shared};
