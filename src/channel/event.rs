//! Events raised by sinks, sources and the duplex itself.

use crate::error::SharedError;

/// Metadata travelling with each write, forwarded to the sink unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
    #[default]
    Binary,
    Utf8,
}

/// Events a pull source raises.
#[derive(Debug, Clone)]
pub enum SourceEvent {
    /// Data may now be available from `read`.
    Readable,
    /// No more data will ever be produced. Raised once, after the last chunk was read.
    End,
    Error(SharedError),
}

/// Events a sink raises.
#[derive(Debug, Clone)]
pub enum SinkEvent {
    /// The sink completed, either after `end` or on its own (e.g. the peer closed).
    Finish,
    Error(SharedError),
}

/// Events a push-style source raises.
#[derive(Debug, Clone)]
pub enum PushEvent<T> {
    Data(T),
    End,
    Error(SharedError),
}

/// Events raised on the duplex handle.
#[derive(Debug, Clone)]
pub enum DuplexEvent {
    /// The input side completed; no more writes are accepted.
    Finish,
    /// The consumer has read the last chunk.
    End,
    /// A sink or source error, bubbled unchanged.
    Error(SharedError),
    /// The adapter task has shut down and released both channels.
    Close,
}

impl DuplexEvent {
    pub fn is_error(&self) -> bool {
        matches!(self, DuplexEvent::Error(_))
    }
}
