//! The minimal contracts a duplex needs from its two halves.

use super::emitter::Subscription;
use super::event::{Encoding, PushEvent, SinkEvent, SourceEvent};
use super::write_done::WriteDone;

/// A read-only channel that hands out chunks on demand.
///
/// `read` returning `None` means "nothing right now", not "finished".
/// Completion is reported with [`SourceEvent::End`], which must only be
/// raised once every chunk has been handed out by `read`.
pub trait PullSource<T>: Send + 'static {
    fn read(&mut self) -> Option<T>;

    fn subscribe(&self) -> Subscription<SourceEvent>;
}

/// A write-only channel.
pub trait PushSink<T>: Send + 'static {
    /// Accept one chunk. `done` must be completed once the chunk is handled.
    fn write(&mut self, chunk: T, encoding: Encoding, done: WriteDone);

    /// No more writes are coming. The sink raises [`SinkEvent::Finish`] once flushed.
    fn end(&mut self);

    fn subscribe(&self) -> Subscription<SinkEvent>;
}

/// A read-only channel that emits chunks as they arrive instead of on demand.
///
/// Wrap it with [`super::WrappedSource`] to use it as a [`PullSource`].
pub trait PushSource<T>: Send + 'static {
    fn subscribe(&self) -> Subscription<PushEvent<T>>;

    /// Stop emitting data until `resume`. Sources without flow control ignore it.
    fn pause(&mut self) {}

    fn resume(&mut self) {}
}

impl<T, S: PullSource<T> + ?Sized> PullSource<T> for Box<S> {
    fn read(&mut self) -> Option<T> {
        (**self).read()
    }

    fn subscribe(&self) -> Subscription<SourceEvent> {
        (**self).subscribe()
    }
}

impl<T, S: PushSink<T> + ?Sized> PushSink<T> for Box<S> {
    fn write(&mut self, chunk: T, encoding: Encoding, done: WriteDone) {
        (**self).write(chunk, encoding, done)
    }

    fn end(&mut self) {
        (**self).end()
    }

    fn subscribe(&self) -> Subscription<SinkEvent> {
        (**self).subscribe()
    }
}
