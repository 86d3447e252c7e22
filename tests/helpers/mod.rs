//! Shared mock channels for duplex integration tests.
//!
//! Every mock is a cheap clone around shared state, so a test can keep one
//! copy for observation after moving another into the duplex.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use duplexer::{
    DuplexEvent, Emitter, Encoding, PullSource, PushEvent, PushSink, PushSource, SharedError,
    SinkEvent, SourceEvent, Subscription, WriteDone,
};

pub const EVENT_TIMEOUT: Duration = Duration::from_secs(2);
pub const QUIET_PERIOD: Duration = Duration::from_millis(100);

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Sink that records every chunk and completes writes immediately.
#[derive(Clone, Default)]
pub struct MockSink {
    written: Arc<Mutex<Vec<(String, Encoding)>>>,
    ends: Arc<AtomicUsize>,
    fail_writes: Arc<Mutex<Option<SharedError>>>,
    finish_on_end: bool,
    events: Emitter<SinkEvent>,
}

impl MockSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink that raises `Finish` as soon as it is ended, like a flushed pipe.
    pub fn finishing_on_end() -> Self {
        Self {
            finish_on_end: true,
            ..Self::default()
        }
    }

    pub fn written(&self) -> Vec<String> {
        self.written
            .lock()
            .unwrap()
            .iter()
            .map(|(chunk, _)| chunk.clone())
            .collect()
    }

    pub fn encodings(&self) -> Vec<Encoding> {
        self.written.lock().unwrap().iter().map(|(_, e)| *e).collect()
    }

    pub fn end_calls(&self) -> usize {
        self.ends.load(Ordering::SeqCst)
    }

    /// Complete every following write with `err`.
    pub fn fail_writes_with(&self, err: SharedError) {
        *self.fail_writes.lock().unwrap() = Some(err);
    }

    /// The sink completes on its own, e.g. the remote peer closed.
    pub fn finish(&self) {
        self.events.emit(SinkEvent::Finish);
    }

    pub fn raise(&self, err: SharedError) {
        self.events.emit(SinkEvent::Error(err));
    }

    pub fn listener_count(&self) -> usize {
        self.events.listener_count()
    }
}

impl PushSink<String> for MockSink {
    fn write(&mut self, chunk: String, encoding: Encoding, done: WriteDone) {
        if let Some(err) = self.fail_writes.lock().unwrap().clone() {
            done.fail(err);
            return;
        }
        self.written.lock().unwrap().push((chunk, encoding));
        done.succeed();
    }

    fn end(&mut self) {
        self.ends.fetch_add(1, Ordering::SeqCst);
        if self.finish_on_end {
            self.events.emit(SinkEvent::Finish);
        }
    }

    fn subscribe(&self) -> Subscription<SinkEvent> {
        self.events.subscribe()
    }
}

#[derive(Default)]
struct SourceState {
    queue: VecDeque<String>,
    ended: bool,
    end_emitted: bool,
}

/// Pull source backed by a queue, counting every `read` call.
#[derive(Clone, Default)]
pub struct MockSource {
    state: Arc<Mutex<SourceState>>,
    reads: Arc<AtomicUsize>,
    events: Emitter<SourceEvent>,
}

impl MockSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn preloaded(chunks: &[&str]) -> Self {
        let source = Self::new();
        source
            .state
            .lock()
            .unwrap()
            .queue
            .extend(chunks.iter().map(|c| c.to_string()));
        source
    }

    /// Make a chunk available and announce it.
    pub fn push(&self, chunk: &str) {
        self.state.lock().unwrap().queue.push_back(chunk.to_string());
        self.events.emit(SourceEvent::Readable);
    }

    /// Raise `Readable` without adding data.
    pub fn announce(&self) {
        self.events.emit(SourceEvent::Readable);
    }

    /// Make a chunk available silently.
    pub fn stash(&self, chunk: &str) {
        self.state.lock().unwrap().queue.push_back(chunk.to_string());
    }

    /// Mark the source finished. `End` is raised once the queue is drained.
    pub fn end(&self) {
        let emit_now = {
            let mut state = self.state.lock().unwrap();
            state.ended = true;
            let now = state.queue.is_empty() && !state.end_emitted;
            if now {
                state.end_emitted = true;
            }
            now
        };
        if emit_now {
            self.events.emit(SourceEvent::End);
        }
    }

    pub fn raise(&self, err: SharedError) {
        self.events.emit(SourceEvent::Error(err));
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn listener_count(&self) -> usize {
        self.events.listener_count()
    }
}

impl PullSource<String> for MockSource {
    fn read(&mut self) -> Option<String> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let (chunk, emit_end) = {
            let mut state = self.state.lock().unwrap();
            let chunk = state.queue.pop_front();
            let emit_end = state.ended && state.queue.is_empty() && !state.end_emitted;
            if emit_end {
                state.end_emitted = true;
            }
            (chunk, emit_end)
        };
        if emit_end {
            self.events.emit(SourceEvent::End);
        }
        chunk
    }

    fn subscribe(&self) -> Subscription<SourceEvent> {
        self.events.subscribe()
    }
}

/// Push-style source without `read`; the test drives emission.
#[derive(Clone, Default)]
pub struct MockPushSource {
    events: Emitter<PushEvent<String>>,
    paused: Arc<Mutex<bool>>,
    pauses: Arc<AtomicUsize>,
}

impl MockPushSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&self, chunk: &str) {
        self.events.emit(PushEvent::Data(chunk.to_string()));
    }

    pub fn end(&self) {
        self.events.emit(PushEvent::End);
    }

    pub fn raise(&self, err: SharedError) {
        self.events.emit(PushEvent::Error(err));
    }

    pub fn is_paused(&self) -> bool {
        *self.paused.lock().unwrap()
    }

    pub fn pauses(&self) -> usize {
        self.pauses.load(Ordering::SeqCst)
    }

    pub fn listener_count(&self) -> usize {
        self.events.listener_count()
    }
}

impl PushSource<String> for MockPushSource {
    fn subscribe(&self) -> Subscription<PushEvent<String>> {
        self.events.subscribe()
    }

    fn pause(&mut self) {
        *self.paused.lock().unwrap() = true;
        self.pauses.fetch_add(1, Ordering::SeqCst);
    }

    fn resume(&mut self) {
        *self.paused.lock().unwrap() = false;
    }
}

/// Wait for the next duplex event, failing the test after a timeout.
pub async fn next_event(events: &mut Subscription<DuplexEvent>) -> DuplexEvent {
    tokio::time::timeout(EVENT_TIMEOUT, events.recv())
        .await
        .expect("timed out waiting for duplex event")
        .expect("duplex event emitter dropped")
}

/// Wait until an event matching `predicate` arrives, skipping others.
pub async fn wait_for(
    events: &mut Subscription<DuplexEvent>,
    predicate: impl Fn(&DuplexEvent) -> bool,
) -> DuplexEvent {
    loop {
        let event = next_event(events).await;
        if predicate(&event) {
            return event;
        }
    }
}

/// Collect every event that arrives within the quiet period.
pub async fn quiet_events(events: &mut Subscription<DuplexEvent>) -> Vec<DuplexEvent> {
    tokio::time::sleep(QUIET_PERIOD).await;
    events.drain()
}

/// Poll `condition` until it holds, failing the test after a timeout.
pub async fn eventually(condition: impl Fn() -> bool) {
    tokio::time::timeout(EVENT_TIMEOUT, async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

pub fn io_error(message: &str) -> SharedError {
    duplexer::shared(std::io::Error::other(message.to_string()))
}
