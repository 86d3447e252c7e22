//! Pull adapter for push-style sources.
//!
//! A pump task receives [`PushEvent`]s from the upstream source and buffers
//! the data. `read` hands the buffer out on demand, so a push source looks
//! like any other [`PullSource`] to the duplex.
//!
//! Flow control: once the buffer holds `high_water_mark` chunks the upstream
//! is paused, and a `read` that brings it back below resumes it. `End` is
//! only raised by `read`, once the upstream has ended and the buffer is
//! empty, so a subscriber that arrives after the upstream finished still
//! sees it.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use log::debug;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::capability::{PullSource, PushSource};
use super::emitter::{Emitter, Subscription};
use super::event::{PushEvent, SourceEvent};
use crate::config::DuplexOptions;
use crate::error::LockResultExt;

struct WrapState<T> {
    buffer: VecDeque<T>,
    paused: bool,
    upstream_ended: bool,
    end_emitted: bool,
}

/// State shared between the wrapper and its pump task.
struct Shared<T, S> {
    state: Mutex<WrapState<T>>,
    upstream: Mutex<S>,
    events: Emitter<SourceEvent>,
    high_water_mark: usize,
}

impl<T, S: PushSource<T>> Shared<T, S> {
    fn accept(&self, chunk: T) {
        let should_pause = {
            let mut state = self.state.lock().recover_poison("wrap accept");
            state.buffer.push_back(chunk);
            let over = !state.paused && state.buffer.len() >= self.high_water_mark;
            if over {
                state.paused = true;
            }
            over
        };

        if should_pause {
            debug!(
                target: "duplexer::wrap",
                "Buffer reached high water mark ({}), pausing upstream",
                self.high_water_mark
            );
            self.upstream.lock().recover_poison("wrap pause").pause();
        }

        self.events.emit(SourceEvent::Readable);
    }

    fn finish(&self) {
        self.state.lock().recover_poison("wrap finish").upstream_ended = true;
        // The next read observes the end, even with nothing left buffered.
        self.events.emit(SourceEvent::Readable);
    }
}

/// A [`PushSource`] adapted to the [`PullSource`] contract.
pub struct WrappedSource<T, S> {
    shared: Arc<Shared<T, S>>,
    cancel_token: CancellationToken,
    _pump: JoinHandle<()>,
}

impl<T, S> WrappedSource<T, S>
where
    T: Send + 'static,
    S: PushSource<T>,
{
    /// Subscribe to `upstream` and start pumping its events.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn wrap(upstream: S, options: &DuplexOptions) -> Self {
        let subscription = upstream.subscribe();
        let shared = Arc::new(Shared {
            state: Mutex::new(WrapState {
                buffer: VecDeque::new(),
                paused: false,
                upstream_ended: false,
                end_emitted: false,
            }),
            upstream: Mutex::new(upstream),
            events: Emitter::new(),
            high_water_mark: options.effective_high_water_mark(),
        });

        let cancel_token = CancellationToken::new();
        let pump = tokio::spawn(pump_loop(
            subscription,
            shared.clone(),
            cancel_token.clone(),
        ));

        Self {
            shared,
            cancel_token,
            _pump: pump,
        }
    }

    /// Number of chunks buffered and not yet read.
    pub fn buffered(&self) -> usize {
        self.shared
            .state
            .lock()
            .recover_poison("wrap buffered")
            .buffer
            .len()
    }
}

impl<T, S> PullSource<T> for WrappedSource<T, S>
where
    T: Send + 'static,
    S: PushSource<T>,
{
    fn read(&mut self) -> Option<T> {
        let (chunk, resume, end) = {
            let mut state = self.shared.state.lock().recover_poison("wrap read");
            let chunk = state.buffer.pop_front();

            let resume = state.paused && state.buffer.len() < self.shared.high_water_mark;
            if resume {
                state.paused = false;
            }

            let end = state.upstream_ended && state.buffer.is_empty() && !state.end_emitted;
            if end {
                state.end_emitted = true;
            }

            (chunk, resume, end)
        };

        if resume {
            debug!(target: "duplexer::wrap", "Buffer drained below high water mark, resuming upstream");
            self.shared
                .upstream
                .lock()
                .recover_poison("wrap resume")
                .resume();
        }
        if end {
            self.shared.events.emit(SourceEvent::End);
        }

        chunk
    }

    fn subscribe(&self) -> Subscription<SourceEvent> {
        self.shared.events.subscribe()
    }
}

impl<T, S> Drop for WrappedSource<T, S> {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}

async fn pump_loop<T, S>(
    mut upstream: Subscription<PushEvent<T>>,
    shared: Arc<Shared<T, S>>,
    cancel_token: CancellationToken,
) where
    S: PushSource<T>,
{
    loop {
        tokio::select! {
            biased;

            _ = cancel_token.cancelled() => {
                debug!(target: "duplexer::wrap", "Pump cancelled, unsubscribing from upstream");
                break;
            }

            event = upstream.recv() => match event {
                Some(PushEvent::Data(chunk)) => shared.accept(chunk),
                Some(PushEvent::Error(err)) => {
                    shared.events.emit(SourceEvent::Error(err));
                }
                Some(PushEvent::End) => {
                    shared.finish();
                    break;
                }
                None => {
                    debug!(target: "duplexer::wrap", "Upstream emitter dropped, treating as end");
                    shared.finish();
                    break;
                }
            }
        }
    }
}
