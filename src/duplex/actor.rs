//! Task that owns a [`DuplexCore`] and serialises everything that touches it.
//!
//! Commands from the handle and events from both channels arrive on
//! separate queues; the loop applies them one at a time, so the core's
//! `waiting_for_data` flag never needs a lock. At most one consumer read
//! is parked at a time.
//!
//! The task exits when the core reports both directions closed, when the
//! handle goes away, or on cancellation. On exit it emits `Close` once and
//! drops both subscriptions, unregistering from the sink and source.

use std::sync::Mutex;

use log::{debug, warn};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::state::{DuplexCore, ReadOutcome};
use crate::channel::{
    DuplexEvent, Encoding, PullSource, PushSink, SinkEvent, SourceEvent, Subscription, WriteDone,
};
use crate::error::LockResultExt;

/// Queue capacity for handle commands.
///
/// Bounds the number of writes and reads queued ahead of the task; a full
/// queue makes `write` wait.
pub(crate) const COMMAND_QUEUE_CAPACITY: usize = 256;

pub(crate) enum Command<T> {
    Write {
        chunk: T,
        encoding: Encoding,
        done: WriteDone,
    },
    End,
    Read {
        reply: oneshot::Sender<Option<T>>,
    },
}

/// Handle to a running duplex task. Dropping it cancels the task.
///
/// Shared by the reader and writer halves, so the task lives as long as
/// either half does.
pub(crate) struct DuplexTaskHandle {
    join_handle: Mutex<Option<JoinHandle<()>>>,
    cancel_token: CancellationToken,
}

impl DuplexTaskHandle {
    /// Cancel the task and wait until it has released both channels.
    pub(crate) async fn shutdown(&self) {
        self.cancel_token.cancel();
        let join_handle = self
            .join_handle
            .lock()
            .recover_poison("duplex task shutdown")
            .take();
        if let Some(join_handle) = join_handle {
            if let Err(e) = join_handle.await {
                warn!(target: "duplexer::actor", "Duplex task ended abnormally: {}", e);
            }
        }
    }
}

impl Drop for DuplexTaskHandle {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}

/// Subscribe to both channels and spawn the task driving `core`.
///
/// Subscriptions are taken before this returns, so events raised by the
/// channels right after construction are not lost.
pub(crate) fn spawn_duplex_task<T, Si, So>(
    core: DuplexCore<T, Si, So>,
    commands: mpsc::Receiver<Command<T>>,
) -> DuplexTaskHandle
where
    T: Send + 'static,
    Si: PushSink<T>,
    So: PullSource<T>,
{
    let source_events = core.source().subscribe();
    let sink_events = core.sink().subscribe();

    let cancel_token = CancellationToken::new();
    let join_handle = tokio::spawn(duplex_loop(
        core,
        commands,
        source_events,
        sink_events,
        cancel_token.clone(),
    ));

    DuplexTaskHandle {
        join_handle: Mutex::new(Some(join_handle)),
        cancel_token,
    }
}

async fn duplex_loop<T, Si, So>(
    mut core: DuplexCore<T, Si, So>,
    mut commands: mpsc::Receiver<Command<T>>,
    mut source_events: Subscription<SourceEvent>,
    mut sink_events: Subscription<SinkEvent>,
    cancel_token: CancellationToken,
) where
    Si: PushSink<T>,
    So: PullSource<T>,
{
    let mut pending_read: Option<oneshot::Sender<Option<T>>> = None;
    let mut source_open = true;
    let mut sink_open = true;

    loop {
        if core.is_closed() {
            debug!(target: "duplexer::actor", "Both directions complete, closing");
            break;
        }

        tokio::select! {
            biased;

            _ = cancel_token.cancelled() => {
                debug!(target: "duplexer::actor", "Duplex task cancelled, shutting down");
                break;
            }

            event = source_events.recv(), if source_open => match event {
                Some(event) => core.on_source_event(event),
                None => {
                    debug!(target: "duplexer::actor", "Source dropped its emitter");
                    source_open = false;
                }
            },

            event = sink_events.recv(), if sink_open => match event {
                Some(event) => core.on_sink_event(event),
                None => {
                    debug!(target: "duplexer::actor", "Sink dropped its emitter");
                    sink_open = false;
                }
            },

            command = commands.recv() => match command {
                Some(Command::Write { chunk, encoding, done }) => core.write(chunk, encoding, done),
                Some(Command::End) => core.end_input(),
                Some(Command::Read { reply }) => {
                    // Reads take the handle mutably, so a parked reply still
                    // here belongs to a read future that was dropped.
                    if pending_read.take().is_some() {
                        debug!(target: "duplexer::actor", "Discarding abandoned parked read");
                    }
                    let outcome = core.read();
                    pending_read = deliver(&mut core, reply, outcome);
                    continue;
                }
                None => {
                    debug!(target: "duplexer::actor", "Duplex handle dropped, shutting down");
                    break;
                }
            },
        }

        if let Some(reply) = pending_read.take() {
            let outcome = core.next_chunk();
            pending_read = deliver(&mut core, reply, outcome);
        }
    }

    core.events().emit(DuplexEvent::Close);
}

/// Answer a read if the outcome is final; otherwise keep it parked.
fn deliver<T, Si, So>(
    core: &mut DuplexCore<T, Si, So>,
    reply: oneshot::Sender<Option<T>>,
    outcome: ReadOutcome<T>,
) -> Option<oneshot::Sender<Option<T>>>
where
    Si: PushSink<T>,
    So: PullSource<T>,
{
    match outcome {
        ReadOutcome::Chunk(chunk) => {
            if let Err(Some(chunk)) = reply.send(Some(chunk)) {
                debug!(target: "duplexer::actor", "Reader went away, keeping chunk buffered");
                core.unshift(chunk);
            }
            None
        }
        ReadOutcome::Ended => {
            let _ = reply.send(None);
            None
        }
        ReadOutcome::Pending => Some(reply),
    }
}
