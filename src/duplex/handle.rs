//! The public duplex handle and its reader and writer halves.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};

use super::actor::{COMMAND_QUEUE_CAPACITY, Command, DuplexTaskHandle, spawn_duplex_task};
use super::state::DuplexCore;
use crate::channel::{
    DuplexEvent, Emitter, Encoding, PullSource, PushSink, PushSource, Subscription,
    WrappedSource, WriteDone,
};
use crate::config::DuplexOptions;
use crate::error::{DuplexError, DuplexResult};

/// A sink and a source presented as one bidirectional channel.
///
/// Writes go to the sink; reads pull from the source. Both channels are
/// driven by a background task, so construction must happen inside a Tokio
/// runtime. Dropping the handle stops the task and unsubscribes from both
/// channels.
///
/// A read waits for data while holding the handle mutably. To keep writing
/// while a read is outstanding, [`split`](Self::split) the handle.
///
/// ```ignore
/// let mut duplex = Duplex::new(sink, source);
/// duplex.write(chunk).await?;
/// duplex.end().await?;
/// while let Some(chunk) = duplex.read().await {
///     // ...
/// }
/// ```
pub struct Duplex<T> {
    reader: DuplexReader<T>,
    writer: DuplexWriter<T>,
    options: DuplexOptions,
}

impl<T: Send + 'static> Duplex<T> {
    /// Join `sink` and `source` with default options.
    pub fn new<Si, So>(sink: Si, source: So) -> Self
    where
        Si: PushSink<T>,
        So: PullSource<T>,
    {
        Self::with_options(DuplexOptions::default(), sink, source)
    }

    pub fn with_options<Si, So>(options: DuplexOptions, sink: Si, source: So) -> Self
    where
        Si: PushSink<T>,
        So: PullSource<T>,
    {
        let core = DuplexCore::new(&options, sink, source);
        let events = core.events().clone();
        let (commands, rx) = mpsc::channel(COMMAND_QUEUE_CAPACITY);
        let task = Arc::new(spawn_duplex_task(core, rx));

        Self {
            reader: DuplexReader {
                commands: commands.clone(),
                events,
                task: task.clone(),
                output_ended: false,
            },
            writer: DuplexWriter { commands, task },
            options,
        }
    }

    /// Pick the construction shape from whether options were supplied.
    pub fn from_parts<Si, So>(options: Option<DuplexOptions>, sink: Si, source: So) -> Self
    where
        Si: PushSink<T>,
        So: PullSource<T>,
    {
        Self::with_options(options.unwrap_or_default(), sink, source)
    }

    /// Join `sink` with a push-style source, adapting it to on-demand pulls.
    pub fn wrap<Si, S>(sink: Si, source: S) -> Self
    where
        Si: PushSink<T>,
        S: PushSource<T>,
    {
        Self::wrap_with_options(DuplexOptions::default(), sink, source)
    }

    pub fn wrap_with_options<Si, S>(options: DuplexOptions, sink: Si, source: S) -> Self
    where
        Si: PushSink<T>,
        S: PushSource<T>,
    {
        let source = WrappedSource::wrap(source, &options);
        Self::with_options(options, sink, source)
    }
}

impl<T> Duplex<T> {
    /// Write one chunk and wait for the sink to complete it.
    pub async fn write(&self, chunk: T) -> DuplexResult<()> {
        self.writer.write(chunk).await
    }

    pub async fn write_with(&self, chunk: T, encoding: Encoding) -> DuplexResult<()> {
        self.writer.write_with(chunk, encoding).await
    }

    /// Signal that no more writes are coming. The sink is ended once.
    pub async fn end(&self) -> DuplexResult<()> {
        self.writer.end().await
    }

    /// Next chunk from the source, waiting until one is available.
    ///
    /// Returns `None` once the source has ended and every chunk was read.
    pub async fn read(&mut self) -> Option<T> {
        self.reader.read().await
    }

    /// Listen for `Finish`, `End`, bubbled `Error`s and `Close`.
    pub fn subscribe(&self) -> Subscription<DuplexEvent> {
        self.reader.subscribe()
    }

    pub fn options(&self) -> &DuplexOptions {
        &self.options
    }

    /// Separate the read and write sides so they can be driven concurrently.
    ///
    /// The task keeps running until both halves are dropped.
    pub fn split(self) -> (DuplexReader<T>, DuplexWriter<T>) {
        (self.reader, self.writer)
    }

    /// Stop the task and wait until both channels are released.
    ///
    /// Unlike `end`, this does not tell the sink that writing is done.
    pub async fn close(self) {
        self.writer.task.shutdown().await;
    }
}

impl<T> std::fmt::Debug for Duplex<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Duplex")
            .field("options", &self.options)
            .field("output_ended", &self.reader.output_ended)
            .finish()
    }
}

/// Read side of a split [`Duplex`]. At most one read is outstanding.
pub struct DuplexReader<T> {
    commands: mpsc::Sender<Command<T>>,
    events: Emitter<DuplexEvent>,
    task: Arc<DuplexTaskHandle>,
    output_ended: bool,
}

impl<T> DuplexReader<T> {
    pub async fn read(&mut self) -> Option<T> {
        if self.output_ended {
            return None;
        }

        let (reply, rx) = oneshot::channel();
        if self.commands.send(Command::Read { reply }).await.is_err() {
            self.output_ended = true;
            return None;
        }

        match rx.await {
            Ok(Some(chunk)) => Some(chunk),
            Ok(None) | Err(_) => {
                self.output_ended = true;
                None
            }
        }
    }

    pub fn subscribe(&self) -> Subscription<DuplexEvent> {
        self.events.subscribe()
    }

    /// Stop the task, releasing both channels even if the writer is still held.
    pub async fn close(self) {
        self.task.shutdown().await;
    }
}

impl<T> std::fmt::Debug for DuplexReader<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DuplexReader")
            .field("output_ended", &self.output_ended)
            .finish()
    }
}

/// Write side of a split [`Duplex`]. Clones share the same sink.
pub struct DuplexWriter<T> {
    commands: mpsc::Sender<Command<T>>,
    task: Arc<DuplexTaskHandle>,
}

impl<T> DuplexWriter<T> {
    pub async fn write(&self, chunk: T) -> DuplexResult<()> {
        self.write_with(chunk, Encoding::default()).await
    }

    pub async fn write_with(&self, chunk: T, encoding: Encoding) -> DuplexResult<()> {
        let (done, ack) = WriteDone::new();
        self.commands
            .send(Command::Write {
                chunk,
                encoding,
                done,
            })
            .await
            .map_err(|_| DuplexError::Closed)?;
        ack.wait().await
    }

    pub async fn end(&self) -> DuplexResult<()> {
        self.commands
            .send(Command::End)
            .await
            .map_err(|_| DuplexError::Closed)
    }
}

impl<T> Clone for DuplexWriter<T> {
    fn clone(&self) -> Self {
        Self {
            commands: self.commands.clone(),
            task: self.task.clone(),
        }
    }
}

impl<T> std::fmt::Debug for DuplexWriter<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DuplexWriter")
            .field("closed", &self.commands.is_closed())
            .finish()
    }
}
