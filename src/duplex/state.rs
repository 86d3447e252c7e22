//! The duplex state machine.
//!
//! `DuplexCore` binds one sink and one source and tracks the completion of
//! both directions. It is single-threaded: every method takes `&mut self`,
//! and events from the channels are fed in through `on_source_event` and
//! `on_sink_event`. The actor in `super::actor` drives it from one task.

use std::collections::VecDeque;

use log::debug;

use crate::channel::{
    DuplexEvent, Emitter, Encoding, PullSource, PushSink, SinkEvent, SourceEvent, WriteDone,
};
use crate::config::DuplexOptions;
use crate::error::{DuplexError, SharedError};

/// Outcome of a consumer read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome<T> {
    Chunk(T),
    /// Nothing available yet; the core is waiting for the source.
    Pending,
    /// The source has ended and every chunk was delivered.
    Ended,
}

pub struct DuplexCore<T, Si, So> {
    sink: Si,
    source: So,
    events: Emitter<DuplexEvent>,
    bubble_errors: bool,
    high_water_mark: usize,
    /// Set when a pull found nothing; cleared by the next `Readable`.
    waiting_for_data: bool,
    output: VecDeque<T>,
    output_ended: bool,
    end_emitted: bool,
    input_ended: bool,
    sink_finished: bool,
}

impl<T, Si, So> DuplexCore<T, Si, So>
where
    Si: PushSink<T>,
    So: PullSource<T>,
{
    pub fn new(options: &DuplexOptions, sink: Si, source: So) -> Self {
        Self {
            sink,
            source,
            events: Emitter::new(),
            bubble_errors: options.bubble_errors,
            high_water_mark: options.effective_high_water_mark(),
            waiting_for_data: false,
            output: VecDeque::new(),
            output_ended: false,
            end_emitted: false,
            input_ended: false,
            sink_finished: false,
        }
    }

    /// Events raised on the duplex (`Finish`, `End`, bubbled `Error`).
    pub fn events(&self) -> &Emitter<DuplexEvent> {
        &self.events
    }

    pub fn sink(&self) -> &Si {
        &self.sink
    }

    pub fn source(&self) -> &So {
        &self.source
    }

    /// Forward one chunk to the sink, handing it `done` unchanged.
    pub fn write(&mut self, chunk: T, encoding: Encoding, done: WriteDone) {
        if self.input_ended {
            done.reject(DuplexError::WriteAfterEnd);
            return;
        }
        self.sink.write(chunk, encoding, done);
    }

    /// Drain everything the source has right now into the output buffer.
    ///
    /// Returns the number of chunks pulled. Pulling nothing leaves the core
    /// waiting for the source's next `Readable`.
    pub fn read_request(&mut self) -> usize {
        if self.output_ended {
            return 0;
        }

        let mut reads = 0;
        while let Some(chunk) = self.source.read() {
            self.output.push_back(chunk);
            reads += 1;
        }

        if reads == 0 {
            self.waiting_for_data = true;
        }
        reads
    }

    /// Consumer pull: refill from the source when below the high water mark,
    /// then hand out the next chunk.
    pub fn read(&mut self) -> ReadOutcome<T> {
        if !self.output_ended && self.output.len() < self.high_water_mark {
            self.read_request();
        }
        self.next_chunk()
    }

    /// Hand out a buffered chunk without touching the source.
    pub fn next_chunk(&mut self) -> ReadOutcome<T> {
        if let Some(chunk) = self.output.pop_front() {
            return ReadOutcome::Chunk(chunk);
        }
        if self.output_ended {
            if !self.end_emitted {
                self.end_emitted = true;
                debug!(target: "duplexer::core", "Output fully consumed, emitting end");
                self.events.emit(DuplexEvent::End);
            }
            return ReadOutcome::Ended;
        }
        ReadOutcome::Pending
    }

    /// Put back a chunk the consumer never received.
    pub fn unshift(&mut self, chunk: T) {
        self.output.push_front(chunk);
    }

    pub fn on_source_event(&mut self, event: SourceEvent) {
        match event {
            SourceEvent::Readable => {
                if self.waiting_for_data {
                    self.waiting_for_data = false;
                    self.read_request();
                }
            }
            SourceEvent::End => {
                if !self.output_ended {
                    debug!(target: "duplexer::core", "Source ended, no more output");
                    self.output_ended = true;
                    self.waiting_for_data = false;
                }
            }
            SourceEvent::Error(err) => self.bubble(err, "source"),
        }
    }

    pub fn on_sink_event(&mut self, event: SinkEvent) {
        match event {
            SinkEvent::Finish => {
                if !self.sink_finished {
                    debug!(target: "duplexer::core", "Sink finished, ending input side");
                    self.sink_finished = true;
                    self.end_input();
                }
            }
            SinkEvent::Error(err) => self.bubble(err, "sink"),
        }
    }

    /// Complete the input side: no more writes, and the sink is told so once.
    pub fn end_input(&mut self) {
        if self.input_ended {
            return;
        }
        self.input_ended = true;
        self.events.emit(DuplexEvent::Finish);

        if !self.sink_finished {
            self.sink.end();
        }
    }

    fn bubble(&self, err: SharedError, origin: &str) {
        if self.bubble_errors {
            self.events.emit(DuplexEvent::Error(err));
        } else {
            debug!(
                target: "duplexer::core",
                "Not bubbling {} error: {}",
                origin,
                err
            );
        }
    }

    pub fn is_waiting_for_data(&self) -> bool {
        self.waiting_for_data
    }

    pub fn is_output_ended(&self) -> bool {
        self.output_ended
    }

    pub fn is_input_ended(&self) -> bool {
        self.input_ended
    }

    pub fn buffered(&self) -> usize {
        self.output.len()
    }

    /// Both directions are complete and the sink has settled.
    pub fn is_closed(&self) -> bool {
        self.end_emitted && self.input_ended && self.sink_finished
    }
}
