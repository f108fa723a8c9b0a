//! Buffered log broadcasting.
//!
//! Backend startup diagnostics arrive before any UI exists to display
//! them. The broadcaster buffers every event until a consumer attaches,
//! flushes the buffer exactly once in arrival order, and delivers
//! everything after that live. Detaching resumes buffering.

use std::sync::Mutex;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::debug;

use timelens_core::{LogEvent, LogLevel, LogSource, LogStream};

struct Inner {
    buffer: Vec<LogEvent>,
    consumer: Option<UnboundedSender<LogEvent>>,
    next_seq: u64,
}

/// Buffer-until-attach broadcaster with a single optional consumer.
///
/// Sync interior mutability (std mutex, never held across an await) so
/// reader tasks and the exit monitor can emit without async locking.
pub struct LogBroadcaster {
    inner: Mutex<Inner>,
}

impl LogBroadcaster {
    /// Create an empty, unattached broadcaster.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                buffer: Vec::new(),
                consumer: None,
                next_seq: 0,
            }),
        }
    }

    /// Emit a backend output line.
    pub fn backend(&self, level: LogLevel, stream: LogStream, text: String) {
        self.emit(level, LogSource::Backend, Some(stream), text);
    }

    /// Emit a host-side diagnostic.
    pub fn host(&self, level: LogLevel, text: String) {
        self.emit(level, LogSource::Host, None, text);
    }

    fn emit(&self, level: LogLevel, source: LogSource, stream: Option<LogStream>, text: String) {
        let mut inner = self.inner.lock().unwrap();
        let event = LogEvent {
            level,
            source,
            stream,
            text,
            seq: inner.next_seq,
        };
        inner.next_seq += 1;

        if let Some(ref tx) = inner.consumer {
            if tx.send(event.clone()).is_ok() {
                return;
            }
            // Consumer receiver was dropped without detach(); fall back
            // to buffering so nothing is lost for the next attach.
            debug!("log consumer went away; resuming buffering");
            inner.consumer = None;
        }
        inner.buffer.push(event);
    }

    /// Attach the (single) consumer.
    ///
    /// Everything buffered so far is flushed into the returned channel in
    /// original order before any live event, and is never delivered again.
    /// Attaching replaces a previous consumer.
    pub fn attach(&self) -> UnboundedReceiver<LogEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = self.inner.lock().unwrap();
        let backlog = std::mem::take(&mut inner.buffer);
        debug!(backlog = backlog.len(), "log consumer attached");
        for event in backlog {
            // Cannot fail: we hold the receiver right here.
            let _ = tx.send(event);
        }
        inner.consumer = Some(tx);
        rx
    }

    /// Detach the consumer; subsequent events buffer again.
    pub fn detach(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.consumer = None;
    }

    /// Number of events waiting for the next attach.
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.inner.lock().unwrap().buffer.len()
    }
}

impl Default for LogBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}
