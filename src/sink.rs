//! Delivery of serialized contention records
//!
//! The monitor hands each payload to a [`Sink`] exactly once and moves on.
//! Whatever happens afterwards, including failures, is the sink's business.

use std::io::Write;

use crossbeam_channel::Sender;
use parking_lot::Mutex;
use tracing::{debug, warn};

pub trait Sink: Send + Sync {
    fn send_to_server(&self, payload: String);
}

impl<F> Sink for F
where
    F: Fn(String) + Send + Sync,
{
    fn send_to_server(&self, payload: String) {
        self(payload);
    }
}

/// Forwards payloads to a channel, e.g. a transport thread
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: Sender<String>,
}

impl ChannelSink {
    pub fn new(sender: Sender<String>) -> Self {
        Self { sender }
    }

    /// Unbounded sink plus the receiving end
    pub fn unbounded() -> (Self, crossbeam_channel::Receiver<String>) {
        let (sender, receiver) = crossbeam_channel::unbounded();
        (Self::new(sender), receiver)
    }
}

impl Sink for ChannelSink {
    fn send_to_server(&self, payload: String) {
        if self.sender.send(payload).is_err() {
            debug!("record receiver disconnected, dropping payload");
        }
    }
}

/// Writes one payload per line
pub struct WriterSink<W: Write + Send> {
    writer: Mutex<W>,
}

impl<W: Write + Send> WriterSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

impl<W: Write + Send> Sink for WriterSink<W> {
    fn send_to_server(&self, payload: String) {
        let mut writer = self.writer.lock();
        let result = writeln!(writer, "{payload}").and_then(|()| writer.flush());
        if let Err(error) = result {
            warn!(%error, "failed to write contention record");
        }
    }
}
