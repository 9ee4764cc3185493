//! Bounded output sink for streamed transcodes.
//!
//! The sink is the write half of a bounded channel. A full channel makes
//! [`StreamSink::send`] wait, so a slow reader throttles the transcode instead
//! of growing a buffer. Dropping the read half closes the sink, which the
//! writer treats as the client going away.

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use mf_core::Error;

/// One item delivered to the reader: a chunk of output or a terminal error.
pub type SinkItem = std::result::Result<Bytes, Error>;

/// Read half of a sink, usable directly as an HTTP response body stream.
pub type SinkStream = ReceiverStream<SinkItem>;

/// The reader side of the sink has been dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("output sink closed")]
pub struct SinkClosed;

/// Write half of a bounded byte stream.
#[derive(Debug, Clone)]
pub struct StreamSink {
    tx: mpsc::Sender<SinkItem>,
}

/// Create a sink holding at most `capacity` unread chunks.
pub fn channel(capacity: usize) -> (StreamSink, SinkStream) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (StreamSink { tx }, ReceiverStream::new(rx))
}

impl StreamSink {
    /// Deliver a chunk, waiting while the reader is behind.
    pub async fn send(&self, chunk: Bytes) -> std::result::Result<(), SinkClosed> {
        self.tx.send(Ok(chunk)).await.map_err(|_| SinkClosed)
    }

    /// Terminate the stream with an error. Returns `false` if nobody is
    /// listening any more.
    pub async fn fail(&self, err: Error) -> bool {
        self.tx.send(Err(err)).await.is_ok()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
