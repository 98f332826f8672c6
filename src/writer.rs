//! Rate-limited output buffering.
//!
//! Buffered sends are spaced at least one configured interval apart so
//! the client stays under server flood limits; [`OutputBuffer::send_immediate`]
//! bypasses the queue and the timer for time-critical replies
//! (keep-alive PONGs).
//!
//! The queue and the idle/waiting flag form a single unit of shared
//! state touched from two scheduling contexts: caller tasks and the
//! drain task armed after the first send. One mutex covers both.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use futures_util::SinkExt;
use parking_lot::Mutex;
use tokio::sync::Mutex as AsyncMutex;
use tokio_util::codec::FramedWrite;
use tracing::{debug, warn};

use corvid_proto::LineCodec;

use crate::error::{ClientError, Result};
use crate::transport::BoxedWriter;

type LineSink = FramedWrite<BoxedWriter, LineCodec>;

#[derive(Default)]
struct QueueState {
    queue: VecDeque<String>,
    /// True while the drain timer is armed.
    waiting: bool,
}

/// Serializes outbound lines with a minimum inter-send interval.
pub struct OutputBuffer {
    sink: Arc<AsyncMutex<Option<LineSink>>>,
    state: Arc<Mutex<QueueState>>,
    interval: Duration,
}

impl OutputBuffer {
    /// Create a buffer with the given minimum gap between buffered sends.
    pub fn new(interval: Duration) -> Self {
        Self {
            sink: Arc::new(AsyncMutex::new(None)),
            state: Arc::new(Mutex::new(QueueState::default())),
            interval,
        }
    }

    /// Attach a freshly connected write half. Queued entries survive
    /// a reattach; the drain picks them up on its next tick.
    pub async fn attach(&self, writer: BoxedWriter) {
        *self.sink.lock().await = Some(FramedWrite::new(writer, LineCodec::new()));
    }

    /// Drop the current write half (connection teardown).
    pub async fn detach(&self) {
        *self.sink.lock().await = None;
    }

    /// Number of entries waiting behind the timer.
    pub fn queued(&self) -> usize {
        self.state.lock().queue.len()
    }

    /// Write a line right now, bypassing the queue and the timer.
    ///
    /// Reserved for latency-critical replies; ordinary traffic goes
    /// through [`send_buffered`](Self::send_buffered).
    pub async fn send_immediate(&self, line: impl Into<String>) -> Result<()> {
        let line = line.into();
        debug!(line = %line, "send immediate");
        self.write_line(line).await
    }

    /// Enqueue a line behind the rate limiter.
    ///
    /// When the buffer is idle the line goes out at once and the drain
    /// timer is armed; while the timer is armed, lines queue in FIFO
    /// order and leave one per interval.
    pub async fn send_buffered(&self, line: impl Into<String>) -> Result<()> {
        let line = line.into();
        {
            let mut st = self.state.lock();
            if st.waiting {
                debug!(line = %line, depth = st.queue.len(), "send queued");
                st.queue.push_back(line);
                return Ok(());
            }
            st.waiting = true;
        }

        debug!(line = %line, "send buffered (idle path)");
        if let Err(e) = self.write_line(line).await {
            // Concurrent callers may have enqueued behind the failed
            // write; those entries still need a drain
            let mut st = self.state.lock();
            if st.queue.is_empty() {
                st.waiting = false;
            } else {
                drop(st);
                self.spawn_drain();
            }
            return Err(e);
        }
        self.spawn_drain();
        Ok(())
    }

    async fn write_line(&self, line: String) -> Result<()> {
        let mut guard = self.sink.lock().await;
        let sink = guard.as_mut().ok_or(ClientError::NotConnected)?;
        sink.send(line).await?;
        Ok(())
    }

    /// One-shot drain loop: sleep an interval, pop the oldest entry,
    /// send, repeat; go idle when the queue empties.
    fn spawn_drain(&self) {
        let sink = Arc::clone(&self.sink);
        let state = Arc::clone(&self.state);
        let interval = self.interval;

        tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;

                let mut guard = sink.lock().await;
                let Some(s) = guard.as_mut() else {
                    // Detached: entries stay queued until a reattach
                    continue;
                };

                let next = {
                    let mut st = state.lock();
                    match st.queue.pop_front() {
                        Some(line) => line,
                        None => {
                            st.waiting = false;
                            break;
                        }
                    }
                };

                if let Err(e) = s.send(next).await {
                    warn!(error = %e, "dropping buffered line after write error");
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;
    use tokio::time::Instant;
    use tokio_util::codec::FramedRead;

    async fn attach(out: &OutputBuffer, client_write: BoxedWriter) {
        out.attach(client_write).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_buffered_sends_keep_interval_and_order() {
        let (client, server) = tokio::io::duplex(4096);
        let (_r, w) = tokio::io::split(client);
        let out = OutputBuffer::new(Duration::from_secs(1));
        attach(&out, Box::new(w)).await;
        let mut reader = FramedRead::new(server, LineCodec::new());

        let start = Instant::now();
        out.send_buffered("one").await.unwrap();
        out.send_buffered("two").await.unwrap();
        out.send_buffered("three").await.unwrap();

        let first = reader.next().await.unwrap().unwrap();
        assert_eq!(first, "one");
        assert!(start.elapsed() < Duration::from_secs(1));

        let second = reader.next().await.unwrap().unwrap();
        assert_eq!(second, "two");
        assert!(start.elapsed() >= Duration::from_secs(1));

        let third = reader.next().await.unwrap().unwrap();
        assert_eq!(third, "three");
        assert!(start.elapsed() >= Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_immediate_bypasses_queue() {
        let (client, server) = tokio::io::duplex(4096);
        let (_r, w) = tokio::io::split(client);
        let out = OutputBuffer::new(Duration::from_secs(1));
        attach(&out, Box::new(w)).await;
        let mut reader = FramedRead::new(server, LineCodec::new());

        let start = Instant::now();
        out.send_buffered("queued-a").await.unwrap();
        out.send_buffered("queued-b").await.unwrap();
        out.send_immediate("urgent").await.unwrap();

        // The urgent line goes out ahead of the queued one, with no delay
        assert_eq!(reader.next().await.unwrap().unwrap(), "queued-a");
        assert_eq!(reader.next().await.unwrap().unwrap(), "urgent");
        assert!(start.elapsed() < Duration::from_secs(1));

        assert_eq!(reader.next().await.unwrap().unwrap(), "queued-b");
        assert!(start.elapsed() >= Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_buffer_goes_idle_after_drain() {
        let (client, server) = tokio::io::duplex(4096);
        let (_r, w) = tokio::io::split(client);
        let out = OutputBuffer::new(Duration::from_secs(1));
        attach(&out, Box::new(w)).await;
        let mut reader = FramedRead::new(server, LineCodec::new());

        out.send_buffered("alpha").await.unwrap();
        assert_eq!(reader.next().await.unwrap().unwrap(), "alpha");

        // Let the drain timer fire on an empty queue and go idle
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(out.queued(), 0);

        // Next buffered send takes the idle path again: out at once
        let start = Instant::now();
        out.send_buffered("beta").await.unwrap();
        assert_eq!(reader.next().await.unwrap().unwrap(), "beta");
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_queued_lines_survive_detach_and_reattach() {
        let (client, server) = tokio::io::duplex(4096);
        let (_r, w) = tokio::io::split(client);
        let out = OutputBuffer::new(Duration::from_secs(1));
        attach(&out, Box::new(w)).await;
        let mut reader = FramedRead::new(server, LineCodec::new());

        out.send_buffered("one").await.unwrap();
        out.send_buffered("two").await.unwrap();
        out.send_buffered("three").await.unwrap();
        assert_eq!(reader.next().await.unwrap().unwrap(), "one");

        // A long detach window must not bleed the queue dry
        out.detach().await;
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(out.queued(), 2);

        let (client2, server2) = tokio::io::duplex(4096);
        let (_r2, w2) = tokio::io::split(client2);
        attach(&out, Box::new(w2)).await;
        let mut reader2 = FramedRead::new(server2, LineCodec::new());
        assert_eq!(reader2.next().await.unwrap().unwrap(), "two");
        assert_eq!(reader2.next().await.unwrap().unwrap(), "three");
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_idle_send_arms_drain_for_queued_entries() {
        use std::sync::Arc;

        let out = Arc::new(OutputBuffer::new(Duration::from_secs(1)));

        // Park the first sender inside its write by holding the sink
        let guard = out.sink.lock().await;
        let racer = Arc::clone(&out);
        let first = tokio::spawn(async move { racer.send_buffered("first").await });
        tokio::task::yield_now().await;

        // A second caller enqueues while the first write is in flight
        out.send_buffered("second").await.unwrap();
        assert_eq!(out.queued(), 1);

        // Release the sink: the first write fails (never attached)
        drop(guard);
        let err = first.await.unwrap().unwrap_err();
        assert!(matches!(err, ClientError::NotConnected));
        assert_eq!(out.queued(), 1);

        // Once a writer shows up, the queued entry drains first and
        // later sends keep FIFO order behind it
        let (client, server) = tokio::io::duplex(4096);
        let (_r, w) = tokio::io::split(client);
        attach(&out, Box::new(w)).await;
        let mut reader = FramedRead::new(server, LineCodec::new());
        out.send_buffered("third").await.unwrap();

        assert_eq!(reader.next().await.unwrap().unwrap(), "second");
        assert_eq!(reader.next().await.unwrap().unwrap(), "third");
    }

    #[tokio::test]
    async fn test_send_without_attach_is_an_error() {
        let out = OutputBuffer::new(Duration::from_secs(1));
        let err = out.send_immediate("nope").await.unwrap_err();
        assert!(matches!(err, ClientError::NotConnected));

        let err = out.send_buffered("nope").await.unwrap_err();
        assert!(matches!(err, ClientError::NotConnected));
        // The failed idle-path send must not leave the buffer stuck waiting
        assert_eq!(out.queued(), 0);
    }
}
