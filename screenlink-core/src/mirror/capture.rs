//! Producer side of the mirroring pipeline.
//!
//! [`CaptureLoop`] owns a spawned task that repeatedly pulls frames
//! from a [`FrameSource`] and pushes them into a [`FrameQueue`].
//! Lifecycle is `Stopped → Running → Stopping → Stopped`: cooperative
//! cancellation through an `AtomicBool` observed at the top of every
//! iteration, plus a bounded join.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::error::LinkError;
use crate::mirror::queue::FrameQueue;
use crate::mirror::source::FrameSource;

/// Pause between successful captures; bounds CPU without throttling
/// the bridge round-trip time, which dominates.
pub const CAPTURE_IDLE: Duration = Duration::from_millis(10);
/// Longer pause after a failed capture so a dead bridge is polled at
/// ~10 Hz instead of busy-looping.
pub const CAPTURE_RETRY: Duration = Duration::from_millis(100);

/// Configuration for [`CaptureLoop`].
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Width hint passed to the source on every capture.
    pub target_width: Option<u32>,
    /// Sleep after a successful capture.
    pub idle: Duration,
    /// Sleep after a transient failure.
    pub retry: Duration,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            target_width: None,
            idle: CAPTURE_IDLE,
            retry: CAPTURE_RETRY,
        }
    }
}

/// Lifecycle-controlled capture producer.
///
/// Individual capture failures are retried indefinitely; the loop only
/// exits through [`stop`](Self::stop).
pub struct CaptureLoop {
    queue: Arc<FrameQueue>,
    config: CaptureConfig,
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl CaptureLoop {
    /// Create a stopped loop feeding `queue`.
    pub fn new(queue: Arc<FrameQueue>, config: CaptureConfig) -> Self {
        Self {
            queue,
            config,
            running: Arc::new(AtomicBool::new(false)),
            handle: None,
        }
    }

    /// Transition to Running: spawn the producer task.
    ///
    /// Calling `start` while already running is a no-op.
    pub fn start<S>(&mut self, mut source: S)
    where
        S: FrameSource + 'static,
    {
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }
        let running = Arc::clone(&self.running);
        let queue = Arc::clone(&self.queue);
        let config = self.config.clone();

        self.handle = Some(tokio::spawn(async move {
            while running.load(Ordering::SeqCst) {
                match source.capture(config.target_width).await {
                    Ok(frame) => {
                        if queue.push(frame) {
                            trace!("queue full; dropped oldest frame");
                        }
                        tokio::time::sleep(config.idle).await;
                    }
                    Err(e) => {
                        // Transient by contract: log and retry slower.
                        trace!("capture unavailable: {e}");
                        tokio::time::sleep(config.retry).await;
                    }
                }
            }
            debug!("capture loop exited");
        }));
    }

    /// Signal the producer to stop (cooperative, non-preemptive).
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Wait up to `timeout` for the producer to observe the stop flag
    /// and exit.
    ///
    /// A timed-out join is reported as [`LinkError::JoinTimeout`] and
    /// logged; the task is aborted so it cannot outlive the caller, but
    /// callers must not assume its resources are already released.
    pub async fn join(&mut self, timeout: Duration) -> Result<(), LinkError> {
        let Some(mut handle) = self.handle.take() else {
            return Ok(());
        };
        match tokio::time::timeout(timeout, &mut handle).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => {
                // The task is gone either way, but a crashed producer
                // must not read like a graceful stop in the logs.
                if e.is_panic() {
                    warn!("capture task panicked: {e}");
                }
                Ok(())
            }
            Err(_) => {
                warn!("capture task did not stop within {timeout:?}; aborting");
                handle.abort();
                Err(LinkError::JoinTimeout(timeout))
            }
        }
    }

    /// Whether the producer task is currently running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// The queue this loop feeds.
    pub fn queue(&self) -> &Arc<FrameQueue> {
        &self.queue
    }
}

impl Drop for CaptureLoop {
    fn drop(&mut self) {
        self.stop();
        if let Some(handle) = self.handle.take() {
            // Last-resort: never leave a detached producer behind.
            handle.abort();
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Unavailable;
    use crate::mirror::frame::Frame;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicU32;

    /// Source that always succeeds instantly.
    struct InstantSource {
        captures: Arc<AtomicU32>,
    }

    #[async_trait]
    impl FrameSource for InstantSource {
        async fn capture(&mut self, _w: Option<u32>) -> Result<Frame, Unavailable> {
            self.captures.fetch_add(1, Ordering::SeqCst);
            Ok(Frame::from_rgb(1, 1, vec![0; 3]).unwrap())
        }
    }

    /// Source that always fails.
    struct DeadSource {
        attempts: Arc<AtomicU32>,
    }

    #[async_trait]
    impl FrameSource for DeadSource {
        async fn capture(&mut self, _w: Option<u32>) -> Result<Frame, Unavailable> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Err(Unavailable::Platform("always down".into()))
        }
    }

    #[tokio::test]
    async fn produces_frames_into_queue() {
        let queue = Arc::new(FrameQueue::new());
        let mut cap = CaptureLoop::new(
            Arc::clone(&queue),
            CaptureConfig {
                idle: Duration::from_millis(1),
                ..Default::default()
            },
        );
        cap.start(InstantSource {
            captures: Arc::new(AtomicU32::new(0)),
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!queue.is_empty());

        cap.stop();
        cap.join(Duration::from_secs(1)).await.unwrap();
    }

    #[tokio::test]
    async fn failing_source_keeps_loop_alive_without_busy_looping() {
        let attempts = Arc::new(AtomicU32::new(0));
        let queue = Arc::new(FrameQueue::new());
        let mut cap = CaptureLoop::new(
            Arc::clone(&queue),
            CaptureConfig {
                retry: Duration::from_millis(20),
                ..Default::default()
            },
        );
        cap.start(DeadSource {
            attempts: Arc::clone(&attempts),
        });

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(cap.is_running(), "loop must survive permanent failure");
        let n = attempts.load(Ordering::SeqCst);
        // ~200ms / 20ms retry ≈ 10 attempts; far below a busy loop.
        assert!(n >= 2, "loop stalled: {n} attempts");
        assert!(n <= 30, "retry sleep not honored: {n} attempts");
        assert!(queue.is_empty());

        cap.stop();
        cap.join(Duration::from_secs(1)).await.unwrap();
    }

    #[tokio::test]
    async fn stop_then_join_returns_within_timeout() {
        let queue = Arc::new(FrameQueue::new());
        let mut cap = CaptureLoop::new(queue, CaptureConfig::default());
        cap.start(DeadSource {
            attempts: Arc::new(AtomicU32::new(0)),
        });

        tokio::time::sleep(Duration::from_millis(30)).await;
        cap.stop();

        let timeout = Duration::from_millis(500);
        let start = std::time::Instant::now();
        cap.join(timeout).await.unwrap();
        assert!(start.elapsed() < timeout + Duration::from_millis(100));
        assert!(!cap.is_running());
    }

    #[tokio::test]
    async fn double_start_is_a_noop() {
        let queue = Arc::new(FrameQueue::new());
        let mut cap = CaptureLoop::new(queue, CaptureConfig::default());
        cap.start(InstantSource {
            captures: Arc::new(AtomicU32::new(0)),
        });
        let first = cap.handle.is_some();
        cap.start(InstantSource {
            captures: Arc::new(AtomicU32::new(0)),
        });
        assert!(first);
        cap.stop();
        cap.join(Duration::from_secs(1)).await.unwrap();
    }

    /// Source whose first capture brings the whole task down.
    struct PanickingSource;

    #[async_trait]
    impl FrameSource for PanickingSource {
        async fn capture(&mut self, _w: Option<u32>) -> Result<Frame, Unavailable> {
            panic!("producer crashed");
        }
    }

    #[tokio::test]
    async fn crashed_producer_joins_without_hanging() {
        let queue = Arc::new(FrameQueue::new());
        let mut cap = CaptureLoop::new(queue, CaptureConfig::default());
        cap.start(PanickingSource);

        tokio::time::sleep(Duration::from_millis(30)).await;
        cap.stop();

        // The panic already ended the task; join must report promptly
        // instead of timing out or propagating the panic.
        let start = std::time::Instant::now();
        cap.join(Duration::from_secs(1)).await.unwrap();
        assert!(start.elapsed() < Duration::from_millis(500));
    }

    #[tokio::test]
    async fn join_without_start_is_ok() {
        let queue = Arc::new(FrameQueue::new());
        let mut cap = CaptureLoop::new(queue, CaptureConfig::default());
        cap.join(Duration::from_millis(10)).await.unwrap();
    }
}
