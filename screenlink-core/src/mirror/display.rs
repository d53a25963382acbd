//! Consumer side of the mirroring pipeline.
//!
//! [`DisplayLoop`] drains the newest frame from the queue, presents it
//! through a [`FrameSink`], measures throughput over a rolling
//! one-second window, and paces itself to a target frame rate so the
//! render cadence is decoupled from capture jitter.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::watch;
use tracing::debug;

use crate::error::LinkError;
use crate::mirror::frame::Frame;
use crate::mirror::queue::FrameQueue;

/// Floor for the pacing sleep so the loop always yields.
const MIN_SLEEP: Duration = Duration::from_millis(1);
/// FPS snapshot window.
const FPS_WINDOW: Duration = Duration::from_secs(1);

// ── FrameSink ────────────────────────────────────────────────────

/// Where frames go: a native window, or a recording sink in tests.
pub trait FrameSink: Send {
    /// Present one frame. Called at most once per loop iteration.
    fn present(&mut self, frame: &Frame) -> Result<(), LinkError>;

    /// Poll for a quit request (window close, `q` key). Called every
    /// iteration; returning `true` ends the loop.
    fn poll_quit(&mut self) -> bool;

    /// Update the title/status line with the measured frame rate.
    fn set_status(&mut self, _fps: f64) {}
}

// ── DisplayStats ─────────────────────────────────────────────────

/// Rolling throughput snapshot published once per second.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisplayStats {
    /// Frames presented over the last window, per second.
    pub fps: f64,
    /// Total frames presented since the loop started.
    pub total_frames: u64,
}

// ── DisplayLoop ──────────────────────────────────────────────────

/// Paced frame consumer.
pub struct DisplayLoop {
    queue: Arc<FrameQueue>,
    target_fps: u32,
    stats_tx: watch::Sender<DisplayStats>,
    stats_rx: watch::Receiver<DisplayStats>,
}

impl DisplayLoop {
    /// Create a loop draining `queue` at `target_fps` (min 1).
    pub fn new(queue: Arc<FrameQueue>, target_fps: u32) -> Self {
        let (stats_tx, stats_rx) = watch::channel(DisplayStats::default());
        Self {
            queue,
            target_fps: target_fps.max(1),
            stats_tx,
            stats_rx,
        }
    }

    /// Obtain a receiver that yields the latest [`DisplayStats`].
    pub fn stats_receiver(&self) -> watch::Receiver<DisplayStats> {
        self.stats_rx.clone()
    }

    /// Run until the sink requests quit.
    ///
    /// Each iteration: pop at most one frame, present it if there was
    /// one (ticks with an empty queue render nothing — no frame is
    /// fabricated), then sleep the remainder of the frame interval.
    pub async fn run<S: FrameSink>(&mut self, sink: &mut S) -> Result<(), LinkError> {
        let interval = Duration::from_secs_f64(1.0 / self.target_fps as f64);
        let mut window_start = Instant::now();
        let mut window_frames: u64 = 0;
        let mut total_frames: u64 = 0;

        loop {
            let tick_start = Instant::now();

            if sink.poll_quit() {
                break;
            }

            if let Some(frame) = self.queue.try_pop() {
                sink.present(&frame)?;
                window_frames += 1;
                total_frames += 1;
            }

            // Snapshot the window once per second, then reset it.
            let elapsed = window_start.elapsed();
            if elapsed >= FPS_WINDOW {
                let fps = window_frames as f64 / elapsed.as_secs_f64();
                debug!(fps, total_frames, "display throughput");
                sink.set_status(fps);
                let _ = self.stats_tx.send(DisplayStats { fps, total_frames });
                window_start = Instant::now();
                window_frames = 0;
            }

            // Pace: absorb fast ticks, never sleep below the floor.
            let spent = tick_start.elapsed();
            let sleep = if spent < interval {
                (interval - spent).max(MIN_SLEEP)
            } else {
                MIN_SLEEP
            };
            tokio::time::sleep(sleep).await;
        }

        Ok(())
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    /// Sink that records presented frames and quits after a deadline.
    struct RecordingSink {
        presented: u64,
        deadline: Instant,
    }

    impl RecordingSink {
        fn for_duration(d: Duration) -> Self {
            Self {
                presented: 0,
                deadline: Instant::now() + d,
            }
        }
    }

    impl FrameSink for RecordingSink {
        fn present(&mut self, _frame: &Frame) -> Result<(), LinkError> {
            self.presented += 1;
            Ok(())
        }

        fn poll_quit(&mut self) -> bool {
            Instant::now() >= self.deadline
        }
    }

    fn dummy_frame() -> Frame {
        Frame::from_rgb(1, 1, vec![0; 3]).unwrap()
    }

    #[tokio::test]
    async fn empty_queue_skips_render() {
        let queue = Arc::new(FrameQueue::new());
        let mut sink = RecordingSink::for_duration(Duration::from_millis(100));
        let mut display = DisplayLoop::new(queue, 60);
        display.run(&mut sink).await.unwrap();
        assert_eq!(sink.presented, 0);
    }

    #[tokio::test]
    async fn presents_queued_frames() {
        let queue = Arc::new(FrameQueue::new());
        queue.push(dummy_frame());
        queue.push(dummy_frame());

        let mut sink = RecordingSink::for_duration(Duration::from_millis(150));
        let mut display = DisplayLoop::new(Arc::clone(&queue), 60);
        display.run(&mut sink).await.unwrap();

        assert_eq!(sink.presented, 2);
        assert!(queue.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn pacing_converges_on_target_fps() {
        // Keep the queue saturated so pacing is the only limiter.
        let queue = Arc::new(FrameQueue::with_capacity(2));
        let feeder_queue = Arc::clone(&queue);
        let feeder = tokio::spawn(async move {
            loop {
                feeder_queue.push(dummy_frame());
                tokio::time::sleep(Duration::from_millis(2)).await;
            }
        });

        let target_fps = 40u32;
        let run_for = Duration::from_millis(1500);
        let mut sink = RecordingSink::for_duration(run_for);
        let mut display = DisplayLoop::new(Arc::clone(&queue), target_fps);
        display.run(&mut sink).await.unwrap();
        feeder.abort();

        let measured = sink.presented as f64 / run_for.as_secs_f64();
        let target = target_fps as f64;
        // Generous tolerance: timer resolution and CI jitter both bite.
        assert!(
            measured > target * 0.5 && measured < target * 1.5,
            "measured {measured:.1} fps, target {target}"
        );
    }

    #[tokio::test]
    async fn stats_are_published() {
        let queue = Arc::new(FrameQueue::with_capacity(2));
        let feeder_queue = Arc::clone(&queue);
        let feeder = tokio::spawn(async move {
            loop {
                feeder_queue.push(dummy_frame());
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        });

        let mut display = DisplayLoop::new(Arc::clone(&queue), 30);
        let stats_rx = display.stats_receiver();
        let mut sink = RecordingSink::for_duration(Duration::from_millis(1300));
        display.run(&mut sink).await.unwrap();
        feeder.abort();

        let stats = *stats_rx.borrow();
        assert!(stats.total_frames > 0);
        assert!(stats.fps > 0.0);
    }
}
