//! Generator task keeping the frame queue topped up

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, trace};

use crate::provider::FrameProvider;
use crate::queue::FrameQueue;
use crate::{BridgeError, Result};

/// Default interval between queue capacity re-checks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Consecutive provider failures tolerated before the task gives up.
const MAX_ERRORS: u32 = 10;

/// Summary returned when the generator stops
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GeneratorReport {
    /// Frames successfully buffered
    pub frames_generated: u64,
}

/// Handle to a running generator task
pub struct GeneratorHandle {
    cancel: CancellationToken,
    task: JoinHandle<Result<GeneratorReport>>,
}

impl GeneratorHandle {
    /// Cancel the task and wait for it to exit.
    pub async fn shutdown(self) -> Result<GeneratorReport> {
        self.cancel.cancel();
        self.task.await?
    }

    /// Wait for the task to exit without cancelling it.
    pub async fn join(self) -> Result<GeneratorReport> {
        self.task.await?
    }
}

/// Generator spawns the background production loop
///
/// The loop asks its provider for a frame whenever the queue has spare
/// capacity and idles otherwise. It is the only writer to the queue.
pub struct Generator;

impl Generator {
    /// Spawn the generator task
    ///
    /// `cancel` stops the task at its next suspension point, which is never
    /// more than one poll interval away while the queue is full.
    pub fn spawn<P>(
        provider: P,
        queue: Arc<FrameQueue>,
        poll_interval: Duration,
        cancel: CancellationToken,
    ) -> GeneratorHandle
    where
        P: FrameProvider,
    {
        let cancel_task = cancel.clone();
        let task = tokio::spawn(async move {
            Self::generate_task(provider, queue, poll_interval, cancel_task).await
        });

        GeneratorHandle { cancel, task }
    }

    async fn generate_task<P>(
        mut provider: P,
        queue: Arc<FrameQueue>,
        poll_interval: Duration,
        cancel: CancellationToken,
    ) -> Result<GeneratorReport>
    where
        P: FrameProvider,
    {
        info!(source = provider.source(), capacity = queue.capacity(), "Generator task started");
        let mut report = GeneratorReport::default();
        let mut error_count = 0u32;

        loop {
            if cancel.is_cancelled() {
                break;
            }

            if !queue.has_space() {
                trace!("Queue full, waiting for space");
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = queue.wait_for_space(poll_interval) => {}
                }
                continue;
            }

            let result = tokio::select! {
                _ = cancel.cancelled() => break,
                result = provider.next_frame() => result,
            };

            let frame = match result {
                Ok(frame) => {
                    error_count = 0;
                    frame
                }
                Err(e) => {
                    error_count += 1;
                    error!("Provider error ({}/{}): {}", error_count, MAX_ERRORS, e);

                    if error_count >= MAX_ERRORS {
                        error!("Too many provider errors, stopping generator");
                        return Err(BridgeError::task_failed_with_source(
                            "frame generation",
                            Box::new(e),
                        ));
                    }

                    // Exponential backoff: 50ms, 100ms, 200ms, ...
                    let backoff = Duration::from_millis(50 * (1 << error_count.min(5)));
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = tokio::time::sleep(backoff) => {}
                    }
                    continue;
                }
            };

            // Sole producer: space seen above is still free, so this completes at once
            let train_id = frame.train_id();
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = queue.push_wait(frame, poll_interval) => {}
            }
            report.frames_generated += 1;
            info!(train_id, queued = queue.len(), "Buffered train");
        }

        info!(frames = report.frames_generated, "Generator task stopped");
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{FailingProvider, GatedProvider, SequenceProvider, tiny_frame};

    const POLL: Duration = Duration::from_millis(20);

    async fn wait_for_len(queue: &FrameQueue, len: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while queue.len() != len {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("queue should reach the expected length");
    }

    #[tokio::test]
    async fn fills_queue_to_capacity_and_stops_pushing() {
        let queue = Arc::new(FrameQueue::new(10));
        let handle = Generator::spawn(
            SequenceProvider::new(0),
            Arc::clone(&queue),
            POLL,
            CancellationToken::new(),
        );

        wait_for_len(&queue, 10).await;
        tokio::time::sleep(POLL * 3).await;
        assert_eq!(queue.len(), 10);
        assert!(queue.try_push(tiny_frame(999)).is_err());

        let report = handle.shutdown().await.unwrap();
        assert_eq!(report.frames_generated, 10);
    }

    #[tokio::test]
    async fn first_generation_buffers_one_frame() {
        let queue = Arc::new(FrameQueue::new(10));
        let (provider, gate) = GatedProvider::new();
        let handle =
            Generator::spawn(provider, Arc::clone(&queue), POLL, CancellationToken::new());

        assert_eq!(queue.len(), 0);
        gate.release(1);
        wait_for_len(&queue, 1).await;
        tokio::time::sleep(POLL * 2).await;
        assert_eq!(queue.len(), 1);

        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn refills_after_consumption_in_order() {
        let queue = Arc::new(FrameQueue::new(3));
        let handle = Generator::spawn(
            SequenceProvider::new(100),
            Arc::clone(&queue),
            POLL,
            CancellationToken::new(),
        );

        let mut seen = Vec::new();
        for _ in 0..8 {
            let frame = tokio::time::timeout(Duration::from_secs(5), queue.pop_wait(POLL))
                .await
                .unwrap();
            seen.push(frame.train_id());
        }
        assert_eq!(seen, (100..108).collect::<Vec<_>>());

        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn cancellation_is_prompt_while_full() {
        let queue = Arc::new(FrameQueue::new(1));
        let cancel = CancellationToken::new();
        let handle =
            Generator::spawn(SequenceProvider::new(0), Arc::clone(&queue), POLL, cancel.clone());

        wait_for_len(&queue, 1).await;
        cancel.cancel();

        let report = tokio::time::timeout(POLL * 5, handle.join())
            .await
            .expect("generator should stop within a poll interval")
            .unwrap();
        assert_eq!(report.frames_generated, 1);
    }

    #[tokio::test]
    async fn cancellation_interrupts_pending_generation() {
        let queue = Arc::new(FrameQueue::new(4));
        let (provider, _gate) = GatedProvider::new();
        let handle =
            Generator::spawn(provider, Arc::clone(&queue), POLL, CancellationToken::new());

        tokio::time::sleep(POLL).await;
        let report = tokio::time::timeout(Duration::from_secs(1), handle.shutdown())
            .await
            .expect("shutdown should not wait for the provider")
            .unwrap();
        assert_eq!(report.frames_generated, 0);
        assert!(queue.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn persistent_provider_errors_stop_the_task() {
        let queue = Arc::new(FrameQueue::new(4));
        let handle = Generator::spawn(
            FailingProvider,
            Arc::clone(&queue),
            POLL,
            CancellationToken::new(),
        );

        let result = handle.join().await;
        assert!(matches!(result, Err(BridgeError::Task { .. })));
        assert!(queue.is_empty());
    }
}
