//! Bounded frame queue between the audio producers and the agent loop
//!
//! Producers never block: when the queue is full a frame is dropped according
//! to the [`OverflowPolicy`], so a slow consumer can never stall the audio
//! driver callback. Order is strictly FIFO for the frames that are kept.

use super::AudioFrame;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use tokio::sync::Notify;
use tracing::warn;

/// What to discard when a push finds the queue full
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Evict the oldest queued frame to make room
    #[default]
    DropOldest,
    /// Keep the queue as is and discard the new frame
    DropIncoming,
}

/// Result of a single push
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    Enqueued,
    DroppedOldest,
    DroppedIncoming,
    Closed,
}

#[derive(Debug, Default)]
struct QueueState {
    frames: VecDeque<AudioFrame>,
    closed: bool,
    dropped: u64,
}

/// Single-consumer FIFO of audio frames
#[derive(Debug)]
pub struct FrameQueue {
    state: Mutex<QueueState>,
    notify: Notify,
    capacity: usize,
    policy: OverflowPolicy,
}

impl FrameQueue {
    pub fn new(capacity: usize, policy: OverflowPolicy) -> Self {
        Self {
            state: Mutex::new(QueueState::default()),
            notify: Notify::new(),
            capacity: capacity.max(1),
            policy,
        }
    }

    fn state(&self) -> MutexGuard<'_, QueueState> {
        // Queue state stays consistent even if a holder panicked
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Enqueue a frame without blocking
    pub fn push(&self, frame: AudioFrame) -> PushOutcome {
        let outcome = {
            let mut state = self.state();
            if state.closed {
                return PushOutcome::Closed;
            }

            if state.frames.len() < self.capacity {
                state.frames.push_back(frame);
                PushOutcome::Enqueued
            } else {
                state.dropped += 1;
                let dropped = state.dropped;
                let outcome = match self.policy {
                    OverflowPolicy::DropOldest => {
                        let _ = state.frames.pop_front();
                        state.frames.push_back(frame);
                        PushOutcome::DroppedOldest
                    }
                    OverflowPolicy::DropIncoming => PushOutcome::DroppedIncoming,
                };
                if dropped == 1 || dropped % 100 == 0 {
                    warn!(
                        dropped,
                        capacity = self.capacity,
                        "frame queue full, dropping audio ({:?})",
                        self.policy
                    );
                }
                outcome
            }
        };

        if outcome != PushOutcome::DroppedIncoming {
            self.notify.notify_one();
        }
        outcome
    }

    /// Take the next frame if one is queued
    pub fn try_pop(&self) -> Option<AudioFrame> {
        self.state().frames.pop_front()
    }

    /// Wait for the next frame; `None` once closed and drained
    pub async fn pop(&self) -> Option<AudioFrame> {
        loop {
            {
                let mut state = self.state();
                if let Some(frame) = state.frames.pop_front() {
                    return Some(frame);
                }
                if state.closed {
                    return None;
                }
            }
            // A push between the check and here leaves a stored permit
            self.notify.notified().await;
        }
    }

    /// Stop accepting frames and wake the consumer
    pub fn close(&self) {
        self.state().closed = true;
        self.notify.notify_one();
    }

    pub fn is_closed(&self) -> bool {
        self.state().closed
    }

    pub fn len(&self) -> usize {
        self.state().frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total frames discarded by the overflow policy
    pub fn dropped(&self) -> u64 {
        self.state().dropped
    }
}
