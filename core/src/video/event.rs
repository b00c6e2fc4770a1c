//! Frame-ready event shared by the capture frontend, the frame pipeline task
//! and the main loop.
//!
//! A binary, manually cleared event. The capture side raises it once per
//! emulated frame through a [`FrameSignal`]. The pipeline task waits on it
//! through a [`FrameConsumer`] and clears it once the frame has been
//! presented. The main loop paces itself with a [`FramePacer`], which counts
//! raises instead of reading the flag, so it still sees a frame the pipeline
//! task has already cleared.
//!
//! The [`FrameReadyEvent`] itself is the owner. Dropping it (or calling
//! [`FrameReadyEvent::destroy`]) closes the event, which wakes every waiter
//! with [`EventClosed`]. That is the only way the pipeline task is stopped.

use std::sync::{Arc, Condvar, Mutex, MutexGuard, Weak};

use thiserror::Error;
use tracing::warn;

/// The owning [`FrameReadyEvent`] was destroyed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("frame-ready event closed")]
pub struct EventClosed;

#[derive(Debug, Default)]
struct EventState {
    signaled: bool,
    /// Bumped by every raise.
    generation: u64,
    closed: bool,
}

type Shared = (Mutex<EventState>, Condvar);

fn lock(shared: &Shared) -> MutexGuard<'_, EventState> {
    shared.0.lock().unwrap_or_else(|e| {
        warn!("Frame event mutex poisoned; continuing");
        e.into_inner()
    })
}

/// Owner of the frame-ready event.
#[derive(Debug)]
pub struct FrameReadyEvent {
    shared: Arc<Shared>,
}

impl FrameReadyEvent {
    pub fn new() -> Self {
        Self {
            shared: Arc::new((Mutex::new(EventState::default()), Condvar::new())),
        }
    }

    /// Producer handle for the capture frontend.
    pub fn signal(&self) -> FrameSignal {
        FrameSignal {
            shared: Arc::downgrade(&self.shared),
        }
    }

    /// Waiting handle that clears the event; owned by the pipeline task.
    pub fn consumer(&self) -> FrameConsumer {
        FrameConsumer {
            shared: Arc::downgrade(&self.shared),
        }
    }

    /// Observing handle for the main loop.
    pub fn pacer(&self) -> FramePacer {
        FramePacer {
            seen: lock(&self.shared).generation,
            shared: Arc::downgrade(&self.shared),
        }
    }

    pub fn is_signaled(&self) -> bool {
        lock(&self.shared).signaled
    }

    /// Close the event and wake every waiter. Idempotent.
    pub fn destroy(&self) {
        let mut state = lock(&self.shared);
        if !state.closed {
            state.closed = true;
            self.shared.1.notify_all();
        }
    }
}

impl Default for FrameReadyEvent {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for FrameReadyEvent {
    fn drop(&mut self) {
        self.destroy();
    }
}

/// Producer side of the event.
#[derive(Debug, Clone)]
pub struct FrameSignal {
    shared: Weak<Shared>,
}

impl FrameSignal {
    /// Raise the event. Returns `false` once the event has been closed.
    pub fn raise(&self) -> bool {
        let Some(shared) = self.shared.upgrade() else {
            return false;
        };
        let mut state = lock(&shared);
        if state.closed {
            return false;
        }
        state.signaled = true;
        state.generation = state.generation.wrapping_add(1);
        shared.1.notify_all();
        true
    }
}

/// Waiting side that clears the event after each processed frame.
#[derive(Debug)]
pub struct FrameConsumer {
    shared: Weak<Shared>,
}

impl FrameConsumer {
    /// Block until a frame is ready. Does not clear the event.
    pub fn wait(&self) -> Result<(), EventClosed> {
        let shared = self.shared.upgrade().ok_or(EventClosed)?;
        wait_until_signaled(&shared)
    }

    /// Mark the current frame as processed.
    pub fn clear(&self) {
        if let Some(shared) = self.shared.upgrade() {
            lock(&shared).signaled = false;
        }
    }
}

/// Observing side used to pace the main loop. Never clears the event.
#[derive(Debug, Clone)]
pub struct FramePacer {
    shared: Weak<Shared>,
    seen: u64,
}

impl FramePacer {
    /// Block until a raise this pacer has not seen yet. Returns at once if one
    /// arrived since the last call, whether or not the event was cleared since.
    pub fn wait(&mut self) -> Result<(), EventClosed> {
        let shared = self.shared.upgrade().ok_or(EventClosed)?;
        let mut state = lock(&shared);
        loop {
            if state.closed {
                return Err(EventClosed);
            }
            if state.generation != self.seen {
                self.seen = state.generation;
                return Ok(());
            }
            state = wait_on(&shared, state);
        }
    }
}

fn wait_on<'a>(
    shared: &'a Shared,
    state: MutexGuard<'a, EventState>,
) -> MutexGuard<'a, EventState> {
    shared.1.wait(state).unwrap_or_else(|e| {
        warn!("Frame event condvar wait poisoned; continuing");
        e.into_inner()
    })
}

fn wait_until_signaled(shared: &Shared) -> Result<(), EventClosed> {
    let mut state = lock(shared);
    loop {
        if state.closed {
            return Err(EventClosed);
        }
        if state.signaled {
            return Ok(());
        }
        state = wait_on(shared, state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn signal_then_wait_returns_immediately() {
        let event = FrameReadyEvent::new();
        let consumer = event.consumer();
        assert!(event.signal().raise());
        assert!(event.is_signaled());
        assert_eq!(consumer.wait(), Ok(()));
        // Waiting alone does not clear.
        assert!(event.is_signaled());
        consumer.clear();
        assert!(!event.is_signaled());
    }

    #[test]
    fn pacer_never_clears() {
        let event = FrameReadyEvent::new();
        let mut pacer = event.pacer();
        event.signal().raise();
        assert_eq!(pacer.wait(), Ok(()));
        event.signal().raise();
        assert_eq!(pacer.wait(), Ok(()));
        assert!(event.is_signaled());
    }

    #[test]
    fn pacer_sees_raise_after_consumer_cleared() {
        let event = FrameReadyEvent::new();
        let mut pacer = event.pacer();
        event.signal().raise();
        event.consumer().clear();
        assert!(!event.is_signaled());
        assert_eq!(pacer.wait(), Ok(()));
    }

    #[test]
    fn pacer_blocks_until_next_raise() {
        let event = FrameReadyEvent::new();
        let mut pacer = event.pacer();
        let signal = event.signal();
        signal.raise();
        assert_eq!(pacer.wait(), Ok(()));

        let producer = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            signal.raise()
        });
        assert_eq!(pacer.wait(), Ok(()));
        assert!(producer.join().unwrap());
    }

    #[test]
    fn consumer_and_pacer_both_see_every_frame() {
        const FRAMES: usize = 50;
        let event = FrameReadyEvent::new();
        let signal = event.signal();
        let consumer = event.consumer();
        let mut pacer = event.pacer();

        let (consumed_tx, consumed) = mpsc::channel();
        let consumer_thread = thread::spawn(move || {
            let mut woke = 0;
            while consumer.wait().is_ok() {
                woke += 1;
                consumer.clear();
                let _ = consumed_tx.send(woke);
            }
            woke
        });
        let (paced_tx, paced) = mpsc::channel();
        let pacer_thread = thread::spawn(move || {
            let mut woke = 0;
            while pacer.wait().is_ok() {
                woke += 1;
                let _ = paced_tx.send(woke);
            }
            woke
        });

        for frame in 1..=FRAMES {
            signal.raise();
            // Both sides take this frame before the next raise.
            assert_eq!(consumed.recv_timeout(Duration::from_secs(5)), Ok(frame));
            assert_eq!(paced.recv_timeout(Duration::from_secs(5)), Ok(frame));
        }
        event.destroy();

        assert_eq!(consumer_thread.join().unwrap(), FRAMES);
        assert_eq!(pacer_thread.join().unwrap(), FRAMES);
    }

    #[test]
    fn waiter_wakes_on_signal_from_other_thread() {
        let event = FrameReadyEvent::new();
        let consumer = event.consumer();
        let signal = event.signal();
        let producer = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            signal.raise()
        });
        assert_eq!(consumer.wait(), Ok(()));
        assert!(producer.join().unwrap());
    }

    #[test]
    fn destroy_wakes_blocked_waiter() {
        let event = FrameReadyEvent::new();
        let consumer = event.consumer();
        let waiter = thread::spawn(move || consumer.wait());
        thread::sleep(Duration::from_millis(20));
        event.destroy();
        assert_eq!(waiter.join().unwrap(), Err(EventClosed));
    }

    #[test]
    fn dropping_owner_closes_every_handle() {
        let event = FrameReadyEvent::new();
        let signal = event.signal();
        let consumer = event.consumer();
        let mut pacer = event.pacer();
        drop(event);
        assert!(!signal.raise());
        assert_eq!(consumer.wait(), Err(EventClosed));
        assert_eq!(pacer.wait(), Err(EventClosed));
    }

    #[test]
    fn closed_wins_over_pending_signal() {
        let event = FrameReadyEvent::new();
        let consumer = event.consumer();
        event.signal().raise();
        event.destroy();
        assert_eq!(consumer.wait(), Err(EventClosed));
    }
}
