use std::time::Duration;

/// Identifies one pending capture so it can be cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CaptureHandle(u64);

/// Coalesces bursts of mutations into a single deferred capture.
///
/// Each `schedule` pushes the deadline to `now + window`; the capture fires
/// on the first `poll` at or past the deadline. Rescheduling while a capture
/// is pending keeps the same handle.
#[derive(Debug, Clone)]
pub struct CaptureScheduler {
    window: Duration,
    pending: Option<(CaptureHandle, Duration)>,
    next_handle: u64,
}

impl CaptureScheduler {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: None,
            next_handle: 0,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Request a capture once mutations have been quiet for the window.
    pub fn schedule(&mut self, now: Duration) -> CaptureHandle {
        let deadline = now + self.window;
        let handle = match self.pending {
            Some((handle, _)) => handle,
            None => {
                self.next_handle += 1;
                CaptureHandle(self.next_handle)
            }
        };
        self.pending = Some((handle, deadline));
        handle
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.pending.map(|(_, deadline)| deadline)
    }

    /// Returns true exactly once per scheduled capture, when it is due.
    pub fn poll(&mut self, now: Duration) -> bool {
        match self.pending {
            Some((_, deadline)) if now >= deadline => {
                self.pending = None;
                true
            }
            _ => false,
        }
    }

    /// Drop the pending capture only if it is the one identified by `handle`.
    pub fn cancel(&mut self, handle: CaptureHandle) -> bool {
        match self.pending {
            Some((pending, _)) if pending == handle => {
                self.pending = None;
                true
            }
            _ => false,
        }
    }
}
