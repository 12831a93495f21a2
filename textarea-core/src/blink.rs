//! Caret blink scheduling.
//!
//! Blinking is cooperative: the widget arms a deadline, the host calls back
//! when it passes, and the tick re-arms itself only while blinking should
//! continue. There is no ambient timer; time comes from an injected
//! [`Clock`], so tests drive it deterministically.
//!
//! Caret visibility is *derived*, not toggled: given the instant the caret
//! was last forced visible, the caret is shown during even half-periods of
//! [`BLINK_INTERVAL`]. Forcing visibility (focus gain, a fresh edit) is just
//! resetting that instant to "now".

use std::time::{Duration, Instant};

use tracing::trace;

/// Half-period of the caret blink: visible for one interval, hidden for the
/// next.
pub const BLINK_INTERVAL: Duration = Duration::from_millis(500);

/// Monotonic time source.
pub trait Clock: Send + Sync {
    /// Time elapsed since an arbitrary fixed origin.
    fn uptime(&self) -> Duration;
}

/// Wall [`Clock`] measuring from its own creation.
#[derive(Debug)]
pub struct SystemClock {
    origin: Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl SystemClock {
    /// Creates a clock starting at zero uptime.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Clock for SystemClock {
    fn uptime(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Whether the caret is in a visible half-period at `now`.
pub fn caret_visible(shown_since: Duration, now: Duration) -> bool {
    if now < shown_since {
        return true;
    }
    let elapsed = now - shown_since;
    (elapsed.as_millis() / BLINK_INTERVAL.as_millis()) % 2 == 0
}

/// Cancellable blink deadline.
///
/// `cancel` suspends ticking (screen off) without forgetting that blinking
/// was in progress; `uncancel` plus a fresh arm resumes from a clean visible
/// state. Both are idempotent.
#[derive(Debug, Default)]
pub struct Blink {
    cancelled: bool,
    deadline: Option<Duration>,
}

impl Blink {
    /// Creates an idle, uncancelled blink state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules the next tick at `at`.
    pub fn arm(&mut self, at: Duration) {
        self.deadline = Some(at);
    }

    /// Drops any scheduled tick without touching the cancelled flag.
    pub fn disarm(&mut self) {
        self.deadline = None;
    }

    /// Suspends ticking. Repeated calls are no-ops.
    pub fn cancel(&mut self) {
        if !self.cancelled {
            self.cancelled = true;
            self.deadline = None;
            trace!("blink cancelled");
        }
    }

    /// Lifts a suspension; the caller re-arms afterwards.
    pub fn uncancel(&mut self) {
        self.cancelled = false;
    }

    /// Whether ticking is suspended.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    /// The pending deadline the host should call back at, if any.
    pub fn deadline(&self) -> Option<Duration> {
        if self.cancelled { None } else { self.deadline }
    }

    /// Consumes a due deadline. Returns `true` exactly once per armed
    /// deadline that has passed; cancelled state never reports due.
    pub fn take_due(&mut self, now: Duration) -> bool {
        if self.cancelled {
            return false;
        }
        match self.deadline {
            Some(at) if at <= now => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

/// Test clock advanced by hand.
#[cfg(test)]
pub(crate) struct FakeClock {
    now_millis: std::sync::atomic::AtomicU64,
}

#[cfg(test)]
impl FakeClock {
    pub fn new() -> Self {
        Self {
            now_millis: std::sync::atomic::AtomicU64::new(0),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.now_millis
            .fetch_add(by.as_millis() as u64, std::sync::atomic::Ordering::SeqCst);
    }

    pub fn set(&self, to: Duration) {
        self.now_millis
            .store(to.as_millis() as u64, std::sync::atomic::Ordering::SeqCst);
    }
}

#[cfg(test)]
impl Clock for FakeClock {
    fn uptime(&self) -> Duration {
        Duration::from_millis(self.now_millis.load(std::sync::atomic::Ordering::SeqCst))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(millis: u64) -> Duration {
        Duration::from_millis(millis)
    }

    #[test]
    fn test_caret_visibility_parity() {
        let shown = ms(1000);
        assert!(caret_visible(shown, ms(1000)));
        assert!(caret_visible(shown, ms(1499)));
        assert!(!caret_visible(shown, ms(1500)));
        assert!(!caret_visible(shown, ms(1999)));
        assert!(caret_visible(shown, ms(2000)));
        // A show time in the future still renders the caret.
        assert!(caret_visible(ms(5000), ms(1000)));
    }

    #[test]
    fn test_take_due_fires_once() {
        let mut blink = Blink::new();
        blink.arm(ms(500));
        assert!(!blink.take_due(ms(499)));
        assert!(blink.take_due(ms(500)));
        assert!(!blink.take_due(ms(501)));
    }

    #[test]
    fn test_cancel_suppresses_and_is_idempotent() {
        let mut blink = Blink::new();
        blink.arm(ms(500));
        blink.cancel();
        blink.cancel();
        assert!(blink.deadline().is_none());
        assert!(!blink.take_due(ms(1000)));

        // Resume requires an explicit re-arm, from a clean state.
        blink.uncancel();
        assert!(!blink.take_due(ms(1000)));
        blink.arm(ms(1500));
        assert!(blink.take_due(ms(1500)));
    }

    #[test]
    fn test_fake_clock_advances() {
        let clock = FakeClock::new();
        assert_eq!(clock.uptime(), ms(0));
        clock.advance(ms(250));
        assert_eq!(clock.uptime(), ms(250));
        clock.set(ms(1000));
        assert_eq!(clock.uptime(), ms(1000));
    }
}
