//! Batch-edit coordination.
//!
//! An IME groups any number of buffer mutations into one transaction by
//! bracketing them with `begin`/`end`, possibly nested. [`BatchEditState`]
//! counts the nesting and accumulates the smallest span covering every edit
//! inside the outermost pair; exactly one [`FinishOutcome`] is produced when
//! the counter returns to zero, no matter how many mutations or nested pairs
//! occurred.
//!
//! [`ImeSession`] is the connection-side guard: a counter behind a mutex so
//! its increments stay atomic relative to the main thread's forced-reset
//! path, and a revocation state so a connection torn down by the platform
//! can never unbalance the widget's nesting again.

use parking_lot::Mutex;
use tracing::{debug, warn};

/// Span of buffer content changed inside the current transaction, in
/// coordinates of the buffer as it was when the transaction started.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum ChangedSpan {
    /// No edit recorded yet; a consumer must assume the whole buffer.
    #[default]
    Unknown,
    /// The smallest inclusive span covering every recorded edit.
    Range {
        /// First changed offset.
        start: usize,
        /// One past the last changed offset (pre-transaction coordinates).
        end: usize,
    },
}

/// What the widget must do once the outermost `end` lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishOutcome {
    /// Content changed: run the full update-after-edit pipeline once.
    Content {
        /// Union span of every edit in the transaction.
        changed: ChangedSpan,
        /// Net length change across the transaction.
        delta: isize,
    },
    /// Only the cursor moved: a caret-only invalidate suffices.
    Cursor,
    /// Nothing observable happened inside the transaction.
    Quiet,
}

/// Nesting counter plus dirty-span accumulator for batch edits.
#[derive(Debug, Default)]
pub struct BatchEditState {
    nesting: u32,
    changed: ChangedSpan,
    changed_delta: isize,
    content_changed: bool,
    cursor_changed: bool,
}

impl BatchEditState {
    /// Creates an idle coordinator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a transaction is open.
    pub fn is_in_batch(&self) -> bool {
        self.nesting > 0
    }

    /// Current nesting depth.
    pub fn nesting(&self) -> u32 {
        self.nesting
    }

    /// Whether buffer content changed since the transaction started (or,
    /// outside a transaction, since the last finish).
    pub fn content_changed(&self) -> bool {
        self.content_changed
    }

    /// Opens (or nests into) a transaction. `buffer_len` sizes the forced
    /// whole-buffer span when a content change was already pending from an
    /// earlier, un-batched edit, so that information is not lost.
    pub fn begin(&mut self, buffer_len: usize) -> u32 {
        self.nesting += 1;
        if self.nesting == 1 {
            self.cursor_changed = false;
            self.changed_delta = 0;
            if self.content_changed {
                self.changed = ChangedSpan::Range {
                    start: 0,
                    end: buffer_len,
                };
            } else {
                self.changed = ChangedSpan::Unknown;
            }
            debug!("batch edit opened");
        }
        self.nesting
    }

    /// Closes one nesting level. Returns the finish outcome only when the
    /// outermost pair closes; an unbalanced call at depth 0 is absorbed.
    pub fn end(&mut self) -> Option<FinishOutcome> {
        if self.nesting == 0 {
            warn!("unbalanced endBatchEdit ignored");
            return None;
        }
        self.nesting -= 1;
        if self.nesting == 0 {
            debug!("batch edit finished");
            Some(self.finish_outcome())
        } else {
            None
        }
    }

    /// Forced reset: zeroes the nesting and, if anything was pending, yields
    /// its finish outcome. Calling this while idle is a no-op, so repeated
    /// resets (focus loss, detach) stay safe.
    pub fn ensure_ended(&mut self) -> Option<FinishOutcome> {
        if self.nesting == 0 {
            return None;
        }
        debug!(depth = self.nesting, "batch edit force-reset");
        self.nesting = 0;
        Some(self.finish_outcome())
    }

    /// Records one buffer mutation.
    ///
    /// The accumulated span stays in pre-transaction coordinates: the running
    /// `changed_delta` converts each new edit's end back before the union.
    pub fn record_edit(&mut self, start: usize, removed: usize, inserted: usize) {
        let edit_end = (start + removed) as isize - self.changed_delta;
        self.changed = match self.changed {
            ChangedSpan::Unknown => ChangedSpan::Range {
                start,
                end: edit_end.max(0) as usize,
            },
            ChangedSpan::Range {
                start: span_start,
                end: span_end,
            } => ChangedSpan::Range {
                start: span_start.min(start),
                end: span_end.max(edit_end.max(0) as usize),
            },
        };
        self.changed_delta += inserted as isize - removed as isize;
        self.content_changed = true;
    }

    /// Records a selection move inside the transaction.
    pub fn record_cursor_change(&mut self) {
        self.cursor_changed = true;
    }

    /// Records an annotation-appearance change (e.g. composition span moved)
    /// without a known span.
    pub fn record_appearance_change(&mut self) {
        self.content_changed = true;
    }

    /// Clears the pending content flag after the update pipeline ran.
    pub fn take_content_changed(&mut self) -> bool {
        std::mem::take(&mut self.content_changed)
    }

    fn finish_outcome(&self) -> FinishOutcome {
        if self.content_changed {
            FinishOutcome::Content {
                changed: self.changed,
                delta: self.changed_delta,
            }
        } else if self.cursor_changed {
            FinishOutcome::Cursor
        } else {
            FinishOutcome::Quiet
        }
    }
}

/// Connection-side nesting guard for one IME session.
///
/// `begin`/`end` report success to the caller, which forwards successful
/// calls to the widget's batch-edit entry points. Once [`revoke`] runs (the
/// platform finished the connection) every further `begin` is rejected, so a
/// stale connection's late, asynchronous `end` calls contribute exactly zero
/// net nesting to the widget.
///
/// The mutex only keeps the counter's updates atomic: the IME may call from
/// a binder/input thread while the main thread force-resets.
///
/// [`revoke`]: ImeSession::revoke
#[derive(Debug, Default)]
pub struct ImeSession {
    nesting: Mutex<i32>,
}

impl ImeSession {
    /// Creates an armed session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enters a batch edit. Returns `false` once the session was revoked.
    pub fn begin(&self) -> bool {
        let mut nesting = self.nesting.lock();
        if *nesting >= 0 {
            *nesting += 1;
            true
        } else {
            debug!("beginBatchEdit on revoked IME session rejected");
            false
        }
    }

    /// Leaves a batch edit. Returns `false` when there is nothing to leave,
    /// keeping this session's net contribution balanced.
    pub fn end(&self) -> bool {
        let mut nesting = self.nesting.lock();
        if *nesting > 0 {
            *nesting -= 1;
            true
        } else {
            false
        }
    }

    /// Marks the session finished; further `begin` calls are rejected until
    /// [`rearm`](ImeSession::rearm).
    pub fn revoke(&self) {
        *self.nesting.lock() = -1;
    }

    /// Re-arms a revoked session (a fresh connection was established).
    pub fn rearm(&self) {
        *self.nesting.lock() = 0;
    }
}
