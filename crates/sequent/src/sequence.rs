//! Sequence: the protocol-body cursor.
//!
//! One `Sequence` lives for exactly one re-entry of a protocol body. It
//! couples the step-counter resumption trick (`core-step`) with production
//! configuration: the fired step block stages the next production — perform,
//! expectations, until — and ends at a yield (`advance`, `repeat_while`,
//! `abort`) or at the terminal (`finish`).
//!
//! The body shape mirrors the generic step function:
//!
//! ```text
//! fn my_protocol(seq: &mut Sequence<'_, Ctx>, ctx: &mut Ctx) -> Flow {
//!     if seq.step() {
//!         seq.perform_named(send_reset, (), "send_reset");
//!         seq.until_event(Check::ResetReason(codes::REASON_HOST_RESET));
//!         return seq.advance();
//!     }
//!     if seq.step() {
//!         if !seq.met_expectations() {
//!             return seq.abort();
//!         }
//!         // …
//!     }
//!     seq.finish()
//! }
//! ```

use core_engine::{Engine, PerformFn};
use core_event::{Check, PredicateFn};
use core_rules::{ActionFn, Rule};
use core_step::StepCursor;
use tracing::debug;

/// What the protocol body tells the dispatcher on return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// A production was configured; the narrative continues on the next
    /// completed production.
    Running,
    /// The terminal was reached; the narrative completed.
    Complete,
    /// The body aborted; the dispatcher clears the current protocol.
    Failed,
}

/// Cursor handed to a protocol body for one re-entry.
pub struct Sequence<'a, C, A = ()> {
    cursor: StepCursor<'a>,
    engine: &'a mut Engine<C, A>,
    now_ms: u64,
    failed: bool,
}

impl<'a, C, A: Copy> Sequence<'a, C, A> {
    pub(crate) fn new(step: &'a mut u16, engine: &'a mut Engine<C, A>, now_ms: u64) -> Self {
        Self {
            cursor: StepCursor::new(step),
            engine,
            now_ms,
            failed: false,
        }
    }

    /// True when this step is the one being resumed. See `core-step` for the
    /// counter contract.
    pub fn step(&mut self) -> bool {
        self.cursor.step()
    }

    pub fn step_index(&self) -> u16 {
        self.cursor.index()
    }

    // --- production configuration -----------------------------------------

    /// Stage the production's one-shot perform.
    pub fn perform(&mut self, func: PerformFn<C, A>, arg: A) {
        self.engine.set_perform(func, arg);
    }

    /// Stage the perform with a debug name for the log stream.
    pub fn perform_named(&mut self, func: PerformFn<C, A>, arg: A, name: &'static str) {
        self.engine.set_perform_named(func, arg, crate::clip_name(name));
    }

    /// Expect an event: every matching normal rule fires, in the order added.
    /// Capacity overflows are logged by the rule store and the add dropped;
    /// the production keeps running without the rule.
    pub fn expect(&mut self, check: Check, action: ActionFn<C, A>, arg: A) {
        let _ = self.engine.add_normal(Rule::new(check, action, arg));
    }

    /// Expect an event without reacting to it; matching still counts towards
    /// [`Sequence::met_expectations`].
    pub fn expect_only(&mut self, check: Check, arg: A) {
        let _ = self.engine.add_normal(Rule::expect_only(check, arg));
    }

    /// Expect an event exclusively: of all exclusive rules, only the first
    /// match fires.
    pub fn expect_exclusive(&mut self, check: Check, action: ActionFn<C, A>, arg: A) {
        let _ = self.engine.add_exclusive(Rule::new(check, action, arg));
    }

    /// Trap events nothing else matched. Global rules persist across
    /// productions until cleared through the dispatcher.
    pub fn trap(&mut self, check: Check, action: ActionFn<C, A>, arg: A) {
        let _ = self.engine.add_global(Rule::new(check, action, arg));
    }

    /// End the production once `predicate` holds for an event.
    pub fn until(&mut self, predicate: PredicateFn) {
        self.engine.until(predicate);
    }

    /// End the production once an event matches `check`.
    pub fn until_event(&mut self, check: Check) {
        self.engine.until_event(check);
    }

    /// End the production after `after_ms` milliseconds, counted from now.
    /// Cooperative: the deadline is only checked when an event arrives.
    pub fn until_timeout(&mut self, after_ms: u64) {
        self.engine.until_timeout(after_ms, self.now_ms);
    }

    /// Did any normal/exclusive rule fire during the production that just
    /// completed? Global traps never count.
    pub fn met_expectations(&self) -> bool {
        self.engine.met_expectations()
    }

    // --- yields -------------------------------------------------------------

    /// Yield and resume at the next step once the configured production
    /// completes.
    pub fn advance(&mut self) -> Flow {
        self.cursor.next();
        Flow::Running
    }

    /// Advance the step counter and keep executing this same body call, so
    /// the next step fires without waiting for another production. Used when
    /// a step discovers it has nothing left to configure.
    pub fn advance_now(&mut self) {
        self.cursor.next_now();
    }

    /// Yield; re-run this same step after the configured production completes
    /// while `keep` holds, advance otherwise. `keep` is evaluated now, at
    /// configure time — a body that needs an exact repetition count should
    /// branch on its context and use [`Sequence::advance_now`] instead of
    /// configuring one final production.
    pub fn repeat_while(&mut self, keep: bool) -> Flow {
        self.cursor.repeat_while(keep);
        Flow::Running
    }

    /// Mark the narrative failed without yielding; the dispatcher aborts the
    /// protocol when the body returns.
    pub fn fail(&mut self) {
        debug!(target: "dispatch.protocol", step = self.cursor.index(), "protocol body flagged failure");
        self.failed = true;
    }

    /// Fail and yield in one move.
    pub fn abort(&mut self) -> Flow {
        self.fail();
        Flow::Failed
    }

    /// Terminal: rewind the step counter and report the narrative outcome.
    pub fn finish(&mut self) -> Flow {
        self.cursor.rewind();
        if self.failed { Flow::Failed } else { Flow::Complete }
    }

    pub(crate) fn failed(&self) -> bool {
        self.failed
    }
}
