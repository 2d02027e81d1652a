//! core-step: reentrant step functions without coroutines.
//!
//! The trick: a function that is re-entered from the top on every call, plus
//! two counters. `step_index` persists between calls and names the step that
//! should run; `compare` starts at zero on entry and is tested at each yield
//! site in source order. The site where they agree fires; every earlier site
//! falls through. Each entry therefore "resumes" at exactly one step, with no
//! generator machinery and no allocation.
//!
//! The body shape:
//!
//! ```
//! use core_step::{StepCursor, StepFn};
//!
//! struct Ctx { scans: u32 }
//!
//! fn warmup(cursor: &mut StepCursor<'_>, ctx: &mut Ctx) {
//!     if ctx.scans > 3 {
//!         return; // guard: skip every step this call
//!     }
//!     if cursor.step() {
//!         ctx.scans += 1;
//!         cursor.next();
//!         return;
//!     }
//!     if cursor.step() {
//!         ctx.scans += 1;
//!         cursor.repeat_while(ctx.scans < 3);
//!         return;
//!     }
//!     cursor.rewind();
//! }
//!
//! let mut steps = StepFn::new("warmup", warmup);
//! let mut ctx = Ctx { scans: 0 };
//! steps.run(&mut ctx);
//! assert_eq!(steps.index(), 1);
//! ```
//!
//! A fired step block must end by choosing how the counter moves (`next`,
//! `next_now`, `repeat_while`, `rewind`) and then return — except after
//! `next_now`, which deliberately lets execution fall through so the next
//! step also fires within the same call.

use tracing::trace;

/// Per-call view over a persistent step counter.
pub struct StepCursor<'a> {
    step: &'a mut u16,
    compare: u16,
}

impl<'a> StepCursor<'a> {
    pub fn new(step: &'a mut u16) -> Self {
        Self { step, compare: 0 }
    }

    /// True when this yield site is the one the persistent counter selects.
    /// A non-selected site advances the compare counter so the following
    /// site can be tested.
    pub fn step(&mut self) -> bool {
        if self.compare == *self.step {
            true
        } else {
            self.compare += 1;
            false
        }
    }

    /// Advance to the next step on the *next* call.
    pub fn next(&mut self) {
        *self.step += 1;
    }

    /// Advance to the next step and let it fire within the *same* call: the
    /// caller falls through instead of returning.
    pub fn next_now(&mut self) {
        *self.step += 1;
        self.compare += 1;
    }

    /// Keep re-running the current step while `keep` holds; advance once it
    /// stops holding.
    pub fn repeat_while(&mut self, keep: bool) {
        if !keep {
            *self.step += 1;
        }
    }

    /// Back to the first step (terminal sites use this before returning).
    pub fn rewind(&mut self) {
        *self.step = 0;
    }

    pub fn index(&self) -> u16 {
        *self.step
    }
}

/// A named reentrant function and its persistent step counter.
///
/// Unlike a protocol, a step function owns no rule state; it is the generic
/// sequencing primitive, typically used to orchestrate several protocols
/// from a host loop.
pub struct StepFn<C> {
    name: &'static str,
    func: fn(&mut StepCursor<'_>, &mut C),
    step: u16,
}

impl<C> StepFn<C> {
    pub fn new(name: &'static str, func: fn(&mut StepCursor<'_>, &mut C)) -> Self {
        Self {
            name,
            func,
            step: 0,
        }
    }

    /// Re-enter the body, resuming at the current step.
    pub fn run(&mut self, ctx: &mut C) {
        trace!(target: "dispatch.step", function = self.name, step = self.step, "run");
        let mut cursor = StepCursor::new(&mut self.step);
        (self.func)(&mut cursor, ctx);
    }

    pub fn reset(&mut self) {
        self.step = 0;
    }

    pub fn index(&self) -> u16 {
        self.step
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}
