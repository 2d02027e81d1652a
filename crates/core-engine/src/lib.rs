//! core-engine: the production engine.
//!
//! A production is one unit of protocol work: an optional one-shot `perform`
//! that starts it, the expectation/action rules that react to events while it
//! runs, and an "until" condition that ends it. [`Engine::dispatch`] is the
//! per-event entry point and encodes the whole firing policy:
//!
//! 1. Non-event packets short-circuit: nothing is evaluated, not even the
//!    until condition.
//! 2. A pending `perform` is consumed exactly once, before any rule. A false
//!    return ends the production immediately (`Done(PerformFailed)`) with all
//!    transient state cleared; the dispatcher above turns that into a
//!    protocol abort.
//! 3. `exclusive` rules: only the first match fires.
//! 4. `normal` rules: every match fires, in insertion order.
//! 5. `global` rules: consulted only when steps 3 and 4 fired nothing; at
//!    most one fires. Global matches do not count towards `rule_matched` —
//!    globals exist to trap unexpected traffic.
//!
//! Afterwards the until condition decides whether the production is done: no
//! configured termination source at all means single-shot (one dispatch, one
//! `Done`); otherwise a predicate hit, an event match, or an elapsed timeout
//! finishes it. Finishing clears `normal`/`exclusive` and the until state but
//! leaves `global` alone and preserves `rule_matched` for
//! [`Engine::met_expectations`].
//!
//! Matching is evaluated against the rule lists as they stood when the event
//! arrived: the scan collects what fires, then the actions run. Actions
//! receive only the host context, so reconfiguration for the next production
//! flows through the protocol body rather than mid-dispatch mutation.

use core_event::{Check, Packet, PredicateFn};
use core_rules::{ActionFn, Rule, RuleError, RuleStore};
use smallvec::SmallVec;
use tracing::{debug, trace, warn};

pub use core_rules::RULE_CAPACITY;

mod clock;
pub use clock::{Clock, StdClock};

/// Production-starting callback: runs once, before rule evaluation, on the
/// first event dispatched into the production. Returning false aborts.
pub type PerformFn<C, A> = fn(&mut C, A) -> bool;

/// Why a production reported `Done`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// The until condition held (or the production was single-shot).
    Fulfilled,
    /// The one-shot perform returned false; the production was torn down
    /// without evaluating any rules.
    PerformFailed,
}

/// Result of dispatching a single packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Nothing fired and the production is still running.
    NoMatch,
    /// At least one normal/exclusive rule fired; the production continues.
    Advanced,
    /// The production finished on this packet.
    Done(Completion),
}

impl Outcome {
    pub fn is_done(&self) -> bool {
        matches!(self, Outcome::Done(_))
    }
}

struct Perform<C, A> {
    func: PerformFn<C, A>,
    arg: A,
    name: &'static str,
}

impl<C, A: Copy> Copy for Perform<C, A> {}
impl<C, A: Copy> Clone for Perform<C, A> {
    fn clone(&self) -> Self {
        *self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Timeout {
    after_ms: u64,
    started_at: u64,
}

/// Ephemeral state of the in-flight production. Reset between productions;
/// `rule_matched` outlives the reset long enough for the protocol body to
/// read it.
struct Production<C, A> {
    perform: Option<Perform<C, A>>,
    until_predicate: Option<PredicateFn>,
    until_match: Option<Check>,
    timeout: Option<Timeout>,
    rule_matched: bool,
}

impl<C, A> Production<C, A> {
    fn new() -> Self {
        Self {
            perform: None,
            until_predicate: None,
            until_match: None,
            timeout: None,
            rule_matched: false,
        }
    }

    fn has_until(&self) -> bool {
        self.until_predicate.is_some() || self.until_match.is_some() || self.timeout.is_some()
    }
}

/// The production engine: rule store + in-flight production state.
///
/// `C` is the host's protocol context, handed to every callback; `A` is the
/// per-rule argument type (defaults to `()`).
pub struct Engine<C, A = ()> {
    rules: RuleStore<C, A>,
    production: Production<C, A>,
}

impl<C, A: Copy> Engine<C, A> {
    pub fn new() -> Self {
        Self {
            rules: RuleStore::new(),
            production: Production::new(),
        }
    }

    // --- production configuration -----------------------------------------

    /// Stage the one-shot perform for the next dispatch.
    pub fn set_perform(&mut self, func: PerformFn<C, A>, arg: A) {
        self.set_perform_named(func, arg, "unnamed");
    }

    /// Stage the one-shot perform with a debug name for the log stream.
    pub fn set_perform_named(&mut self, func: PerformFn<C, A>, arg: A, name: &'static str) {
        if self.production.perform.is_some() {
            warn!(target: "engine.production", action = name, "replacing pending perform");
        }
        self.production.perform = Some(Perform { func, arg, name });
    }

    /// Name of the staged perform, if any. Purely diagnostic.
    pub fn perform_name(&self) -> Option<&'static str> {
        self.production.perform.as_ref().map(|p| p.name)
    }

    /// Finish the production once `predicate` answers true for an event.
    pub fn until(&mut self, predicate: PredicateFn) {
        self.production.until_predicate = Some(predicate);
    }

    /// Finish the production once an event matches `check`.
    pub fn until_event(&mut self, check: Check) {
        self.production.until_match = Some(check);
    }

    /// Finish the production once `after_ms` milliseconds have passed since
    /// `now_ms`. Cooperative: only evaluated when an event is dispatched.
    pub fn until_timeout(&mut self, after_ms: u64, now_ms: u64) {
        self.production.timeout = Some(Timeout {
            after_ms,
            started_at: now_ms,
        });
    }

    /// True iff at least one normal/exclusive rule fired during the current
    /// (or just-finished) production. Global fires never count.
    pub fn met_expectations(&self) -> bool {
        self.production.rule_matched
    }

    /// Forget the `rule_matched` observation. The dispatcher calls this after
    /// the protocol body has had its chance to read it.
    pub fn reset_expectations(&mut self) {
        self.production.rule_matched = false;
    }

    // --- rule management ---------------------------------------------------

    pub fn add_normal(&mut self, rule: Rule<C, A>) -> Result<(), RuleError> {
        self.rules.add_normal(rule)
    }

    pub fn add_exclusive(&mut self, rule: Rule<C, A>) -> Result<(), RuleError> {
        self.rules.add_exclusive(rule)
    }

    pub fn add_global(&mut self, rule: Rule<C, A>) -> Result<(), RuleError> {
        self.rules.add_global(rule)
    }

    /// Clear the normal set. Per the rule-store contract this also resets
    /// the `rule_matched` flag; the engine-internal end-of-production clear
    /// does not.
    pub fn clear_normal(&mut self) {
        self.rules.clear_normal();
        self.production.rule_matched = false;
    }

    pub fn clear_exclusive(&mut self) {
        self.rules.clear_exclusive();
    }

    pub fn clear_global(&mut self) {
        self.rules.clear_global();
    }

    /// Clear every rule set and the observation flag.
    pub fn clear_all(&mut self) {
        self.rules.clear_all();
        self.production.rule_matched = false;
    }

    pub fn rules(&self) -> &RuleStore<C, A> {
        &self.rules
    }

    /// Tear down all transient production state: pending perform, untils,
    /// timeout, `normal`/`exclusive` rules, and the observation flag. Globals
    /// survive. Used on protocol abort/clear.
    pub fn reset_transient(&mut self) {
        self.production.perform = None;
        self.production.until_predicate = None;
        self.production.until_match = None;
        self.production.timeout = None;
        self.production.rule_matched = false;
        self.rules.clear_normal();
        self.rules.clear_exclusive();
    }

    // --- dispatch ----------------------------------------------------------

    /// Run one packet through the production. `now_ms` comes from the host's
    /// clock collaborator and is only consulted for the timeout.
    pub fn dispatch(&mut self, ctx: &mut C, packet: &Packet<'_>, now_ms: u64) -> Outcome {
        if !packet.is_event() {
            trace!(target: "engine.production", kind = ?packet.kind(), "non-event packet ignored");
            return Outcome::NoMatch;
        }

        if let Some(perform) = self.production.perform.take() {
            debug!(target: "engine.production", action = perform.name, "perform");
            if !(perform.func)(ctx, perform.arg) {
                warn!(
                    target: "engine.production",
                    action = perform.name,
                    "perform failed; production torn down"
                );
                self.reset_transient();
                return Outcome::Done(Completion::PerformFailed);
            }
        }

        // Scan phase: the rule lists are fixed for the duration of one
        // dispatch, so collect what fires first and invoke afterwards.
        let mut pending: SmallVec<[(ActionFn<C, A>, A); RULE_CAPACITY + 1]> = SmallVec::new();
        let mut fired = false;

        for rule in self.rules.exclusive().iter() {
            if rule.check.matches(packet) {
                trace!(target: "engine.rules", check = ?rule.check, "exclusive rule fired");
                fired = true;
                if let Some(action) = rule.action {
                    pending.push((action, rule.arg));
                }
                break;
            }
        }
        for rule in self.rules.normal().iter() {
            if rule.check.matches(packet) {
                trace!(target: "engine.rules", check = ?rule.check, "normal rule fired");
                fired = true;
                if let Some(action) = rule.action {
                    pending.push((action, rule.arg));
                }
            }
        }
        if !fired {
            for rule in self.rules.global().iter() {
                if rule.check.matches(packet) {
                    trace!(target: "engine.rules", check = ?rule.check, "global rule fired");
                    if let Some(action) = rule.action {
                        pending.push((action, rule.arg));
                    }
                    break;
                }
            }
        }

        if fired {
            self.production.rule_matched = true;
        }

        // Fire phase.
        for (action, arg) in pending {
            if !action(ctx, packet, arg) {
                debug!(target: "engine.production", "event action reported failure (informational)");
            }
        }

        if self.production_finished(packet, now_ms) {
            self.finish_production();
            return Outcome::Done(Completion::Fulfilled);
        }
        if fired { Outcome::Advanced } else { Outcome::NoMatch }
    }

    fn production_finished(&self, packet: &Packet<'_>, now_ms: u64) -> bool {
        let production = &self.production;
        // No termination source at all: single-shot, done after one dispatch.
        if !production.has_until() {
            return true;
        }
        if let Some(predicate) = production.until_predicate
            && predicate(packet)
        {
            return true;
        }
        if let Some(check) = production.until_match
            && check.matches(packet)
        {
            return true;
        }
        if let Some(timeout) = production.timeout
            && now_ms.saturating_sub(timeout.started_at) >= timeout.after_ms
        {
            debug!(
                target: "engine.production",
                after_ms = timeout.after_ms,
                "production timed out"
            );
            return true;
        }
        false
    }

    /// End-of-production teardown: transient rules and untils go, globals
    /// stay, and `rule_matched` is preserved for `met_expectations`.
    fn finish_production(&mut self) {
        debug!(
            target: "engine.production",
            met_expectations = self.production.rule_matched,
            "production done"
        );
        self.rules.clear_normal();
        self.rules.clear_exclusive();
        self.production.until_predicate = None;
        self.production.until_match = None;
        self.production.timeout = None;
    }
}

impl<C, A: Copy> Default for Engine<C, A> {
    fn default() -> Self {
        Self::new()
    }
}
