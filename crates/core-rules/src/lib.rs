//! core-rules: ordered expectation/action rule storage.
//!
//! Three insertion-ordered sets back every production:
//! * `normal` — every matching rule fires, in insertion order.
//! * `exclusive` — at most the first matching rule fires.
//! * `global` — fallback, consulted only when nothing in `normal` or
//!   `exclusive` matched; persists across productions until explicitly
//!   cleared.
//!
//! Storage is fixed-capacity and inline ([`RULE_CAPACITY`] per set): rule
//! adds on the hot path never touch the heap, matching the engine's
//! no-allocation posture. An add past capacity is rejected with a typed
//! error, logged, and dropped; the production keeps running without it.
//!
//! This crate is pure bookkeeping. Firing policy, precedence between sets,
//! and the `rule_matched` flag live in the production engine; the flag is
//! documented here only because `clear_normal` at the engine level resets it.

use std::fmt;

use core_event::{Check, Packet};
use smallvec::SmallVec;
use thiserror::Error;
use tracing::warn;

/// Per-set rule capacity. Compile-time by design: the target environments
/// have no allocator to grow into.
pub const RULE_CAPACITY: usize = 20;

/// Event-action callback. The context `C` is the host's protocol state; the
/// return value is informational (logged by the engine, never propagated).
pub type ActionFn<C, A> = fn(&mut C, &Packet<'_>, A) -> bool;

/// One expectation/action pair.
///
/// The original model threads an opaque pointer-sized `user_arg` to each
/// action; here it is the typed `arg: A` (`Copy`, defaults to `()`), handed
/// back to the action verbatim when the rule fires.
pub struct Rule<C, A = ()> {
    pub check: Check,
    pub action: Option<ActionFn<C, A>>,
    pub arg: A,
}

impl<C, A> Rule<C, A> {
    pub fn new(check: Check, action: ActionFn<C, A>, arg: A) -> Self {
        Self {
            check,
            action: Some(action),
            arg,
        }
    }

    /// An expectation with no action: matching still counts towards the
    /// production's `rule_matched` flag.
    pub fn expect_only(check: Check, arg: A) -> Self {
        Self {
            check,
            action: None,
            arg,
        }
    }
}

impl<C> Rule<C, ()> {
    /// Convenience for the common no-argument case.
    pub fn on(check: Check, action: ActionFn<C, ()>) -> Self {
        Self::new(check, action, ())
    }
}

// Manual impls: derived Clone/Copy would demand `C: Clone`, but `C` only
// appears behind a fn pointer.
impl<C, A: Clone> Clone for Rule<C, A> {
    fn clone(&self) -> Self {
        Self {
            check: self.check,
            action: self.action,
            arg: self.arg.clone(),
        }
    }
}

impl<C, A: Copy> Copy for Rule<C, A> {}

impl<C, A: fmt::Debug> fmt::Debug for Rule<C, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("check", &self.check)
            .field("has_action", &self.action.is_some())
            .field("arg", &self.arg)
            .finish()
    }
}

/// Which of the three sets a rule lives in. Carried by capacity errors and
/// log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetKind {
    Normal,
    Exclusive,
    Global,
}

impl fmt::Display for SetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SetKind::Normal => "normal",
            SetKind::Exclusive => "exclusive",
            SetKind::Global => "global",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RuleError {
    #[error("{set} rule set full ({capacity} rules); rule dropped")]
    Capacity { set: SetKind, capacity: usize },
}

/// One insertion-ordered, fixed-capacity rule sequence.
pub struct RuleSet<C, A = ()> {
    kind: SetKind,
    rules: SmallVec<[Rule<C, A>; RULE_CAPACITY]>,
}

impl<C, A> RuleSet<C, A> {
    pub fn new(kind: SetKind) -> Self {
        Self {
            kind,
            rules: SmallVec::new(),
        }
    }

    pub fn kind(&self) -> SetKind {
        self.kind
    }

    /// Append a rule, preserving insertion order as priority order. At
    /// capacity the add is logged, dropped, and reported; existing rules are
    /// untouched.
    pub fn push(&mut self, rule: Rule<C, A>) -> Result<(), RuleError> {
        if self.rules.len() >= RULE_CAPACITY {
            warn!(
                target: "engine.rules",
                set = %self.kind,
                capacity = RULE_CAPACITY,
                "rule set full; dropping rule"
            );
            return Err(RuleError::Capacity {
                set: self.kind,
                capacity: RULE_CAPACITY,
            });
        }
        self.rules.push(rule);
        Ok(())
    }

    pub fn iter(&self) -> core::slice::Iter<'_, Rule<C, A>> {
        self.rules.iter()
    }

    pub fn clear(&mut self) {
        self.rules.clear();
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.rules.len() >= RULE_CAPACITY
    }
}

impl<C, A: fmt::Debug> fmt::Debug for RuleSet<C, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleSet")
            .field("kind", &self.kind)
            .field("rules", &self.rules.as_slice())
            .finish()
    }
}

/// The three rule sets of one production engine.
pub struct RuleStore<C, A = ()> {
    normal: RuleSet<C, A>,
    exclusive: RuleSet<C, A>,
    global: RuleSet<C, A>,
}

impl<C, A> RuleStore<C, A> {
    pub fn new() -> Self {
        Self {
            normal: RuleSet::new(SetKind::Normal),
            exclusive: RuleSet::new(SetKind::Exclusive),
            global: RuleSet::new(SetKind::Global),
        }
    }

    pub fn add_normal(&mut self, rule: Rule<C, A>) -> Result<(), RuleError> {
        self.normal.push(rule)
    }

    pub fn add_exclusive(&mut self, rule: Rule<C, A>) -> Result<(), RuleError> {
        self.exclusive.push(rule)
    }

    pub fn add_global(&mut self, rule: Rule<C, A>) -> Result<(), RuleError> {
        self.global.push(rule)
    }

    pub fn normal(&self) -> &RuleSet<C, A> {
        &self.normal
    }

    pub fn exclusive(&self) -> &RuleSet<C, A> {
        &self.exclusive
    }

    pub fn global(&self) -> &RuleSet<C, A> {
        &self.global
    }

    pub fn clear_normal(&mut self) {
        self.normal.clear();
    }

    pub fn clear_exclusive(&mut self) {
        self.exclusive.clear();
    }

    pub fn clear_global(&mut self) {
        self.global.clear();
    }

    /// Clear every set, globals included.
    pub fn clear_all(&mut self) {
        self.normal.clear();
        self.exclusive.clear();
        self.global.clear();
    }
}

impl<C, A> Default for RuleStore<C, A> {
    fn default() -> Self {
        Self::new()
    }
}
