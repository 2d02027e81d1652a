//! sequent: write event-driven wire protocols as sequential narratives.
//!
//! A protocol author writes a straight-line story — start this action, expect
//! these events, react, advance, finish — and the runtime drives it
//! step-by-step from an externally delivered stream of HCI event packets.
//! There is no async runtime and no allocation on the hot path: the
//! [`Dispatcher`] is re-entered by the host's event callback, and protocol
//! bodies "resume" via a persistent step counter (see `core-step`).
//!
//! The pieces, bottom up:
//! * `core-event` — packet envelope + [`Check`] matching.
//! * `core-rules` — the normal/exclusive/global rule sets.
//! * `core-engine` — per-event firing policy and until-termination.
//! * `core-step` — the reentrant step-counter primitive.
//! * this crate — [`Protocol`], [`Sequence`] (the protocol-body cursor),
//!   [`Dispatcher`] (the single event entry point), and [`EventSource`] for
//!   hosts that want a blocking pump.
//!
//! A minimal narrative:
//!
//! ```
//! use sequent::{Check, Dispatcher, Flow, Protocol, Sequence, codes};
//!
//! #[derive(Default)]
//! struct Radio {
//!     resets: u32,
//! }
//!
//! fn send_reset(radio: &mut Radio, _: ()) -> bool {
//!     radio.resets += 1;
//!     true
//! }
//!
//! fn startup(seq: &mut Sequence<'_, Radio>, _radio: &mut Radio) -> Flow {
//!     if seq.step() {
//!         seq.perform_named(send_reset, (), "send_reset");
//!         seq.until_event(Check::Event(codes::EVT_COMMAND_COMPLETE));
//!         return seq.advance();
//!     }
//!     seq.finish()
//! }
//!
//! let mut dispatcher: Dispatcher<Radio> = Dispatcher::new();
//! let mut radio = Radio::default();
//! dispatcher.start_protocol(Protocol::new("startup", startup));
//! // Any event kicks the body into configuring its first production.
//! dispatcher.on_event(&mut radio, &[0x04, 0x13, 0x00]);
//! // The perform runs on the next event; command-complete ends the step.
//! dispatcher.on_event(&mut radio, &[0x04, 0x0e, 0x00]);
//! assert_eq!(radio.resets, 1);
//! assert!(!dispatcher.is_running());
//! ```
//!
//! Cooperative by construction: everything runs on the thread that delivers
//! events, action callbacks cannot re-enter the dispatcher (the borrow
//! checker owns that rule now), and timeouts are evaluated only when an
//! event arrives.
//!
//! Diagnostics go through `tracing` under per-subsystem targets
//! (`engine.rules`, `engine.production`, `dispatch.protocol`); release
//! builds can compile them out with tracing's `release_max_level_*`
//! features.

use std::fmt;

mod dispatcher;
mod sequence;
mod source;

pub use dispatcher::Dispatcher;
pub use sequence::{Flow, Sequence};
pub use source::EventSource;

pub use core_engine::{Clock, Completion, Engine, Outcome, PerformFn, StdClock};
pub use core_event::{Check, MAX_EVENT_LEN, Packet, PacketKind, PredicateFn, codes};
pub use core_rules::{ActionFn, RULE_CAPACITY, Rule, RuleError, RuleSet, RuleStore, SetKind};
pub use core_step::{StepCursor, StepFn};

/// Debug names longer than this are clipped in log output.
pub const NAME_LEN_MAX: usize = 40;

/// A protocol body: re-entered once per completed production, resuming at
/// the step the [`Sequence`] cursor selects.
pub type ProtocolFn<C, A = ()> = fn(&mut Sequence<'_, C, A>, &mut C) -> Flow;

/// A named protocol narrative. At most one protocol is current per
/// [`Dispatcher`] at any time.
pub struct Protocol<C, A = ()> {
    name: &'static str,
    body: ProtocolFn<C, A>,
}

impl<C, A> Protocol<C, A> {
    pub fn new(name: &'static str, body: ProtocolFn<C, A>) -> Self {
        Self { name, body }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub(crate) fn body(&self) -> ProtocolFn<C, A> {
        self.body
    }

    /// Name clipped for log lines.
    pub(crate) fn display_name(&self) -> &str {
        clip_name(self.name)
    }
}

// fn pointer + &'static str are Copy no matter what C is; the derive would
// wrongly demand C: Clone.
impl<C, A> Copy for Protocol<C, A> {}
impl<C, A> Clone for Protocol<C, A> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<C, A> fmt::Debug for Protocol<C, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Protocol").field("name", &self.name).finish()
    }
}

pub(crate) fn clip_name(name: &str) -> &str {
    name.char_indices()
        .nth(NAME_LEN_MAX)
        .map(|(i, _)| &name[..i])
        .unwrap_or(name)
}
