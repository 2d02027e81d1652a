//! Dispatcher: the single event entry point.
//!
//! Owns everything the original design kept in file-scope statics: the
//! production engine, the current protocol and its step index, and the clock
//! collaborator. Event delivery calls [`Dispatcher::on_event`]; on a
//! completed production the dispatcher re-enters the protocol body so it can
//! configure the next one.
//!
//! State machine:
//!
//! ```text
//!         ┌──────────┐   start_protocol          ┌──────────┐
//!         │  Idle    │──────────────────────────▶│ Running  │
//!         │ (no cur) │                           │          │
//!         └──────────┘◀──────────────────────────└──────────┘
//!               ▲        clear_protocol / perform failure /
//!               │        body terminal or abort
//!               └── start: no current protocol, rule sets empty
//! ```

use core_engine::{Clock, Completion, Engine, Outcome, StdClock};
use core_event::{MAX_EVENT_LEN, Packet};
use core_rules::{Rule, RuleError};
use tracing::{debug, warn};

use crate::sequence::{Flow, Sequence};
use crate::source::EventSource;
use crate::Protocol;

/// The event dispatch loop's state. `C` is the host's protocol context, `A`
/// the per-rule argument type, `K` the clock collaborator.
pub struct Dispatcher<C, A = (), K = StdClock> {
    engine: Engine<C, A>,
    clock: K,
    current: Option<Protocol<C, A>>,
    step_index: u16,
}

impl<C, A: Copy> Dispatcher<C, A, StdClock> {
    pub fn new() -> Self {
        Self::with_clock(StdClock::new())
    }
}

impl<C, A: Copy> Default for Dispatcher<C, A, StdClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C, A: Copy, K: Clock> Dispatcher<C, A, K> {
    /// Build a dispatcher around a host-supplied clock (tests typically pass
    /// a `Cell<u64>` and tick it through [`Dispatcher::clock`]).
    pub fn with_clock(clock: K) -> Self {
        Self {
            engine: Engine::new(),
            clock,
            current: None,
            step_index: 0,
        }
    }

    pub fn clock(&self) -> &K {
        &self.clock
    }

    pub fn engine(&self) -> &Engine<C, A> {
        &self.engine
    }

    /// Direct engine access for hosts that run productions without a
    /// protocol (and for tests). Protocol bodies should configure through
    /// their [`Sequence`] instead.
    pub fn engine_mut(&mut self) -> &mut Engine<C, A> {
        &mut self.engine
    }

    // --- protocol lifecycle -------------------------------------------------

    /// Make `protocol` current. Its body is not invoked here: the next
    /// dispatched event completes the (empty, single-shot) initial production
    /// and kicks the body into configuring step 0. A protocol already
    /// running is cleared first.
    pub fn start_protocol(&mut self, protocol: Protocol<C, A>) {
        if let Some(previous) = self.current.take() {
            warn!(
                target: "dispatch.protocol",
                previous = previous.display_name(),
                next = protocol.display_name(),
                "replacing running protocol"
            );
            self.engine.reset_transient();
        }
        debug!(target: "dispatch.protocol", protocol = protocol.display_name(), "protocol started");
        self.step_index = 0;
        self.current = Some(protocol);
    }

    /// Clear the current protocol and all transient rule/until/perform state.
    /// Globals survive.
    pub fn clear_protocol(&mut self) {
        if let Some(protocol) = self.current.take() {
            debug!(target: "dispatch.protocol", protocol = protocol.display_name(), "protocol cleared");
        }
        self.step_index = 0;
        self.engine.reset_transient();
    }

    pub fn current_protocol(&self) -> Option<&Protocol<C, A>> {
        self.current.as_ref()
    }

    pub fn is_running(&self) -> bool {
        self.current.is_some()
    }

    /// `rule_matched` of the in-flight (or just-finished) production.
    pub fn met_expectations(&self) -> bool {
        self.engine.met_expectations()
    }

    // --- global rules -------------------------------------------------------

    /// Install a fallback rule that persists across productions.
    pub fn add_global(&mut self, rule: Rule<C, A>) -> Result<(), RuleError> {
        self.engine.add_global(rule)
    }

    pub fn clear_globals(&mut self) {
        self.engine.clear_global();
    }

    // --- event delivery -----------------------------------------------------

    /// The host's event callback. Runs the production engine over the packet;
    /// when the production completes, re-enters the current protocol body to
    /// configure the next one.
    pub fn on_event(&mut self, ctx: &mut C, bytes: &[u8]) -> Outcome {
        let packet = Packet::new(bytes);
        let now_ms = self.clock.now_millis();
        let outcome = self.engine.dispatch(ctx, &packet, now_ms);
        match outcome {
            Outcome::Done(Completion::PerformFailed) => {
                // The engine already tore down its transient state.
                if let Some(protocol) = self.current.take() {
                    warn!(
                        target: "dispatch.protocol",
                        protocol = protocol.display_name(),
                        "protocol aborted: perform failed"
                    );
                }
                self.step_index = 0;
            }
            Outcome::Done(Completion::Fulfilled) => self.advance_protocol(ctx),
            Outcome::Advanced | Outcome::NoMatch => {}
        }
        outcome
    }

    fn advance_protocol(&mut self, ctx: &mut C) {
        let Some(protocol) = self.current else {
            return;
        };
        let now_ms = self.clock.now_millis();
        let mut sequence = Sequence::new(&mut self.step_index, &mut self.engine, now_ms);
        let mut flow = (protocol.body())(&mut sequence, ctx);
        if sequence.failed() {
            flow = Flow::Failed;
        }
        drop(sequence);
        // The body had its chance to read the previous production's
        // observation; the next production starts clean.
        self.engine.reset_expectations();

        match flow {
            Flow::Running => {}
            Flow::Complete => {
                debug!(
                    target: "dispatch.protocol",
                    protocol = protocol.display_name(),
                    "protocol complete"
                );
                self.current = None;
                self.step_index = 0;
                self.engine.reset_transient();
            }
            Flow::Failed => {
                warn!(
                    target: "dispatch.protocol",
                    protocol = protocol.display_name(),
                    step = self.step_index,
                    "protocol failed"
                );
                self.current = None;
                self.step_index = 0;
                self.engine.reset_transient();
            }
        }
    }

    // --- pumping ------------------------------------------------------------

    /// Pump `source` until the current protocol finishes: the blocking
    /// counterpart to an interrupt-driven host. When no packet is pending the
    /// source's `idle` hook runs (sleep, wfi, transport poll — the host's
    /// choice). Returns immediately when no protocol is running.
    pub fn drive<S: EventSource>(&mut self, ctx: &mut C, source: &mut S) {
        let mut buf = [0u8; MAX_EVENT_LEN];
        while self.is_running() {
            match source.next_packet(&mut buf) {
                Some(len) => {
                    self.on_event(ctx, &buf[..len]);
                }
                None => source.idle(),
            }
        }
    }
}
