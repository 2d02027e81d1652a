//! Check: the expectation half of a rule.
//!
//! A check is the check-kind + code pair from the rule model. Each variant
//! carries its code at the width the envelope actually uses; `Condition`
//! bypasses envelope decoding entirely and asks an arbitrary predicate.

use tracing::trace;

use crate::{Packet, codes};

/// Pure predicate over a packet. Used by `Check::Condition` and by
/// until-conditions in the production engine.
pub type PredicateFn = fn(&Packet<'_>) -> bool;

/// What a rule (or an until-condition) is waiting for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Check {
    /// Never matches. Placeholder for rules that are disabled in place.
    None,
    /// Top-level event code equals the given code.
    Event(u8),
    /// LE meta event whose subevent code equals the given code.
    Subevent(u8),
    /// Vendor event whose 16-bit ecode equals the given code.
    VendorEcode(u16),
    /// Vendor "HAL initialized" event whose reason byte equals the given
    /// code.
    ResetReason(u8),
    /// Vendor "procedure complete" event whose procedure byte equals the
    /// given code.
    ProcedureComplete(u8),
    /// Arbitrary predicate over the packet.
    Condition(PredicateFn),
}

impl Check {
    /// True when this check fires for `packet`. Truncated payloads never
    /// match; they fail the envelope accessor instead.
    pub fn matches(&self, packet: &Packet<'_>) -> bool {
        let hit = match *self {
            Check::None => false,
            Check::Event(code) => packet.event_code() == Some(code),
            Check::Subevent(code) => packet.subevent_code() == Some(code),
            Check::VendorEcode(code) => packet.vendor_ecode() == Some(code),
            Check::ResetReason(code) => packet.reset_reason() == Some(code),
            Check::ProcedureComplete(code) => packet.procedure_code() == Some(code),
            Check::Condition(predicate) => predicate(packet),
        };
        if hit {
            trace!(target: "event.packet", check = ?self, "check matched");
        }
        hit
    }
}
