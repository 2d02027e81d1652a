//! EventSource: the pull side of [`crate::Dispatcher::drive`].
//!
//! Hosts with their own event loop never need this; they call
//! `Dispatcher::on_event` from wherever packets arrive. `EventSource` exists
//! for the hosts that want to block until a protocol finishes.

/// A synchronous packet feed.
pub trait EventSource {
    /// Copy the next pending packet into `buf` and return its length, or
    /// `None` when nothing is pending right now. Packets longer than `buf`
    /// must be truncated by the transport before they get here.
    fn next_packet(&mut self, buf: &mut [u8]) -> Option<usize>;

    /// Invoked when no packet is pending. Hosts typically sleep, `wfi`, or
    /// pump their transport here; the default does nothing.
    fn idle(&mut self) {}
}
