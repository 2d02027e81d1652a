#![allow(dead_code)] // Shared across the integration test binaries; each uses a subset.

use sequent::{Packet, codes};

/// Recording context threaded through every test protocol: performs append
/// command labels, event actions append what they saw.
#[derive(Default)]
pub struct Harness {
    pub commands: Vec<&'static str>,
    pub events: Vec<&'static str>,
    pub reports: u32,
}

// --- perform callbacks ------------------------------------------------------

pub fn send_reset(harness: &mut Harness, _: ()) -> bool {
    harness.commands.push("reset");
    true
}

pub fn start_scan(harness: &mut Harness, _: ()) -> bool {
    harness.commands.push("scan_on");
    true
}

pub fn stop_scan(harness: &mut Harness, _: ()) -> bool {
    harness.commands.push("scan_off");
    true
}

pub fn broken_command(harness: &mut Harness, _: ()) -> bool {
    harness.commands.push("broken");
    false
}

// --- event actions ----------------------------------------------------------

pub fn record_report(harness: &mut Harness, _: &Packet<'_>, _: ()) -> bool {
    harness.reports += 1;
    harness.events.push("report");
    true
}

pub fn record_unexpected(harness: &mut Harness, _: &Packet<'_>, _: ()) -> bool {
    harness.events.push("unexpected");
    true
}

// --- packet builders --------------------------------------------------------

pub fn event(code: u8, payload: &[u8]) -> Vec<u8> {
    let mut bytes = vec![0x04, code, payload.len() as u8];
    bytes.extend_from_slice(payload);
    bytes
}

pub fn hal_initialized(reason: u8) -> Vec<u8> {
    let [lo, hi] = codes::VSE_HAL_INITIALIZED.to_le_bytes();
    event(codes::EVT_VENDOR, &[lo, hi, reason])
}

pub fn adv_report() -> Vec<u8> {
    event(codes::EVT_LE_META, &[codes::SUB_LE_ADVERTISING_REPORT, 0x01])
}

pub fn command_complete() -> Vec<u8> {
    event(codes::EVT_COMMAND_COMPLETE, &[0x01, 0x03, 0x0c, 0x00])
}

pub fn conn_complete() -> Vec<u8> {
    event(
        codes::EVT_LE_META,
        &[codes::SUB_LE_CONNECTION_COMPLETE, 0x00, 0x40, 0x00],
    )
}

pub fn kick() -> Vec<u8> {
    event(codes::EVT_NUM_COMPLETED_PACKETS, &[0x00])
}

/// Install a fmt subscriber once so failing tests show the engine's log
/// stream under --nocapture.
pub fn init_tracing() {
    use std::sync::Once;
    static ONCE: Once = Once::new();
    ONCE.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .try_init();
    });
}
