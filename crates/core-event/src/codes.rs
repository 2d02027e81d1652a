//! Event-code vocabulary shared by the matcher and protocol authors.
//!
//! These constants are the bit-exact agreement with the host transport:
//! standard HCI event codes at the envelope's top level, LE meta subevents at
//! payload offset 0, and the vendor event family (16-bit little-endian ecode
//! at payload offset 0, reason byte at offset 2, procedure byte at offset 4).

// --- Top-level event codes -----------------------------------------------

pub const EVT_DISCONNECTION_COMPLETE: u8 = 0x05;
pub const EVT_ENCRYPTION_CHANGE: u8 = 0x08;
pub const EVT_COMMAND_COMPLETE: u8 = 0x0e;
pub const EVT_COMMAND_STATUS: u8 = 0x0f;
pub const EVT_HARDWARE_ERROR: u8 = 0x10;
pub const EVT_NUM_COMPLETED_PACKETS: u8 = 0x13;
/// LE meta event; the subevent code follows at payload offset 0.
pub const EVT_LE_META: u8 = 0x3e;
/// Vendor-specific event; a 16-bit ecode follows at payload offset 0.
pub const EVT_VENDOR: u8 = 0xff;

// --- LE meta subevent codes ----------------------------------------------

pub const SUB_LE_CONNECTION_COMPLETE: u8 = 0x01;
pub const SUB_LE_ADVERTISING_REPORT: u8 = 0x02;
pub const SUB_LE_CONNECTION_UPDATE_COMPLETE: u8 = 0x03;
pub const SUB_LE_READ_REMOTE_FEATURES_COMPLETE: u8 = 0x04;
pub const SUB_LE_LONG_TERM_KEY_REQUEST: u8 = 0x05;

// --- Vendor event codes ---------------------------------------------------

/// Controller HAL finished (re)initializing; the reason byte sits at payload
/// offset 2.
pub const VSE_HAL_INITIALIZED: u16 = 0x0200;
/// A host-requested procedure ran to completion; the procedure byte sits at
/// payload offset 4.
pub const VSE_PROCEDURE_COMPLETE: u16 = 0x0216;

// --- HAL initialization reasons ------------------------------------------

pub const REASON_POWER_ON: u8 = 0x01;
pub const REASON_HOST_RESET: u8 = 0x02;
pub const REASON_WATCHDOG: u8 = 0x05;
