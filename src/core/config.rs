//! Centralized configuration constants for pastelink.
//!
//! All tunable parameters live here so they can be reviewed and adjusted
//! in a single place. Wire-format details (envelope tags) stay in the
//! protocol module.

use std::time::Duration;

// ── Transfer / Chunking ──────────────────────────────────────────────────────

/// Fixed file chunk size in bytes (16 KiB).
///
/// Not negotiated between peers: chunking is receiver-transparent, the
/// receiver concatenates whatever chunk sizes arrive. 16 KiB stays well
/// under the 64 KB SCTP message limit of every WebRTC implementation.
pub const CHUNK_SIZE: usize = 16 * 1024;

/// Emit a transfer-progress event every this many chunks, plus one final
/// event when the transfer completes. Keeps UI traffic bounded on large
/// files.
pub const PROGRESS_CHUNK_INTERVAL: u64 = 16;

// ── Connection / Negotiation ─────────────────────────────────────────────────

/// Label of the single data channel carrying chat and file frames.
pub const DATA_CHANNEL_LABEL: &str = "pastelink";

/// Timeout for ICE candidate gathering.
///
/// With copy-paste signaling there is no candidate trickling: the local
/// descriptor is only usable once gathering has reached its terminal
/// state, so the wait is bounded rather than open-ended.
pub const ICE_GATHER_TIMEOUT: Duration = Duration::from_secs(15);

/// Public STUN server used for server-reflexive candidates. Two peers on
/// the same LAN connect via host candidates even when this is unreachable.
pub const STUN_URL: &str = "stun:stun.l.google.com:19302";
