//! pastelink: serverless peer-to-peer chat, file transfer, and live media
//! between two devices on the same network, over a WebRTC data channel.
//!
//! There is no signaling server. Each side's negotiation descriptor is
//! encoded as a copy-paste blob the users exchange manually; once the
//! connection is up, a single ordered reliable data channel carries JSON
//! chat/control envelopes and raw binary file chunks.

pub mod core;
pub mod utils;

pub use crate::core::error::SessionError;
pub use crate::core::session::{ConnectionState, Role, Session, SessionEvent};
