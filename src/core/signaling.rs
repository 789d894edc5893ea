//! Signaling codec: descriptors as copy-paste text blobs.
//!
//! There is no signaling server. Each side's negotiation descriptor is
//! serialized to a single-line string that the users copy and paste
//! themselves (chat, e-mail, over the shoulder). The blob must therefore
//! be self-contained: candidate gathering runs to completion before a
//! descriptor is encoded, so every reachable network path is embedded in
//! the SDP.
//!
//! Format: JSON `{"kind":"offer"|"answer","sdp":"..."}`, base64-armored
//! so the blob survives whitespace-mangling paste targets intact.

use crate::core::error::SessionError;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};

/// Which side of the handshake produced a descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DescriptorKind {
    Offer,
    Answer,
}

/// A complete negotiation descriptor, immutable after creation.
///
/// The SDP embeds the gathered candidate list; a descriptor encoded
/// before gathering finished would be unusable on the remote side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Descriptor {
    pub kind: DescriptorKind,
    pub sdp: String,
}

/// Encode a descriptor into a single-line copy-paste blob.
pub fn encode(desc: &Descriptor) -> Result<String, SessionError> {
    let json = serde_json::to_string(desc)?;
    Ok(BASE64.encode(json))
}

/// Decode a pasted blob back into a descriptor.
///
/// Surrounding whitespace is tolerated (terminals love trailing
/// newlines). Anything else that is not a valid blob fails with
/// [`SessionError::MalformedDescriptor`] — never a panic.
pub fn decode(text: &str) -> Result<Descriptor, SessionError> {
    let raw = BASE64
        .decode(text.trim())
        .map_err(|e| SessionError::MalformedDescriptor(format!("invalid base64: {e}")))?;
    let json = String::from_utf8(raw)
        .map_err(|e| SessionError::MalformedDescriptor(format!("invalid utf-8: {e}")))?;
    serde_json::from_str(&json)
        .map_err(|e| SessionError::MalformedDescriptor(format!("invalid descriptor: {e}")))
}
