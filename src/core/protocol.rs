//! Wire protocol codec for the data channel.
//!
//! Two frame representations share the channel:
//!
//! - **Text frames** carry a JSON envelope with a `t` tag:
//!   `{"t":"chat","text":...}`, `{"t":"file-meta","meta":{...}}`,
//!   `{"t":"file-end"}`.
//! - **Binary frames** carry raw file chunk bytes with no envelope at all.
//!
//! The receiver disambiguates by frame representation, not by tag: binary
//! is always a chunk, text is parsed as an envelope. This asymmetric
//! framing avoids base64-inflating bulk data inside JSON, at the cost of
//! allowing only one file transfer in flight (a bare chunk carries no
//! identifier linking it to a file).
//!
//! Text that fails envelope parsing degrades to a literal chat message.
//! A peer speaking plain text must not crash the session.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::error::SessionError;

/// A raw frame as the transport delivers or accepts it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Binary(Bytes),
}

/// Metadata announcing a file, sent before its chunk stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMeta {
    pub name: String,
    /// Size in bytes.
    pub size: u64,
    /// MIME type, empty when unknown.
    #[serde(rename = "type")]
    pub mime: String,
}

/// A typed message travelling over the data channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireMessage {
    Chat(String),
    FileMeta(FileMeta),
    FileChunk(Bytes),
    FileEnd,
}

/// The tagged-text envelope. `FileChunk` deliberately has no variant here:
/// chunks travel as untagged binary frames.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "kebab-case")]
enum Envelope {
    Chat { text: String },
    FileMeta { meta: FileMeta },
    FileEnd,
}

/// Encode a message into the frame the transport should send.
pub fn encode_message(msg: &WireMessage) -> Result<Frame, SessionError> {
    let envelope = match msg {
        WireMessage::FileChunk(bytes) => return Ok(Frame::Binary(bytes.clone())),
        WireMessage::Chat(text) => Envelope::Chat { text: text.clone() },
        WireMessage::FileMeta(meta) => Envelope::FileMeta { meta: meta.clone() },
        WireMessage::FileEnd => Envelope::FileEnd,
    };
    Ok(Frame::Text(serde_json::to_string(&envelope)?))
}

/// Decode an inbound frame. Infallible: binary frames are unconditionally
/// chunks, and unparsable text is displayed as-is rather than failing the
/// session.
pub fn decode_frame(frame: Frame) -> WireMessage {
    match frame {
        Frame::Binary(bytes) => WireMessage::FileChunk(bytes),
        Frame::Text(text) => match serde_json::from_str::<Envelope>(&text) {
            Ok(Envelope::Chat { text }) => WireMessage::Chat(text),
            Ok(Envelope::FileMeta { meta }) => WireMessage::FileMeta(meta),
            Ok(Envelope::FileEnd) => WireMessage::FileEnd,
            Err(err) => {
                debug!(%err, "text frame is not an envelope, treating as chat");
                WireMessage::Chat(text)
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_uses_expected_tag() {
        let frame = encode_message(&WireMessage::Chat("hi".into())).unwrap();
        match frame {
            Frame::Text(json) => {
                let v: serde_json::Value = serde_json::from_str(&json).unwrap();
                assert_eq!(v["t"], "chat");
                assert_eq!(v["text"], "hi");
            }
            Frame::Binary(_) => panic!("chat must be a text frame"),
        }
    }

    #[test]
    fn file_meta_round_trips_with_type_field() {
        let meta = FileMeta {
            name: "report.pdf".into(),
            size: 12345,
            mime: "application/pdf".into(),
        };
        let frame = encode_message(&WireMessage::FileMeta(meta.clone())).unwrap();
        let Frame::Text(json) = &frame else {
            panic!("meta must be a text frame");
        };
        let v: serde_json::Value = serde_json::from_str(json).unwrap();
        assert_eq!(v["t"], "file-meta");
        assert_eq!(v["meta"]["type"], "application/pdf");

        assert_eq!(decode_frame(frame), WireMessage::FileMeta(meta));
    }

    #[test]
    fn file_end_round_trips() {
        let frame = encode_message(&WireMessage::FileEnd).unwrap();
        assert_eq!(decode_frame(frame), WireMessage::FileEnd);
    }

    #[test]
    fn chunk_is_raw_binary() {
        let bytes = Bytes::from_static(b"\x00\x01\x02");
        let frame = encode_message(&WireMessage::FileChunk(bytes.clone())).unwrap();
        assert_eq!(frame, Frame::Binary(bytes.clone()));
        assert_eq!(decode_frame(frame), WireMessage::FileChunk(bytes));
    }

    #[test]
    fn bare_text_degrades_to_chat() {
        assert_eq!(
            decode_frame(Frame::Text("hello".into())),
            WireMessage::Chat("hello".into())
        );
    }

    #[test]
    fn unknown_tag_degrades_to_chat() {
        let text = r#"{"t":"presence","who":"bob"}"#;
        assert_eq!(
            decode_frame(Frame::Text(text.into())),
            WireMessage::Chat(text.into())
        );
    }

    #[test]
    fn any_binary_is_a_chunk() {
        // Even bytes that happen to be valid envelope JSON.
        let bytes = Bytes::from_static(br#"{"t":"file-end"}"#);
        assert_eq!(
            decode_frame(Frame::Binary(bytes.clone())),
            WireMessage::FileChunk(bytes)
        );
    }
}
