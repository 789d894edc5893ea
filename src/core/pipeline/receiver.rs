//! Inbound file reassembly.
//!
//! The wire protocol carries at most one inbound transfer at a time: a
//! `file-meta` envelope opens it, untagged binary chunks fill it, and
//! `file-end` finalizes it. Chunks carry no identifier, so there is
//! nothing to multiplex on — a new `file-meta` arriving before the
//! previous `file-end` abandons the old buffer entirely.
//!
//! The assembler is only ever touched from the single event-processing
//! context; exclusive ownership, not locking, is the correctness
//! mechanism here.

use bytes::Bytes;
use tracing::{debug, warn};

use crate::core::protocol::FileMeta;

/// Receiver-side accumulation state for the file currently in flight.
#[derive(Debug, Default)]
pub struct InFlightTransfer {
    /// Metadata from `file-meta`, or `None` for an anonymous transfer
    /// opened by a chunk that arrived before any metadata.
    meta: Option<FileMeta>,
    /// Chunks in arrival order. Individual sizes are irrelevant — the
    /// sender's chunking is receiver-transparent.
    buffers: Vec<Bytes>,
    received: u64,
}

/// A fully reassembled inbound file, ready to be saved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedFile {
    pub meta: FileMeta,
    pub bytes: Vec<u8>,
}

/// Reassembles the (single) inbound chunk stream into complete files.
#[derive(Debug, Default)]
pub struct InboundAssembler {
    current: Option<InFlightTransfer>,
}

impl InboundAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a new transfer. Any unfinished prior transfer is discarded —
    /// its buffered bytes must never leak into the new one.
    pub fn begin(&mut self, meta: FileMeta) {
        if let Some(prior) = self.current.take() {
            warn!(
                abandoned = prior.name(),
                buffered = prior.received,
                "new file-meta before file-end, dropping unfinished transfer"
            );
        }
        debug!(name = %meta.name, size = meta.size, "inbound transfer opened");
        self.current = Some(InFlightTransfer {
            meta: Some(meta),
            buffers: Vec::new(),
            received: 0,
        });
    }

    /// Append a chunk to the open transfer, returning `(received, expected)`
    /// byte counts for progress reporting.
    ///
    /// A chunk with no open transfer opens an anonymous zero-expected-size
    /// transfer rather than being dropped: metadata may have been lost or
    /// reordered, and the bytes are still recoverable at `file-end`.
    pub fn push_chunk(&mut self, chunk: Bytes) -> (u64, u64) {
        let transfer = self.current.get_or_insert_with(|| {
            warn!("chunk arrived before file-meta, buffering into anonymous transfer");
            InFlightTransfer::default()
        });
        transfer.received += chunk.len() as u64;
        transfer.buffers.push(chunk);
        let expected = transfer.meta.as_ref().map_or(0, |m| m.size);
        (transfer.received, expected)
    }

    /// Finalize the open transfer into a complete file. `file-end` with
    /// nothing open is ignored and returns `None`.
    pub fn finish(&mut self) -> Option<ReceivedFile> {
        let transfer = self.current.take()?;
        let mut bytes = Vec::with_capacity(transfer.received as usize);
        for buf in &transfer.buffers {
            bytes.extend_from_slice(buf);
        }
        let meta = transfer.meta.unwrap_or(FileMeta {
            name: "received.bin".into(),
            size: bytes.len() as u64,
            mime: String::new(),
        });
        debug!(name = %meta.name, bytes = bytes.len(), "inbound transfer complete");
        Some(ReceivedFile { meta, bytes })
    }

    /// Whether a transfer is currently open (its `file-end` not yet seen).
    pub fn in_flight(&self) -> bool {
        self.current.is_some()
    }

    /// Metadata of the open transfer, if it was announced.
    pub fn current_meta(&self) -> Option<&FileMeta> {
        self.current.as_ref().and_then(|t| t.meta.as_ref())
    }
}

impl InFlightTransfer {
    fn name(&self) -> &str {
        self.meta.as_ref().map_or("<anonymous>", |m| m.name.as_str())
    }
}
