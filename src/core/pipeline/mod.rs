//! Transfer pipeline: outbound chunked sending and inbound reassembly.
//!
//! The protocol is fire-and-forget at the chunk level — no per-chunk
//! acknowledgements, hashes, or retries. The ordered reliable data channel
//! is the delivery guarantee; this layer only slices and concatenates.

pub mod receiver;
pub mod sender;
