//! Core: signaling, session lifecycle, wire protocol, transfer pipeline.

pub mod chat;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod protocol;
pub mod session;
pub mod signaling;
pub mod transport;
