//! Transport abstraction consumed by the session state machine.
//!
//! The session never touches ICE, DTLS, or SCTP directly: it drives a
//! [`Transport`] through the handshake and reacts to the [`TransportEvent`]
//! stream the transport emits on an unbounded channel. That channel is the
//! single place where callback-driven connectivity notifications become a
//! plain event sequence consumed by one dispatch loop, which keeps ordering
//! and error propagation explicit.
//!
//! The production implementation lives in [`webrtc`]; tests drive the
//! session with an in-memory fake.

pub mod webrtc;

use std::future::Future;

use crate::core::error::SessionError;
use crate::core::protocol::Frame;
use crate::core::signaling::Descriptor;

/// Connectivity state as reported by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    New,
    Connecting,
    Connected,
    Disconnected,
    Failed,
    Closed,
}

/// Events emitted by a transport on its event channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    StateChanged(TransportState),
    /// The data channel is open for traffic.
    ChannelOpened,
    ChannelClosed,
    /// An inbound frame from the data channel.
    Frame(Frame),
    /// The peer attached a live media track (video, screen share, audio).
    /// Playback is the embedder's concern; the core only announces it.
    TrackAdded { kind: String },
}

/// Cloneable handle for pushing frames to the open data channel.
///
/// Separate from [`Transport`] so a spawned file-send task can hold a
/// sender while the session keeps exclusive ownership of the transport.
pub trait FrameSender: Clone + Send + Sync + 'static {
    fn send(&self, frame: Frame) -> impl Future<Output = Result<(), SessionError>> + Send;
}

/// The connectivity engine, exclusively owned by the session.
///
/// Handshake call order on the initiator: [`create_channel`] (the channel
/// intent must be embedded in the offer), [`generate_offer`],
/// [`set_local_descriptor`], [`await_gathering_complete`]. The responder
/// swaps offer generation for [`set_remote_descriptor`] +
/// [`generate_answer`].
///
/// [`create_channel`]: Transport::create_channel
/// [`generate_offer`]: Transport::generate_offer
/// [`set_local_descriptor`]: Transport::set_local_descriptor
/// [`await_gathering_complete`]: Transport::await_gathering_complete
/// [`set_remote_descriptor`]: Transport::set_remote_descriptor
/// [`generate_answer`]: Transport::generate_answer
pub trait Transport {
    type Sender: FrameSender;

    /// Create the local data channel. Initiator-side only; the responder
    /// receives the channel announced in the remote offer.
    fn create_channel(
        &mut self,
        label: &str,
    ) -> impl Future<Output = Result<(), SessionError>> + Send;

    fn generate_offer(&mut self) -> impl Future<Output = Result<Descriptor, SessionError>> + Send;

    fn generate_answer(&mut self) -> impl Future<Output = Result<Descriptor, SessionError>> + Send;

    fn set_local_descriptor(
        &mut self,
        desc: &Descriptor,
    ) -> impl Future<Output = Result<(), SessionError>> + Send;

    fn set_remote_descriptor(
        &mut self,
        desc: &Descriptor,
    ) -> impl Future<Output = Result<(), SessionError>> + Send;

    /// Wait (bounded) for candidate gathering to reach its terminal state
    /// and return the completed local descriptor. Encoding a descriptor
    /// before this resolves would produce an incomplete blob the remote
    /// side can never connect with.
    fn await_gathering_complete(
        &mut self,
    ) -> impl Future<Output = Result<Descriptor, SessionError>> + Send;

    /// Handle for sending frames. Fails until the data channel exists.
    fn frame_sender(&self) -> Result<Self::Sender, SessionError>;

    /// Tear down the connection. Invalidates all in-flight state; the only
    /// way back is a fresh session from `New`.
    fn close(&mut self) -> impl Future<Output = ()> + Send;
}
