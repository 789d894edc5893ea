//! Session state machine: manual offer/answer handshake and lifecycle.
//!
//! One [`Session`] owns one transport, one chat log, and one inbound
//! assembler — there is no process-wide singleton. The handshake has two
//! roles: the initiator creates the data channel, generates the offer blob,
//! and later applies the pasted answer; the responder applies the pasted
//! offer and generates the answer blob. Connection state moves only on
//! transport events, never on UI actions.
//!
//! ```text
//!   New ──start_as_initiator/accept_remote_offer──► Negotiating
//!   Negotiating ──transport connected──► Connected
//!   Negotiating ──transport failed──► Failed
//!   Connected ──transport disconnected──► Disconnected
//! ```
//!
//! No transition is retried automatically: after `Failed` or
//! `Disconnected`, recovery is a fresh session from `New`.
//!
//! All mutation happens in the single event-processing context that calls
//! into this type; each inbound event is fully applied before the next one
//! is taken, so exclusive ownership stands in for locking.

use std::path::PathBuf;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::core::chat::{ChatLog, ChatMessage};
use crate::core::config::{DATA_CHANNEL_LABEL, PROGRESS_CHUNK_INTERVAL};
use crate::core::error::SessionError;
use crate::core::pipeline::receiver::{InboundAssembler, ReceivedFile};
use crate::core::pipeline::sender;
use crate::core::protocol::{self, WireMessage};
use crate::core::signaling::{self, DescriptorKind};
use crate::core::transport::{FrameSender, Transport, TransportEvent, TransportState};

/// Which side of the handshake this session plays. Fixed once set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Initiator,
    Responder,
}

/// Lifecycle state of the session. Written only by transport events and
/// the handshake operations themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    New,
    Negotiating,
    Connected,
    Disconnected,
    Failed,
}

/// Direction of a file transfer, for progress reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Inbound,
    Outbound,
}

/// Notifications the session emits for the UI layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    StateChanged(ConnectionState),
    /// A message (local echo or remote) was appended to the chat log.
    ChatAppended(ChatMessage),
    /// An inbound file finished reassembling and is ready to save.
    FileReceived(ReceivedFile),
    /// The peer attached a live media track.
    TrackAdded { kind: String },
    TransferProgress {
        name: String,
        direction: Direction,
        transferred: u64,
        /// Announced total in bytes; 0 when unknown (anonymous transfer).
        total: u64,
    },
    /// An outbound transfer aborted before completion (unreadable file,
    /// file changed under us, channel send failure).
    TransferFailed { name: String, reason: String },
}

/// A peer session: transport, handshake state, chat log, transfer state.
pub struct Session<T: Transport> {
    transport: T,
    role: Option<Role>,
    state: ConnectionState,
    chat: ChatLog,
    assembler: InboundAssembler,
    inbound_chunks: u64,
    events: mpsc::UnboundedSender<SessionEvent>,
}

impl<T: Transport> Session<T> {
    pub fn new(transport: T, events: mpsc::UnboundedSender<SessionEvent>) -> Self {
        Self {
            transport,
            role: None,
            state: ConnectionState::New,
            chat: ChatLog::new(),
            assembler: InboundAssembler::new(),
            inbound_chunks: 0,
            events,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn role(&self) -> Option<Role> {
        self.role
    }

    pub fn chat(&self) -> &ChatLog {
        &self.chat
    }

    // ── Handshake operations ─────────────────────────────────────────────

    /// Begin the handshake as the offering side and return the encoded
    /// offer blob for the user to copy.
    ///
    /// The data channel is created before the offer: the channel intent
    /// must be embedded in the descriptor, or the responder would never
    /// see a channel announced. The blob is only encoded after candidate
    /// gathering completes — a partial descriptor is unusable in a
    /// copy-paste workflow.
    ///
    /// Every step here mutates the peer connection, so a failure part-way
    /// through (say, a gathering timeout after the channel was created)
    /// leaves the transport in an unusable half-configured state. The
    /// session moves to `Failed` rather than allowing a retry that would
    /// create a second data channel on the same connection.
    pub async fn start_as_initiator(&mut self) -> Result<String, SessionError> {
        self.expect_state(ConnectionState::New, "start_as_initiator")?;

        match self.initiator_handshake().await {
            Ok(blob) => {
                self.role = Some(Role::Initiator);
                self.set_state(ConnectionState::Negotiating);
                Ok(blob)
            }
            Err(err) => {
                self.set_state(ConnectionState::Failed);
                Err(err)
            }
        }
    }

    async fn initiator_handshake(&mut self) -> Result<String, SessionError> {
        self.transport.create_channel(DATA_CHANNEL_LABEL).await?;
        let offer = self.transport.generate_offer().await?;
        self.transport.set_local_descriptor(&offer).await?;
        let complete = self.transport.await_gathering_complete().await?;
        signaling::encode(&complete)
    }

    /// Apply the answer blob pasted by the user. Initiator side, only
    /// while negotiating.
    pub async fn apply_remote_answer(&mut self, text: &str) -> Result<(), SessionError> {
        self.expect_state(ConnectionState::Negotiating, "apply_remote_answer")?;
        if self.role != Some(Role::Initiator) {
            return Err(SessionError::InvalidTransition {
                op: "apply_remote_answer",
                state: self.state,
            });
        }

        let desc = signaling::decode(text)?;
        if desc.kind != DescriptorKind::Answer {
            return Err(SessionError::Apply("expected an answer".into()));
        }
        self.transport.set_remote_descriptor(&desc).await
    }

    /// Accept an offer blob pasted by the user and return the encoded
    /// answer blob to send back. Responder side, from `New` only.
    pub async fn accept_remote_offer(&mut self, text: &str) -> Result<String, SessionError> {
        self.expect_state(ConnectionState::New, "accept_remote_offer")?;

        let desc = signaling::decode(text)?;
        if desc.kind != DescriptorKind::Offer {
            return Err(SessionError::Apply("expected an offer".into()));
        }
        self.transport.set_remote_descriptor(&desc).await?;
        let answer = self.transport.generate_answer().await?;
        self.transport.set_local_descriptor(&answer).await?;
        let complete = self.transport.await_gathering_complete().await?;

        self.role = Some(Role::Responder);
        self.set_state(ConnectionState::Negotiating);
        signaling::encode(&complete)
    }

    /// Tear the transport down. In-flight transfers are lost; the only way
    /// forward is a fresh session.
    pub async fn close(&mut self) {
        self.transport.close().await;
        if self.is_active() {
            self.set_state(ConnectionState::Disconnected);
        }
    }

    // ── Outbound traffic ─────────────────────────────────────────────────

    /// Send a chat line. The local echo is appended to the log before the
    /// transport is involved: the local device is authoritative for its
    /// own messages regardless of delivery.
    pub async fn send_chat(&mut self, text: impl Into<String>) -> Result<(), SessionError> {
        self.expect_state(ConnectionState::Connected, "send_chat")?;
        let text = text.into();

        let msg = self.chat.append_local(text.clone());
        let _ = self.events.send(SessionEvent::ChatAppended(msg));

        let frame = protocol::encode_message(&WireMessage::Chat(text))?;
        self.transport.frame_sender()?.send(frame).await
    }

    /// Start sending a file on a background task so chunk pacing never
    /// blocks event processing. A failure on the task (unreadable file,
    /// channel send error) is reported as a [`SessionEvent::TransferFailed`]
    /// so it stays user-visible even though the caller is not awaiting the
    /// returned handle.
    pub fn send_file(
        &mut self,
        path: impl Into<PathBuf>,
    ) -> Result<JoinHandle<Result<(), SessionError>>, SessionError> {
        self.expect_state(ConnectionState::Connected, "send_file")?;
        let frame_sender = self.transport.frame_sender()?;
        let events = self.events.clone();
        let path = path.into();
        Ok(tokio::spawn(async move {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());
            let result = sender::send_file(frame_sender, &path, events.clone()).await;
            if let Err(err) = &result {
                warn!(%name, error = %err, "file send aborted");
                let _ = events.send(SessionEvent::TransferFailed {
                    name,
                    reason: err.to_string(),
                });
            }
            result
        }))
    }

    // ── Transport event dispatch ─────────────────────────────────────────

    /// Apply one transport event. Events must be fed in delivery order;
    /// each is fully applied before the caller takes the next.
    pub fn handle_transport_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::StateChanged(ts) => self.apply_transport_state(ts),
            TransportEvent::ChannelOpened => {
                info!("data channel open");
            }
            TransportEvent::ChannelClosed => {
                debug!("data channel closed");
            }
            TransportEvent::TrackAdded { kind } => {
                let _ = self.events.send(SessionEvent::TrackAdded { kind });
            }
            TransportEvent::Frame(frame) => self.dispatch_message(protocol::decode_frame(frame)),
        }
    }

    fn apply_transport_state(&mut self, ts: TransportState) {
        let next = match ts {
            TransportState::Connected if self.state == ConnectionState::Negotiating => {
                Some(ConnectionState::Connected)
            }
            TransportState::Failed if self.is_active() => Some(ConnectionState::Failed),
            TransportState::Disconnected | TransportState::Closed if self.is_active() => {
                Some(ConnectionState::Disconnected)
            }
            _ => None,
        };
        if let Some(state) = next {
            self.set_state(state);
        }
    }

    /// Route one decoded wire message: chat to the log, file signals to
    /// the assembler.
    fn dispatch_message(&mut self, msg: WireMessage) {
        match msg {
            WireMessage::Chat(text) => {
                let msg = self.chat.append_remote(text);
                let _ = self.events.send(SessionEvent::ChatAppended(msg));
            }
            WireMessage::FileMeta(meta) => {
                self.inbound_chunks = 0;
                self.assembler.begin(meta);
            }
            WireMessage::FileChunk(bytes) => {
                let (received, expected) = self.assembler.push_chunk(bytes);
                self.inbound_chunks += 1;
                let done = expected > 0 && received >= expected;
                if self.inbound_chunks % PROGRESS_CHUNK_INTERVAL == 0 || done {
                    if let Some(meta) = self.assembler.current_meta() {
                        let _ = self.events.send(SessionEvent::TransferProgress {
                            name: meta.name.clone(),
                            direction: Direction::Inbound,
                            transferred: received,
                            total: expected,
                        });
                    }
                }
            }
            WireMessage::FileEnd => {
                self.inbound_chunks = 0;
                if let Some(file) = self.assembler.finish() {
                    let _ = self.events.send(SessionEvent::FileReceived(file));
                }
            }
        }
    }

    // ── Internals ────────────────────────────────────────────────────────

    fn is_active(&self) -> bool {
        matches!(
            self.state,
            ConnectionState::Negotiating | ConnectionState::Connected
        )
    }

    fn expect_state(
        &self,
        expected: ConnectionState,
        op: &'static str,
    ) -> Result<(), SessionError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(SessionError::InvalidTransition {
                op,
                state: self.state,
            })
        }
    }

    fn set_state(&mut self, state: ConnectionState) {
        if self.state != state {
            info!(from = ?self.state, to = ?state, "session state change");
            self.state = state;
            let _ = self.events.send(SessionEvent::StateChanged(state));
        }
    }
}
