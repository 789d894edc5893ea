//! WebRTC-backed transport adapter.
//!
//! Wraps a webrtc-rs `RTCPeerConnection` with a single ordered, reliable
//! data channel and forwards every callback-driven notification (connection
//! state, channel open/close, inbound frames, remote media tracks) onto the
//! event channel the session consumes. All protocol logic lives above this
//! layer; nothing here interprets frame contents.

use std::sync::{Arc, Mutex};

use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;
use tracing::{debug, info, warn};
use webrtc::api::APIBuilder;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::data_channel::RTCDataChannel;
use webrtc::data_channel::data_channel_init::RTCDataChannelInit;
use webrtc::data_channel::data_channel_message::DataChannelMessage;
use webrtc::ice_transport::ice_gatherer_state::RTCIceGathererState;
use webrtc::ice_transport::ice_gathering_state::RTCIceGatheringState;
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::sdp_type::RTCSdpType;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;

use super::{FrameSender, Transport, TransportEvent, TransportState};
use crate::core::config::{ICE_GATHER_TIMEOUT, STUN_URL};
use crate::core::error::SessionError;
use crate::core::protocol::Frame;
use crate::core::signaling::{Descriptor, DescriptorKind};

type ChannelSlot = Arc<Mutex<Option<Arc<RTCDataChannel>>>>;

/// Production transport over a webrtc-rs peer connection.
pub struct WebRtcTransport {
    pc: Arc<RTCPeerConnection>,
    channel: ChannelSlot,
    events: mpsc::UnboundedSender<TransportEvent>,
}

/// Cloneable frame sink backed by the open data channel.
#[derive(Clone)]
pub struct ChannelSender {
    dc: Arc<RTCDataChannel>,
}

impl FrameSender for ChannelSender {
    fn send(
        &self,
        frame: Frame,
    ) -> impl std::future::Future<Output = Result<(), SessionError>> + Send {
        let dc = self.dc.clone();
        async move {
            let result = match frame {
                Frame::Text(text) => dc.send_text(text).await,
                Frame::Binary(bytes) => dc.send(&bytes).await,
            };
            result
                .map(|_| ())
                .map_err(|e| SessionError::Transport(e.to_string()))
        }
    }
}

impl WebRtcTransport {
    /// Build a peer connection and return it with its event stream.
    pub async fn new()
    -> Result<(Self, mpsc::UnboundedReceiver<TransportEvent>), SessionError> {
        let mut media = MediaEngine::default();
        media
            .register_default_codecs()
            .map_err(|e| SessionError::Negotiation(e.to_string()))?;
        let registry = register_default_interceptors(Registry::new(), &mut media)
            .map_err(|e| SessionError::Negotiation(e.to_string()))?;
        let api = APIBuilder::new()
            .with_media_engine(media)
            .with_interceptor_registry(registry)
            .build();

        let pc = Arc::new(
            api.new_peer_connection(RTCConfiguration {
                ice_servers: vec![RTCIceServer {
                    urls: vec![STUN_URL.into()],
                    ..Default::default()
                }],
                ..Default::default()
            })
            .await
            .map_err(|e| SessionError::Negotiation(e.to_string()))?,
        );

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let channel: ChannelSlot = Arc::new(Mutex::new(None));

        {
            let tx = event_tx.clone();
            pc.on_peer_connection_state_change(Box::new(move |state| {
                let tx = tx.clone();
                Box::pin(async move {
                    let mapped = match state {
                        RTCPeerConnectionState::New => Some(TransportState::New),
                        RTCPeerConnectionState::Connecting => Some(TransportState::Connecting),
                        RTCPeerConnectionState::Connected => {
                            info!(event = "webrtc_connected", "peer connection established");
                            Some(TransportState::Connected)
                        }
                        RTCPeerConnectionState::Disconnected => {
                            warn!(event = "webrtc_disconnected", "peer connection dropped");
                            Some(TransportState::Disconnected)
                        }
                        RTCPeerConnectionState::Failed => {
                            warn!(event = "webrtc_failed", "peer connection failed");
                            Some(TransportState::Failed)
                        }
                        RTCPeerConnectionState::Closed => Some(TransportState::Closed),
                        _ => None,
                    };
                    if let Some(state) = mapped {
                        let _ = tx.send(TransportEvent::StateChanged(state));
                    }
                })
            }));
        }

        // Responder side: the channel arrives announced in the remote offer.
        {
            let tx = event_tx.clone();
            let slot = channel.clone();
            pc.on_data_channel(Box::new(move |dc| {
                let tx = tx.clone();
                let slot = slot.clone();
                Box::pin(async move {
                    debug!(label = dc.label(), "remote data channel announced");
                    attach_channel(&dc, &tx);
                    if let Ok(mut slot) = slot.lock() {
                        *slot = Some(dc);
                    }
                })
            }));
        }

        {
            let tx = event_tx.clone();
            pc.on_track(Box::new(move |track, _receiver, _transceiver| {
                let tx = tx.clone();
                Box::pin(async move {
                    let kind = track.kind().to_string();
                    info!(%kind, "remote media track added");
                    let _ = tx.send(TransportEvent::TrackAdded { kind });
                })
            }));
        }

        Ok((
            Self {
                pc,
                channel,
                events: event_tx,
            },
            event_rx,
        ))
    }

    async fn local_descriptor(&self) -> Result<Descriptor, SessionError> {
        let desc = self.pc.local_description().await.ok_or_else(|| {
            SessionError::Negotiation("no local description after gathering".into())
        })?;
        let kind = match desc.sdp_type {
            RTCSdpType::Offer => DescriptorKind::Offer,
            RTCSdpType::Answer => DescriptorKind::Answer,
            other => {
                return Err(SessionError::Negotiation(format!(
                    "unexpected local description type: {other}"
                )));
            }
        };
        Ok(Descriptor {
            kind,
            sdp: desc.sdp,
        })
    }
}

/// Wire a data channel's callbacks onto the event stream.
fn attach_channel(dc: &Arc<RTCDataChannel>, events: &mpsc::UnboundedSender<TransportEvent>) {
    {
        let tx = events.clone();
        dc.on_open(Box::new(move || {
            let tx = tx.clone();
            Box::pin(async move {
                let _ = tx.send(TransportEvent::ChannelOpened);
            })
        }));
    }
    {
        let tx = events.clone();
        dc.on_close(Box::new(move || {
            let tx = tx.clone();
            Box::pin(async move {
                let _ = tx.send(TransportEvent::ChannelClosed);
            })
        }));
    }
    {
        let tx = events.clone();
        dc.on_message(Box::new(move |msg: DataChannelMessage| {
            let tx = tx.clone();
            Box::pin(async move {
                // Representation, not a tag, disambiguates chunks from
                // envelopes: string frames are text, everything else is
                // a raw chunk.
                let frame = if msg.is_string {
                    Frame::Text(String::from_utf8_lossy(&msg.data).into_owned())
                } else {
                    Frame::Binary(msg.data)
                };
                let _ = tx.send(TransportEvent::Frame(frame));
            })
        }));
    }
}

impl Transport for WebRtcTransport {
    type Sender = ChannelSender;

    async fn create_channel(&mut self, label: &str) -> Result<(), SessionError> {
        // Explicit ordered + fully reliable (SCTP default, no partial
        // reliability). The whole protocol leans on in-order delivery.
        let dc = self
            .pc
            .create_data_channel(
                label,
                Some(RTCDataChannelInit {
                    ordered: Some(true),
                    ..Default::default()
                }),
            )
            .await
            .map_err(|e| SessionError::Negotiation(e.to_string()))?;
        attach_channel(&dc, &self.events);
        if let Ok(mut slot) = self.channel.lock() {
            *slot = Some(dc);
        }
        Ok(())
    }

    async fn generate_offer(&mut self) -> Result<Descriptor, SessionError> {
        let offer = self
            .pc
            .create_offer(None)
            .await
            .map_err(|e| SessionError::Negotiation(e.to_string()))?;
        Ok(Descriptor {
            kind: DescriptorKind::Offer,
            sdp: offer.sdp,
        })
    }

    async fn generate_answer(&mut self) -> Result<Descriptor, SessionError> {
        let answer = self
            .pc
            .create_answer(None)
            .await
            .map_err(|e| SessionError::Negotiation(e.to_string()))?;
        Ok(Descriptor {
            kind: DescriptorKind::Answer,
            sdp: answer.sdp,
        })
    }

    async fn set_local_descriptor(&mut self, desc: &Descriptor) -> Result<(), SessionError> {
        let desc = to_rtc(desc).map_err(|e| SessionError::Negotiation(e.to_string()))?;
        self.pc
            .set_local_description(desc)
            .await
            .map_err(|e| SessionError::Negotiation(e.to_string()))
    }

    async fn set_remote_descriptor(&mut self, desc: &Descriptor) -> Result<(), SessionError> {
        let desc = to_rtc(desc).map_err(|e| SessionError::Apply(e.to_string()))?;
        self.pc
            .set_remote_description(desc)
            .await
            .map_err(|e| SessionError::Apply(e.to_string()))
    }

    async fn await_gathering_complete(&mut self) -> Result<Descriptor, SessionError> {
        if self.pc.ice_gathering_state() == RTCIceGatheringState::Complete {
            return self.local_descriptor().await;
        }

        let (tx, rx) = oneshot::channel::<()>();
        let tx = Arc::new(Mutex::new(Some(tx)));
        self.pc
            .on_ice_gathering_state_change(Box::new(move |state| {
                let tx = tx.clone();
                Box::pin(async move {
                    if state == RTCIceGathererState::Complete {
                        if let Ok(mut guard) = tx.lock() {
                            if let Some(tx) = guard.take() {
                                let _ = tx.send(());
                            }
                        }
                    }
                })
            }));

        // Gathering may have finished between the first check and handler
        // registration; re-check so we never wait on a missed edge.
        if self.pc.ice_gathering_state() != RTCIceGatheringState::Complete {
            timeout(ICE_GATHER_TIMEOUT, rx)
                .await
                .map_err(|_| SessionError::Negotiation("candidate gathering timed out".into()))?
                .map_err(|_| {
                    SessionError::Negotiation("candidate gathering was interrupted".into())
                })?;
        }

        self.local_descriptor().await
    }

    fn frame_sender(&self) -> Result<Self::Sender, SessionError> {
        let guard = self
            .channel
            .lock()
            .map_err(|_| SessionError::Transport("channel slot poisoned".into()))?;
        guard
            .as_ref()
            .map(|dc| ChannelSender { dc: dc.clone() })
            .ok_or_else(|| SessionError::Transport("data channel not created".into()))
    }

    async fn close(&mut self) {
        if let Err(err) = self.pc.close().await {
            warn!(%err, "error closing peer connection");
        }
    }
}

/// Rebuild the webrtc-rs session description from an opaque descriptor.
fn to_rtc(desc: &Descriptor) -> Result<RTCSessionDescription, webrtc::Error> {
    match desc.kind {
        DescriptorKind::Offer => RTCSessionDescription::offer(desc.sdp.clone()),
        DescriptorKind::Answer => RTCSessionDescription::answer(desc.sdp.clone()),
    }
}
