//! WebRTC negotiation broker.
//!
//! Drives the offer/answer handshake against the media server's signaling
//! endpoint for both directions: publish (attach local capture tracks) and
//! play (recv-only transceivers, inbound tracks collected as they arrive).
//!
//! The offer is sent complete: the broker waits, bounded, for ICE candidate
//! gathering to finish so the whole negotiation is one request/response
//! exchange instead of a trickle stream. A failed attempt restarts from
//! media acquisition with linear backoff up to the retry budget. `stop()`
//! is callable from any state, cancels both suspension points, and releases
//! every held resource on every exit path.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tokio::sync::Mutex as AsyncMutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::api::APIBuilder;
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::rtp_transceiver::rtp_codec::RTPCodecType;
use webrtc::rtp_transceiver::rtp_transceiver_direction::RTCRtpTransceiverDirection;
use webrtc::rtp_transceiver::RTCRtpTransceiverInit;
use webrtc::track::track_remote::TrackRemote;

use palco_core::config::SignalingConfig;

use crate::client::SignalingClient;
use crate::error::{Result, SignalingError};
use crate::media::{LocalMedia, MediaDevices};
use crate::sdp::sanitize_answer;

/// Negotiation lifecycle. There is no `Reconnecting`: a mid-connect failure
/// retries the whole flow, a post-connect failure requires a fresh start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrokerState {
    Idle,
    Connecting,
    Connected,
    Failed,
    Stopped,
}

impl BrokerState {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Failed => "failed",
            Self::Stopped => "stopped",
        }
    }
}

impl std::fmt::Display for BrokerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Publish,
    Play,
}

struct ActiveSession {
    pc: Arc<RTCPeerConnection>,
    media: Option<LocalMedia>,
    session_id: String,
    stream_url: String,
}

pub struct SignalingBroker {
    config: SignalingConfig,
    client: SignalingClient,
    devices: Arc<dyn MediaDevices>,
    state: RwLock<BrokerState>,
    active: AsyncMutex<Option<ActiveSession>>,
    cancel: Mutex<CancellationToken>,
    remote_tracks: Arc<Mutex<Vec<Arc<TrackRemote>>>>,
}

impl std::fmt::Debug for SignalingBroker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignalingBroker")
            .field("state", &self.state())
            .finish()
    }
}

impl SignalingBroker {
    pub fn new(config: SignalingConfig, devices: Arc<dyn MediaDevices>) -> Result<Self> {
        let client = SignalingClient::new(
            config.endpoint.clone(),
            Duration::from_millis(config.request_timeout_ms),
        )?;
        Ok(Self {
            config,
            client,
            devices,
            state: RwLock::new(BrokerState::Idle),
            active: AsyncMutex::new(None),
            cancel: Mutex::new(CancellationToken::new()),
            remote_tracks: Arc::new(Mutex::new(Vec::new())),
        })
    }

    #[must_use]
    pub fn state(&self) -> BrokerState {
        *self.state.read()
    }

    /// Inbound tracks collected so far in play mode, in arrival order.
    #[must_use]
    pub fn remote_tracks(&self) -> Vec<Arc<TrackRemote>> {
        self.remote_tracks.lock().clone()
    }

    /// Go live: acquire media, negotiate, return the media server's
    /// session id.
    pub async fn publish(&self, stream_url: &str) -> Result<String> {
        self.start(stream_url, Mode::Publish).await
    }

    /// Subscribe to a stream; inbound tracks surface via `remote_tracks`.
    pub async fn play(&self, stream_url: &str) -> Result<String> {
        self.start(stream_url, Mode::Play).await
    }

    async fn start(&self, stream_url: &str, mode: Mode) -> Result<String> {
        if self.active.lock().await.is_some() {
            return Err(SignalingError::Negotiation(
                "A session is already active; stop it first".to_string(),
            ));
        }

        let cancel = CancellationToken::new();
        *self.cancel.lock() = cancel.clone();
        *self.state.write() = BrokerState::Connecting;

        let budget = self.config.retry_budget.max(1);
        for attempt in 1..=budget {
            if cancel.is_cancelled() {
                *self.state.write() = BrokerState::Stopped;
                return Err(SignalingError::Stopped);
            }

            match self.attempt(stream_url, mode, &cancel).await {
                Ok(session) => {
                    let session_id = session.session_id.clone();
                    *self.active.lock().await = Some(session);
                    *self.state.write() = BrokerState::Connected;
                    info!(stream_url, session_id, attempt, "Negotiation completed");
                    return Ok(session_id);
                }
                Err(SignalingError::Stopped) => {
                    *self.state.write() = BrokerState::Stopped;
                    return Err(SignalingError::Stopped);
                }
                Err(e) => {
                    warn!(stream_url, attempt, budget, error = %e, "Negotiation attempt failed");
                    if attempt < budget {
                        let backoff =
                            Duration::from_millis(self.config.backoff_step_ms * u64::from(attempt));
                        tokio::select! {
                            () = cancel.cancelled() => {
                                *self.state.write() = BrokerState::Stopped;
                                return Err(SignalingError::Stopped);
                            }
                            () = tokio::time::sleep(backoff) => {}
                        }
                    }
                }
            }
        }

        *self.state.write() = BrokerState::Failed;
        Err(SignalingError::RetryExhausted { attempts: budget })
    }

    /// One full negotiation attempt. Owns its media and peer connection;
    /// both are torn down here if any step fails.
    async fn attempt(
        &self,
        stream_url: &str,
        mode: Mode,
        cancel: &CancellationToken,
    ) -> Result<ActiveSession> {
        let media = match mode {
            Mode::Publish => Some(self.devices.acquire().await?),
            Mode::Play => None,
        };

        let pc = match self.new_peer_connection().await {
            Ok(pc) => pc,
            Err(e) => {
                if let Some(media) = &media {
                    media.release();
                }
                return Err(e);
            }
        };

        match self
            .negotiate(&pc, media.as_ref(), mode, stream_url, cancel)
            .await
        {
            Ok(session_id) => Ok(ActiveSession {
                pc,
                media,
                session_id,
                stream_url: stream_url.to_string(),
            }),
            Err(e) => {
                if let Err(close_err) = pc.close().await {
                    warn!(error = %close_err, "Error closing peer connection after failed attempt");
                }
                if let Some(media) = &media {
                    media.release();
                }
                Err(e)
            }
        }
    }

    async fn negotiate(
        &self,
        pc: &Arc<RTCPeerConnection>,
        media: Option<&LocalMedia>,
        mode: Mode,
        stream_url: &str,
        cancel: &CancellationToken,
    ) -> Result<String> {
        match mode {
            Mode::Publish => {
                let media = media.ok_or_else(|| {
                    SignalingError::Media("Publish without local media".to_string())
                })?;
                pc.add_track(media.audio_track()).await?;
                pc.add_track(media.video_track()).await?;
            }
            Mode::Play => {
                for kind in [RTPCodecType::Audio, RTPCodecType::Video] {
                    pc.add_transceiver_from_kind(
                        kind,
                        Some(RTCRtpTransceiverInit {
                            direction: RTCRtpTransceiverDirection::Recvonly,
                            send_encodings: vec![],
                        }),
                    )
                    .await?;
                }

                let sink = Arc::clone(&self.remote_tracks);
                pc.on_track(Box::new(move |track, _receiver, _transceiver| {
                    let sink = Arc::clone(&sink);
                    Box::pin(async move {
                        debug!(kind = %track.kind(), ssrc = track.ssrc(), "Inbound track arrived");
                        sink.lock().push(track);
                    })
                }));
            }
        }

        let offer = pc.create_offer(None).await?;
        let mut gather_complete = pc.gathering_complete_promise().await;
        pc.set_local_description(offer).await?;

        // Wait for ICE gathering so the offer carries every local
        // candidate; the server contract is one exchange, no trickle.
        let gather_timeout = Duration::from_millis(self.config.ice_gathering_timeout_ms);
        tokio::select! {
            _ = gather_complete.recv() => {}
            () = tokio::time::sleep(gather_timeout) => {
                warn!(timeout_ms = self.config.ice_gathering_timeout_ms,
                    "ICE gathering incomplete at timeout; sending gathered candidates");
            }
            () = cancel.cancelled() => return Err(SignalingError::Stopped),
        }

        let local = pc.local_description().await.ok_or_else(|| {
            SignalingError::Negotiation("Local description missing after gathering".to_string())
        })?;

        let response = tokio::select! {
            r = async {
                match mode {
                    Mode::Publish => self.client.publish(stream_url, &local.sdp).await,
                    Mode::Play => self.client.play(stream_url, &local.sdp).await,
                }
            } => r?,
            () = cancel.cancelled() => return Err(SignalingError::Stopped),
        };

        let raw_answer = response.sdp_answer.ok_or_else(|| {
            SignalingError::Negotiation("Endpoint accepted but sent no SDP answer".to_string())
        })?;
        let answer = RTCSessionDescription::answer(sanitize_answer(&raw_answer))?;
        pc.set_remote_description(answer).await?;

        Ok(response.session_id.unwrap_or_default())
    }

    /// Tear everything down. Callable from any state, idempotent: cancels
    /// an in-flight attempt, notifies the endpoint, closes the connection
    /// and releases every held media track.
    pub async fn stop(&self) {
        self.cancel.lock().cancel();

        let session = self.active.lock().await.take();
        if let Some(session) = session {
            if let Err(e) = self.client.stop(&session.stream_url).await {
                warn!(stream_url = %session.stream_url, error = %e,
                    "Failed to notify signaling endpoint on stop");
            }
            if let Err(e) = session.pc.close().await {
                warn!(error = %e, "Error closing peer connection on stop");
            }
            if let Some(media) = &session.media {
                media.release();
            }
            info!(stream_url = %session.stream_url, "Session stopped");
        }

        self.remote_tracks.lock().clear();
        *self.state.write() = BrokerState::Stopped;
    }

    async fn new_peer_connection(&self) -> Result<Arc<RTCPeerConnection>> {
        let mut media_engine = MediaEngine::default();
        media_engine.register_default_codecs()?;

        let mut registry = Registry::new();
        registry = register_default_interceptors(registry, &mut media_engine)?;

        let api = APIBuilder::new()
            .with_media_engine(media_engine)
            .with_interceptor_registry(registry)
            .build();

        let mut ice_servers = Vec::new();
        if !self.config.stun_servers.is_empty() {
            ice_servers.push(RTCIceServer {
                urls: self.config.stun_servers.clone(),
                ..Default::default()
            });
        }
        for turn in &self.config.turn_servers {
            ice_servers.push(RTCIceServer {
                urls: turn.urls.clone(),
                username: turn.username.clone(),
                credential: turn.credential.clone(),
                ..Default::default()
            });
        }

        let rtc_config = RTCConfiguration {
            ice_servers,
            ..Default::default()
        };
        Ok(Arc::new(api.new_peer_connection(rtc_config).await?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::broadcast_tracks;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Counts open device handles; every acquire must be matched by a
    /// release for the count to return to zero.
    struct CountingDevices {
        open: Arc<AtomicUsize>,
    }

    impl CountingDevices {
        fn new() -> (Self, Arc<AtomicUsize>) {
            let open = Arc::new(AtomicUsize::new(0));
            (Self { open: Arc::clone(&open) }, open)
        }
    }

    #[async_trait]
    impl MediaDevices for CountingDevices {
        async fn acquire(&self) -> Result<LocalMedia> {
            self.open.fetch_add(1, Ordering::SeqCst);
            let (audio, video) = broadcast_tracks();
            let open = Arc::clone(&self.open);
            Ok(LocalMedia::new(audio, video).with_release_hook(Arc::new(move || {
                open.fetch_sub(1, Ordering::SeqCst);
            })))
        }
    }

    fn test_config(endpoint: String, retry_budget: u32) -> SignalingConfig {
        SignalingConfig {
            endpoint,
            stun_servers: Vec::new(),
            turn_servers: Vec::new(),
            retry_budget,
            backoff_step_ms: 10,
            ice_gathering_timeout_ms: 500,
            request_timeout_ms: 2_000,
        }
    }

    #[tokio::test]
    async fn test_publish_retry_exhaustion_releases_media() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/signaling/publish"))
            .respond_with(ResponseTemplate::new(500))
            .expect(3)
            .mount(&server)
            .await;

        let (devices, open) = CountingDevices::new();
        let broker = SignalingBroker::new(test_config(server.uri(), 3), Arc::new(devices))
            .expect("broker");

        let result = broker.publish("rtmp://media/live/abc").await;
        assert!(matches!(
            result,
            Err(SignalingError::RetryExhausted { attempts: 3 })
        ));
        assert_eq!(broker.state(), BrokerState::Failed);
        assert_eq!(open.load(Ordering::SeqCst), 0, "no open device handles");
    }

    #[tokio::test]
    async fn test_endpoint_rejection_counts_against_budget() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/signaling/publish"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "code": 2 })),
            )
            .expect(2)
            .mount(&server)
            .await;

        let (devices, open) = CountingDevices::new();
        let broker = SignalingBroker::new(test_config(server.uri(), 2), Arc::new(devices))
            .expect("broker");

        let result = broker.publish("rtmp://media/live/abc").await;
        assert!(matches!(
            result,
            Err(SignalingError::RetryExhausted { attempts: 2 })
        ));
        assert_eq!(open.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_play_failure_never_opens_devices() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/signaling/play"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let (devices, open) = CountingDevices::new();
        let broker = SignalingBroker::new(test_config(server.uri(), 1), Arc::new(devices))
            .expect("broker");

        let result = broker.play("rtmp://media/live/abc").await;
        assert!(matches!(result, Err(SignalingError::RetryExhausted { .. })));
        assert_eq!(broker.state(), BrokerState::Failed);
        assert_eq!(open.load(Ordering::SeqCst), 0);
        assert!(broker.remote_tracks().is_empty());
    }

    #[tokio::test]
    async fn test_stop_is_idempotent_from_any_state() {
        let (devices, _open) = CountingDevices::new();
        let broker = SignalingBroker::new(
            test_config("http://localhost:1".to_string(), 1),
            Arc::new(devices),
        )
        .expect("broker");

        assert_eq!(broker.state(), BrokerState::Idle);
        broker.stop().await;
        assert_eq!(broker.state(), BrokerState::Stopped);
        broker.stop().await;
        assert_eq!(broker.state(), BrokerState::Stopped);
    }

    #[tokio::test]
    async fn test_stop_cancels_inflight_negotiation() {
        let server = MockServer::start().await;
        // Long backoff keeps the publish loop alive until stop() lands.
        Mock::given(method("POST"))
            .and(path("/signaling/publish"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let (devices, open) = CountingDevices::new();
        let mut config = test_config(server.uri(), 3);
        config.backoff_step_ms = 10_000;
        let broker = Arc::new(
            SignalingBroker::new(config, Arc::new(devices)).expect("broker"),
        );

        let publisher = {
            let broker = Arc::clone(&broker);
            tokio::spawn(async move { broker.publish("rtmp://media/live/abc").await })
        };

        tokio::time::sleep(Duration::from_millis(1_500)).await;
        broker.stop().await;

        let result = publisher.await.expect("join");
        assert!(matches!(result, Err(SignalingError::Stopped)));
        assert_eq!(broker.state(), BrokerState::Stopped);
        assert_eq!(open.load(Ordering::SeqCst), 0);
    }
}
