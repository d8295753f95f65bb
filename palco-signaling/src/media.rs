//! Local media acquisition seam.
//!
//! Actual device capture (camera, microphone) is platform integration that
//! lives behind the `MediaDevices` trait; this layer only cares that
//! acquired tracks can be attached to a peer connection and that every
//! handle is released on every exit path. The release hook lets a device
//! implementation tie hardware teardown to the broker's cleanup.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use webrtc::api::media_engine::{MIME_TYPE_H264, MIME_TYPE_OPUS};
use webrtc::rtp_transceiver::rtp_codec::RTCRtpCodecCapability;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;
use webrtc::track::track_local::TrackLocal;

use crate::error::Result;

/// Camera + microphone track pair held for one broadcast.
#[derive(Clone)]
pub struct LocalMedia {
    audio: Arc<TrackLocalStaticSample>,
    video: Arc<TrackLocalStaticSample>,
    released: Arc<AtomicBool>,
    release_hook: Option<Arc<dyn Fn() + Send + Sync>>,
}

impl std::fmt::Debug for LocalMedia {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalMedia")
            .field("released", &self.is_released())
            .finish()
    }
}

impl LocalMedia {
    #[must_use]
    pub fn new(audio: Arc<TrackLocalStaticSample>, video: Arc<TrackLocalStaticSample>) -> Self {
        Self {
            audio,
            video,
            released: Arc::new(AtomicBool::new(false)),
            release_hook: None,
        }
    }

    /// Attach a hook invoked exactly once when the media is released.
    #[must_use]
    pub fn with_release_hook(mut self, hook: Arc<dyn Fn() + Send + Sync>) -> Self {
        self.release_hook = Some(hook);
        self
    }

    #[must_use]
    pub fn audio_track(&self) -> Arc<dyn TrackLocal + Send + Sync> {
        Arc::clone(&self.audio) as Arc<dyn TrackLocal + Send + Sync>
    }

    #[must_use]
    pub fn video_track(&self) -> Arc<dyn TrackLocal + Send + Sync> {
        Arc::clone(&self.video) as Arc<dyn TrackLocal + Send + Sync>
    }

    /// Release the underlying device handles. Idempotent.
    pub fn release(&self) {
        if !self.released.swap(true, Ordering::SeqCst) {
            if let Some(hook) = &self.release_hook {
                hook();
            }
        }
    }

    #[must_use]
    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }
}

/// Source of local capture tracks.
#[async_trait]
pub trait MediaDevices: Send + Sync {
    /// Open the camera and microphone and hand back their tracks.
    async fn acquire(&self) -> Result<LocalMedia>;
}

/// Build the standard Opus + H264 track pair used for a broadcast.
#[must_use]
pub fn broadcast_tracks() -> (Arc<TrackLocalStaticSample>, Arc<TrackLocalStaticSample>) {
    let audio = Arc::new(TrackLocalStaticSample::new(
        RTCRtpCodecCapability {
            mime_type: MIME_TYPE_OPUS.to_owned(),
            ..Default::default()
        },
        "audio".to_owned(),
        "palco-broadcast".to_owned(),
    ));
    let video = Arc::new(TrackLocalStaticSample::new(
        RTCRtpCodecCapability {
            mime_type: MIME_TYPE_H264.to_owned(),
            ..Default::default()
        },
        "video".to_owned(),
        "palco-broadcast".to_owned(),
    ));
    (audio, video)
}
