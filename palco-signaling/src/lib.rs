pub mod broker;
pub mod client;
pub mod error;
pub mod media;
pub mod sdp;

pub use broker::{BrokerState, SignalingBroker};
pub use client::{SignalResponse, SignalingClient};
pub use error::{Result, SignalingError};
pub use media::{broadcast_tracks, LocalMedia, MediaDevices};
pub use sdp::sanitize_answer;
