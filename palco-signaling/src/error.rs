use thiserror::Error;

#[derive(Error, Debug)]
pub enum SignalingError {
    #[error("Media device error: {0}")]
    Media(String),

    #[error("Signaling endpoint returned code {code}")]
    Endpoint { code: i32 },

    #[error("Signaling transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Negotiation error: {0}")]
    Negotiation(String),

    #[error("Negotiation failed after {attempts} attempts")]
    RetryExhausted { attempts: u32 },

    #[error("Stopped")]
    Stopped,
}

impl From<webrtc::Error> for SignalingError {
    fn from(err: webrtc::Error) -> Self {
        Self::Negotiation(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SignalingError>;
