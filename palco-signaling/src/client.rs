//! HTTP client for the media server's signaling endpoint.
//!
//! The contract is a single request/response exchange per direction:
//! `POST /signaling/publish` and `POST /signaling/play` take a complete SDP
//! offer and return `{code, sdpAnswer, sessionId}`; `DELETE /signaling/stop`
//! tears the remote session down. `code == 0` is success; nothing else
//! about the body is guaranteed on failure.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{Result, SignalingError};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SignalRequest<'a> {
    stream_url: &'a str,
    sdp_offer: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StopRequest<'a> {
    stream_url: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalResponse {
    pub code: i32,
    #[serde(default)]
    pub sdp_answer: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SignalingClient {
    http: reqwest::Client,
    base_url: String,
}

impl SignalingClient {
    pub fn new(base_url: impl Into<String>, request_timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub async fn publish(&self, stream_url: &str, sdp_offer: &str) -> Result<SignalResponse> {
        self.exchange("publish", stream_url, sdp_offer).await
    }

    pub async fn play(&self, stream_url: &str, sdp_offer: &str) -> Result<SignalResponse> {
        self.exchange("play", stream_url, sdp_offer).await
    }

    /// Ask the media server to drop the remote session.
    pub async fn stop(&self, stream_url: &str) -> Result<()> {
        let response = self
            .http
            .delete(format!("{}/signaling/stop", self.base_url))
            .json(&StopRequest { stream_url })
            .send()
            .await?
            .error_for_status()?;

        let body: SignalResponse = response.json().await?;
        if body.code != 0 {
            return Err(SignalingError::Endpoint { code: body.code });
        }
        Ok(())
    }

    async fn exchange(
        &self,
        operation: &str,
        stream_url: &str,
        sdp_offer: &str,
    ) -> Result<SignalResponse> {
        let response = self
            .http
            .post(format!("{}/signaling/{operation}", self.base_url))
            .json(&SignalRequest {
                stream_url,
                sdp_offer,
            })
            .send()
            .await?
            .error_for_status()?;

        let body: SignalResponse = response.json().await?;
        if body.code != 0 {
            return Err(SignalingError::Endpoint { code: body.code });
        }
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> SignalingClient {
        SignalingClient::new(server.uri(), Duration::from_secs(2)).expect("client")
    }

    #[tokio::test]
    async fn test_publish_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/signaling/publish"))
            .and(body_partial_json(serde_json::json!({
                "streamUrl": "rtmp://media/live/abc"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "code": 0,
                "sdpAnswer": "v=0\r\n",
                "sessionId": "sess-1"
            })))
            .mount(&server)
            .await;

        let response = client(&server)
            .publish("rtmp://media/live/abc", "v=0\r\n")
            .await
            .expect("publish");
        assert_eq!(response.session_id.as_deref(), Some("sess-1"));
        assert_eq!(response.sdp_answer.as_deref(), Some("v=0\r\n"));
    }

    #[tokio::test]
    async fn test_non_zero_code_is_endpoint_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/signaling/play"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "code": 7 })),
            )
            .mount(&server)
            .await;

        let result = client(&server).play("rtmp://media/live/abc", "v=0\r\n").await;
        assert!(matches!(
            result,
            Err(SignalingError::Endpoint { code: 7 })
        ));
    }

    #[tokio::test]
    async fn test_stop_success() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/signaling/stop"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "code": 0 })),
            )
            .mount(&server)
            .await;

        client(&server)
            .stop("rtmp://media/live/abc")
            .await
            .expect("stop");
    }

    #[tokio::test]
    async fn test_http_failure_propagates() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/signaling/publish"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let result = client(&server).publish("url", "sdp").await;
        assert!(matches!(result, Err(SignalingError::Http(_))));
    }
}
