/// Remote quantum randomness service
///
/// The ANU QRNG JSON API is queried as
/// `GET <endpoint>?length=<n>&type=uint8` and answers with
/// `{"success": true, "data": [0..255, ...]}`.

#[cfg(any(test, feature = "network"))]
use serde::Deserialize;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use thiserror::Error;

/// Why a remote fetch produced no bytes. Never leaves `EntropySource`:
/// every variant is logged, counted and answered with local randomness.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("request timed out")]
    Timeout,
    #[error("transport error: {0}")]
    Transport(String),
    #[error("invalid QRNG response: {0}")]
    InvalidResponse(&'static str),
}

pub type FetchFuture<'a> = Pin<Box<dyn Future<Output = Result<Vec<u8>, FetchError>> + Send + 'a>>;

/// Source of remote random bytes consumed by `EntropySource`.
pub trait EntropyFetcher: Send + Sync {
    /// Fetch up to `length` bytes, giving up after `timeout`.
    fn fetch(&self, length: usize, timeout: Duration) -> FetchFuture<'_>;

    /// Human-readable origin, used in log lines.
    fn describe(&self) -> String;
}

#[cfg(any(test, feature = "network"))]
#[derive(Debug, Deserialize)]
struct QrngResponse {
    success: bool,
    #[serde(default)]
    data: Vec<u8>,
}

/// Validate a decoded response body and trim it to the requested length.
#[cfg(any(test, feature = "network"))]
fn accept_response(response: QrngResponse, length: usize) -> Result<Vec<u8>, FetchError> {
    if !response.success {
        return Err(FetchError::InvalidResponse("success flag not set"));
    }
    if response.data.is_empty() {
        return Err(FetchError::InvalidResponse("empty data"));
    }
    let mut data = response.data;
    data.truncate(length);
    Ok(data)
}

/// Parse a raw JSON body. Values outside `0..=255` are rejected by serde.
#[cfg(test)]
fn parse_response(body: &str, length: usize) -> Result<Vec<u8>, FetchError> {
    let response: QrngResponse = serde_json::from_str(body)
        .map_err(|_| FetchError::InvalidResponse("malformed JSON"))?;
    accept_response(response, length)
}

/// `reqwest`-backed client for the QRNG HTTP API
#[cfg(feature = "network")]
#[derive(Clone)]
pub struct QrngClient {
    client: reqwest::Client,
    endpoint: String,
}

#[cfg(feature = "network")]
impl QrngClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }

    async fn get(&self, length: usize, timeout: Duration) -> Result<Vec<u8>, FetchError> {
        let request = self
            .client
            .get(&self.endpoint)
            .query(&[("length", length.to_string()), ("type", "uint8".to_string())])
            .timeout(timeout);

        let response = request
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(map_reqwest_error)?;

        let body: QrngResponse = response.json().await.map_err(map_reqwest_error)?;
        accept_response(body, length)
    }
}

#[cfg(feature = "network")]
fn map_reqwest_error(e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout
    } else if e.is_decode() {
        FetchError::InvalidResponse("undecodable body")
    } else {
        FetchError::Transport(e.to_string())
    }
}

#[cfg(feature = "network")]
impl EntropyFetcher for QrngClient {
    fn fetch(&self, length: usize, timeout: Duration) -> FetchFuture<'_> {
        Box::pin(self.get(length, timeout))
    }

    fn describe(&self) -> String {
        self.endpoint.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_response() {
        let body = r#"{"type":"uint8","length":4,"data":[0,17,128,255],"success":true}"#;
        assert_eq!(parse_response(body, 4).unwrap(), vec![0, 17, 128, 255]);
    }

    #[test]
    fn test_parse_truncates_to_requested_length() {
        let body = r#"{"data":[1,2,3,4,5],"success":true}"#;
        assert_eq!(parse_response(body, 3).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_parse_rejects_unsuccessful_response() {
        let body = r#"{"data":[1,2,3],"success":false}"#;
        assert_eq!(
            parse_response(body, 3),
            Err(FetchError::InvalidResponse("success flag not set"))
        );
    }

    #[test]
    fn test_parse_rejects_out_of_range_values() {
        let body = r#"{"data":[1,256,3],"success":true}"#;
        assert!(parse_response(body, 3).is_err());
    }

    #[test]
    fn test_parse_rejects_empty_or_missing_data() {
        assert!(parse_response(r#"{"success":true}"#, 3).is_err());
        assert!(parse_response(r#"{"success":true,"data":[]}"#, 3).is_err());
        assert!(parse_response("not json", 3).is_err());
    }
}
