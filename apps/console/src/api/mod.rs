pub mod retry;

use std::sync::Arc;

use anyhow::Context;
use reqwest::{header, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

use crate::config::AppConfig;
use crate::models::{
    AnomalyResultsPage, DateRange, Detector, DetectorActionResult, DetectorListPage,
    EntityAnomalySummaries, EntitySummaryPayload, Monitor, MonitorSearchPayload, NameMatch,
};
use crate::query::GetDetectorsQueryParams;

use self::retry::is_retryable_status;

pub type ClientResult<T> = Result<T, ClientError>;

#[derive(Clone)]
pub struct AdClient {
    inner: reqwest::Client,
    config: Arc<AppConfig>,
    base_url: String,
}

impl AdClient {
    pub fn new(config: AppConfig) -> ClientResult<Self> {
        let timeout = config.request_timeout;
        let base_url = normalize_base_url(&config.api_base_url);

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build reqwest client")
            .map_err(ClientError::internal)?;

        Ok(Self {
            inner: client,
            config: Arc::new(config),
            base_url,
        })
    }

    pub fn config(&self) -> Arc<AppConfig> {
        Arc::clone(&self.config)
    }

    pub async fn list_detectors(
        &self,
        params: &GetDetectorsQueryParams,
    ) -> ClientResult<DetectorListPage> {
        self.read(|| self.request(Method::GET, "detectors").query(params))
            .await
    }

    pub async fn get_detector(&self, detector_id: &str) -> ClientResult<Detector> {
        let path = format!("detectors/{detector_id}");
        self.read(|| self.request(Method::GET, &path)).await
    }

    pub async fn create_detector(&self, detector: &Detector) -> ClientResult<Detector> {
        let builder = self.request(Method::POST, "detectors").json(detector);
        self.send(builder).await?.into_response()
    }

    pub async fn update_detector(
        &self,
        detector_id: &str,
        detector: &Detector,
    ) -> ClientResult<Detector> {
        let path = format!("detectors/{detector_id}");
        let builder = self.request(Method::PUT, &path).json(detector);
        self.send(builder).await?.into_response()
    }

    pub async fn start_detector(&self, detector_id: &str) -> ClientResult<DetectorActionResult> {
        self.detector_action(Method::POST, &format!("detectors/{detector_id}/start"))
            .await
    }

    pub async fn stop_detector(&self, detector_id: &str) -> ClientResult<DetectorActionResult> {
        self.detector_action(Method::POST, &format!("detectors/{detector_id}/stop"))
            .await
    }

    pub async fn delete_detector(&self, detector_id: &str) -> ClientResult<DetectorActionResult> {
        self.detector_action(Method::DELETE, &format!("detectors/{detector_id}"))
            .await
    }

    pub async fn detector_name_exists(&self, name: &str) -> ClientResult<bool> {
        let matched: NameMatch = self
            .read(|| {
                self.request(Method::GET, "detectors/_match")
                    .query(&[("name", name)])
            })
            .await?;
        Ok(matched.matched || matched.count > 0)
    }

    pub async fn search_monitors(&self, detector_ids: &[String]) -> ClientResult<Vec<Monitor>> {
        if detector_ids.is_empty() {
            return Ok(Vec::new());
        }
        let body = json!({ "detectorIds": detector_ids });
        let payload: MonitorSearchPayload = self
            .read(|| self.request(Method::POST, "monitors/_search").json(&body))
            .await?;
        Ok(payload.monitors)
    }

    pub async fn get_entity_summaries(
        &self,
        detector_id: &str,
        range: DateRange,
        top_n: usize,
    ) -> ClientResult<Vec<EntityAnomalySummaries>> {
        let path = format!("detectors/{detector_id}/results/_entity_summary");
        let body = json!({
            "startTime": range.start_ms,
            "endTime": range.end_ms,
            "size": top_n,
        });
        let payload: EntitySummaryPayload = self
            .read(|| self.request(Method::POST, &path).json(&body))
            .await?;
        Ok(payload.entities)
    }

    pub async fn get_anomaly_results(
        &self,
        detector_id: &str,
        range: DateRange,
    ) -> ClientResult<AnomalyResultsPage> {
        let path = format!("detectors/{detector_id}/results");
        let query = [("startTime", range.start_ms), ("endTime", range.end_ms)];
        self.read(|| self.request(Method::GET, &path).query(&query))
            .await
    }

    async fn detector_action(
        &self,
        method: Method,
        path: &str,
    ) -> ClientResult<DetectorActionResult> {
        let envelope = self.send::<DetectorActionResult>(self.request(method, path)).await?;
        Ok(envelope.response.unwrap_or_default())
    }

    /// Idempotent request under the configured retry policy. `build` is
    /// called once per attempt since a sent builder is consumed.
    async fn read<T, B>(&self, build: B) -> ClientResult<T>
    where
        T: DeserializeOwned,
        B: Fn() -> reqwest::RequestBuilder,
    {
        let build = &build;
        self.config
            .retry
            .run(move || async move { self.send::<T>(build()).await?.into_response() })
            .await
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = self.join_path(path);
        let mut builder = self.inner.request(method, url);

        if let Some(token) = self.config.bearer_token() {
            builder = builder.header(header::AUTHORIZATION, token);
        }

        builder
    }

    fn join_path(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn send<T>(&self, builder: reqwest::RequestBuilder) -> ClientResult<ApiEnvelope<T>>
    where
        T: DeserializeOwned,
    {
        let response = builder.send().await.map_err(ClientError::from)?;
        let status = response.status();
        let bytes = response.bytes().await.map_err(ClientError::from)?;
        decode_envelope(status, &bytes)
    }
}

fn normalize_base_url(input: &str) -> String {
    input.trim_end_matches('/').to_string()
}

fn decode_envelope<T: DeserializeOwned>(
    status: StatusCode,
    bytes: &[u8],
) -> ClientResult<ApiEnvelope<T>> {
    if bytes.is_empty() {
        return if status.is_success() {
            Err(ClientError::EmptyResponse(status))
        } else {
            Err(ClientError::UnexpectedStatus {
                status,
                body: Vec::new(),
            })
        };
    }

    let envelope: ApiEnvelope<T> = match serde_json::from_slice(bytes) {
        Ok(envelope) => envelope,
        Err(_) if !status.is_success() => {
            return Err(ClientError::UnexpectedStatus {
                status,
                body: bytes.to_vec(),
            })
        }
        Err(err) => return Err(ClientError::Decode(err)),
    };

    if status.is_success() && envelope.ok {
        Ok(envelope)
    } else if let Some(message) = envelope.error.clone() {
        Err(ClientError::Api {
            message,
            status: Some(status),
        })
    } else {
        Err(ClientError::UnexpectedStatus {
            status,
            body: bytes.to_vec(),
        })
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(bound(deserialize = "T: DeserializeOwned"))]
pub struct ApiEnvelope<T> {
    pub ok: bool,
    #[serde(default)]
    pub response: Option<T>,
    #[serde(default)]
    pub error: Option<String>,
}

impl<T> ApiEnvelope<T> {
    pub fn into_response(self) -> ClientResult<T> {
        self.response.ok_or(ClientError::MissingPayload)
    }
}

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("{message}")]
    Api {
        message: String,
        status: Option<StatusCode>,
    },
    #[error("empty response body: {0}")]
    EmptyResponse(StatusCode),
    #[error("response carried no payload")]
    MissingPayload,
    #[error("unexpected status {status}: {body:?}")]
    UnexpectedStatus { status: StatusCode, body: Vec<u8> },
    #[error("client error: {0}")]
    Internal(String),
}

impl ClientError {
    fn internal(err: anyhow::Error) -> Self {
        Self::Internal(format!("{err:#}"))
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Api { status, .. } => *status,
            Self::EmptyResponse(status) => Some(*status),
            Self::UnexpectedStatus { status, .. } => Some(*status),
            Self::Transport(err) => err.status(),
            _ => None,
        }
    }

    /// Transport failures and gateway/throttling statuses.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(err) => err.status().map_or(true, is_retryable_status),
            other => other.status().is_some_and(is_retryable_status),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DetectorState;

    #[test]
    fn decodes_successful_envelope() {
        let body = br#"{"ok":true,"response":{"detectorList":[{"id":"d1","name":"cpu","curState":"RUNNING"}],"totalDetectors":1}}"#;
        let page: DetectorListPage = decode_envelope(StatusCode::OK, body)
            .unwrap()
            .into_response()
            .unwrap();
        assert_eq!(page.total_detectors, 1);
        assert_eq!(page.detector_list[0].cur_state, DetectorState::Running);
    }

    #[test]
    fn api_error_carries_message_and_status() {
        let body = br#"{"ok":false,"error":"Detector not found"}"#;
        let err = decode_envelope::<Detector>(StatusCode::NOT_FOUND, body).unwrap_err();
        assert_eq!(err.to_string(), "Detector not found");
        assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));
        assert!(!err.is_retryable());
    }

    #[test]
    fn non_json_gateway_error_is_retryable() {
        let err =
            decode_envelope::<Detector>(StatusCode::BAD_GATEWAY, b"<html>bad gateway</html>")
                .unwrap_err();
        assert!(matches!(err, ClientError::UnexpectedStatus { .. }));
        assert!(err.is_retryable());
    }

    #[test]
    fn decodes_payloads_without_a_default() {
        #[derive(Debug, Deserialize)]
        struct Ack {
            acknowledged: bool,
        }

        let body = br#"{"ok":true,"response":{"acknowledged":true}}"#;
        let envelope = decode_envelope::<Ack>(StatusCode::OK, body).unwrap();
        assert!(envelope.into_response().unwrap().acknowledged);
    }

    #[test]
    fn empty_and_payloadless_responses() {
        let err = decode_envelope::<Detector>(StatusCode::OK, b"").unwrap_err();
        assert!(matches!(err, ClientError::EmptyResponse(StatusCode::OK)));

        let envelope = decode_envelope::<Detector>(StatusCode::OK, br#"{"ok":true}"#).unwrap();
        assert!(matches!(envelope.into_response(), Err(ClientError::MissingPayload)));

        let err = decode_envelope::<Detector>(StatusCode::OK, b"{").unwrap_err();
        assert!(matches!(err, ClientError::Decode(_)));
    }

    #[test]
    fn base_url_is_normalized() {
        assert_eq!(normalize_base_url("http://host/api/"), "http://host/api");
        let client = AdClient::new(AppConfig {
            api_base_url: "http://host/api//".into(),
            ..AppConfig::default()
        })
        .unwrap();
        assert_eq!(client.join_path("/detectors/d1"), "http://host/api/detectors/d1");
    }
}
