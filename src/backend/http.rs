use anyhow::{anyhow, bail, Context};
use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Jitter, Quota, RateLimiter};
use moka::future::Cache;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::types::{
    AnalysisResults, AnalyzeRequest, ApplyNormativeRequest, ChatbotMessageRequest, ChatbotReply,
    ChatbotStartRequest, ChatbotStartResponse, ChecklistRequest, ClassificationResult,
    ClassifyRequest, ExportPayload, FinalChecklist, FinalReport, NormativeApplication,
    ReportRequest, StartVerificationRequest, StartVerificationResponse, ValidatePayload,
};
use super::{BackendError, VerificationBackend};
use crate::config::BackendConfig;
use crate::draft::FileRef;

const EXPORT_CACHE_CAPACITY: u64 = 256;
const EXPORT_CACHE_TTL: Duration = Duration::from_secs(300);

/// Rate-limited JSON-over-HTTP binding of the verification API
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base: Url,
    rate_limiter: Arc<DefaultDirectRateLimiter>,
    export_cache: Cache<String, ExportPayload>,
}

impl HttpBackend {
    pub fn new(config: &BackendConfig) -> anyhow::Result<Self> {
        let rate = NonZeroU32::new(config.requests_per_second)
            .ok_or_else(|| anyhow!("backend.requests_per_second must be greater than zero"))?;
        let burst = NonZeroU32::new(config.burst)
            .ok_or_else(|| anyhow!("backend.burst must be greater than zero"))?;
        let rate_limiter = Arc::new(RateLimiter::direct(Quota::per_second(rate).allow_burst(burst)));

        let base = Url::parse(&config.base_url)
            .with_context(|| format!("invalid backend.base_url '{}'", config.base_url))?;
        if base.cannot_be_a_base() {
            bail!("backend.base_url '{}' cannot carry a path", config.base_url);
        }

        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .context("failed to build HTTP client")?;

        // Exports are reads keyed by job id; repeated downloads skip the network
        let export_cache = Cache::builder()
            .max_capacity(EXPORT_CACHE_CAPACITY)
            .time_to_live(EXPORT_CACHE_TTL)
            .build();

        Ok(Self {
            client,
            base,
            rate_limiter,
            export_cache,
        })
    }

    pub fn base_url(&self) -> &str {
        self.base.as_str().trim_end_matches('/')
    }

    /// Drop a cached export, e.g. after the checklist was regenerated.
    pub async fn invalidate_export(&self, job_id: &str) {
        self.export_cache.invalidate(job_id).await;
        debug!(job_id, "Invalidated cached export");
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url(), path)
    }

    /// Job ids are escaped as a single path segment.
    fn export_url(&self, job_id: &str) -> Result<Url, BackendError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| BackendError::network(format!("{} cannot carry a path", self.base)))?
            .pop_if_empty()
            .extend(["madrid", "final-checklist", job_id, "export-json"]);
        Ok(url)
    }

    async fn throttle(&self) {
        self.rate_limiter
            .until_ready_with_jitter(Jitter::up_to(Duration::from_millis(50)))
            .await;
    }

    async fn post_json<Req, Resp>(&self, path: &str, body: &Req) -> Result<Resp, BackendError>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        self.throttle().await;
        debug!(path, "POST");
        let response = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(classify_transport_error)?;
        decode_response(path, response).await
    }

    async fn file_part(file: &FileRef) -> Result<Part, BackendError> {
        let path = file.source.as_ref().ok_or_else(|| {
            BackendError::network(format!("no local source for upload '{}'", file.name))
        })?;
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            BackendError::network(format!("failed to read upload '{}': {e}", file.name))
        })?;
        Part::bytes(bytes)
            .file_name(file.name.clone())
            .mime_str(&file.mime_type)
            .map_err(|e| BackendError::network(format!("invalid mime type for '{}': {e}", file.name)))
    }
}

/// Split reqwest failures into transport problems and unreadable bodies.
fn classify_transport_error(error: reqwest::Error) -> BackendError {
    if error.is_decode() {
        BackendError::decode(error.to_string())
    } else {
        BackendError::network(error.to_string())
    }
}

async fn decode_response<Resp: DeserializeOwned>(
    path: &str,
    response: Response,
) -> Result<Resp, BackendError> {
    let status = response.status();
    let body = response.bytes().await.map_err(classify_transport_error)?;

    if !status.is_success() {
        let message = server_message(&body);
        warn!(path, status = status.as_u16(), %message, "Backend returned an error status");
        return Err(BackendError::Server {
            status: status.as_u16(),
            message,
        });
    }

    serde_json::from_slice(&body)
        .map_err(|e| BackendError::decode(format!("{path}: {e}")))
}

/// FastAPI-style `{"detail": ...}` bodies carry the useful message.
fn server_message(body: &[u8]) -> String {
    match serde_json::from_slice::<serde_json::Value>(body) {
        Ok(value) => match value.get("detail") {
            Some(serde_json::Value::String(detail)) => detail.clone(),
            Some(other) => other.to_string(),
            None => value.to_string(),
        },
        Err(_) => String::from_utf8_lossy(body).trim().to_string(),
    }
}

#[async_trait]
impl VerificationBackend for HttpBackend {
    async fn start_verification(
        &self,
        request: &StartVerificationRequest,
    ) -> Result<StartVerificationResponse, BackendError> {
        self.post_json("/verify", request).await
    }

    async fn classify_documents(
        &self,
        request: &ClassifyRequest,
    ) -> Result<ClassificationResult, BackendError> {
        let secondary_uses = serde_json::to_string(&request.project.secondary_uses)
            .map_err(|e| BackendError::decode(format!("failed to encode secondary uses: {e}")))?;

        let mut form = Form::new()
            .text("job_id", request.job_id.clone())
            .text(
                "is_existing_building",
                request.project.is_existing_building.to_string(),
            )
            .text(
                "primary_use",
                request
                    .project
                    .primary_use
                    .map(|u| u.as_str().to_string())
                    .unwrap_or_default(),
            )
            .text(
                "has_secondary_uses",
                request.project.has_secondary_uses.to_string(),
            )
            .text("secondary_uses", secondary_uses);

        for file in &request.memoria {
            form = form.part("memoria_files", Self::file_part(file).await?);
        }
        for file in &request.planos {
            form = form.part("plano_files", Self::file_part(file).await?);
        }

        self.throttle().await;
        let path = "/madrid/classification/classify-documents";
        info!(
            job_id = %request.job_id,
            memoria = request.memoria.len(),
            planos = request.planos.len(),
            "Uploading documents for classification"
        );
        let response = self
            .client
            .post(self.url(path))
            .multipart(form)
            .send()
            .await
            .map_err(classify_transport_error)?;
        decode_response(path, response).await
    }

    async fn apply_normative(
        &self,
        request: &ApplyNormativeRequest,
    ) -> Result<NormativeApplication, BackendError> {
        self.post_json("/madrid/normative/apply-normative", request)
            .await
    }

    async fn analyze_documents(
        &self,
        request: &AnalyzeRequest,
    ) -> Result<AnalysisResults, BackendError> {
        self.post_json("/api/madrid/analysis/analyze-documents", request)
            .await
    }

    async fn start_chatbot(
        &self,
        request: &ChatbotStartRequest,
    ) -> Result<ChatbotStartResponse, BackendError> {
        self.post_json("/madrid/chatbot/start", request).await
    }

    async fn send_chatbot_message(
        &self,
        request: &ChatbotMessageRequest,
    ) -> Result<ChatbotReply, BackendError> {
        self.post_json("/madrid/chatbot/message", request).await
    }

    async fn generate_checklist(
        &self,
        request: &ChecklistRequest,
    ) -> Result<FinalChecklist, BackendError> {
        let checklist = self
            .post_json("/madrid/final-checklist/generate-checklist", request)
            .await?;
        if let Some(job_id) = &request.project_data.project_id {
            self.invalidate_export(job_id).await;
        }
        Ok(checklist)
    }

    async fn generate_report(&self, request: &ReportRequest) -> Result<FinalReport, BackendError> {
        self.post_json("/madrid/final-checklist/generate-report", request)
            .await
    }

    async fn export_checklist(&self, job_id: &str) -> Result<ExportPayload, BackendError> {
        if let Some(cached) = self.export_cache.get(job_id).await {
            debug!(job_id, "Export cache hit");
            return Ok(cached);
        }

        let url = self.export_url(job_id)?;
        self.throttle().await;
        debug!(%url, "GET");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(classify_transport_error)?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("application/json")
            .to_string();
        let body = response.bytes().await.map_err(classify_transport_error)?;

        if !status.is_success() {
            return Err(BackendError::Server {
                status: status.as_u16(),
                message: server_message(&body),
            });
        }

        let payload = ExportPayload {
            job_id: job_id.to_string(),
            content_type,
            body: body.to_vec(),
        };
        // Invalid exports are left uncached so a retry reaches the server again
        if payload.validate().is_ok() {
            self.export_cache
                .insert(job_id.to_string(), payload.clone())
                .await;
        }
        Ok(payload)
    }
}
