use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::{multipart, Client};
use shared::{domain::ImageRef, protocol::PredictResponse};
use tracing::{debug, warn};
use url::Url;

use crate::orchestrator::AnalysisUpload;

/// Seam between the session controller and the inference service. Production
/// code talks HTTP through [`HttpInferenceClient`]; tests substitute stubs.
#[async_trait]
pub trait InferenceBackend: Send + Sync {
    /// Issues one inference request. The error's display text is exactly what
    /// the user sees: a non-2xx response body verbatim (status line when the
    /// body is empty), or the transport error as reported.
    async fn predict(&self, upload: &AnalysisUpload) -> Result<PredictResponse>;

    /// Resolves an annotated-image reference to raw encoded image bytes.
    /// Data URIs decode locally; anything else is fetched relative to the
    /// server base.
    async fn fetch_image(&self, image: &ImageRef) -> Result<Vec<u8>>;
}

#[derive(Debug, Clone)]
pub struct HttpInferenceClient {
    http: Client,
    base_url: Url,
}

impl HttpInferenceClient {
    pub fn new(http: Client, base_url: Url) -> Self {
        Self { http, base_url }
    }

    pub fn from_base_url(base_url: &str) -> Result<Self> {
        let base_url =
            Url::parse(base_url).with_context(|| format!("invalid server URL: {base_url}"))?;
        Ok(Self::new(Client::new(), base_url))
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }
}

#[async_trait]
impl InferenceBackend for HttpInferenceClient {
    async fn predict(&self, upload: &AnalysisUpload) -> Result<PredictResponse> {
        let endpoint = self.base_url.join("/api/predict")?;
        let part = multipart::Part::bytes(upload.bytes.clone())
            .file_name(upload.filename.clone())
            .mime_str(upload.kind.mime_type())?;
        let form = multipart::Form::new().part("image", part);

        debug!(
            %endpoint,
            file = %upload.filename,
            size_bytes = upload.bytes.len(),
            "posting analysis request"
        );
        let response = self.http.post(endpoint).multipart(form).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%status, "inference request rejected");
            if body.trim().is_empty() {
                return Err(anyhow!("{status}"));
            }
            return Err(anyhow!(body));
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|error| anyhow!("invalid inference response: {error}"))
    }

    async fn fetch_image(&self, image: &ImageRef) -> Result<Vec<u8>> {
        if let Some((_, payload)) = image.data_uri_parts() {
            return STANDARD
                .decode(payload)
                .context("invalid base64 payload in annotated image data URI");
        }
        if image.is_data_uri() {
            return Err(anyhow!("unsupported data URI encoding in annotated image"));
        }

        let target = match Url::parse(image.as_str()) {
            Ok(url) => url,
            Err(_) => self.base_url.join(image.as_str())?,
        };
        debug!(%target, "fetching annotated image");
        let response = self.http.get(target).send().await?.error_for_status()?;
        Ok(response.bytes().await?.to_vec())
    }
}

#[cfg(test)]
#[path = "tests/transport_tests.rs"]
mod tests;
