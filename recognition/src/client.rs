//! HTTP client for the FR Core face-recognition API.

use std::time::Duration;

use reqwest::multipart::{Form, Part};
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use lifecert_utils::body_preview;

use crate::content_type::detect_content_type;
use crate::port::{BindRequest, BoundFace, Recognition, RecognitionClient, RecognizeRequest};
use crate::RecognitionError;

/// Default timeout for a whole request.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default connection timeout.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// File name sent when the caller gives none.
const DEFAULT_IMAGE_NAME: &str = "selfie.jpg";

const API_KEY_HEADER: &str = "X-API-Key";
const TENANT_HEADER: &str = "X-Tenant-ID";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FrCoreConfig {
    #[serde(default)]
    pub base_url: String,
    #[serde(default)]
    pub upload_api_key: String,
    #[serde(default)]
    pub recognize_api_key: String,
    /// Sent as `X-Tenant-ID` when non-empty.
    #[serde(default)]
    pub tenant_id: String,
    /// Whole-request timeout; `0` means the 10 second default.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT.as_secs()
}

impl Default for FrCoreConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            upload_api_key: String::new(),
            recognize_api_key: String::new(),
            tenant_id: String::new(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Client for the FR Core recognition engine.
///
/// `POST {base}/upload` binds a face to a label, `POST {base}/recognize`
/// finds the best match. Both take a multipart form with an `image` part and
/// answer with a `{status, message, data}` JSON envelope.
pub struct FrCoreClient {
    http_client: reqwest::Client,
    upload_url: Url,
    recognize_url: Url,
    upload_api_key: String,
    recognize_api_key: String,
    tenant_id: String,
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    status: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    data: Option<T>,
}

#[derive(Debug, Default, Deserialize)]
struct UploadData {
    #[serde(default)]
    id: String,
    #[serde(default)]
    label: String,
    #[serde(default)]
    image_path: String,
    #[serde(default)]
    external_ref: String,
}

#[derive(Debug, Default, Deserialize)]
struct RecognizeData {
    #[serde(default)]
    label: String,
    #[serde(default)]
    similarity: f64,
    #[serde(default)]
    distance: Option<f64>,
}

impl FrCoreClient {
    pub fn new(config: &FrCoreConfig) -> Result<Self, RecognitionError> {
        let base = config.base_url.trim();
        if base.is_empty() {
            return Err(RecognitionError::InvalidRequest(
                "base URL is required".to_string(),
            ));
        }
        let base = Url::parse(base).map_err(|e| {
            RecognitionError::InvalidRequest(format!("invalid base URL '{base}': {e}"))
        })?;
        let timeout = match config.timeout_secs {
            0 => DEFAULT_TIMEOUT,
            secs => Duration::from_secs(secs),
        };
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT.min(timeout))
            .build()
            .map_err(|e| RecognitionError::Transport(format!("failed to build client: {e}")))?;

        Ok(Self {
            http_client,
            upload_url: endpoint(&base, "upload")?,
            recognize_url: endpoint(&base, "recognize")?,
            upload_api_key: config.upload_api_key.clone(),
            recognize_api_key: config.recognize_api_key.clone(),
            tenant_id: config.tenant_id.trim().to_string(),
        })
    }

    pub fn upload_url(&self) -> &Url {
        &self.upload_url
    }

    pub fn recognize_url(&self) -> &Url {
        &self.recognize_url
    }

    /// Send one multipart POST and unwrap the response envelope.
    async fn post<T>(
        &self,
        url: &Url,
        api_key: &str,
        form: Form,
        payload_bytes: usize,
    ) -> Result<T, RecognitionError>
    where
        T: DeserializeOwned + Default,
    {
        let mut request = self.http_client.post(url.clone()).multipart(form);
        if !api_key.is_empty() {
            request = request.header(API_KEY_HEADER, api_key);
        }
        if !self.tenant_id.is_empty() {
            request = request.header(TENANT_HEADER, &self.tenant_id);
        }

        tracing::debug!(
            method = "POST",
            url = %url,
            tenant = %self.tenant_id,
            payload_bytes,
            "frcore request"
        );

        let response = request.send().await.map_err(|e| {
            tracing::warn!(url = %url, error = %e, "frcore request failed");
            RecognitionError::from(e)
        })?;
        let status = response.status();
        let body = response.bytes().await?;
        let preview = body_preview(&body);
        tracing::debug!(url = %url, status = status.as_u16(), body = %preview, "frcore response");

        if status.as_u16() >= 400 {
            tracing::warn!(url = %url, status = status.as_u16(), "frcore returned an error status");
            return Err(RecognitionError::Status {
                code: status.as_u16(),
                body: preview,
            });
        }

        let envelope: Envelope<T> = serde_json::from_slice(&body)
            .map_err(|e| RecognitionError::Decode(e.to_string()))?;
        if !envelope.status.eq_ignore_ascii_case("success") {
            tracing::warn!(url = %url, status = %envelope.status, message = %envelope.message, "frcore rejected request");
            return Err(RecognitionError::Rejected(envelope.message));
        }
        Ok(envelope.data.unwrap_or_default())
    }
}

impl RecognitionClient for FrCoreClient {
    async fn bind(&self, request: BindRequest<'_>) -> Result<BoundFace, RecognitionError> {
        let image = image_part(request.image, request.image_name)?;
        let mut form = Form::new().text("label", request.label.to_string());
        if !request.external_ref.trim().is_empty() {
            form = form.text("external_ref", request.external_ref.to_string());
        }
        let form = form.part("image", image);

        let data: UploadData = self
            .post(&self.upload_url, &self.upload_api_key, form, request.image.len())
            .await?;
        Ok(BoundFace {
            id: data.id,
            label: data.label,
            external_ref: data.external_ref,
            image_path: data.image_path,
        })
    }

    async fn recognize(&self, request: RecognizeRequest<'_>) -> Result<Recognition, RecognitionError> {
        let image = image_part(request.image, request.image_name)?;
        let form = Form::new().part("image", image);

        let data: RecognizeData = self
            .post(&self.recognize_url, &self.recognize_api_key, form, request.image.len())
            .await?;
        Ok(Recognition {
            label: data.label,
            similarity: data.similarity,
            distance: data.distance,
        })
    }
}

/// `{base}/{name}`, keeping any path prefix already on the base URL.
fn endpoint(base: &Url, name: &str) -> Result<Url, RecognitionError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| {
            RecognitionError::InvalidRequest(format!("base URL '{base}' cannot have a path"))
        })?
        .pop_if_empty()
        .push(name);
    Ok(url)
}

fn image_part(image: &[u8], image_name: &str) -> Result<Part, RecognitionError> {
    if image.is_empty() {
        return Err(RecognitionError::InvalidRequest(
            "image payload is empty".to_string(),
        ));
    }
    let name = match image_name.trim() {
        "" => DEFAULT_IMAGE_NAME,
        name => name,
    };
    Part::bytes(image.to_vec())
        .file_name(name.to_string())
        .mime_str(detect_content_type(image, name))
        .map_err(|e| RecognitionError::InvalidRequest(format!("bad content type: {e}")))
}
