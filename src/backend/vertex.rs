//! Vertex AI backend: Imagen for images, Veo for video

use async_trait::async_trait;
use reqwest::Client;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::base64;
use crate::backend::credentials::TokenProvider;
use crate::backend::polling::{poll_until, PollStatus, RetryPolicy};
use crate::backend::traits::{
    EditRequest, GeneratedImage, GeneratedVideo, ImageRequest, MediaBackend, VideoRequest,
};
use crate::backend::wire::{
    self, EditInstance, FetchOperationRequest, ImageInstance, ImageParameters, InlineMedia,
    OperationHandle, OperationState, OperationStatus, PredictRequest, PredictResponse,
    Predictions, ReferenceImage, VideoInstance, VideoOutcome, VideoParameters,
};
use crate::config::VertexConfig;
use crate::error::{AppError, Result};

/// Vertex AI prediction client
pub struct VertexBackend {
    client: Client,
    tokens: Arc<dyn TokenProvider>,
    base_url: String,
    project_id: String,
    location: String,
    image_model: String,
    edit_model: String,
    video_model: String,
    poll_policy: RetryPolicy,
}

impl VertexBackend {
    /// Create a new Vertex backend from configuration
    pub fn new(
        config: &VertexConfig,
        project_id: String,
        tokens: Arc<dyn TokenProvider>,
        poll_policy: RetryPolicy,
    ) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout_ms) = config.request_timeout_ms {
            builder = builder.timeout(Duration::from_millis(timeout_ms));
        }
        let client = builder
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            tokens,
            base_url: config.base_url(),
            project_id,
            location: config.location.clone(),
            image_model: config.image_model.clone(),
            edit_model: config.edit_model.clone(),
            video_model: config.video_model.clone(),
            poll_policy,
        })
    }

    fn model_url(&self, model: &str, method: &str) -> String {
        format!(
            "{}/projects/{}/locations/{}/publishers/google/models/{}:{}",
            self.base_url, self.project_id, self.location, model, method
        )
    }

    /// POST a JSON body and decode a JSON response, mapping failures to `Upstream`
    async fn post_json<B, R>(&self, url: &str, body: &B) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let token = self.tokens.access_token().await?;

        let response = self
            .client
            .post(url)
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Request to {} failed: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Upstream(format!(
                "Vertex AI returned {}: {}",
                status,
                wire::error_message(&body)
            )));
        }

        response
            .json::<R>()
            .await
            .map_err(|e| AppError::Upstream(format!("Failed to parse response: {}", e)))
    }

    async fn predict<B: Serialize>(&self, model: &str, body: &B) -> Result<Vec<GeneratedImage>> {
        let url = self.model_url(model, "predict");
        let response: PredictResponse = self.post_json(&url, body).await?;

        match response.decode()? {
            Predictions::Images(images) => {
                debug!(model = %model, count = images.len(), "Received predictions");
                Ok(images)
            }
            Predictions::Filtered(reasons) => Err(AppError::ContentFiltered(reasons.join("; "))),
            Predictions::Empty => Err(AppError::EmptyResult(format!(
                "{} returned no predictions",
                model
            ))),
        }
    }

    async fn start_video_operation(&self, request: &VideoRequest) -> Result<String> {
        let body = PredictRequest {
            instances: vec![VideoInstance {
                prompt: &request.prompt,
                image: InlineMedia {
                    bytes_base64_encoded: base64::encode(&request.base_image),
                    mime_type: Some(sniff_image_mime(&request.base_image).to_string()),
                },
            }],
            parameters: VideoParameters {
                aspect_ratio: &request.aspect_ratio,
                duration_seconds: request.duration_seconds,
                sample_count: 1,
                generate_audio: supports_audio(&self.video_model).then_some(true),
            },
        };

        let url = self.model_url(&self.video_model, "predictLongRunning");
        let handle: OperationHandle = self
            .post_json(&url, &body)
            .await
            .map_err(|e| match e {
                AppError::Upstream(message) => AppError::OperationStart(message),
                other => other,
            })?;

        handle
            .name
            .filter(|name| !name.is_empty())
            .ok_or_else(|| {
                AppError::OperationStart("response did not include an operation name".to_string())
            })
    }

    async fn poll_video_operation(&self, operation: &str) -> Result<PollStatus<GeneratedVideo>> {
        let url = self.model_url(&self.video_model, "fetchPredictOperation");
        let status: OperationStatus = self
            .post_json(&url, &FetchOperationRequest {
                operation_name: operation,
            })
            .await?;

        match status.decode()? {
            OperationState::Running => Ok(PollStatus::Pending),
            OperationState::Failed { code, message } => Err(AppError::GenerationFailed(format!(
                "code {}: {}",
                code, message
            ))),
            OperationState::Finished(VideoOutcome::Inline(video)) => Ok(PollStatus::Ready(video)),
            OperationState::Finished(VideoOutcome::ExternalStorage(uri)) => {
                Err(AppError::UnsupportedStorage(format!(
                    "video was written to {} instead of being returned inline",
                    uri
                )))
            }
            OperationState::Finished(VideoOutcome::Filtered { count, reasons }) => {
                Err(AppError::ContentFiltered(format!(
                    "{} video(s) filtered: {}",
                    count,
                    reasons.join("; ")
                )))
            }
            OperationState::Finished(VideoOutcome::Empty) => Err(AppError::EmptyResult(
                "operation finished without a video".to_string(),
            )),
        }
    }
}

#[async_trait]
impl MediaBackend for VertexBackend {
    fn name(&self) -> &str {
        "vertex"
    }

    async fn generate_image(&self, request: ImageRequest) -> Result<Vec<GeneratedImage>> {
        debug!(model = %self.image_model, samples = request.sample_count, "Sending generate request");

        let body = PredictRequest {
            instances: vec![ImageInstance {
                prompt: &request.prompt,
            }],
            parameters: ImageParameters {
                sample_count: request.sample_count,
                aspect_ratio: Some(&request.aspect_ratio),
                safety_setting: &request.safety_setting,
                person_generation: &request.person_generation,
            },
        };

        self.predict(&self.image_model, &body).await
    }

    async fn edit_image(&self, request: EditRequest) -> Result<Vec<GeneratedImage>> {
        debug!(model = %self.edit_model, samples = request.sample_count, "Sending edit request");

        let body = PredictRequest {
            instances: vec![EditInstance {
                prompt: &request.prompt,
                reference_images: vec![ReferenceImage::raw(&request.base_image)],
            }],
            parameters: ImageParameters {
                sample_count: request.sample_count,
                aspect_ratio: None,
                safety_setting: &request.safety_setting,
                person_generation: &request.person_generation,
            },
        };

        self.predict(&self.edit_model, &body).await
    }

    async fn generate_video(&self, request: VideoRequest) -> Result<GeneratedVideo> {
        let operation = self.start_video_operation(&request).await?;
        info!(
            model = %self.video_model,
            operation = %operation,
            max_attempts = self.poll_policy.max_attempts,
            "Started video generation"
        );

        let result = poll_until(&self.poll_policy, &operation, |_| {
            self.poll_video_operation(&operation)
        })
        .await;

        if let Err(e) = &result {
            warn!(operation = %operation, error = %e, "Video generation did not succeed");
        }

        result
    }
}

/// Veo 3 models generate an audio track only when asked to
pub fn supports_audio(model: &str) -> bool {
    model.starts_with("veo-3")
}

/// Detect the MIME type of image data using magic bytes, defaulting to PNG
pub fn sniff_image_mime(data: &[u8]) -> &'static str {
    // JPEG: FF D8 FF
    if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return "image/jpeg";
    }

    // WebP: RIFF....WEBP
    if data.len() >= 12 && data.starts_with(b"RIFF") && &data[8..12] == b"WEBP" {
        return "image/webp";
    }

    "image/png"
}
