//! Vertex AI prediction wire format
//!
//! Responses are decoded once, here, into closed result types so the client
//! never has to inspect optional fields ad hoc.

use serde::{Deserialize, Serialize};

use super::base64;
use crate::backend::traits::{GeneratedImage, GeneratedVideo};
use crate::error::Result;

/// Envelope shared by every prediction call
#[derive(Debug, Serialize)]
pub struct PredictRequest<I, P> {
    pub instances: Vec<I>,
    pub parameters: P,
}

#[derive(Debug, Serialize)]
pub struct ImageInstance<'a> {
    pub prompt: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageParameters<'a> {
    pub sample_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aspect_ratio: Option<&'a str>,
    pub safety_setting: &'a str,
    pub person_generation: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EditInstance<'a> {
    pub prompt: &'a str,
    pub reference_images: Vec<ReferenceImage>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceImage {
    pub reference_type: &'static str,
    pub reference_id: u32,
    pub reference_image: InlineMedia,
}

impl ReferenceImage {
    /// The unmasked image an edit applies to
    pub fn raw(bytes: &[u8]) -> Self {
        Self {
            reference_type: "REFERENCE_TYPE_RAW",
            reference_id: 1,
            reference_image: InlineMedia {
                bytes_base64_encoded: base64::encode(bytes),
                mime_type: None,
            },
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineMedia {
    pub bytes_base64_encoded: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct VideoInstance<'a> {
    pub prompt: &'a str,
    pub image: InlineMedia,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoParameters<'a> {
    pub aspect_ratio: &'a str,
    pub duration_seconds: u32,
    pub sample_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generate_audio: Option<bool>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchOperationRequest<'a> {
    pub operation_name: &'a str,
}

/// Response of a `:predict` call
#[derive(Debug, Default, Deserialize)]
pub struct PredictResponse {
    #[serde(default)]
    pub predictions: Vec<Prediction>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prediction {
    #[serde(default)]
    pub bytes_base64_encoded: Option<String>,
    #[serde(default)]
    pub mime_type: Option<String>,
    /// Rewritten prompt, present when the model enhanced the input
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub rai_filtered_reason: Option<String>,
}

/// Decoded result of a `:predict` call
#[derive(Debug, PartialEq)]
pub enum Predictions {
    Images(Vec<GeneratedImage>),
    /// Every prediction was withheld by the safety filters
    Filtered(Vec<String>),
    Empty,
}

impl PredictResponse {
    pub fn decode(self) -> Result<Predictions> {
        let mut images = Vec::with_capacity(self.predictions.len());
        let mut filtered = Vec::new();

        for prediction in self.predictions {
            match prediction.bytes_base64_encoded {
                Some(encoded) => images.push(GeneratedImage {
                    bytes: base64::decode(&encoded)?,
                    mime_type: prediction.mime_type,
                    rewritten_prompt: prediction.prompt.filter(|p| !p.trim().is_empty()),
                }),
                None => {
                    if let Some(reason) = prediction.rai_filtered_reason {
                        filtered.push(reason);
                    }
                }
            }
        }

        Ok(if !images.is_empty() {
            Predictions::Images(images)
        } else if !filtered.is_empty() {
            Predictions::Filtered(filtered)
        } else {
            Predictions::Empty
        })
    }
}

/// Response of a `:predictLongRunning` call
#[derive(Debug, Deserialize)]
pub struct OperationHandle {
    #[serde(default)]
    pub name: Option<String>,
}

/// Response of a `:fetchPredictOperation` call
#[derive(Debug, Default, Deserialize)]
pub struct OperationStatus {
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub error: Option<OperationError>,
    #[serde(default)]
    pub response: Option<VideoResponse>,
}

#[derive(Debug, Default, Deserialize)]
pub struct OperationError {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoResponse {
    #[serde(default)]
    pub rai_media_filtered_count: u32,
    #[serde(default)]
    pub rai_media_filtered_reasons: Vec<String>,
    #[serde(default)]
    pub videos: Vec<VideoPayload>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoPayload {
    #[serde(default)]
    pub bytes_base64_encoded: Option<String>,
    #[serde(default)]
    pub gcs_uri: Option<String>,
    #[serde(default)]
    pub mime_type: Option<String>,
}

/// Decoded state of a long-running operation
#[derive(Debug, PartialEq)]
pub enum OperationState {
    Running,
    Failed { code: i64, message: String },
    Finished(VideoOutcome),
}

/// What a finished video operation produced
#[derive(Debug, PartialEq)]
pub enum VideoOutcome {
    Inline(GeneratedVideo),
    ExternalStorage(String),
    Filtered { count: u32, reasons: Vec<String> },
    Empty,
}

impl OperationStatus {
    pub fn decode(self) -> Result<OperationState> {
        // An explicit error wins even if the operation is not marked done
        if let Some(error) = self.error {
            return Ok(OperationState::Failed {
                code: error.code,
                message: error.message,
            });
        }

        if !self.done {
            return Ok(OperationState::Running);
        }

        let response = self.response.unwrap_or_default();

        if let Some(video) = response
            .videos
            .iter()
            .find(|video| video.bytes_base64_encoded.is_some())
        {
            let encoded = video.bytes_base64_encoded.as_deref().unwrap_or_default();
            return Ok(OperationState::Finished(VideoOutcome::Inline(GeneratedVideo {
                bytes: base64::decode(encoded)?,
                mime_type: video.mime_type.clone(),
            })));
        }

        if let Some(uri) = response.videos.into_iter().find_map(|video| video.gcs_uri) {
            return Ok(OperationState::Finished(VideoOutcome::ExternalStorage(uri)));
        }

        if response.rai_media_filtered_count > 0 {
            return Ok(OperationState::Finished(VideoOutcome::Filtered {
                count: response.rai_media_filtered_count,
                reasons: response.rai_media_filtered_reasons,
            }));
        }

        Ok(OperationState::Finished(VideoOutcome::Empty))
    }
}

/// Best-effort extraction of the message from a Google API error body
pub fn error_message(body: &str) -> String {
    #[derive(Deserialize)]
    struct Envelope {
        error: Detail,
    }

    #[derive(Deserialize)]
    struct Detail {
        #[serde(default)]
        message: String,
        #[serde(default)]
        status: Option<String>,
    }

    match serde_json::from_str::<Envelope>(body) {
        Ok(envelope) => match envelope.error.status {
            Some(status) => format!("{}: {}", status, envelope.error.message),
            None => envelope.error.message,
        },
        Err(_) => body.trim().to_string(),
    }
}
