//! JSON response bodies

use serde::Serialize;

use crate::studio::{Animation, Generation, GenerationSummary};

/// Response of the generate and edit endpoints
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationResponse {
    pub success: bool,
    pub id: i64,
    pub prompts: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enhanced_prompt: Option<String>,
    pub result_images: Vec<String>,
    pub count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edit_prompt: Option<String>,
}

impl GenerationResponse {
    pub fn created(generation: Generation) -> Self {
        Self {
            success: true,
            id: generation.id,
            count: generation.images.len(),
            prompts: generation.record.prompts,
            enhanced_prompt: generation.record.enhanced_prompt,
            result_images: generation.images,
            edit_prompt: None,
        }
    }

    pub fn edited(generation: Generation) -> Self {
        Self {
            edit_prompt: Some(generation.prompt.clone()),
            ..Self::created(generation)
        }
    }
}

/// Response of the video endpoint
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoResponse {
    pub success: bool,
    pub id: i64,
    pub video_url: String,
    pub prompt: String,
}

impl From<Animation> for VideoResponse {
    fn from(animation: Animation) -> Self {
        Self {
            success: true,
            id: animation.id,
            video_url: animation.video_url,
            prompt: animation.prompt,
        }
    }
}

/// Response of the results listing
#[derive(Debug, Serialize)]
pub struct ResultsResponse {
    pub results: Vec<ResultEntry>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultEntry {
    pub id: i64,
    pub prompts: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enhanced_prompt: Option<String>,
    pub video_prompts: Vec<String>,
    pub result_images: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_videos: Option<Vec<String>>,
}

impl From<GenerationSummary> for ResultEntry {
    fn from(summary: GenerationSummary) -> Self {
        Self {
            id: summary.id,
            prompts: summary.record.prompts,
            enhanced_prompt: summary.record.enhanced_prompt,
            video_prompts: summary.record.video_prompts,
            result_images: summary.images,
            result_videos: (!summary.videos.is_empty()).then_some(summary.videos),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}
