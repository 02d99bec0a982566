//! Request bodies and their validation

use serde::Deserialize;

use crate::error::{AppError, Result};

pub const ASPECT_RATIOS: &[&str] = &["1:1", "9:16", "16:9", "3:4", "4:3"];
pub const VIDEO_ASPECT_RATIOS: &[&str] = &["16:9", "9:16"];
pub const SAFETY_SETTINGS: &[&str] = &[
    "block_low_and_above",
    "block_medium_and_above",
    "block_only_high",
    "block_none",
];
pub const PERSON_GENERATION: &[&str] = &["dont_allow", "allow_adult", "allow_all"];

pub const MAX_SAMPLE_COUNT: u32 = 4;
pub const MIN_VIDEO_SECONDS: u32 = 5;
pub const MAX_VIDEO_SECONDS: u32 = 8;

const DEFAULT_ASPECT_RATIO: &str = "1:1";
const DEFAULT_VIDEO_ASPECT_RATIO: &str = "16:9";
const DEFAULT_SAFETY_SETTING: &str = "block_medium_and_above";
const DEFAULT_PERSON_GENERATION: &str = "allow_adult";

/// Body of `POST /api/generate-image`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateImage {
    #[serde(default)]
    pub prompt: String,
    pub sample_count: Option<u32>,
    pub aspect_ratio: Option<String>,
    pub safety_setting: Option<String>,
    pub person_generation: Option<String>,
}

/// Body of `POST /api/edit-image`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditImage {
    #[serde(default)]
    pub image_path: String,
    #[serde(default)]
    pub edit_prompt: String,
    pub sample_count: Option<u32>,
    pub safety_setting: Option<String>,
    pub person_generation: Option<String>,
}

/// Body of `POST /api/generate-video`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnimateImage {
    #[serde(default)]
    pub image_path: String,
    #[serde(default)]
    pub prompt: String,
    pub aspect_ratio: Option<String>,
    pub duration: Option<u32>,
}

/// Options shared by image generation and editing, after validation
#[derive(Debug, Clone, PartialEq)]
pub struct ImageOptions {
    pub sample_count: u32,
    pub safety_setting: String,
    pub person_generation: String,
}

/// Trimmed, non-empty text field
pub fn required_text(value: &str, field: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation(format!("{} is required", field)));
    }
    Ok(trimmed.to_string())
}

pub fn sample_count(value: Option<u32>) -> Result<u32> {
    let count = value.unwrap_or(1);
    if !(1..=MAX_SAMPLE_COUNT).contains(&count) {
        return Err(AppError::Validation(format!(
            "sampleCount must be between 1 and {}, got {}",
            MAX_SAMPLE_COUNT, count
        )));
    }
    Ok(count)
}

/// Value from a fixed set, or the default when absent
fn one_of(value: Option<&str>, allowed: &[&str], default: &str, field: &str) -> Result<String> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(default.to_string()),
        Some(v) if allowed.contains(&v) => Ok(v.to_string()),
        Some(v) => Err(AppError::Validation(format!(
            "{} '{}' is not one of {}",
            field,
            v,
            allowed.join(", ")
        ))),
    }
}

pub fn aspect_ratio(value: Option<&str>) -> Result<String> {
    one_of(value, ASPECT_RATIOS, DEFAULT_ASPECT_RATIO, "aspectRatio")
}

pub fn video_aspect_ratio(value: Option<&str>) -> Result<String> {
    one_of(value, VIDEO_ASPECT_RATIOS, DEFAULT_VIDEO_ASPECT_RATIO, "aspectRatio")
}

pub fn video_duration(value: Option<u32>) -> Result<u32> {
    let seconds = value.unwrap_or(MAX_VIDEO_SECONDS);
    if !(MIN_VIDEO_SECONDS..=MAX_VIDEO_SECONDS).contains(&seconds) {
        return Err(AppError::Validation(format!(
            "duration must be between {} and {} seconds, got {}",
            MIN_VIDEO_SECONDS, MAX_VIDEO_SECONDS, seconds
        )));
    }
    Ok(seconds)
}

pub fn image_options(
    count: Option<u32>,
    safety_setting: Option<&str>,
    person_generation: Option<&str>,
) -> Result<ImageOptions> {
    Ok(ImageOptions {
        sample_count: sample_count(count)?,
        safety_setting: one_of(
            safety_setting,
            SAFETY_SETTINGS,
            DEFAULT_SAFETY_SETTING,
            "safetySetting",
        )?,
        person_generation: one_of(
            person_generation,
            PERSON_GENERATION,
            DEFAULT_PERSON_GENERATION,
            "personGeneration",
        )?,
    })
}
