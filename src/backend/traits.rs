//! Common traits and types for media generation backends

use async_trait::async_trait;

use crate::error::Result;

/// Request to generate images from a prompt
#[derive(Debug, Clone)]
pub struct ImageRequest {
    /// The prompt to generate images from
    pub prompt: String,

    /// Number of images to generate (1-4)
    pub sample_count: u32,

    /// Aspect ratio such as "1:1" or "16:9"
    pub aspect_ratio: String,

    /// Safety filter threshold
    pub safety_setting: String,

    /// Whether people may appear in the output
    pub person_generation: String,
}

/// Request to edit an existing image
#[derive(Debug, Clone)]
pub struct EditRequest {
    /// Raw bytes of the image being edited
    pub base_image: Vec<u8>,

    /// Instruction describing the edit
    pub prompt: String,

    pub sample_count: u32,
    pub safety_setting: String,
    pub person_generation: String,
}

/// Request to animate an existing image into a video
#[derive(Debug, Clone)]
pub struct VideoRequest {
    /// Raw bytes of the first frame
    pub base_image: Vec<u8>,

    pub prompt: String,

    /// "16:9" or "9:16"
    pub aspect_ratio: String,

    pub duration_seconds: u32,
}

/// A generated image
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedImage {
    /// Decoded image bytes
    pub bytes: Vec<u8>,

    /// MIME type reported by the service
    pub mime_type: Option<String>,

    /// Prompt as rewritten by the service, if it rewrote it
    pub rewritten_prompt: Option<String>,
}

/// A generated video
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedVideo {
    pub bytes: Vec<u8>,
    pub mime_type: Option<String>,
}

/// Trait for media generation backends
#[async_trait]
pub trait MediaBackend: Send + Sync {
    /// Get the backend name
    fn name(&self) -> &str;

    /// Generate images from a prompt in a single round trip
    async fn generate_image(&self, request: ImageRequest) -> Result<Vec<GeneratedImage>>;

    /// Apply an edit instruction to an existing image
    async fn edit_image(&self, request: EditRequest) -> Result<Vec<GeneratedImage>>;

    /// Generate a video from an image, waiting for the remote operation to finish
    async fn generate_video(&self, request: VideoRequest) -> Result<GeneratedVideo>;
}
