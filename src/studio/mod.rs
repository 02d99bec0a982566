//! Request orchestration: validation, remote calls and persistence
//!
//! Each operation is a straight-line sequence that stops at the first
//! failure. Artifacts are written before the ledger is touched, so a failed
//! request never leaves prompt history pointing at missing files.

pub mod ids;
pub mod validation;

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::backend::{
    EditRequest, GeneratedImage, ImageRequest, MediaBackend, VideoRequest,
};
use crate::error::{AppError, Result};
use crate::storage::artifacts::{extension_for_mime, image_file_name};
use crate::storage::{ArtifactStore, GenerationRecord, MetadataLedger};

pub use ids::GenerationIds;
pub use validation::{AnimateImage, CreateImage, EditImage};

/// Outcome of a create or edit
#[derive(Debug, Clone)]
pub struct Generation {
    pub id: i64,
    /// Prompt of this request, after validation
    pub prompt: String,
    pub record: GenerationRecord,
    /// Public paths of the images written by this request
    pub images: Vec<String>,
}

/// Outcome of an animation
#[derive(Debug, Clone)]
pub struct Animation {
    pub id: i64,
    pub video_url: String,
    pub prompt: String,
}

/// One generation as listed by the results endpoint
#[derive(Debug, Clone)]
pub struct GenerationSummary {
    pub id: i64,
    pub record: GenerationRecord,
    pub images: Vec<String>,
    pub videos: Vec<String>,
}

/// Ties the generation backend to local storage
pub struct Studio {
    backend: Arc<dyn MediaBackend>,
    artifacts: ArtifactStore,
    ledger: MetadataLedger,
    ids: GenerationIds,
}

impl Studio {
    pub fn new(backend: Arc<dyn MediaBackend>, artifacts: ArtifactStore, ledger: MetadataLedger) -> Self {
        Self {
            backend,
            artifacts,
            ledger,
            ids: GenerationIds::new(),
        }
    }

    pub fn artifacts(&self) -> &ArtifactStore {
        &self.artifacts
    }

    pub fn ledger(&self) -> &MetadataLedger {
        &self.ledger
    }

    /// Create the storage directory and make sure new ids sort after existing ones
    pub async fn prepare(&self) -> Result<()> {
        self.artifacts.ensure_storage_dir().await?;

        let on_disk = self.artifacts.list_by_generation_id().await?;
        let in_ledger = self.ledger.load().await?;
        let existing = on_disk.keys().chain(in_ledger.keys()).copied();

        for id in existing {
            if !self.ids.advance_past(id) {
                warn!(generation_id = id, "Ignoring generation id beyond any clock value");
            }
        }

        info!(
            backend = %self.backend.name(),
            storage = ?self.artifacts.storage_path(),
            ledger = ?self.ledger.path(),
            "Studio ready"
        );
        Ok(())
    }

    /// Generate new images from a prompt
    pub async fn create_image(&self, body: CreateImage) -> Result<Generation> {
        let prompt = validation::required_text(&body.prompt, "prompt")?;
        let aspect_ratio = validation::aspect_ratio(body.aspect_ratio.as_deref())?;
        let options = validation::image_options(
            body.sample_count,
            body.safety_setting.as_deref(),
            body.person_generation.as_deref(),
        )?;

        let id = self.ids.next()?;
        info!(generation_id = id, samples = options.sample_count, "Generating image");

        let images = self
            .backend
            .generate_image(ImageRequest {
                prompt: prompt.clone(),
                sample_count: options.sample_count,
                aspect_ratio,
                safety_setting: options.safety_setting,
                person_generation: options.person_generation,
            })
            .await?;

        let enhanced_prompt = images.iter().find_map(|image| image.rewritten_prompt.clone());
        let urls = self.persist_images(id, images, None).await?;
        let record = self
            .ledger
            .record_creation(id, &prompt, enhanced_prompt.as_deref())
            .await?;

        info!(generation_id = id, count = urls.len(), "Image generation complete");
        Ok(Generation {
            id,
            prompt,
            record,
            images: urls,
        })
    }

    /// Edit an existing image; the video of the generation is discarded
    pub async fn edit_image(&self, body: EditImage) -> Result<Generation> {
        let edit_prompt = validation::required_text(&body.edit_prompt, "editPrompt")?;
        let image_path = validation::required_text(&body.image_path, "imagePath")?;
        let options = validation::image_options(
            body.sample_count,
            body.safety_setting.as_deref(),
            body.person_generation.as_deref(),
        )?;

        let source = self.artifacts.resolve(&image_path)?;
        let id = source.generation_id;
        let base_image = self.artifacts.read(&source.file_name).await?;

        info!(generation_id = id, source = %source.file_name, "Editing image");

        let images = self
            .backend
            .edit_image(EditRequest {
                base_image,
                prompt: edit_prompt.clone(),
                sample_count: options.sample_count,
                safety_setting: options.safety_setting,
                person_generation: options.person_generation,
            })
            .await?;

        self.artifacts.delete_video(id).await?;
        let urls = self
            .persist_images(id, images, Some(&source.file_name))
            .await?;
        let record = self.ledger.append_edit(id, &edit_prompt).await?;

        info!(generation_id = id, count = urls.len(), "Image edit complete");
        Ok(Generation {
            id,
            prompt: edit_prompt,
            record,
            images: urls,
        })
    }

    /// Turn an existing image into a video, replacing any earlier video
    pub async fn animate_image(&self, body: AnimateImage) -> Result<Animation> {
        let prompt = validation::required_text(&body.prompt, "prompt")?;
        let image_path = validation::required_text(&body.image_path, "imagePath")?;
        let aspect_ratio = validation::video_aspect_ratio(body.aspect_ratio.as_deref())?;
        let duration_seconds = validation::video_duration(body.duration)?;

        let source = self.artifacts.resolve(&image_path)?;
        let id = source.generation_id;
        let base_image = self.artifacts.read(&source.file_name).await?;

        info!(generation_id = id, duration_seconds, "Generating video");

        let video = self
            .backend
            .generate_video(VideoRequest {
                base_image,
                prompt: prompt.clone(),
                aspect_ratio,
                duration_seconds,
            })
            .await?;

        self.artifacts.delete_video(id).await?;
        let video_url = self.artifacts.save_video(id, &video.bytes).await?;
        self.ledger.append_video_prompt(id, &prompt).await?;

        info!(generation_id = id, size = video.bytes.len(), "Video generation complete");
        Ok(Animation {
            id,
            video_url,
            prompt,
        })
    }

    /// All generations with at least one image, newest first
    pub async fn list_results(&self) -> Result<Vec<GenerationSummary>> {
        let artifacts = self.artifacts.list_by_generation_id().await?;
        let mut ledger = self.ledger.load().await?;

        Ok(artifacts
            .into_iter()
            .rev()
            .filter(|(_, files)| !files.images.is_empty())
            .map(|(id, files)| GenerationSummary {
                id,
                record: ledger.remove(&id).unwrap_or_default(),
                images: files.images,
                videos: files.videos,
            })
            .collect())
    }

    /// A single image keeps `reuse_name` (or the base name); several become
    /// numbered variants and replace every earlier variant of the id
    async fn persist_images(
        &self,
        id: i64,
        images: Vec<GeneratedImage>,
        reuse_name: Option<&str>,
    ) -> Result<Vec<String>> {
        if images.is_empty() {
            return Err(AppError::EmptyResult("no images to save".to_string()));
        }

        if images.len() == 1 {
            let image = &images[0];
            let url = match reuse_name {
                Some(name) => self.artifacts.save_as(name, &image.bytes).await?,
                None => {
                    self.artifacts
                        .save(&image.bytes, image.mime_type.as_deref(), id, None)
                        .await?
                }
            };
            return Ok(vec![url]);
        }

        let files: Vec<(String, Vec<u8>)> = images
            .into_iter()
            .enumerate()
            .map(|(index, image)| {
                let extension = extension_for_mime(image.mime_type.as_deref());
                (image_file_name(id, Some(index as u32 + 1), &extension), image.bytes)
            })
            .collect();

        let urls = self.artifacts.save_all(&files).await?;

        let keep: Vec<&str> = files.iter().map(|(name, _)| name.as_str()).collect();
        let removed = self.artifacts.prune_variants(id, &keep).await?;
        if removed > 0 {
            debug!(generation_id = id, removed, "Removed stale image variants");
        }

        Ok(urls)
    }
}
