//! File storage for generated images and videos
//!
//! Files are named `result-{id}.{ext}`, `result-{id}-{n}.{ext}` for numbered
//! image variants, and `result-{id}-video.mp4` for the video of a generation.
//! The generation id and kind are recovered from the name when listing.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{AppError, Result};

const FILE_PREFIX: &str = "result-";
const VIDEO_SUFFIX: &str = "video";
const VIDEO_EXTENSION: &str = "mp4";
const DEFAULT_IMAGE_EXTENSION: &str = "png";

/// Kind of artifact, derived from the file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Image,
    Video,
}

/// Parsed artifact file name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactName {
    /// The file name as found on disk
    pub file_name: String,
    pub generation_id: i64,
    pub suffix: Option<String>,
    pub extension: String,
}

impl ArtifactName {
    /// Parse `result-{id}(-{suffix})?.{ext}`; anything else yields `None`
    pub fn parse(file_name: &str) -> Option<Self> {
        let rest = file_name.strip_prefix(FILE_PREFIX)?;
        let (stem, extension) = rest.rsplit_once('.')?;
        if extension.is_empty() || !extension.chars().all(|c| c.is_ascii_alphanumeric()) {
            return None;
        }

        let (id, suffix) = match stem.split_once('-') {
            Some((id, suffix)) if !suffix.is_empty() => (id, Some(suffix.to_string())),
            Some(_) => return None,
            None => (stem, None),
        };

        if id.is_empty() || !id.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }

        Some(Self {
            file_name: file_name.to_string(),
            generation_id: id.parse().ok()?,
            suffix,
            extension: extension.to_string(),
        })
    }

    pub fn kind(&self) -> ArtifactKind {
        if self.extension.eq_ignore_ascii_case(VIDEO_EXTENSION) {
            ArtifactKind::Video
        } else {
            ArtifactKind::Image
        }
    }

    /// Numeric variant index, if the suffix is one
    pub fn variant(&self) -> Option<u32> {
        self.suffix.as_deref().and_then(|s| s.parse().ok())
    }
}

/// File name for an image of a generation
pub fn image_file_name(generation_id: i64, variant: Option<u32>, extension: &str) -> String {
    match variant {
        Some(n) => format!("{}{}-{}.{}", FILE_PREFIX, generation_id, n, extension),
        None => format!("{}{}.{}", FILE_PREFIX, generation_id, extension),
    }
}

/// File name of the video of a generation
pub fn video_file_name(generation_id: i64) -> String {
    format!("{}{}-{}.{}", FILE_PREFIX, generation_id, VIDEO_SUFFIX, VIDEO_EXTENSION)
}

/// File extension for a MIME type, taken from its subtype
pub fn extension_for_mime(mime_type: Option<&str>) -> String {
    mime_type
        .and_then(|mime| mime.split_once('/'))
        .map(|(_, subtype)| subtype.split(';').next().unwrap_or(subtype).trim())
        .filter(|subtype| !subtype.is_empty() && subtype.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|subtype| subtype.to_ascii_lowercase())
        .unwrap_or_else(|| DEFAULT_IMAGE_EXTENSION.to_string())
}

/// Artifacts stored for one generation id, as public paths
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationArtifacts {
    pub images: Vec<String>,
    pub videos: Vec<String>,
}

/// Handler for artifact storage operations
pub struct ArtifactStore {
    storage_path: PathBuf,
    public_path: String,
}

impl ArtifactStore {
    /// Create a new artifact store rooted at `storage_path`, served under `public_path`
    pub fn new(storage_path: impl Into<PathBuf>, public_path: impl Into<String>) -> Self {
        let public_path = public_path.into();
        Self {
            storage_path: storage_path.into(),
            public_path: public_path.trim_end_matches('/').to_string(),
        }
    }

    pub fn storage_path(&self) -> &Path {
        &self.storage_path
    }

    /// Ensure the storage directory exists
    pub async fn ensure_storage_dir(&self) -> Result<()> {
        if !self.storage_path.exists() {
            fs::create_dir_all(&self.storage_path).await?;
            debug!(path = ?self.storage_path, "Created storage directory");
        }
        Ok(())
    }

    /// Public URL path of a stored file
    pub fn public_url(&self, file_name: &str) -> String {
        format!("{}/{}", self.public_path, file_name)
    }

    /// Save image bytes under the naming convention and return the public path
    pub async fn save(
        &self,
        data: &[u8],
        mime_type: Option<&str>,
        generation_id: i64,
        variant: Option<u32>,
    ) -> Result<String> {
        let file_name = image_file_name(generation_id, variant, &extension_for_mime(mime_type));
        self.write(&file_name, data).await
    }

    /// Save the video of a generation, replacing any previous one
    pub async fn save_video(&self, generation_id: i64, data: &[u8]) -> Result<String> {
        self.write(&video_file_name(generation_id), data).await
    }

    /// Write several files so that either all of them appear or none do.
    ///
    /// Each file is staged under a hidden temporary name and only renamed into
    /// place after every write succeeded. If a rename fails, the files already
    /// moved into place are removed again. A file they overwrote is lost.
    pub async fn save_all(&self, files: &[(String, Vec<u8>)]) -> Result<Vec<String>> {
        self.ensure_storage_dir().await?;

        let mut staged: Vec<(PathBuf, PathBuf)> = Vec::with_capacity(files.len());
        for (file_name, data) in files {
            let target = self.storage_path.join(file_name);
            let temp = self
                .storage_path
                .join(format!(".{}.{}.partial", file_name, Uuid::new_v4()));

            if let Err(e) = fs::write(&temp, data).await {
                warn!(file = %file_name, error = %e, "Failed to stage artifact, discarding batch");
                let _ = fs::remove_file(&temp).await;
                discard(&staged).await;
                return Err(AppError::Io(e));
            }
            staged.push((temp, target));
        }

        let mut urls = Vec::with_capacity(files.len());
        for (index, (temp, target)) in staged.iter().enumerate() {
            if let Err(e) = fs::rename(temp, target).await {
                warn!(file = %files[index].0, error = %e, "Failed to publish artifact, rolling back batch");
                for (_, promoted) in &staged[..index] {
                    let _ = fs::remove_file(promoted).await;
                }
                discard(&staged[index..]).await;
                return Err(AppError::Io(e));
            }
            urls.push(self.public_url(&files[index].0));
        }

        debug!(count = urls.len(), "Saved artifacts");
        Ok(urls)
    }

    /// Save bytes under an explicit artifact file name, overwriting it
    pub async fn save_as(&self, file_name: &str, data: &[u8]) -> Result<String> {
        self.write(file_name, data).await
    }

    async fn write(&self, file_name: &str, data: &[u8]) -> Result<String> {
        self.ensure_storage_dir().await?;

        let file_path = self.storage_path.join(file_name);
        fs::write(&file_path, data).await?;

        debug!(path = ?file_path, size = data.len(), "Saved artifact file");

        Ok(self.public_url(file_name))
    }

    /// Resolve a client-supplied image path to a parsed artifact name.
    ///
    /// Accepts the public path (`/outputs/result-1.png`) or a bare file name.
    pub fn resolve(&self, image_path: &str) -> Result<ArtifactName> {
        // Front-ends append cache-busting query strings
        let trimmed = image_path.trim().split(['?', '#']).next().unwrap_or_default();
        let file_name = trimmed
            .strip_prefix(&self.public_path)
            .and_then(|rest| rest.strip_prefix('/'))
            .unwrap_or(trimmed);

        let invalid = || {
            AppError::Validation(format!(
                "imagePath '{}' does not reference a generated image",
                image_path
            ))
        };

        if file_name.contains('/') || file_name.contains('\\') {
            return Err(invalid());
        }

        let name = ArtifactName::parse(file_name).ok_or_else(invalid)?;
        if name.kind() != ArtifactKind::Image {
            return Err(invalid());
        }

        Ok(name)
    }

    /// Read a stored file
    pub async fn read(&self, file_name: &str) -> Result<Vec<u8>> {
        let file_path = self.storage_path.join(file_name);

        match fs::read(&file_path).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(AppError::NotFound(format!(
                "image {} does not exist",
                self.public_url(file_name)
            ))),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    /// Delete the video of a generation; returns whether one existed
    pub async fn delete_video(&self, generation_id: i64) -> Result<bool> {
        let file_path = self.storage_path.join(video_file_name(generation_id));

        match fs::remove_file(&file_path).await {
            Ok(()) => {
                debug!(generation_id, "Deleted previous video");
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    /// Delete numbered image variants of a generation not listed in `keep`.
    ///
    /// Returns how many files were removed.
    pub async fn prune_variants(&self, generation_id: i64, keep: &[&str]) -> Result<usize> {
        let mut entries = match fs::read_dir(&self.storage_path).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(AppError::Io(e)),
        };

        let mut removed = 0;
        while let Some(entry) = entries.next_entry().await? {
            let Some(name) = entry.file_name().to_str().and_then(ArtifactName::parse) else {
                continue;
            };

            let stale = name.generation_id == generation_id
                && name.kind() == ArtifactKind::Image
                && name.variant().is_some()
                && !keep.contains(&name.file_name.as_str());

            if stale {
                match fs::remove_file(entry.path()).await {
                    Ok(()) => removed += 1,
                    Err(e) if e.kind() == ErrorKind::NotFound => {}
                    Err(e) => return Err(AppError::Io(e)),
                }
            }
        }

        Ok(removed)
    }

    /// Scan the storage directory once and group artifacts by generation id
    pub async fn list_by_generation_id(&self) -> Result<BTreeMap<i64, GenerationArtifacts>> {
        let mut entries = match fs::read_dir(&self.storage_path).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(AppError::Io(e)),
        };

        let mut grouped: BTreeMap<i64, (Vec<ArtifactName>, Vec<ArtifactName>)> = BTreeMap::new();

        while let Some(entry) = entries.next_entry().await? {
            let Some(file_name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            let Some(name) = ArtifactName::parse(&file_name) else {
                continue;
            };

            let slot = grouped.entry(name.generation_id).or_default();
            match name.kind() {
                ArtifactKind::Image => slot.0.push(name),
                ArtifactKind::Video => slot.1.push(name),
            }
        }

        Ok(grouped
            .into_iter()
            .map(|(id, (mut images, mut videos))| {
                images.sort_by(|a, b| {
                    image_order(a)
                        .cmp(&image_order(b))
                        .then_with(|| a.file_name.cmp(&b.file_name))
                });
                videos.sort_by(|a, b| a.file_name.cmp(&b.file_name));

                let artifacts = GenerationArtifacts {
                    images: images.iter().map(|n| self.public_url(&n.file_name)).collect(),
                    videos: videos.iter().map(|n| self.public_url(&n.file_name)).collect(),
                };
                (id, artifacts)
            })
            .collect())
    }
}

/// Base image first, then numbered variants, then anything else
fn image_order(name: &ArtifactName) -> (u8, u32) {
    match (&name.suffix, name.variant()) {
        (None, _) => (0, 0),
        (Some(_), Some(n)) => (1, n),
        (Some(_), None) => (2, 0),
    }
}

async fn discard(staged: &[(PathBuf, PathBuf)]) {
    for (temp, _) in staged {
        let _ = fs::remove_file(temp).await;
    }
}
