//! Shared fixtures for functional tests

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header::CONTENT_TYPE, HeaderMap, Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;
use vertex_media_studio::{
    api::routes::create_router,
    backend::{
        EditRequest, GeneratedImage, GeneratedVideo, ImageRequest, MediaBackend, VideoRequest,
    },
    config::Settings,
    error::{AppError, Result},
    storage::{ArtifactStore, MetadataLedger},
    studio::Studio,
    AppState,
};

pub const PNG_HEADER: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

/// How the fake backend answers video requests
pub enum VideoBehavior {
    Succeed,
    TimeOut,
}

/// In-memory stand-in for the generation service
pub struct FakeBackend {
    calls: AtomicUsize,
    rewritten_prompt: Option<String>,
    video: VideoBehavior,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            rewritten_prompt: None,
            video: VideoBehavior::Succeed,
        }
    }

    pub fn rewriting_prompts(mut self, rewritten: &str) -> Self {
        self.rewritten_prompt = Some(rewritten.to_string());
        self
    }

    pub fn with_video(mut self, video: VideoBehavior) -> Self {
        self.video = video;
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn images(&self, count: u32, label: &str) -> Vec<GeneratedImage> {
        (0..count)
            .map(|index| {
                let mut bytes = PNG_HEADER.to_vec();
                bytes.extend_from_slice(format!("{}-{}", label, index).as_bytes());
                GeneratedImage {
                    bytes,
                    mime_type: Some("image/png".to_string()),
                    rewritten_prompt: self.rewritten_prompt.clone(),
                }
            })
            .collect()
    }
}

#[async_trait]
impl MediaBackend for FakeBackend {
    fn name(&self) -> &str {
        "fake"
    }

    async fn generate_image(&self, request: ImageRequest) -> Result<Vec<GeneratedImage>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.images(request.sample_count, &request.prompt))
    }

    async fn edit_image(&self, request: EditRequest) -> Result<Vec<GeneratedImage>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.images(request.sample_count, &format!("edited {}", request.prompt)))
    }

    async fn generate_video(&self, request: VideoRequest) -> Result<GeneratedVideo> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.video {
            VideoBehavior::Succeed => Ok(GeneratedVideo {
                bytes: format!("video of {}", request.prompt).into_bytes(),
                mime_type: Some("video/mp4".to_string()),
            }),
            VideoBehavior::TimeOut => Err(AppError::Timeout(
                "operation op-1 did not complete after 120 attempts".to_string(),
            )),
        }
    }
}

/// Router wired to a fake backend and a temporary storage root
pub struct TestApp {
    pub router: Router,
    pub backend: Arc<FakeBackend>,
    studio: Arc<Studio>,
    _dir: TempDir,
    output_dir: PathBuf,
    metadata_path: PathBuf,
}

impl TestApp {
    pub fn new(backend: FakeBackend) -> Self {
        let dir = TempDir::new().unwrap();

        let mut settings = Settings::default();
        settings.storage.root = dir.path().to_string_lossy().into_owned();
        settings.server.static_dir = None;

        let output_dir = settings.storage.output_dir();
        let metadata_path = settings.storage.metadata_path();
        std::fs::create_dir_all(&output_dir).unwrap();

        let backend = Arc::new(backend);
        let studio = Studio::new(
            backend.clone(),
            ArtifactStore::new(output_dir.clone(), settings.storage.public_path.clone()),
            MetadataLedger::new(metadata_path.clone()),
        );

        let studio = Arc::new(studio);
        let state = Arc::new(AppState {
            settings: Arc::new(settings),
            studio: studio.clone(),
        });

        Self {
            router: create_router(state),
            backend,
            studio,
            _dir: dir,
            output_dir,
            metadata_path,
        }
    }

    /// Run the startup scan over whatever was written to the output directory
    pub async fn prepare(&self) {
        self.studio.prepare().await.unwrap();
    }

    pub fn output_file(&self, name: &str) -> PathBuf {
        self.output_dir.join(name)
    }

    pub fn write_output(&self, name: &str, data: &[u8]) {
        std::fs::write(self.output_file(name), data).unwrap();
    }

    pub fn write_metadata(&self, document: &Value) {
        std::fs::write(&self.metadata_path, document.to_string()).unwrap();
    }

    pub async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.post_raw(uri, body.to_string()).await
    }

    pub async fn post_raw(&self, uri: &str, body: String) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .unwrap();

        let (status, _, bytes) = self.send(request).await;
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        let (status, _, bytes) = self.get_raw(uri).await;
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    pub async fn get_raw(&self, uri: &str) -> (StatusCode, HeaderMap, Vec<u8>) {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        self.send(request).await
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, HeaderMap, Vec<u8>) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, headers, bytes.to_vec())
    }
}
