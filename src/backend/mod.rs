//! Backend module - Generation traits, the Vertex AI client, and its wire format

pub mod base64;
pub mod credentials;
pub mod polling;
pub mod traits;
pub mod vertex;
pub mod wire;

pub use traits::{
    EditRequest, GeneratedImage, GeneratedVideo, ImageRequest, MediaBackend, VideoRequest,
};
