//! Vertex Media Studio
//!
//! An HTTP studio in front of Vertex AI: generates and edits images with
//! Imagen, animates them with Veo, stores the results as local files and
//! keeps a JSON ledger of the prompts behind every generation.

pub mod api;
pub mod backend;
pub mod config;
pub mod error;
pub mod storage;
pub mod studio;

pub use error::{AppError, Result};

use std::sync::Arc;

use studio::Studio;

/// Application state shared across all handlers
pub struct AppState {
    pub settings: Arc<crate::config::Settings>,
    pub studio: Arc<Studio>,
}
