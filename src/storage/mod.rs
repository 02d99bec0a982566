//! Storage module - Artifact files and the metadata ledger

pub mod artifacts;
pub mod ledger;

pub use artifacts::{ArtifactKind, ArtifactName, ArtifactStore, GenerationArtifacts};
pub use ledger::{GenerationRecord, LedgerDocument, MetadataLedger};
