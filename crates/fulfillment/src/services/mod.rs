//! Outbound collaborators of the fulfillment workflow, with in-memory doubles.

pub mod artifacts;
pub mod notifier;

pub use artifacts::{
    ArtifactError, ArtifactStore, FileSystemArtifactStore, InMemoryArtifactStore, StoredArtifact,
};
pub use notifier::{InMemoryNotifier, LogNotifier, Message, Notifier, NotifyError};
