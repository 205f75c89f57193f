//! Publish progress events.
//!
//! The pipeline reports each stage over a broadcast channel so the editing
//! UI can show progress without polling. Sending never blocks and a publish
//! with no subscribers behaves the same as one with many.

use serde::Serialize;
use tokio::sync::broadcast;

/// Buffered events per subscriber before the slowest one starts lagging.
const CHANNEL_CAPACITY: usize = 64;

/// Payload for publish-progress events.
#[derive(Debug, Clone, Serialize)]
pub struct PublishProgressPayload {
    /// Current phase of the publish.
    pub phase: PublishPhase,

    /// Progress message.
    pub message: String,

    /// Number of items processed so far (if applicable).
    pub processed: Option<usize>,

    /// Total number of items to process (if applicable).
    pub total: Option<usize>,

    /// Whether an error occurred.
    pub is_error: bool,
}

/// Phase of a publish operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishPhase {
    /// Obtaining an installation token.
    Authenticating,

    /// Reading the branch tip.
    LookingUpRef,

    /// Uploading blobs.
    UploadingBlobs,

    CreatingTree,

    CreatingCommit,

    /// Moving the branch.
    UpdatingRef,

    /// Publish completed.
    Complete,

    /// Publish failed.
    Failed,
}

/// Broadcast sender for publish progress.
#[derive(Debug, Clone)]
pub struct PublishEvents {
    sender: broadcast::Sender<PublishProgressPayload>,
}

impl Default for PublishEvents {
    fn default() -> Self {
        Self::new()
    }
}

impl PublishEvents {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    /// Receive every event emitted from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<PublishProgressPayload> {
        self.sender.subscribe()
    }

    /// Report a phase transition.
    pub fn phase(&self, phase: PublishPhase, message: impl Into<String>) {
        self.emit(PublishProgressPayload {
            phase,
            message: message.into(),
            processed: None,
            total: None,
            is_error: false,
        });
    }

    /// Report counted progress within a phase.
    pub fn progress(
        &self,
        phase: PublishPhase,
        message: impl Into<String>,
        processed: usize,
        total: usize,
    ) {
        self.emit(PublishProgressPayload {
            phase,
            message: message.into(),
            processed: Some(processed),
            total: Some(total),
            is_error: false,
        });
    }

    /// Report a failed publish.
    pub fn failed(&self, message: impl Into<String>) {
        self.emit(PublishProgressPayload {
            phase: PublishPhase::Failed,
            message: message.into(),
            processed: None,
            total: None,
            is_error: true,
        });
    }

    fn emit(&self, payload: PublishProgressPayload) {
        // Err only means nobody is listening
        let _ = self.sender.send(payload);
    }
}
