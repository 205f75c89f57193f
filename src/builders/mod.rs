//! Change-set builders.
//!
//! One builder per site domain. Each takes the state as it was loaded, the
//! edited state and any staged uploads, and produces the change-set for the
//! next commit together with the state the editor should adopt once the
//! publish succeeds. Stale assets are always computed against the loaded
//! state, never against intermediate edits.

pub mod assets;
pub mod blog;
pub mod pictures;
pub mod projects;
pub mod shares;
pub mod site_content;

use crate::error::AppError;
use crate::models::ChangeSet;

pub use assets::{to_tab_json, AssetDir, PendingUpload};
pub use blog::{BlogDelete, BlogIndexEdit, BlogPublish};
pub use pictures::GalleryEdit;
pub use projects::ProjectListEdit;
pub use shares::ShareListEdit;
pub use site_content::{SiteConfigEdit, SiteConfigState};

/// Change-set plus the state it publishes.
#[derive(Debug, Clone)]
pub struct BuildOutput<T> {
    pub changes: ChangeSet,
    pub state: T,
}

/// A domain edit that can be turned into a change-set.
pub trait ChangeSetBuilder {
    /// State the editor should treat as published after a successful commit.
    type State;

    fn build(self) -> Result<BuildOutput<Self::State>, AppError>;
}
