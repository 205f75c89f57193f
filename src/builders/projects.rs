//! Project list builder.

use super::assets::{to_tab_json, AssetDir, PendingUpload};
use super::{BuildOutput, ChangeSetBuilder};
use crate::error::AppError;
use crate::models::{ChangeSet, Project};
use std::collections::{BTreeMap, HashSet};

pub const PROJECT_LIST_PATH: &str = "src/app/projects/list.json";
pub const PROJECT_IMAGE_DIR: &str = "public/images/project/";
pub const PROJECT_IMAGE_PREFIX: &str = "/images/project/";
pub const PROJECT_COMMIT_MESSAGE: &str = "update project list";

/// Edited project list.
///
/// `uploads` are keyed by the `url` of the project whose image they replace.
#[derive(Debug, Clone, Default)]
pub struct ProjectListEdit {
    pub previous: Vec<Project>,
    pub projects: Vec<Project>,
    pub uploads: BTreeMap<String, PendingUpload>,
}

impl ChangeSetBuilder for ProjectListEdit {
    type State = Vec<Project>;

    fn build(self) -> Result<BuildOutput<Vec<Project>>, AppError> {
        let Self {
            previous,
            mut projects,
            uploads,
        } = self;
        let dir = AssetDir::new(PROJECT_IMAGE_DIR, PROJECT_IMAGE_PREFIX);
        let mut changes = ChangeSet::new(PROJECT_COMMIT_MESSAGE);

        for (slot, upload) in &uploads {
            let project = projects
                .iter_mut()
                .find(|p| &p.url == slot)
                .ok_or_else(|| {
                    AppError::invalid_input_field(
                        format!("No project with url {}", slot),
                        "uploads",
                    )
                })?;
            project.image = dir.stage(&mut changes, upload);
        }

        changes.write_text(PROJECT_LIST_PATH, to_tab_json(&projects)?);

        let current: HashSet<&str> = projects.iter().map(|p| p.image.as_str()).collect();
        dir.delete_stale(
            &mut changes,
            previous.iter().map(|p| p.image.as_str()),
            &current,
        );

        Ok(BuildOutput {
            changes,
            state: projects,
        })
    }
}
