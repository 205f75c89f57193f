//! Share list builder.

use super::assets::{to_tab_json, AssetDir, PendingUpload};
use super::{BuildOutput, ChangeSetBuilder};
use crate::error::AppError;
use crate::models::{ChangeSet, Share};
use std::collections::{BTreeMap, HashSet};

pub const SHARE_LIST_PATH: &str = "src/app/share/list.json";
pub const SHARE_LOGO_DIR: &str = "public/images/share/";
pub const SHARE_LOGO_PREFIX: &str = "/images/share/";
pub const SHARE_COMMIT_MESSAGE: &str = "update share list";

/// Edited share list; `uploads` are keyed by share `url` and replace its logo.
#[derive(Debug, Clone, Default)]
pub struct ShareListEdit {
    pub previous: Vec<Share>,
    pub shares: Vec<Share>,
    pub uploads: BTreeMap<String, PendingUpload>,
}

impl ChangeSetBuilder for ShareListEdit {
    type State = Vec<Share>;

    fn build(self) -> Result<BuildOutput<Vec<Share>>, AppError> {
        let Self {
            previous,
            mut shares,
            uploads,
        } = self;
        let dir = AssetDir::new(SHARE_LOGO_DIR, SHARE_LOGO_PREFIX);
        let mut changes = ChangeSet::new(SHARE_COMMIT_MESSAGE);

        for (slot, upload) in &uploads {
            let Some(share) = shares.iter_mut().find(|s| &s.url == slot) else {
                return Err(AppError::invalid_input_field(
                    format!("No share with url {}", slot),
                    "uploads",
                ));
            };
            share.logo = dir.stage(&mut changes, upload);
        }

        changes.write_text(SHARE_LIST_PATH, to_tab_json(&shares)?);

        let current: HashSet<&str> = shares.iter().map(|s| s.logo.as_str()).collect();
        dir.delete_stale(
            &mut changes,
            previous.iter().map(|s| s.logo.as_str()),
            &current,
        );

        Ok(BuildOutput {
            changes,
            state: shares,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn share(name: &str, logo: &str) -> Share {
        Share {
            name: name.to_string(),
            url: format!("https://{}.example.com", name),
            logo: logo.to_string(),
            description: String::new(),
            tags: vec![],
            extra: Default::default(),
        }
    }

    #[test]
    fn test_removed_share_deletes_its_logo() {
        let previous = vec![
            share("a", "/images/share/a.png"),
            share("b", "/images/share/b.png"),
            share("c", "/images/share/c.png"),
        ];
        let edited = vec![previous[0].clone(), previous[2].clone()];

        let out = ShareListEdit {
            previous,
            shares: edited,
            uploads: BTreeMap::new(),
        }
        .build()
        .unwrap();

        assert_eq!(out.changes.summary().writes, 1);
        let deletes: Vec<_> = out.changes.deletes().map(|c| c.path.as_str()).collect();
        assert_eq!(deletes, vec!["public/images/share/b.png"]);
        assert_eq!(out.changes.message(), SHARE_COMMIT_MESSAGE);
    }

    #[test]
    fn test_shared_logo_is_kept_while_referenced() {
        let previous = vec![
            share("a", "/images/share/same.png"),
            share("b", "/images/share/same.png"),
        ];
        let edited = vec![previous[0].clone()];
        let out = ShareListEdit {
            previous,
            shares: edited,
            uploads: BTreeMap::new(),
        }
        .build()
        .unwrap();
        assert_eq!(out.changes.deletes().count(), 0);
    }
}
