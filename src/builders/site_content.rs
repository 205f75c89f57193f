//! Site configuration builder.
//!
//! Publishes `site-content.json` and `card-styles.json` together with the
//! favicon, avatar, art images, background images and social button icons.
//! Favicon and avatar live at fixed paths; everything else is content-hashed.

use super::assets::{to_tab_json, AssetDir, PendingUpload};
use super::{BuildOutput, ChangeSetBuilder};
use crate::error::AppError;
use crate::models::{CardStyles, ChangeSet, ImageRef, SiteContent};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

pub const SITE_CONTENT_PATH: &str = "src/config/site-content.json";
pub const CARD_STYLES_PATH: &str = "src/config/card-styles.json";
pub const FAVICON_PATH: &str = "public/favicon.png";
pub const AVATAR_PATH: &str = "public/images/avatar.png";
pub const SITE_COMMIT_MESSAGE: &str = "chore: update site configuration via web editor";

/// Site content plus card styles, published as a pair.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteConfigState {
    pub content: SiteContent,
    pub card_styles: CardStyles,
}

/// Edited site configuration.
///
/// Art and background uploads are keyed by image id, social button uploads
/// by button id.
#[derive(Debug, Clone, Default)]
pub struct SiteConfigEdit {
    pub previous: SiteContent,
    pub content: SiteContent,
    pub card_styles: CardStyles,
    pub favicon: Option<PendingUpload>,
    pub avatar: Option<PendingUpload>,
    pub art_uploads: BTreeMap<String, PendingUpload>,
    pub background_uploads: BTreeMap<String, PendingUpload>,
    pub social_button_uploads: BTreeMap<String, PendingUpload>,
}

fn art_dir() -> AssetDir {
    AssetDir::new("public/images/art/", "/images/art/")
}

fn background_dir() -> AssetDir {
    AssetDir::new("public/images/background/", "/images/background/")
}

fn social_button_dir() -> AssetDir {
    AssetDir::new("public/images/social-buttons/", "/images/social-buttons/")
}

fn apply_image_uploads(
    changes: &mut ChangeSet,
    dir: &AssetDir,
    images: &mut [ImageRef],
    uploads: &BTreeMap<String, PendingUpload>,
    field: &str,
) -> Result<(), AppError> {
    for (id, upload) in uploads {
        let image = images.iter_mut().find(|i| &i.id == id).ok_or_else(|| {
            AppError::invalid_input_field(format!("No image with id {}", id), field)
        })?;
        image.url = dir.stage(changes, upload);
    }
    Ok(())
}

/// Every image URL the site content references.
fn referenced_urls(content: &SiteContent) -> impl Iterator<Item = &str> {
    content
        .art_images
        .iter()
        .chain(&content.background_images)
        .map(|i| i.url.as_str())
        .chain(content.social_buttons.iter().filter_map(|b| b.image.as_deref()))
}

impl ChangeSetBuilder for SiteConfigEdit {
    type State = SiteConfigState;

    fn build(self) -> Result<BuildOutput<SiteConfigState>, AppError> {
        let Self {
            previous,
            mut content,
            card_styles,
            favicon,
            avatar,
            art_uploads,
            background_uploads,
            social_button_uploads,
        } = self;
        let mut changes = ChangeSet::new(SITE_COMMIT_MESSAGE);

        let art = art_dir();
        let background = background_dir();
        let social = social_button_dir();

        apply_image_uploads(
            &mut changes,
            &art,
            &mut content.art_images,
            &art_uploads,
            "artImages",
        )?;
        apply_image_uploads(
            &mut changes,
            &background,
            &mut content.background_images,
            &background_uploads,
            "backgroundImages",
        )?;
        for (id, upload) in &social_button_uploads {
            let button = content
                .social_buttons
                .iter_mut()
                .find(|b| &b.id == id)
                .ok_or_else(|| {
                    AppError::invalid_input_field(
                        format!("No social button with id {}", id),
                        "socialButtons",
                    )
                })?;
            button.image = Some(social.stage(&mut changes, upload));
        }

        changes.write_text(SITE_CONTENT_PATH, to_tab_json(&content)?);
        changes.write_text(CARD_STYLES_PATH, to_tab_json(&card_styles)?);

        if let Some(favicon) = favicon {
            changes.write_binary(FAVICON_PATH, favicon.bytes);
        }
        if let Some(avatar) = avatar {
            changes.write_binary(AVATAR_PATH, avatar.bytes);
        }

        let current: HashSet<&str> = referenced_urls(&content).collect();
        for dir in [&art, &background, &social] {
            dir.delete_stale(&mut changes, referenced_urls(&previous), &current);
        }

        Ok(BuildOutput {
            changes,
            state: SiteConfigState {
                content,
                card_styles,
            },
        })
    }
}
