//! Photo gallery builder.
//!
//! Upload slots are addressed as `<picture id>::<image index>`. Replacing a
//! slot on a picture that still uses the legacy single `image` field moves
//! it to the `images` list.

use super::assets::{to_tab_json, AssetDir, PendingUpload};
use super::{BuildOutput, ChangeSetBuilder};
use crate::error::AppError;
use crate::models::{ChangeSet, Picture};
use std::collections::{BTreeMap, HashSet};

pub const GALLERY_LIST_PATH: &str = "src/app/astro/list.json";
pub const GALLERY_IMAGE_DIR: &str = "public/images/astro/";
pub const GALLERY_IMAGE_PREFIX: &str = "/images/astro/";
pub const GALLERY_COMMIT_MESSAGE: &str = "update photo gallery";

const SLOT_SEPARATOR: &str = "::";

/// Edited photo gallery.
#[derive(Debug, Clone, Default)]
pub struct GalleryEdit {
    /// Gallery as last published; the command layer reads it from the
    /// repository when the editor did not keep a copy.
    pub previous: Vec<Picture>,
    pub pictures: Vec<Picture>,
    pub uploads: BTreeMap<String, PendingUpload>,
}

/// Split `"<id>::<index>"`; a missing or unparsable index means 0.
pub fn parse_slot(slot: &str) -> Result<(&str, usize), AppError> {
    let (id, index) = match slot.split_once(SLOT_SEPARATOR) {
        Some((id, index)) => (id, index.trim().parse().unwrap_or(0)),
        None => (slot, 0),
    };
    if id.is_empty() {
        return Err(AppError::invalid_input_field(
            format!("Invalid gallery slot {:?}", slot),
            "uploads",
        ));
    }
    Ok((id, index))
}

fn set_image(picture: &mut Picture, index: usize, url: String) {
    let mut images = picture.normalized_images();
    match images.get_mut(index) {
        Some(existing) => *existing = url,
        None => images.push(url),
    }
    picture.image = None;
    picture.images = Some(images);
}

impl ChangeSetBuilder for GalleryEdit {
    type State = Vec<Picture>;

    fn build(self) -> Result<BuildOutput<Vec<Picture>>, AppError> {
        let Self {
            previous,
            mut pictures,
            uploads,
        } = self;
        let dir = AssetDir::new(GALLERY_IMAGE_DIR, GALLERY_IMAGE_PREFIX);
        let mut changes = ChangeSet::new(GALLERY_COMMIT_MESSAGE);

        for (slot, upload) in &uploads {
            let (id, index) = parse_slot(slot)?;
            let picture = pictures.iter_mut().find(|p| p.id == id).ok_or_else(|| {
                AppError::invalid_input_field(format!("No picture with id {}", id), "uploads")
            })?;
            let url = dir.stage(&mut changes, upload);
            set_image(picture, index, url);
        }

        let current: HashSet<&str> = pictures.iter().flat_map(Picture::image_urls).collect();
        dir.delete_stale(
            &mut changes,
            previous.iter().flat_map(Picture::image_urls),
            &current,
        );

        changes.write_text(GALLERY_LIST_PATH, to_tab_json(&pictures)?);

        Ok(BuildOutput {
            changes,
            state: pictures,
        })
    }
}
