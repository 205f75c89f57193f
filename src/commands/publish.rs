//! Publish commands.
//!
//! Each command builds the domain change-set and runs it through the
//! pipeline. Only one publish runs at a time; a second request while one is
//! in flight fails immediately instead of queueing.

use crate::builders::blog::{post_markdown_path, BLOG_INDEX_PATH};
use crate::builders::pictures::GALLERY_LIST_PATH;
use crate::builders::{
    BlogDelete, BlogIndexEdit, BlogPublish, BuildOutput, ChangeSetBuilder, GalleryEdit,
    PendingUpload, ProjectListEdit, ShareListEdit, SiteConfigEdit, SiteConfigState,
};
use crate::error::AppError;
use crate::models::{BlogIndexItem, ChangeSummary, Picture, Project, PublishOutcome, Share};
use crate::state::AppState;
use serde::Serialize;
use std::collections::BTreeMap;

/// Result of a successful publish.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishResponse<T> {
    pub outcome: PublishOutcome,
    pub summary: ChangeSummary,

    /// State the editor should treat as published from now on.
    pub state: T,
}

/// Build and publish; the caller holds the publish slot.
async fn run_publish<B: ChangeSetBuilder>(
    state: &AppState,
    builder: B,
) -> Result<PublishResponse<B::State>, AppError> {
    let BuildOutput {
        changes,
        state: published,
    } = builder.build()?;
    let summary = changes.summary();
    log::info!(
        "{}: {} writes, {} deletes",
        changes.message(),
        summary.writes,
        summary.deletes
    );

    let outcome = state.pipeline().publish(&changes).await?;
    Ok(PublishResponse {
        outcome,
        summary,
        state: published,
    })
}

/// Publish site content, card styles and their images.
pub async fn publish_site_config(
    state: &AppState,
    edit: SiteConfigEdit,
) -> Result<PublishResponse<SiteConfigState>, AppError> {
    let _guard = state.try_begin_publish()?;
    run_publish(state, edit).await
}

/// Publish the project list.
pub async fn publish_projects(
    state: &AppState,
    edit: ProjectListEdit,
) -> Result<PublishResponse<Vec<Project>>, AppError> {
    let _guard = state.try_begin_publish()?;
    run_publish(state, edit).await
}

/// Publish the photo gallery.
///
/// Without `previous`, the last published list is read from the branch so
/// replaced images can be cleaned up.
pub async fn publish_gallery(
    state: &AppState,
    pictures: Vec<Picture>,
    uploads: BTreeMap<String, PendingUpload>,
    previous: Option<Vec<Picture>>,
) -> Result<PublishResponse<Vec<Picture>>, AppError> {
    let _guard = state.try_begin_publish()?;

    let previous = match previous {
        Some(previous) => previous,
        None => state
            .pipeline()
            .read_json_file(GALLERY_LIST_PATH)
            .await?
            .unwrap_or_default(),
    };

    run_publish(
        state,
        GalleryEdit {
            previous,
            pictures,
            uploads,
        },
    )
    .await
}

/// Publish the share list.
pub async fn publish_shares(
    state: &AppState,
    edit: ShareListEdit,
) -> Result<PublishResponse<Vec<Share>>, AppError> {
    let _guard = state.try_begin_publish()?;
    run_publish(state, edit).await
}

/// Create or update a blog post.
pub async fn publish_blog_post(
    state: &AppState,
    publish: BlogPublish,
) -> Result<PublishResponse<Vec<BlogIndexItem>>, AppError> {
    let _guard = state.try_begin_publish()?;
    run_publish(state, publish).await
}

/// Delete one blog post with its files.
///
/// The index and the post's markdown are read from the branch so the delete
/// always matches what is published.
pub async fn delete_blog_post(
    state: &AppState,
    slug: &str,
) -> Result<PublishResponse<Vec<BlogIndexItem>>, AppError> {
    let _guard = state.try_begin_publish()?;

    let pipeline = state.pipeline();
    let index: Vec<BlogIndexItem> = pipeline
        .read_json_file(BLOG_INDEX_PATH)
        .await?
        .unwrap_or_default();
    let markdown = pipeline.read_text_file(&post_markdown_path(slug)).await?;

    run_publish(
        state,
        BlogDelete {
            slug: slug.to_string(),
            index,
            markdown,
        },
    )
    .await
}

/// Save index edits from the blog management view.
///
/// Removed posts' markdown is read from the branch to find their images.
pub async fn save_blog_edits(
    state: &AppState,
    previous: Vec<BlogIndexItem>,
    items: Vec<BlogIndexItem>,
    categories: Vec<String>,
) -> Result<PublishResponse<(Vec<BlogIndexItem>, Vec<String>)>, AppError> {
    let _guard = state.try_begin_publish()?;

    let mut edit = BlogIndexEdit {
        previous,
        items,
        categories,
        removed_markdown: BTreeMap::new(),
    };
    for slug in edit.removed_slugs() {
        if let Some(markdown) = state
            .pipeline()
            .read_text_file(&post_markdown_path(&slug))
            .await?
        {
            edit.removed_markdown.insert(slug, markdown);
        }
    }

    run_publish(state, edit).await
}
