//! Blog builders.
//!
//! Every post lives in its own directory:
//!
//! ```text
//! public/blogs/<slug>/index.md      markdown body
//! public/blogs/<slug>/config.json   post metadata
//! public/blogs/<slug>/<hash>.<ext>  cover and inline images
//! ```
//!
//! `public/blogs/index.json` lists every post and `categories.json` the
//! category names offered by the writer.

use super::assets::{to_tab_json, AssetDir, PendingUpload};
use super::{BuildOutput, ChangeSetBuilder};
use crate::error::AppError;
use crate::models::{BlogIndexItem, BlogPost, ChangeSet};
use std::collections::{BTreeMap, HashSet};

pub const BLOG_INDEX_PATH: &str = "public/blogs/index.json";
pub const BLOG_CATEGORIES_PATH: &str = "public/blogs/categories.json";
pub const BLOG_INDEX_COMMIT_MESSAGE: &str = "update blog index";

/// Repository path of a post's markdown.
pub fn post_markdown_path(slug: &str) -> String {
    format!("public/blogs/{}/index.md", slug)
}

/// Repository path of a post's metadata.
pub fn post_config_path(slug: &str) -> String {
    format!("public/blogs/{}/config.json", slug)
}

fn post_dir(slug: &str) -> AssetDir {
    AssetDir::new(format!("public/blogs/{}/", slug), format!("/blogs/{}/", slug))
}

fn validate_slug(slug: &str) -> Result<(), AppError> {
    let invalid = slug.is_empty()
        || slug != slug.trim()
        || slug == "."
        || slug == ".."
        || slug.contains(['/', '\\']);
    if invalid {
        return Err(AppError::invalid_input_field(
            format!("Invalid slug {:?}", slug),
            "slug",
        ));
    }
    Ok(())
}

/// URLs under `prefix` that appear in markdown or HTML text.
fn urls_with_prefix<'a>(text: &'a str, prefix: &str) -> Vec<&'a str> {
    const TERMINATORS: &[char] = &[')', '(', '"', '\'', '<', '>', '[', ']', '`'];
    text.match_indices(prefix)
        .map(|(start, _)| {
            let rest = &text[start..];
            let end = rest
                .find(|c: char| c.is_whitespace() || TERMINATORS.contains(&c))
                .unwrap_or(rest.len());
            &rest[..end]
        })
        .collect()
}

/// Every asset URL a post references inside its own directory.
fn post_asset_urls<'a>(dir: &AssetDir, markdown: &'a str, cover: Option<&'a str>) -> Vec<&'a str> {
    let mut urls = urls_with_prefix(markdown, dir.public_prefix());
    urls.extend(cover.filter(|c| dir.owns(c)));
    urls
}

/// Queue deletion of every file a post owns.
fn delete_post_files(
    changes: &mut ChangeSet,
    slug: &str,
    markdown: Option<&str>,
    cover: Option<&str>,
) {
    let dir = post_dir(slug);
    let urls = post_asset_urls(&dir, markdown.unwrap_or_default(), cover);
    dir.delete_stale(changes, urls, &HashSet::new());
    changes.delete(post_markdown_path(slug));
    changes.delete(post_config_path(slug));
}

/// Create a post or save edits to one.
#[derive(Debug, Clone)]
pub struct BlogPublish {
    pub post: BlogPost,

    /// The post as loaded when editing; `None` for a new post.
    pub original: Option<BlogPost>,

    /// Blog index as loaded.
    pub index: Vec<BlogIndexItem>,

    pub cover: Option<PendingUpload>,

    /// Inline images keyed by the placeholder the markdown uses for them.
    pub images: BTreeMap<String, PendingUpload>,
}

impl ChangeSetBuilder for BlogPublish {
    type State = Vec<BlogIndexItem>;

    fn build(self) -> Result<BuildOutput<Vec<BlogIndexItem>>, AppError> {
        let Self {
            post,
            original,
            mut index,
            cover,
            images,
        } = self;
        let BlogPost {
            mut meta,
            mut markdown,
        } = post;

        let slug = meta.slug.clone();
        validate_slug(&slug)?;
        let original_slug = original.as_ref().map(|p| p.meta.slug.clone());

        if original_slug.as_deref() != Some(slug.as_str()) && index.iter().any(|i| i.slug == slug)
        {
            return Err(AppError::invalid_input_field(
                format!("A post with slug {} already exists", slug),
                "slug",
            ));
        }

        let mut changes = ChangeSet::new(format!("publish blog post {}", slug));
        let dir = post_dir(&slug);

        for (placeholder, upload) in &images {
            if placeholder.is_empty() {
                return Err(AppError::invalid_input_field(
                    "Empty image placeholder",
                    "images",
                ));
            }
            let url = dir.stage(&mut changes, upload);
            markdown = markdown.replace(placeholder.as_str(), &url);
        }
        if let Some(cover) = &cover {
            meta.cover = Some(dir.stage(&mut changes, cover));
        }

        changes.write_text(post_markdown_path(&slug), markdown.as_str());
        changes.write_text(post_config_path(&slug), to_tab_json(&meta)?);

        let position = index
            .iter()
            .position(|i| Some(&i.slug) == original_slug.as_ref() || i.slug == slug);
        match position {
            Some(pos) => index[pos] = meta.clone(),
            None => index.insert(0, meta.clone()),
        }
        if let Some(old) = original_slug.as_deref().filter(|old| *old != slug) {
            index.retain(|i| i.slug != old);
        }
        changes.write_text(BLOG_INDEX_PATH, to_tab_json(&index)?);

        if let Some(original) = &original {
            let old_slug = original.meta.slug.as_str();
            let old_dir = post_dir(old_slug);
            let previous = post_asset_urls(&old_dir, &original.markdown, original.meta.cover.as_deref());
            let mut current: HashSet<&str> = urls_with_prefix(&markdown, old_dir.public_prefix())
                .into_iter()
                .collect();
            current.extend(meta.cover.as_deref());
            old_dir.delete_stale(&mut changes, previous, &current);

            if old_slug != slug {
                log::info!("Renaming blog post {} to {}", old_slug, slug);
                changes.delete(post_markdown_path(old_slug));
                changes.delete(post_config_path(old_slug));
            }
        }

        Ok(BuildOutput {
            changes,
            state: index,
        })
    }
}

/// Delete one post and its files.
#[derive(Debug, Clone)]
pub struct BlogDelete {
    pub slug: String,
    pub index: Vec<BlogIndexItem>,

    /// The post's markdown, used to find its inline images.
    pub markdown: Option<String>,
}

impl ChangeSetBuilder for BlogDelete {
    type State = Vec<BlogIndexItem>;

    fn build(self) -> Result<BuildOutput<Vec<BlogIndexItem>>, AppError> {
        let Self {
            slug,
            mut index,
            markdown,
        } = self;
        validate_slug(&slug)?;

        let position = index.iter().position(|i| i.slug == slug).ok_or_else(|| {
            AppError::invalid_input_field(format!("No blog post with slug {}", slug), "slug")
        })?;
        let removed = index.remove(position);

        let mut changes = ChangeSet::new(format!("delete blog post {}", slug));
        changes.write_text(BLOG_INDEX_PATH, to_tab_json(&index)?);
        delete_post_files(
            &mut changes,
            &slug,
            markdown.as_deref(),
            removed.cover.as_deref(),
        );

        Ok(BuildOutput {
            changes,
            state: index,
        })
    }
}

/// Batch edits from the blog management view: posts removed from the
/// index and a new category list.
#[derive(Debug, Clone, Default)]
pub struct BlogIndexEdit {
    pub previous: Vec<BlogIndexItem>,
    pub items: Vec<BlogIndexItem>,
    pub categories: Vec<String>,

    /// Markdown of removed posts, keyed by slug.
    pub removed_markdown: BTreeMap<String, String>,
}

impl BlogIndexEdit {
    /// Slugs present in the loaded index but not in the edited one.
    pub fn removed_slugs(&self) -> Vec<String> {
        let kept: HashSet<&str> = self.items.iter().map(|i| i.slug.as_str()).collect();
        self.previous
            .iter()
            .filter(|i| !kept.contains(i.slug.as_str()))
            .map(|i| i.slug.clone())
            .collect()
    }
}

/// Trim, drop empties and duplicates, keep order.
pub fn normalize_categories(categories: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    categories
        .iter()
        .map(|c| c.trim())
        .filter(|c| !c.is_empty() && seen.insert(*c))
        .map(str::to_string)
        .collect()
}

impl ChangeSetBuilder for BlogIndexEdit {
    type State = (Vec<BlogIndexItem>, Vec<String>);

    fn build(self) -> Result<BuildOutput<Self::State>, AppError> {
        let removed = self.removed_slugs();
        let Self {
            previous,
            items,
            categories,
            removed_markdown,
        } = self;

        let mut changes = ChangeSet::new(BLOG_INDEX_COMMIT_MESSAGE);
        let categories = normalize_categories(&categories);
        changes.write_text(BLOG_INDEX_PATH, to_tab_json(&items)?);
        changes.write_text(BLOG_CATEGORIES_PATH, to_tab_json(&categories)?);

        for slug in &removed {
            validate_slug(slug)?;
            let cover = previous
                .iter()
                .find(|i| &i.slug == slug)
                .and_then(|i| i.cover.as_deref());
            delete_post_files(
                &mut changes,
                slug,
                removed_markdown.get(slug).map(String::as_str),
                cover,
            );
        }

        Ok(BuildOutput {
            changes,
            state: (items, categories),
        })
    }
}
