//! Data models for the publisher.
//!
//! These models describe edited site content, the change-sets built from it,
//! and the GitHub wire types the pipeline exchanges.

pub mod credential;
pub mod file_change;
pub mod git_objects;
pub mod site;

// Re-exports for convenient access
pub use credential::{AuthStatus, CredentialRecord};
pub use file_change::{ChangeOperation, ChangeSet, ChangeSummary, FileChange, FileContent};
pub use git_objects::{PublishOutcome, TreeEntry};
pub use site::{
    BlogIndexItem, BlogPost, CardStyles, ImageRef, Picture, Project, Share, SiteContent,
    SocialButton,
};
