//! Command handlers called by the editing UI.
//!
//! Commands are organized by functionality:
//! - `auth`: vault setup, unlock, logout and reset
//! - `publish`: per-domain publish operations

pub mod auth;
pub mod publish;

pub use auth::{auth_status, login, logout, reset_credentials, LoginInput};
pub use publish::{
    delete_blog_post, publish_blog_post, publish_gallery, publish_projects, publish_shares,
    publish_site_config, save_blog_edits, PublishResponse,
};
