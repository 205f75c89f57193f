//! Site Publisher - commit-based publishing backend for a self-hosted site.
//!
//! Content edited in the browser is published by committing the changed
//! files straight to the site's GitHub repository. A passphrase-protected
//! GitHub App private key is exchanged for a short-lived installation token,
//! and each edit becomes exactly one commit built from blobs, a tree and a
//! single-parent commit before the branch is moved.
//!
//! - [`services::CredentialVault`] keeps the key encrypted at rest.
//! - [`services::TokenBroker`] turns the key into an installation token.
//! - [`services::GitPipeline`] turns a [`models::ChangeSet`] into a commit.
//! - [`builders`] turn domain edits into change-sets.

pub mod builders;
pub mod commands;
pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod state;

pub use config::AppSettings;
pub use error::AppError;
pub use state::AppState;
