//! Business logic services.
//!
//! This module contains the credential vault, the installation token
//! broker and the git publish pipeline, plus the GitHub client they drive.
//!
//! Services are independent of any UI framework; the network seams are
//! traits so tests can substitute recording fakes.

pub mod credentials;
pub mod github_client;
pub mod pipeline;
pub mod publish_events;
pub mod session;
pub mod token_broker;
pub mod vault;

pub use credentials::{
    store_from_settings, CredentialStore, FileCredentialStore, KeyringCredentialStore,
    MemoryCredentialStore,
};
pub use github_client::{AppInstallationApi, GitHost, GitHubClient, GitHubClientConfig};
pub use pipeline::{GitPipeline, PipelineStage};
pub use publish_events::{PublishEvents, PublishPhase, PublishProgressPayload};
pub use session::SessionContext;
pub use token_broker::TokenBroker;
pub use vault::CredentialVault;
