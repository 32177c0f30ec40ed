//! Remote repository access.
//!
//! [`RepositoryTarget`] describes where a module goes, [`RepositoryClient`] is the session
//! used to get it there and [`HttpConnector`] opens real HTTP sessions.

mod client;
mod http;
mod retry;
mod target;

pub use client::{RepositoryClient, RepositoryConnector, StagingRepository, UploadDestination};
pub use http::{DEFAULT_MAX_POLLS, DEFAULT_POLL_INTERVAL, HttpConnector, HttpRepositoryClient};
pub use retry::retry_with_backoff;
pub use target::RepositoryTarget;
