//! # KODEGEN Publish
//!
//! Signed, staged publishing of multi-module library artifacts to Maven-style repositories.
//!
//! Each module of a project goes through the same pipeline: its descriptor is built from
//! shared project metadata, its version is resolved and classified as release or snapshot,
//! its artifacts are signed, and the result is uploaded to every configured repository
//! target. Stages whose credentials are absent are skipped instead of failing the run.
//!
//! ## Features
//!
//! - **Credential-conditional stages**: no signing key means unsigned artifacts, no
//!   repository credentials means the target is skipped
//! - **Release/snapshot routing**: `-SNAPSHOT` versions go to the snapshot endpoint
//! - **Staging barrier**: staged releases of all modules share one staging repository that is
//!   only closed after every upload succeeded
//! - **Report**: every run writes a per-module, per-target outcome report
//!
//! ## Usage
//!
//! ```bash
//! kodegen_publish validate                  # Offline check of metadata and credentials
//! kodegen_publish publish --version 1.2.0   # Publish every module
//! kodegen_publish pom --module core         # Print a module's POM
//! kodegen_publish status                    # Show the last report
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

// Core modules
pub mod artifact;
pub mod build;
pub mod cli;
pub mod config;
pub mod credentials;
pub mod descriptor;
pub mod error;
pub mod publish;
pub mod report;
pub mod repository;
pub mod signing;
pub mod version;

// Re-export main types for public API
pub use artifact::{ArtifactFile, ArtifactKind, ArtifactSet};
pub use cli::Args;
pub use config::{EnvConfig, ProjectManifest, PublishConfig};
pub use credentials::{Credentials, SigningCredentials};
pub use descriptor::ModuleDescriptor;
pub use error::{CliError, ErrorKind, ReleaseError, Result};
pub use publish::{PublishResult, Publisher, RepositoryPublisher, Selection, Stage};
pub use report::PublishReport;
pub use repository::{HttpConnector, RepositoryClient, RepositoryConnector, RepositoryTarget};
pub use signing::{Signer, SigningOutcome};
pub use version::{Channel, ResolvedVersion, VersionResolver};
