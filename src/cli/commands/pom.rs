//! Pom command implementation.
//!
//! Prints the descriptor exactly as it would be uploaded.

use super::helpers::load_publish_config;
use crate::cli::{Args, Command, RuntimeConfig};
use crate::descriptor::{ModuleDescriptor, render_pom};
use crate::error::Result;
use crate::version::VersionResolver;

/// Execute pom command
pub(super) async fn execute_pom(args: &Args, config: &RuntimeConfig) -> Result<()> {
    if let Command::Pom { module, version } = &args.command {
        let publish_config = load_publish_config(config, version.as_ref())?;
        let manifest = &publish_config.manifest;
        let module = manifest.module(module)?;

        let descriptor = ModuleDescriptor::build(&manifest.project, module)?;
        let version = VersionResolver::new(
            &manifest.versioning,
            publish_config.version_override.as_deref(),
            manifest.project.version.as_deref(),
        )
        .resolve(module)?;

        print!("{}", render_pom(&descriptor, &version.raw)?);
    } else {
        unreachable!("execute_pom called with non-Pom command");
    }

    Ok(())
}
