//! External compile and test steps.
//!
//! The publisher does not compile or test anything itself. It runs the commands configured
//! under `[build]` and only looks at their exit status.

use crate::config::BuildConfig;
use crate::error::{BuildError, Result};
use std::path::Path;
use tokio::process::Command;

/// Placeholder replaced by the module's artifact id in command arguments
pub const MODULE_PLACEHOLDER: &str = "{module}";

/// One configured command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildStep {
    /// Step name (`compile`, `test`)
    pub name: &'static str,
    /// Program followed by its arguments
    pub argv: Vec<String>,
}

impl BuildStep {
    /// Configured steps in execution order; empty commands are ignored
    pub fn from_config(config: &BuildConfig) -> Vec<BuildStep> {
        [("compile", &config.compile), ("test", &config.test)]
            .into_iter()
            .filter_map(|(name, argv)| {
                argv.as_ref()
                    .filter(|argv| !argv.is_empty())
                    .map(|argv| BuildStep {
                        name,
                        argv: argv.clone(),
                    })
            })
            .collect()
    }

    /// Run the step for `module` with `root` as working directory
    pub async fn run(&self, module: &str, root: &Path) -> Result<()> {
        let argv: Vec<String> = self
            .argv
            .iter()
            .map(|arg| arg.replace(MODULE_PLACEHOLDER, module))
            .collect();
        let command_line = argv.join(" ");

        let Some((program, args)) = argv.split_first() else {
            return Ok(());
        };

        log::info!("Running {} step for {}: {}", self.name, module, command_line);

        let output = Command::new(program)
            .args(args)
            .current_dir(root)
            .output()
            .await
            .map_err(|e| BuildError::SpawnFailed {
                step: self.name.to_string(),
                command: command_line.clone(),
                reason: e.to_string(),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            log::error!("{} step failed for {}:\n{}", self.name, module, stderr.trim());
            return Err(BuildError::StepFailed {
                step: self.name.to_string(),
                module: module.to_string(),
                code: output.status.code(),
            }
            .into());
        }

        Ok(())
    }
}

/// Run every configured step for `module`, stopping at the first failure
pub async fn run_steps(steps: &[BuildStep], module: &str, root: &Path) -> Result<()> {
    for step in steps {
        step.run(module, root).await?;
    }
    Ok(())
}
