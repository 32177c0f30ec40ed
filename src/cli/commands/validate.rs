//! Validate command implementation.
//!
//! Runs every offline check a publish would run first: descriptors, versions, target URLs
//! and which credential-dependent stages would be active.

use super::helpers::load_publish_config;
use crate::cli::{Args, Command, RuntimeConfig};
use crate::config::PublishConfig;
use crate::credentials::{Credentials, SigningCredentials};
use crate::descriptor::ModuleDescriptor;
use crate::error::{CliError, ReleaseError, Result};
use crate::repository::RepositoryTarget;
use crate::version::{Channel, VersionResolver};
use serde::Serialize;

/// Validation outcome of one module
#[derive(Debug, Serialize)]
pub(super) struct ModuleCheck {
    module: String,
    coordinate: Option<String>,
    channel: Option<Channel>,
    errors: Vec<String>,
}

/// Validation outcome of one target
#[derive(Debug, Serialize)]
pub(super) struct TargetCheck {
    name: String,
    release_url: Option<String>,
    snapshot_url: Option<String>,
    staged: bool,
    credentials: bool,
    errors: Vec<String>,
}

/// Full validation result
#[derive(Debug, Serialize)]
pub(super) struct Validation {
    success: bool,
    signing: bool,
    modules: Vec<ModuleCheck>,
    targets: Vec<TargetCheck>,
}

pub(super) fn validate_config(config: &PublishConfig) -> Validation {
    let manifest = &config.manifest;
    let resolver = VersionResolver::new(
        &manifest.versioning,
        config.version_override.as_deref(),
        manifest.project.version.as_deref(),
    );

    let modules: Vec<ModuleCheck> = manifest
        .modules
        .iter()
        .map(|module| {
            let mut errors = Vec::new();
            let descriptor = ModuleDescriptor::build(&manifest.project, module)
                .map_err(|e| errors.push(e.to_string()))
                .ok();
            let version = resolver
                .resolve(module)
                .map_err(|e| errors.push(e.to_string()))
                .ok();

            ModuleCheck {
                module: module.artifact_id.clone(),
                coordinate: descriptor
                    .zip(version.as_ref())
                    .map(|(d, v)| d.coordinate(&v.raw)),
                channel: version.map(|v| v.channel),
                errors,
            }
        })
        .collect();

    let targets: Vec<TargetCheck> = manifest
        .targets
        .iter()
        .map(|target| {
            let credentials = Credentials::from_env(&config.env, &target.env_prefix())
                .repository_auth()
                .is_some();
            match RepositoryTarget::from_config(target, &config.env) {
                Ok(resolved) => TargetCheck {
                    name: resolved.name.clone(),
                    release_url: Some(resolved.release_url.to_string()),
                    snapshot_url: Some(resolved.snapshot_url.to_string()),
                    staged: resolved.staged,
                    credentials,
                    errors: Vec::new(),
                },
                Err(e) => TargetCheck {
                    name: target.name.clone(),
                    release_url: None,
                    snapshot_url: None,
                    staged: target.staged,
                    credentials,
                    errors: vec![e.to_string()],
                },
            }
        })
        .collect();

    let success = modules.iter().all(|m| m.errors.is_empty())
        && targets.iter().all(|t| t.errors.is_empty());

    Validation {
        success,
        signing: SigningCredentials::present_in(&config.env),
        modules,
        targets,
    }
}

/// Execute validate command
pub(super) async fn execute_validate(args: &Args, config: &RuntimeConfig) -> Result<()> {
    if let Command::Validate { version, json } = &args.command {
        config.verbose_println("Validating publish configuration...");

        let publish_config = load_publish_config(config, version.as_ref())?;
        let validation = validate_config(&publish_config);

        if *json {
            let json_output =
                serde_json::to_string_pretty(&validation).map_err(ReleaseError::Json)?;
            println!("{}", json_output);
        } else {
            config.section("Modules");
            for module in &validation.modules {
                match (&module.coordinate, module.errors.is_empty()) {
                    (Some(coordinate), true) => config.success_println(&format!(
                        "{} ({})",
                        coordinate,
                        module.channel.map(|c| c.to_string()).unwrap_or_default()
                    )),
                    _ => {
                        config.error_println(&module.module);
                        for error in &module.errors {
                            config.indent(&format!("• {}", error));
                        }
                    }
                }
            }

            config.section("Targets");
            for target in &validation.targets {
                if target.errors.is_empty() {
                    let credentials = if target.credentials {
                        "credentials present"
                    } else {
                        "no credentials, will be skipped"
                    };
                    config.success_println(&format!("{} ({})", target.name, credentials));
                } else {
                    config.error_println(&target.name);
                    for error in &target.errors {
                        config.indent(&format!("• {}", error));
                    }
                }
            }

            if validation.signing {
                config.success_println("Signing credentials present");
            } else {
                config.warning_println("No signing credentials: artifacts will be unsigned");
            }
        }

        if !validation.success {
            return Err(ReleaseError::Cli(CliError::ExecutionFailed {
                command: "validate".to_string(),
                reason: "Publish configuration is invalid".to_string(),
            }));
        }
    } else {
        unreachable!("execute_validate called with non-Validate command");
    }

    Ok(())
}
