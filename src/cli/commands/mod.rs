//! Command execution functions.
//!
//! Dispatches the parsed command and turns errors into exit codes with recovery
//! suggestions.

mod helpers;
mod pom;
mod publish;
mod status;
mod validate;

use crate::cli::{Args, Command, RuntimeConfig};
use crate::error::{ReleaseError, Result};

use pom::execute_pom;
use publish::execute_publish;
use status::execute_status;
use validate::execute_validate;

/// Execute the main command based on parsed arguments
pub async fn execute_command(args: Args) -> Result<i32> {
    // Validate arguments
    if let Err(validation_error) = args.validate() {
        // Create output for validation errors (never quiet)
        let output = super::OutputManager::new(false, false);
        output.error(&format!("Invalid arguments: {}", validation_error));
        return Ok(1);
    }

    let config = RuntimeConfig::from(&args);

    let result = match &args.command {
        // Publish reports its own outcome and exit code
        Command::Publish { .. } => execute_publish(&args, &config).await,
        command => {
            let result = match command {
                Command::Validate { .. } => execute_validate(&args, &config).await,
                Command::Pom { .. } => execute_pom(&args, &config).await,
                Command::Status { .. } => execute_status(&args, &config).await,
                Command::Publish { .. } => unreachable!(),
            };
            result.map(|()| {
                if matches!(command, Command::Validate { .. }) && !config.is_quiet() {
                    config.success_println(&format!(
                        "Command '{}' completed successfully",
                        command.name()
                    ));
                }
                0
            })
        }
    };

    match result {
        Ok(exit_code) => Ok(exit_code),
        Err(e) => {
            report_failure(&args, &config, &e);
            Ok(1)
        }
    }
}

fn report_failure(args: &Args, config: &RuntimeConfig, error: &ReleaseError) {
    config.error_println(&format!(
        "Command '{}' failed: {}",
        args.command.name(),
        error
    ));

    let suggestions = error.recovery_suggestions();
    if !suggestions.is_empty() && !config.is_quiet() {
        config.println("\n💡 Recovery suggestions:");
        for suggestion in suggestions {
            config.println(&format!("  • {}", suggestion));
        }
    }
}
