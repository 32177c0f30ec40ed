//! Status command implementation.
//!
//! Displays the report of the last publish run.

use super::publish::render_report;
use crate::cli::{Args, Command, RuntimeConfig};
use crate::config::ProjectManifest;
use crate::error::{ReleaseError, Result};
use crate::report::{PublishReport, REPORT_FILE_NAME};
use std::path::PathBuf;

/// Execute status command
pub(super) async fn execute_status(args: &Args, config: &RuntimeConfig) -> Result<()> {
    if let Command::Status { report, json } = &args.command {
        let path = match report {
            Some(path) => path.clone(),
            None => default_report_path(config),
        };
        config.verbose_println(&format!("Reading report {}", path.display()));

        if !path.is_file() {
            if *json {
                println!("{{\"status\": \"no_report\"}}");
            } else {
                config.println("No publish report found");
            }
            return Ok(());
        }

        let report = PublishReport::load(&path)?;

        if *json {
            let json_output = serde_json::to_string_pretty(&report).map_err(ReleaseError::Json)?;
            println!("{}", json_output);
        } else {
            config.println(&format!("📊 {}", report.summary()));
            config.verbose_println(&format!("Started: {}", report.started_at));
            config.verbose_println(&format!("Finished: {}", report.finished_at));
            render_report(&report, config);
        }
    } else {
        unreachable!("execute_status called with non-Status command");
    }

    Ok(())
}

/// Report next to the manifest, falling back to the manifest's directory when it can't be read
fn default_report_path(config: &RuntimeConfig) -> PathBuf {
    match ProjectManifest::load(&config.manifest_path) {
        Ok(manifest) => manifest.root.join(REPORT_FILE_NAME),
        Err(_) => config
            .manifest_path
            .parent()
            .map(|p| p.join(REPORT_FILE_NAME))
            .unwrap_or_else(|| PathBuf::from(REPORT_FILE_NAME)),
    }
}
