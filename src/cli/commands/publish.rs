//! Publish command implementation.
//!
//! Runs the full pipeline and renders the per-module, per-target outcomes.

use super::helpers::load_publish_config;
use crate::cli::{Args, Command, RuntimeConfig};
use crate::error::Result;
use crate::publish::{PublishResult, Publisher, Selection};
use crate::report::PublishReport;
use crate::repository::HttpConnector;
use std::sync::Arc;

/// Execute publish command, returning the process exit code
pub(super) async fn execute_publish(args: &Args, config: &RuntimeConfig) -> Result<i32> {
    if let Command::Publish {
        version,
        modules,
        targets,
        skip_build,
        report,
    } = &args.command
    {
        let mut publish_config = load_publish_config(config, version.as_ref())?;
        publish_config.skip_build = *skip_build;
        if let Some(path) = report {
            publish_config.report_path = path.clone();
        }
        let report_path = publish_config.report_path.clone();

        let connector = Arc::new(HttpConnector::new(publish_config.http_timeout));
        let publisher = Publisher::new(publish_config, connector);
        let selection = Selection {
            modules: modules.clone(),
            targets: targets.clone(),
        };

        config.println("🚀 Starting publish");
        let report = publisher.run(&selection).await?;

        render_report(&report, config);

        match report.save(&report_path) {
            Ok(()) => config.verbose_println(&format!("Report written to {}", report_path.display())),
            Err(e) => config.warning_println(&format!("Could not write report: {}", e)),
        }

        if report.is_success() {
            config.success_println(&format!("Publish complete: {}", report.summary()));
            Ok(0)
        } else {
            let stages: Vec<String> = report
                .failed_stages()
                .iter()
                .map(ToString::to_string)
                .collect();
            config.error_println(&format!(
                "Publish failed at {} stage(s): {}",
                stages.join(", "),
                report.summary()
            ));
            Ok(1)
        }
    } else {
        unreachable!("execute_publish called with non-Publish command");
    }
}

/// Print one block per module with a line per target
pub(super) fn render_report(report: &PublishReport, config: &RuntimeConfig) {
    let output = config.output();
    for module in &report.modules {
        let version = module.version.as_deref().unwrap_or("<unresolved>");
        config.section(&format!("{} {}", module.module, version));
        for outcome in &module.results {
            let line = format!("{}: {}", outcome.target, outcome.result);
            match &outcome.result {
                PublishResult::Published { .. } => {
                    let _ = output.success(&line);
                }
                PublishResult::Skipped { .. } => {
                    let _ = output.skipped(&line);
                }
                PublishResult::Failed { .. } => output.error(&line),
            }
        }
    }
}
