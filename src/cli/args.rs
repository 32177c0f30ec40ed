//! Command line argument parsing and validation.

use crate::config::MANIFEST_FILE_NAME;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Signed, staged publishing of multi-module library artifacts
#[derive(Parser, Debug)]
#[command(
    name = "kodegen_publish",
    version,
    about = "Publish multi-module library artifacts to Maven-style repositories",
    long_about = "Resolve versions, sign artifacts and publish every module of a project to the
repositories declared in Publish.toml. Stages whose credentials are missing are skipped.

Usage:
  kodegen_publish publish
  kodegen_publish publish --version 1.2.0 --module core
  kodegen_publish validate --json
  kodegen_publish pom --module core"
)]
pub struct Args {
    /// Path to Publish.toml
    #[arg(long, global = true, value_name = "PATH", default_value = MANIFEST_FILE_NAME)]
    pub manifest: PathBuf,

    /// Dotenv file merged into the environment (real variables win)
    #[arg(long, global = true, value_name = "PATH")]
    pub env_file: Option<PathBuf>,

    /// Show detailed progress
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only print errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Command to run
    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Build, sign and publish modules
    Publish {
        /// Version override (takes precedence over PUBLISH_VERSION and the manifest)
        #[arg(long)]
        version: Option<String>,

        /// Only publish these modules (repeatable)
        #[arg(long = "module", value_name = "ARTIFACT_ID")]
        modules: Vec<String>,

        /// Only publish to these targets (repeatable)
        #[arg(long = "target", value_name = "NAME")]
        targets: Vec<String>,

        /// Do not run the configured compile/test commands
        #[arg(long)]
        skip_build: bool,

        /// Where to write the publish report
        #[arg(long, value_name = "PATH")]
        report: Option<PathBuf>,
    },

    /// Check metadata, versions and credentials without touching the network
    Validate {
        /// Version override used for the check
        #[arg(long)]
        version: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the rendered POM of a module
    Pom {
        /// Module artifact id
        #[arg(long = "module", value_name = "ARTIFACT_ID")]
        module: String,

        /// Version override
        #[arg(long)]
        version: Option<String>,
    },

    /// Show the last publish report
    Status {
        /// Report file to read
        #[arg(long, value_name = "PATH")]
        report: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

impl Command {
    /// Command name for messages
    pub fn name(&self) -> &'static str {
        match self {
            Command::Publish { .. } => "publish",
            Command::Validate { .. } => "validate",
            Command::Pom { .. } => "pom",
            Command::Status { .. } => "status",
        }
    }
}

impl Args {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate arguments for consistency
    pub fn validate(&self) -> Result<(), String> {
        let blank = |v: &Option<String>| v.as_ref().is_some_and(|v| v.trim().is_empty());

        match &self.command {
            Command::Publish {
                version,
                modules,
                targets,
                ..
            } => {
                if blank(version) {
                    return Err("--version must not be empty".to_string());
                }
                if modules.iter().chain(targets).any(|n| n.trim().is_empty()) {
                    return Err("--module and --target values must not be empty".to_string());
                }
            }
            Command::Validate { version, .. } | Command::Pom { version, .. } => {
                if blank(version) {
                    return Err("--version must not be empty".to_string());
                }
            }
            Command::Status { .. } => {}
        }

        Ok(())
    }
}

/// Configuration derived from command line arguments
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Output manager for colored terminal output
    output: super::OutputManager,
    /// Manifest location
    pub manifest_path: PathBuf,
    /// Optional dotenv file
    pub env_file: Option<PathBuf>,
}

impl From<&Args> for RuntimeConfig {
    fn from(args: &Args) -> Self {
        Self {
            output: super::OutputManager::new(args.verbose, args.quiet),
            manifest_path: args.manifest.clone(),
            env_file: args.env_file.clone(),
        }
    }
}

impl RuntimeConfig {
    /// Get a reference to the output manager
    pub fn output(&self) -> &super::OutputManager {
        &self.output
    }

    /// Print message
    pub fn println(&self, message: &str) {
        let _ = self.output.println(message);
    }

    /// Print verbose message
    pub fn verbose_println(&self, message: &str) {
        let _ = self.output.verbose(message);
    }

    /// Print error message (always shown)
    pub fn error_println(&self, message: &str) {
        self.output.error(message);
    }

    /// Print warning message
    pub fn warning_println(&self, message: &str) {
        let _ = self.output.warn(message);
    }

    /// Print success message
    pub fn success_println(&self, message: &str) {
        let _ = self.output.success(message);
    }

    /// Print section header
    pub fn section(&self, title: &str) {
        let _ = self.output.section(title);
    }

    /// Print indented text
    pub fn indent(&self, message: &str) {
        let _ = self.output.indent(message);
    }

    /// Check if verbose output is enabled
    pub fn is_verbose(&self) -> bool {
        self.output.is_verbose()
    }

    /// Check if quiet mode is enabled
    pub fn is_quiet(&self) -> bool {
        self.output.is_quiet()
    }
}
