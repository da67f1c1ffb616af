//! Settings file management

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::VersiondError;
use crate::filesys::file::File;
use crate::logs::LogLevel;

/// Service settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Log level
    pub log_level: LogLevel,

    /// Emit JSON log lines
    pub json_logs: bool,

    /// HTTP server configuration
    pub server: ServerSettings,

    /// Deployment folder used when a start request does not name one
    pub deployment_folder: String,

    /// Capacity of the in-memory debug log
    pub debug_buffer_capacity: usize,

    /// Build rules per component kind
    pub build: BuildSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            json_logs: false,
            server: ServerSettings::default(),
            deployment_folder: default_deployment_folder(),
            debug_buffer_capacity: 1000,
            build: BuildSettings::default(),
        }
    }
}

impl Settings {
    /// Read settings from `file`, falling back to defaults when it does not exist
    pub async fn load(file: &File) -> Result<Self, VersiondError> {
        if !file.exists().await {
            info!("No settings file at {}, using defaults", file.path().display());
            return Ok(Self::default());
        }
        file.read_json::<Settings>().await.map_err(|e| {
            VersiondError::ConfigError(format!(
                "Unable to read settings file {}: {}",
                file.path().display(),
                e
            ))
        })
    }
}

fn default_deployment_folder() -> String {
    if cfg!(windows) {
        "C:/OPT/jboss-eap-8.0.5/standalone/deployments".to_string()
    } else {
        "/opt/jboss/standalone/deployments".to_string()
    }
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5055,
        }
    }
}

/// A program and its arguments
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSpec {
    pub program: String,

    #[serde(default)]
    pub args: Vec<String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>, args: &[&str]) -> Self {
        Self {
            program: program.into(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }
}

/// How components are built and where their artifacts land
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildSettings {
    /// Artifact file extension, without the dot
    pub artifact_extension: String,

    /// Build output directory, relative to the build directory
    pub output_dir: String,

    /// Components built from a nested module directory (case-insensitive)
    pub multi_module_components: Vec<String>,

    /// Module directory of multi-module components
    pub module_dir: String,

    /// Build command for standard components
    pub standard_command: CommandSpec,

    /// Build command for multi-module components
    pub multi_module_command: CommandSpec,
}

impl Default for BuildSettings {
    fn default() -> Self {
        let (npm, mvn) = if cfg!(windows) {
            ("npm.cmd", "mvn.cmd")
        } else {
            ("npm", "mvn")
        };

        Self {
            artifact_extension: "war".to_string(),
            output_dir: "target".to_string(),
            multi_module_components: vec!["opt-soa".to_string()],
            module_dir: "SOA".to_string(),
            standard_command: CommandSpec::new(npm, &["run", "build"]),
            multi_module_command: CommandSpec::new(mvn, &["clean", "install"]),
        }
    }
}

impl BuildSettings {
    pub fn is_multi_module(&self, name: &str) -> bool {
        self.multi_module_components
            .iter()
            .any(|n| n.eq_ignore_ascii_case(name))
    }
}
