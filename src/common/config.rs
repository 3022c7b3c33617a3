//! Configuration file handling

use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;

use super::paths::config_path;
use super::Result;

/// Main configuration structure
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Debug adapter configurations
    #[serde(default)]
    pub adapters: HashMap<String, AdapterConfig>,

    /// Default settings
    #[serde(default)]
    pub defaults: Defaults,

    /// Timeout settings
    #[serde(default)]
    pub timeouts: Timeouts,

    /// Fixture build settings
    #[serde(default)]
    pub build: BuildConfig,
}

/// Adapter type for specialized launch argument handling
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum AdapterType {
    /// lldb-dap (LLVM debugger)
    #[default]
    LldbDap,
    /// Generic DAP adapter (no special handling)
    Generic,
}

/// Configuration for a debug adapter
#[derive(Debug, Deserialize, Clone)]
pub struct AdapterConfig {
    /// Path to the adapter executable
    pub path: PathBuf,

    /// Additional arguments to pass to the adapter
    #[serde(default)]
    pub args: Vec<String>,

    /// Adapter type for specialized handling
    #[serde(default)]
    pub adapter_type: AdapterType,
}

/// Default settings
#[derive(Debug, Deserialize)]
pub struct Defaults {
    /// Default adapter to use
    #[serde(default = "default_adapter")]
    pub adapter: String,

    /// Prefix that marks REPL input as a debugger command rather than an expression
    #[serde(default = "default_escape_prefix")]
    pub command_escape_prefix: String,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            adapter: default_adapter(),
            command_escape_prefix: default_escape_prefix(),
        }
    }
}

fn default_adapter() -> String {
    "lldb-dap".to_string()
}

fn default_escape_prefix() -> String {
    "`".to_string()
}

/// Timeout settings in seconds
#[derive(Debug, Deserialize)]
pub struct Timeouts {
    /// Timeout for DAP initialize request
    #[serde(default = "default_dap_initialize")]
    pub dap_initialize_secs: u64,

    /// Timeout for general DAP requests
    #[serde(default = "default_dap_request")]
    pub dap_request_secs: u64,

    /// How long `run` waits for the process to stop or exit
    #[serde(default = "default_stop")]
    pub stop_secs: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            dap_initialize_secs: default_dap_initialize(),
            dap_request_secs: default_dap_request(),
            stop_secs: default_stop(),
        }
    }
}

fn default_dap_initialize() -> u64 {
    10
}
fn default_dap_request() -> u64 {
    30
}
fn default_stop() -> u64 {
    60
}

/// Compiler settings for fixture builds
#[derive(Debug, Deserialize)]
pub struct BuildConfig {
    /// C compiler
    #[serde(default = "default_cc")]
    pub cc: String,

    /// C++ compiler
    #[serde(default = "default_cxx")]
    pub cxx: String,

    /// Flags passed before any scenario-specific flags
    #[serde(default = "default_flags")]
    pub flags: Vec<String>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            cc: default_cc(),
            cxx: default_cxx(),
            flags: default_flags(),
        }
    }
}

fn default_cc() -> String {
    "cc".to_string()
}
fn default_cxx() -> String {
    "c++".to_string()
}
fn default_flags() -> Vec<String> {
    vec!["-g".to_string(), "-O0".to_string()]
}

impl Config {
    /// Load configuration from the default config file
    ///
    /// Returns default configuration if file doesn't exist
    pub fn load() -> Result<Self> {
        if let Some(path) = config_path() {
            if path.exists() {
                let content = std::fs::read_to_string(&path).map_err(|e| {
                    super::Error::FileRead {
                        path: path.display().to_string(),
                        error: e.to_string(),
                    }
                })?;
                return Self::parse(&content);
            }
        }
        Ok(Self::default())
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| super::Error::ConfigParse(e.to_string()))
    }

    /// Get adapter configuration by name
    ///
    /// Falls back to searching PATH if not explicitly configured
    pub fn get_adapter(&self, name: &str) -> Option<AdapterConfig> {
        if let Some(config) = self.adapters.get(name) {
            return Some(config.clone());
        }

        which::which(name).ok().map(|path| {
            let adapter_type = match name {
                "lldb-dap" | "lldb-vscode" => AdapterType::LldbDap,
                _ => AdapterType::Generic,
            };
            AdapterConfig {
                path,
                args: Vec::new(),
                adapter_type,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.defaults.adapter, "lldb-dap");
        assert_eq!(config.defaults.command_escape_prefix, "`");
        assert_eq!(config.timeouts.stop_secs, 60);
        assert_eq!(config.build.cxx, "c++");
        assert_eq!(config.build.flags, vec!["-g", "-O0"]);
    }

    #[test]
    fn test_adapter_table() {
        let config = Config::parse(
            r#"
[adapters.mock]
path = "/opt/mock/bin/adapter"
args = ["--stdio"]
adapter_type = "generic"

[defaults]
adapter = "mock"

[timeouts]
stop_secs = 5
"#,
        )
        .unwrap();

        let adapter = config.get_adapter("mock").unwrap();
        assert_eq!(adapter.path, PathBuf::from("/opt/mock/bin/adapter"));
        assert_eq!(adapter.args, vec!["--stdio"]);
        assert_eq!(adapter.adapter_type, AdapterType::Generic);
        assert_eq!(config.defaults.adapter, "mock");
        assert_eq!(config.timeouts.stop_secs, 5);
        assert_eq!(config.timeouts.dap_request_secs, 30);
    }

    #[test]
    fn test_invalid_toml_is_parse_error() {
        let err = Config::parse("[timeouts\nstop_secs = ").unwrap_err();
        assert!(matches!(err, super::super::Error::ConfigParse(_)));
    }
}
