//! Test scenario configuration types
//!
//! Defines the data structures for deserializing YAML test scenarios.

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// A complete test scenario loaded from a YAML file
#[derive(Deserialize, Debug)]
pub struct TestScenario {
    /// Name of the test scenario
    pub name: String,
    /// Optional description of what the test verifies
    pub description: Option<String>,
    /// Host operating systems the scenario runs on; all hosts when absent
    pub platforms: Option<Vec<String>>,
    /// Fixture program to compile before the steps run
    pub build: Option<BuildSpec>,
    /// Optional setup steps to run before the build
    pub setup: Option<Vec<SetupStep>>,
    /// Debug adapter to use instead of the configured default
    pub adapter: Option<String>,
    /// The sequence of test steps to execute
    pub steps: Vec<TestStep>,
}

impl TestScenario {
    /// Parse a scenario from YAML text
    pub fn from_yaml(content: &str) -> crate::common::Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }
}

/// A setup step that runs before the test
#[derive(Deserialize, Debug)]
pub struct SetupStep {
    /// Shell command to execute
    pub shell: String,
}

/// Source language of a fixture
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    C,
    #[serde(alias = "c++", alias = "cpp")]
    Cxx,
}

impl Language {
    /// Infer the language from a source file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "c" => Some(Self::C),
            "cpp" | "cc" | "cxx" | "C" | "mm" => Some(Self::Cxx),
            _ => None,
        }
    }
}

/// How to compile the fixture program
#[derive(Deserialize, Debug)]
pub struct BuildSpec {
    /// Source files, relative to the scenario file
    pub sources: Vec<PathBuf>,
    /// Language; inferred from the first source when absent
    pub language: Option<Language>,
    /// Extra compiler flags
    #[serde(default)]
    pub flags: Vec<String>,
    /// Name of the produced executable
    #[serde(default = "default_output")]
    pub output: String,
}

fn default_output() -> String {
    "a.out".to_string()
}

/// A single test step in the execution flow
#[derive(Deserialize, Debug)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum TestStep {
    /// Run a command, optionally requiring it to succeed
    RunCmd {
        /// The command to execute (e.g., "file $EXE", "run")
        command: String,
        /// Explanation shown when the step fails
        message: Option<String>,
        /// Fail the step if the command does not succeed
        #[serde(default = "default_true")]
        check: bool,
    },
    /// Run a command and match its output
    Expect {
        /// The command to execute (e.g., "frame diagnose")
        command: String,
        /// What the output must (or must not) contain
        #[serde(default)]
        expect: Expectation,
    },
}

impl TestStep {
    /// The raw command text of this step
    pub fn command(&self) -> &str {
        match self {
            TestStep::RunCmd { command, .. } | TestStep::Expect { command, .. } => command,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Matchers applied to a command's output
#[derive(Deserialize, Debug, Clone)]
pub struct Expectation {
    /// Explanation shown when the expectation fails
    pub message: Option<String>,
    /// Text must start with this
    pub startstr: Option<String>,
    /// Text must end with this
    pub endstr: Option<String>,
    /// Every entry must appear in the text
    pub substrs: Option<Vec<String>>,
    /// The command is expected to fail; match its error text instead
    #[serde(default)]
    pub error: bool,
    /// When false, none of the matchers may hold
    #[serde(default = "default_true")]
    pub matching: bool,
}

impl Default for Expectation {
    fn default() -> Self {
        Self {
            message: None,
            startstr: None,
            endstr: None,
            substrs: None,
            error: false,
            matching: true,
        }
    }
}

/// Substitute `$EXE` / `${EXE}` with the built executable path
pub fn expand_command(command: &str, exe: Option<&Path>) -> String {
    match exe {
        Some(exe) => {
            let exe = exe.to_string_lossy();
            command.replace("${EXE}", &exe).replace("$EXE", &exe)
        }
        None => command.to_string(),
    }
}
