//! Regression scenario runner
//!
//! Reads YAML scenarios, builds their fixture program, and drives a
//! [`CommandInterpreter`](crate::interpreter::CommandInterpreter) through
//! the scripted commands, checking each result.

mod build;
mod config;
mod expect;
mod platform;
mod runner;

pub use build::build_fixture;
pub use config::*;
pub use platform::{host_description, host_platform, platform_matches};
pub use runner::{
    execute_steps, run_scenario, run_suite, Outcome, RunOptions, StepsReport, SuiteSummary,
    TestResult,
};
