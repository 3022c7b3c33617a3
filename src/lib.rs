//! crashprobe - crash-diagnosis regression runner
//!
//! This library drives debuggers through the Debug Adapter Protocol (DAP)
//! and checks their crash diagnosis against YAML scenarios.

pub mod cli;
pub mod commands;
pub mod common;
pub mod dap;
pub mod interpreter;
pub mod session;
pub mod testing;

// Re-export commonly used types for tests
pub use common::{Error, Result};
pub use interpreter::{CommandInterpreter, CommandReturn};
