//! Debug Adapter Protocol (DAP) implementation
//!
//! Client side of DAP for driving debug adapters like lldb-dap.

pub mod client;
pub mod codec;
pub mod types;

pub use client::DapClient;
pub use types::*;
