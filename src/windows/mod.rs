//! Windows telemetry collaborators
//!
//! One module per metric family. Every query returns a snapshot struct on a
//! best-effort basis: a failed OS call degrades to a neutral default or an
//! omitted field, never to an error. On non-Windows targets the queries
//! compile to stubs returning empty snapshots.

pub mod connections;
pub mod cpu;
pub mod disk;
pub mod gpu;
pub mod memory;
pub mod network;
#[cfg(windows)]
pub mod perf;
pub mod power;
pub mod process;
pub mod system;

#[cfg(windows)]
pub(crate) mod util;
