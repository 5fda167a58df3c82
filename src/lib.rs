//! Dependency-aware developer workstation provisioning.
//!
//! A catalog of software entries (id, installer kind, version probe,
//! dependencies, install/update/uninstall recipes) is resolved into a
//! dependency order and executed by a bounded worker pool, with live status
//! detection and per-task output streaming.
//!
//! The public API is organised into layers:
//!
//! - **[`catalog`]** and **[`config`]**: the software registry, templates,
//!   latest versions and run settings
//! - **[`resolver`]**: dependency closure, ordering and cycle detection
//! - **[`status`]**: installed-version probes
//! - **[`engine`]**: installer adapters and single-task execution
//! - **[`orchestrator`]**: dependency-gated parallel runs and task events
//! - **[`commands`]**: top-level subcommands
#![deny(clippy::or_fun_call)]
#![deny(clippy::bool_to_int_with_if)]

pub mod cancel;
pub mod catalog;
pub mod cli;
pub mod commands;
pub mod config;
pub mod engine;
pub mod error;
pub mod exec;
pub mod history;
pub mod logging;
pub mod orchestrator;
pub mod resolver;
pub mod status;

#[cfg(test)]
mod test_helpers;
