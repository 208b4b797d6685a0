// src/exec/mod.rs

//! Process execution layer.
//!
//! Turns plan-file units into [`Action`](crate::engine::Action)s that run
//! shell commands with `tokio::process::Command`.

pub mod command;

pub use command::shell_action;
