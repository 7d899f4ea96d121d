//! External tool abstractions
//!
//! This module provides trait-based abstractions for external CLI tools (git),
//! enabling testable code through dependency injection and scripted executors.
//!
//! Pure logic (deciding what a probe result means, which branch to pick) lives
//! with the provisioning pipeline; this module only runs commands.

pub mod command;
pub mod git;

pub use command::{CommandError, CommandExecutor, CommandOutput, ProcessCommandExecutor};
pub use git::{parse_branch_listing, redact_credentials, GitClient, GitError};
