//! Personal macOS provisioning toolkit.
//!
//! Links configuration files from a repository into the home directory
//! (moving anything in the way into a timestamped backup session), renders
//! `template.<scope>` files from a JSON parameter document, and installs
//! Homebrew packages and application bundles. Each step is a confirmable
//! stage; failures are collected and reported at the end of the run.
//!
//! The public API is organised into four layers:
//!
//! - **[`config`]**: TOML repository configuration and the parameter document
//! - **[`resources`]**: idempotent `check + apply` primitives (links, templates, packages, apps)
//! - **[`tasks`]**: named stages wired to resources, run by the [`orchestrator`]
//! - **[`commands`]**: subcommand entry points (`install`, `link`, `render`, `check`, ...)
#![deny(clippy::or_fun_call)]
#![deny(clippy::bool_to_int_with_if)]

pub mod cancel;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod exec;
pub mod logging;
pub mod orchestrator;
pub mod platform;
pub mod prompt;
pub mod resources;
pub mod tasks;
pub mod validation;
