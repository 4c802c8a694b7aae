//! On-device usage monitor for Family Guard.
//!
//! This crate contains:
//! - Foreground and usage-stats providers backed by device shell commands
//! - The HTTP client for the Family Guard API
//! - The fast enforcement loop and the slow usage upload loop
//! - The local binding store written after linking
//! - App label lookup for human-readable names in reports

pub mod app_labels;
pub mod binding;
pub mod block_screen;
pub mod config;
pub mod error;
pub mod foreground;
pub mod logging;
pub mod monitor;
pub mod remote;
pub mod shell;
pub mod usage_stats;
