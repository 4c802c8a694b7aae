//! Domain layer for Family Guard.
//!
//! This crate contains:
//! - Domain models (usage records, block flags, schedule rules, pairing codes)
//! - Business logic services (schedule evaluation, enforcement, pairing)
//! - The notification seam used to reach parents

pub mod models;
pub mod services;
