//! Shared utilities and common types for the Family Guard backend.
//!
//! This crate provides common functionality used across all other crates:
//! - Device token generation and hashing
//! - Parent access tokens (RS256 JWT)
//! - Common validation logic

pub mod crypto;
pub mod jwt;
pub mod validation;
