//! Custom Axum extractors.

pub mod child_auth;
pub mod parent_auth;

pub use child_auth::{ChildAuth, DEVICE_TOKEN_HEADER};
pub use parent_auth::ParentAuth;
