//! Core types for the server.
//!
//! This module provides foundational types used throughout the system:
//! - **IDs**: Strongly-typed identifiers (RecipeId, InstanceId, AdbEndpoint)
//! - **Errors**: Application error types with thiserror derives
//! - **Config**: Configuration structures for the platform, ADB and logging

mod config;
mod errors;
mod ids;

pub use config::{
    AdbConfig, ApiToken, Config, ObservabilityConfig, PlatformConfig, DEFAULT_BASE_URL,
};
pub use errors::{ApiError, BridgeError, Error, ErrorKind, Result};
pub use ids::{AdbEndpoint, InstanceId, RecipeId};
