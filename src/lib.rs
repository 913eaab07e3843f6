//! # genymotion-mcp
//!
//! Exposes a Genymotion SaaS device farm to an AI agent host as a closed set
//! of MCP tools:
//! - Recipe discovery (list, search, get) and the OS image catalog
//! - Disposable instance lifecycle (start, stop, list, get)
//! - Local ADB attach/detach for running instances
//!
//! ## Layout
//!
//! ```text
//!   stdin ─▶ mcp::McpServer ─▶ dispatch::Dispatcher ─▶ tools::PlatformTools
//!                                  │                     │            │
//!                           tools::ToolCatalog   platform::Client  adb::AdbCli
//!                           (schema validation)     (HTTPS)        (subprocess)
//! ```
//!
//! Every tool outcome reaches the host as a structured result; only a bad
//! configuration at startup is fatal.

#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]
#![warn(rust_2018_idioms)]

pub mod adb;
pub mod dispatch;
pub mod mcp;
pub mod platform;
pub mod tools;
pub mod types;
pub mod validation;

pub mod observability;

pub use types::{Config, Error, Result};
