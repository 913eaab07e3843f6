//! Tool layer: the closed catalog of agent-facing tools and the handlers
//! that execute them against the platform and the local ADB bridge.

pub mod catalog;
pub mod handlers;

pub use catalog::{ParamDef, ParamType, ToolCatalog, ToolEntry, ToolKind};
pub use handlers::{PlatformTools, RecipeSearch, ToolHandler};

#[cfg(test)]
pub use handlers::MockToolHandler;
