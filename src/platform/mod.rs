//! Remote platform access: typed operations over the HTTP API.
//!
//! [`DevicePlatform`] is the seam the tool handlers program against;
//! [`PlatformClient`] is the HTTPS implementation.

pub mod client;
pub mod models;

use async_trait::async_trait;
use serde_json::Value;

use crate::types::{ApiError, InstanceId, RecipeId};

pub use client::{Idempotency, PlatformClient};
pub use models::{HardwareProfile, Instance, InstanceState, Recipe, RecipeRef};

/// Operations the device farm exposes.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DevicePlatform: Send + Sync {
    /// Recipes in platform order.
    async fn list_recipes(&self) -> Result<Vec<Recipe>, ApiError>;

    async fn get_recipe(&self, recipe_id: &RecipeId) -> Result<Recipe, ApiError>;

    /// OS images, passed through untouched.
    async fn list_os_images(&self) -> Result<Vec<Value>, ApiError>;

    async fn start_instance(
        &self,
        recipe_id: &RecipeId,
        instance_name: &str,
    ) -> Result<Instance, ApiError>;

    /// `None` when the platform acknowledges without a body.
    async fn stop_instance(&self, instance_id: &InstanceId) -> Result<Option<Instance>, ApiError>;

    async fn list_instances(&self) -> Result<Vec<Instance>, ApiError>;

    async fn get_instance(&self, instance_id: &InstanceId) -> Result<Instance, ApiError>;
}
