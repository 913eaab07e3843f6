//! Tool handlers: orchestration between arguments, the platform and ADB.
//!
//! Handlers receive arguments that already passed schema validation, decode
//! them into per-tool structs, enforce domain constraints, call out, and
//! shape the payload.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use super::catalog::ToolKind;
use crate::adb::AdbBridge;
use crate::platform::{DevicePlatform, Instance, Recipe};
use crate::types::{AdbEndpoint, ApiError, Error, InstanceId, Result};
use crate::validation;

/// Executes a validated tool call.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn invoke(&self, kind: ToolKind, args: Value) -> Result<Value>;
}

// =============================================================================
// Argument structs
// =============================================================================

#[derive(Debug, Deserialize)]
struct RecipeArgs {
    recipe_id: String,
}

#[derive(Debug, Deserialize)]
struct SearchArgs {
    query: String,
}

#[derive(Debug, Deserialize)]
struct StartArgs {
    recipe_id: String,
    #[serde(default)]
    instance_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct InstanceArgs {
    instance_id: String,
}

fn decode<T: DeserializeOwned>(args: Value) -> Result<T> {
    let args = if args.is_null() { json!({}) } else { args };
    serde_json::from_value(args).map_err(|e| Error::validation(format!("invalid arguments: {}", e)))
}

/// Name given to instances started without one.
fn generated_instance_name() -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    format!("mcp-{}", &id[..8])
}

// =============================================================================
// Platform-backed handler
// =============================================================================

/// Handlers bound to the remote platform and the local ADB bridge.
#[derive(Clone)]
pub struct PlatformTools {
    platform: Arc<dyn DevicePlatform>,
    adb: Arc<dyn AdbBridge>,
}

impl std::fmt::Debug for PlatformTools {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlatformTools").finish_non_exhaustive()
    }
}

/// Outcome of a recipe search.
#[derive(Debug, Clone, PartialEq)]
pub struct RecipeSearch {
    pub matches: Vec<Recipe>,
    /// Every recipe, filled only when nothing matched.
    pub alternatives: Vec<Recipe>,
}

impl PlatformTools {
    pub fn new(platform: Arc<dyn DevicePlatform>, adb: Arc<dyn AdbBridge>) -> Self {
        Self { platform, adb }
    }

    pub async fn list_recipes(&self) -> Result<Vec<Recipe>> {
        Ok(self.platform.list_recipes().await?)
    }

    /// Recipes matching `query`. With no match, the full list comes back as
    /// alternatives.
    pub async fn search_recipes(&self, query: &str) -> Result<RecipeSearch> {
        validation::validate_non_empty(query, "query")?;
        let recipes = self.platform.list_recipes().await?;
        let (matches, rest): (Vec<Recipe>, Vec<Recipe>) =
            recipes.into_iter().partition(|r| r.matches(query));
        let alternatives = if matches.is_empty() { rest } else { Vec::new() };
        Ok(RecipeSearch {
            matches,
            alternatives,
        })
    }

    pub async fn get_recipe(&self, recipe_id: &str) -> Result<Recipe> {
        let id = validation::recipe_id(recipe_id)?;
        self.platform
            .get_recipe(&id)
            .await
            .map_err(|e| Error::not_found_on_404(e, || format!("recipe {}", id)))
    }

    pub async fn list_os_versions(&self) -> Result<Vec<Value>> {
        Ok(self.platform.list_os_images().await?)
    }

    pub async fn start_instance(
        &self,
        recipe_id: &str,
        instance_name: Option<&str>,
    ) -> Result<Instance> {
        let id = validation::recipe_id(recipe_id)?;
        let name = match instance_name.map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => generated_instance_name(),
        };

        let instance = self
            .platform
            .start_instance(&id, &name)
            .await
            .map_err(|e| Error::not_found_on_404(e, || format!("recipe {}", id)))?;
        tracing::info!(
            recipe_id = %id,
            instance_id = %instance.id,
            state = ?instance.state,
            "instance started"
        );
        Ok(instance)
    }

    /// Stop an instance. An instance the platform already reports OFF is a success.
    pub async fn stop_instance(&self, instance_id: &str) -> Result<Value> {
        let id = validation::instance_id(instance_id)?;

        match self.platform.stop_instance(&id).await {
            Ok(instance) => {
                tracing::info!(instance_id = %id, "instance stop requested");
                Ok(stop_payload(&id, instance.as_ref().map(|i| i.state)))
            }
            Err(ApiError::Client { status: 409, message }) => {
                let current = self.fetch_instance(&id).await?;
                if current.state.is_off() {
                    tracing::info!(instance_id = %id, "instance already stopped");
                    Ok(stop_payload(&id, Some(current.state)))
                } else {
                    Err(ApiError::Client {
                        status: 409,
                        message,
                    }
                    .into())
                }
            }
            Err(e) => Err(Error::not_found_on_404(e, || format!("instance {}", id))),
        }
    }

    pub async fn list_instances(&self) -> Result<Vec<Instance>> {
        Ok(self.platform.list_instances().await?)
    }

    pub async fn get_instance(&self, instance_id: &str) -> Result<Instance> {
        let id = validation::instance_id(instance_id)?;
        self.fetch_instance(&id).await
    }

    pub async fn connect_adb(&self, instance_id: &str) -> Result<AdbEndpoint> {
        let id = validation::instance_id(instance_id)?;
        let instance = self.fetch_instance(&id).await?;

        if !instance.state.is_on() {
            return Err(Error::unavailable(format!(
                "instance {} is {:?}, ADB requires it to be ON",
                id, instance.state
            )));
        }
        let endpoint = require_endpoint(&instance)?;

        self.adb.connect(&endpoint).await?;
        Ok(endpoint)
    }

    pub async fn disconnect_adb(&self, instance_id: &str) -> Result<AdbEndpoint> {
        let id = validation::instance_id(instance_id)?;
        let instance = self.fetch_instance(&id).await?;
        let endpoint = require_endpoint(&instance)?;

        self.adb.disconnect(&endpoint).await?;
        Ok(endpoint)
    }

    async fn fetch_instance(&self, id: &InstanceId) -> Result<Instance> {
        self.platform
            .get_instance(id)
            .await
            .map_err(|e| Error::not_found_on_404(e, || format!("instance {}", id)))
    }
}

fn require_endpoint(instance: &Instance) -> Result<AdbEndpoint> {
    instance.endpoint().cloned().ok_or_else(|| {
        Error::unavailable(format!(
            "instance {} has no ADB endpoint reported by the platform",
            instance.id
        ))
    })
}

fn stop_payload(id: &InstanceId, state: Option<crate::platform::InstanceState>) -> Value {
    json!({
        "instance_id": id,
        "stopped": true,
        "state": state,
    })
}

fn list_payload<T: serde::Serialize>(key: &str, items: &[T]) -> Result<Value> {
    let mut payload = serde_json::Map::new();
    payload.insert(key.to_string(), serde_json::to_value(items)?);
    payload.insert("count".to_string(), json!(items.len()));
    Ok(Value::Object(payload))
}

#[async_trait]
impl ToolHandler for PlatformTools {
    async fn invoke(&self, kind: ToolKind, args: Value) -> Result<Value> {
        match kind {
            ToolKind::ListRecipes => list_payload("recipes", &self.list_recipes().await?),
            ToolKind::SearchRecipes => {
                let args: SearchArgs = decode(args)?;
                let search = self.search_recipes(&args.query).await?;
                let mut payload = list_payload("recipes", &search.matches)?;
                payload["query"] = json!(args.query);
                if search.matches.is_empty() {
                    payload["alternatives"] = serde_json::to_value(&search.alternatives)?;
                }
                Ok(payload)
            }
            ToolKind::GetRecipe => {
                let args: RecipeArgs = decode(args)?;
                Ok(serde_json::to_value(self.get_recipe(&args.recipe_id).await?)?)
            }
            ToolKind::ListOsVersions => {
                list_payload("os_versions", &self.list_os_versions().await?)
            }
            ToolKind::StartInstance => {
                let args: StartArgs = decode(args)?;
                let instance = self
                    .start_instance(&args.recipe_id, args.instance_name.as_deref())
                    .await?;
                Ok(serde_json::to_value(instance)?)
            }
            ToolKind::StopInstance => {
                let args: InstanceArgs = decode(args)?;
                self.stop_instance(&args.instance_id).await
            }
            ToolKind::ListInstances => {
                list_payload("instances", &self.list_instances().await?)
            }
            ToolKind::GetInstance => {
                let args: InstanceArgs = decode(args)?;
                Ok(serde_json::to_value(self.get_instance(&args.instance_id).await?)?)
            }
            ToolKind::ConnectAdb => {
                let args: InstanceArgs = decode(args)?;
                let endpoint = self.connect_adb(&args.instance_id).await?;
                Ok(json!({
                    "instance_id": args.instance_id,
                    "adb_serial": endpoint,
                    "connected": true,
                }))
            }
            ToolKind::DisconnectAdb => {
                let args: InstanceArgs = decode(args)?;
                let endpoint = self.disconnect_adb(&args.instance_id).await?;
                Ok(json!({
                    "instance_id": args.instance_id,
                    "adb_serial": endpoint,
                    "connected": false,
                }))
            }
        }
    }
}
