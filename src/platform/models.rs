//! Platform data model: recipes, instances, listing envelopes.
//!
//! Field aliases absorb the spellings the platform has used across API
//! versions; serialization always uses the canonical names.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::{AdbEndpoint, InstanceId, RecipeId};

/// Hardware profile of a recipe.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HardwareProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screen: Option<String>,
    #[serde(default, alias = "density", skip_serializing_if = "Option::is_none")]
    pub dpi: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_count: Option<u32>,
    #[serde(default, alias = "memory", skip_serializing_if = "Option::is_none")]
    pub memory_mb: Option<u32>,
}

/// A device template instances are started from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipe {
    #[serde(alias = "uuid")]
    pub id: RecipeId,
    pub name: String,
    #[serde(rename = "os", alias = "os_version", alias = "android_version", default)]
    pub android_version: String,
    #[serde(
        default,
        alias = "hardware_profile",
        skip_serializing_if = "Option::is_none"
    )]
    pub hardware: Option<HardwareProfile>,
}

impl Recipe {
    /// Case-insensitive substring match on name or Android version.
    pub fn matches(&self, query: &str) -> bool {
        let needle = query.to_lowercase();
        self.name.to_lowercase().contains(&needle)
            || self.android_version.to_lowercase().contains(&needle)
    }
}

/// Instance lifecycle state as reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InstanceState {
    #[serde(alias = "CREATING", alias = "BOOTING")]
    Starting,
    #[serde(alias = "ONLINE")]
    On,
    Stopping,
    #[serde(alias = "DELETED")]
    Off,
    #[serde(other)]
    Unknown,
}

impl InstanceState {
    pub fn is_on(self) -> bool {
        matches!(self, InstanceState::On)
    }

    pub fn is_off(self) -> bool {
        matches!(self, InstanceState::Off)
    }
}

/// Reference from an instance to the recipe it runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeRef {
    #[serde(alias = "uuid")]
    pub id: RecipeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// A running (or recently running) virtual device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instance {
    #[serde(alias = "uuid")]
    pub id: InstanceId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipe: Option<RecipeRef>,
    pub state: InstanceState,
    #[serde(
        default,
        alias = "adb_serial",
        alias = "adb_url",
        skip_serializing_if = "Option::is_none"
    )]
    pub adb_endpoint: Option<AdbEndpoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Instance {
    /// ADB endpoint, if the platform reported a usable `host:port`.
    pub fn endpoint(&self) -> Option<&AdbEndpoint> {
        self.adb_endpoint
            .as_ref()
            .filter(|e| !e.as_str().trim().is_empty() && e.as_str().contains(':'))
    }
}

/// A list response: either a bare array or a paginated `{"results": [...]}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum Listing<T> {
    Bare(Vec<T>),
    Paged { results: Vec<T> },
}

impl<T> Listing<T> {
    pub(crate) fn into_items(self) -> Vec<T> {
        match self {
            Listing::Bare(items) => items,
            Listing::Paged { results } => results,
        }
    }
}

/// An instance response, optionally wrapped as `{"instance": {...}}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum InstanceEnvelope {
    Wrapped { instance: Instance },
    Bare(Instance),
}

impl InstanceEnvelope {
    pub(crate) fn into_instance(self) -> Instance {
        match self {
            InstanceEnvelope::Wrapped { instance } => instance,
            InstanceEnvelope::Bare(instance) => instance,
        }
    }
}

/// Decode a list body, keeping platform order.
pub(crate) fn decode_listing<T: serde::de::DeserializeOwned>(
    value: Value,
) -> Result<Vec<T>, serde_json::Error> {
    serde_json::from_value::<Listing<T>>(value).map(Listing::into_items)
}
