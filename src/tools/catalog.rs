//! Tool catalog: the closed set of tools, their parameter schemas, validation.
//!
//! Every tool is a [`ToolKind`] variant; its metadata is produced by an
//! exhaustive match, so adding a tool without describing it does not compile.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

// =============================================================================
// Tool kinds
// =============================================================================

/// Every operation the server exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    ListRecipes,
    SearchRecipes,
    GetRecipe,
    ListOsVersions,
    StartInstance,
    StopInstance,
    ListInstances,
    GetInstance,
    ConnectAdb,
    DisconnectAdb,
}

impl ToolKind {
    /// All tools, in the order they are advertised.
    pub const ALL: [ToolKind; 10] = [
        ToolKind::ListRecipes,
        ToolKind::SearchRecipes,
        ToolKind::GetRecipe,
        ToolKind::ListOsVersions,
        ToolKind::StartInstance,
        ToolKind::StopInstance,
        ToolKind::ListInstances,
        ToolKind::GetInstance,
        ToolKind::ConnectAdb,
        ToolKind::DisconnectAdb,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ToolKind::ListRecipes => "list_recipes",
            ToolKind::SearchRecipes => "search_recipes",
            ToolKind::GetRecipe => "get_recipe",
            ToolKind::ListOsVersions => "list_os_versions",
            ToolKind::StartInstance => "start_instance",
            ToolKind::StopInstance => "stop_instance",
            ToolKind::ListInstances => "list_instances",
            ToolKind::GetInstance => "get_instance",
            ToolKind::ConnectAdb => "connect_adb",
            ToolKind::DisconnectAdb => "disconnect_adb",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    pub fn description(self) -> &'static str {
        match self {
            ToolKind::ListRecipes => {
                "List all Android recipes (device templates) available on Genymotion SaaS."
            }
            ToolKind::SearchRecipes => {
                "Search recipes whose name or Android version contains the query (case-insensitive)."
            }
            ToolKind::GetRecipe => "Get detailed information about a specific Android recipe.",
            ToolKind::ListOsVersions => "List the Android OS versions available on the platform.",
            ToolKind::StartInstance => {
                "Start a disposable Android instance from a recipe. Returns the new instance in state STARTING."
            }
            ToolKind::StopInstance => {
                "Stop a running Android instance. Stopping an already stopped instance succeeds."
            }
            ToolKind::ListInstances => "List Android instances and their states.",
            ToolKind::GetInstance => "Get the current state and ADB endpoint of an instance.",
            ToolKind::ConnectAdb => {
                "Connect the local ADB to a running (ON) instance. Returns the ADB serial to use."
            }
            ToolKind::DisconnectAdb => "Disconnect the local ADB from an instance.",
        }
    }

    /// Parameter schema for this tool.
    pub fn parameters(self) -> Vec<ParamDef> {
        match self {
            ToolKind::ListRecipes
            | ToolKind::ListOsVersions
            | ToolKind::ListInstances => Vec::new(),
            ToolKind::SearchRecipes => vec![ParamDef::required(
                "query",
                ParamType::String,
                "Name or Android version fragment to look for, e.g. 'pixel' or '14'",
            )],
            ToolKind::GetRecipe => vec![recipe_id_param()],
            ToolKind::StartInstance => vec![
                recipe_id_param(),
                ParamDef::optional(
                    "instance_name",
                    ParamType::String,
                    "Name for the new instance; generated when omitted",
                ),
            ],
            ToolKind::StopInstance
            | ToolKind::GetInstance
            | ToolKind::ConnectAdb
            | ToolKind::DisconnectAdb => vec![instance_id_param()],
        }
    }
}

fn recipe_id_param() -> ParamDef {
    ParamDef::required(
        "recipe_id",
        ParamType::String,
        "Recipe UUID (see list_recipes)",
    )
}

fn instance_id_param() -> ParamDef {
    ParamDef::required(
        "instance_id",
        ParamType::String,
        "Instance UUID (see list_instances)",
    )
}

// =============================================================================
// Parameter types
// =============================================================================

/// Parameter type for tool inputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamType {
    String,
    Optional(Box<ParamType>),
}

impl ParamType {
    /// Validate a JSON value against this parameter type.
    pub fn validate(&self, value: &Value) -> Result<(), String> {
        match self {
            ParamType::String => {
                if value.is_string() {
                    Ok(())
                } else {
                    Err(format!("expected string, got {}", value_type_name(value)))
                }
            }
            ParamType::Optional(inner) => {
                if value.is_null() {
                    Ok(())
                } else {
                    inner.validate(value)
                }
            }
        }
    }

    /// JSON-Schema `type` keyword for this parameter.
    pub fn json_schema_type(&self) -> &'static str {
        match self {
            ParamType::String => "string",
            ParamType::Optional(inner) => inner.json_schema_type(),
        }
    }
}

fn value_type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// =============================================================================
// Parameter definition
// =============================================================================

/// A single parameter definition for a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamDef {
    pub name: String,
    pub param_type: ParamType,
    pub description: String,
}

impl ParamDef {
    pub fn required(name: &str, param_type: ParamType, description: &str) -> Self {
        Self {
            name: name.to_string(),
            param_type,
            description: description.to_string(),
        }
    }

    pub fn optional(name: &str, param_type: ParamType, description: &str) -> Self {
        Self::required(name, ParamType::Optional(Box::new(param_type)), description)
    }

    pub fn is_required(&self) -> bool {
        !matches!(self.param_type, ParamType::Optional(_))
    }
}

// =============================================================================
// Tool entry
// =============================================================================

/// Complete tool metadata entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolEntry {
    pub kind: ToolKind,
    pub description: String,
    pub parameters: Vec<ParamDef>,
}

impl ToolEntry {
    fn for_kind(kind: ToolKind) -> Self {
        Self {
            kind,
            description: kind.description().to_string(),
            parameters: kind.parameters(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    /// JSON-Schema object describing the tool's arguments.
    pub fn input_schema(&self) -> Value {
        let mut properties = Map::new();
        for param in &self.parameters {
            properties.insert(
                param.name.clone(),
                json!({
                    "type": param.param_type.json_schema_type(),
                    "description": param.description,
                }),
            );
        }
        let required: Vec<&str> = self
            .parameters
            .iter()
            .filter(|p| p.is_required())
            .map(|p| p.name.as_str())
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
            "additionalProperties": false,
        })
    }

    /// Host-facing tool definition (`name`, `description`, `inputSchema`).
    pub fn definition(&self) -> Value {
        json!({
            "name": self.name(),
            "description": self.description,
            "inputSchema": self.input_schema(),
        })
    }
}

// =============================================================================
// Tool catalog
// =============================================================================

/// Static tool catalog. Owns metadata, not implementations.
#[derive(Debug, Clone)]
pub struct ToolCatalog {
    entries: Vec<ToolEntry>,
}

impl Default for ToolCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolCatalog {
    pub fn new() -> Self {
        Self {
            entries: ToolKind::ALL.into_iter().map(ToolEntry::for_kind).collect(),
        }
    }

    /// Resolve a tool name to its kind.
    pub fn lookup(&self, name: &str) -> Option<ToolKind> {
        ToolKind::from_name(name)
    }

    pub fn get(&self, kind: ToolKind) -> &ToolEntry {
        // ALL and entries are built in the same order.
        &self.entries[kind as usize]
    }

    /// All entries in advertised order.
    pub fn entries(&self) -> &[ToolEntry] {
        &self.entries
    }

    /// Host-facing definitions for every tool.
    pub fn definitions(&self) -> Vec<Value> {
        self.entries.iter().map(ToolEntry::definition).collect()
    }

    /// Validate arguments against a tool's parameter definitions.
    ///
    /// Returns a list of validation errors (empty = valid).
    pub fn validate_params(&self, kind: ToolKind, params: &Value) -> Vec<String> {
        let entry = self.get(kind);

        let param_map = match params {
            Value::Object(map) => map,
            Value::Null => return missing_required(entry, &Map::new()),
            other => {
                return vec![format!(
                    "Arguments must be a JSON object, got {}",
                    value_type_name(other)
                )]
            }
        };

        let mut errors = missing_required(entry, param_map);

        for (key, value) in param_map {
            match entry.parameters.iter().find(|p| &p.name == key) {
                Some(param_def) => {
                    if let Err(e) = param_def.param_type.validate(value) {
                        errors.push(format!("Parameter '{}': {}", key, e));
                    }
                }
                None => errors.push(format!("Unknown parameter: {}", key)),
            }
        }

        errors
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn missing_required(entry: &ToolEntry, params: &Map<String, Value>) -> Vec<String> {
    entry
        .parameters
        .iter()
        .filter(|p| p.is_required() && !params.contains_key(&p.name))
        .map(|p| format!("Missing required parameter: {}", p.name))
        .collect()
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_catalog_order_matches_kind_discriminants() {
        let catalog = ToolCatalog::new();
        assert_eq!(catalog.len(), ToolKind::ALL.len());
        for kind in ToolKind::ALL {
            assert_eq!(catalog.get(kind).kind, kind);
        }
    }

    #[test]
    fn test_names_round_trip() {
        for kind in ToolKind::ALL {
            assert_eq!(ToolKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(ToolKind::from_name("format_disk"), None);
        assert_eq!(ToolKind::from_name("LIST_RECIPES"), None);
    }

    #[test]
    fn test_validate_params_valid() {
        let catalog = ToolCatalog::new();
        let errors = catalog.validate_params(
            ToolKind::StartInstance,
            &json!({"recipe_id": "r1", "instance_name": "demo"}),
        );
        assert!(errors.is_empty(), "Expected no errors, got: {:?}", errors);

        let errors = catalog.validate_params(ToolKind::StartInstance, &json!({"recipe_id": "r1"}));
        assert!(errors.is_empty());
    }

    #[test]
    fn test_validate_params_missing_required() {
        let catalog = ToolCatalog::new();
        let errors = catalog.validate_params(ToolKind::GetRecipe, &json!({}));
        assert_eq!(errors, vec!["Missing required parameter: recipe_id".to_string()]);
    }

    #[test]
    fn test_validate_params_null_arguments() {
        let catalog = ToolCatalog::new();
        assert!(catalog
            .validate_params(ToolKind::ListRecipes, &Value::Null)
            .is_empty());
        assert_eq!(
            catalog.validate_params(ToolKind::StopInstance, &Value::Null).len(),
            1
        );
    }

    #[test]
    fn test_validate_params_wrong_type() {
        let catalog = ToolCatalog::new();
        let errors = catalog.validate_params(ToolKind::StopInstance, &json!({"instance_id": 42}));
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("expected string, got number"));
    }

    #[test]
    fn test_validate_params_unknown_param() {
        let catalog = ToolCatalog::new();
        let errors = catalog.validate_params(ToolKind::ListRecipes, &json!({"bogus": true}));
        assert_eq!(errors, vec!["Unknown parameter: bogus".to_string()]);
    }

    #[test]
    fn test_validate_params_not_an_object() {
        let catalog = ToolCatalog::new();
        let errors = catalog.validate_params(ToolKind::GetRecipe, &json!(["r1"]));
        assert_eq!(errors, vec!["Arguments must be a JSON object, got array".to_string()]);
    }

    #[test]
    fn test_optional_accepts_null() {
        let catalog = ToolCatalog::new();
        let errors = catalog.validate_params(
            ToolKind::StartInstance,
            &json!({"recipe_id": "r1", "instance_name": null}),
        );
        assert!(errors.is_empty());
    }

    #[test]
    fn test_input_schema() {
        let catalog = ToolCatalog::new();
        let schema = catalog.get(ToolKind::StartInstance).input_schema();
        assert_eq!(
            schema,
            json!({
                "type": "object",
                "properties": {
                    "recipe_id": {"type": "string", "description": "Recipe UUID (see list_recipes)"},
                    "instance_name": {
                        "type": "string",
                        "description": "Name for the new instance; generated when omitted"
                    },
                },
                "required": ["recipe_id"],
                "additionalProperties": false,
            })
        );
    }

    #[test]
    fn test_definition_shape() {
        let catalog = ToolCatalog::new();
        let defs = catalog.definitions();
        assert_eq!(defs.len(), 10);
        assert_eq!(defs[0]["name"], "list_recipes");
        assert_eq!(defs[0]["inputSchema"]["required"], json!([]));
    }

    #[test]
    fn test_param_type_validation() {
        assert!(ParamType::String.validate(&json!("r1")).is_ok());
        assert_eq!(
            ParamType::String.validate(&json!(3)),
            Err("expected string, got number".to_string())
        );

        let optional = ParamType::Optional(Box::new(ParamType::String));
        assert!(optional.validate(&Value::Null).is_ok());
        assert_eq!(
            optional.validate(&json!(true)),
            Err("expected string, got boolean".to_string())
        );
        assert_eq!(optional.json_schema_type(), "string");
    }
}
