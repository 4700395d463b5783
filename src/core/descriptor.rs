//! Deployment descriptor accumulated during a run.
//!
//! Handlers contribute to the descriptor incrementally. Contributions merge
//! instead of replacing: function events are concatenated, environment maps
//! merge key-wise with later writes winning, resources and provider settings
//! merge shallowly.

use anyhow::{Result, bail};
use indexmap::IndexMap;
use serde::{Serialize, Serializer, ser::SerializeMap};
use serde_json::Value;

use crate::config::ProjectConfig;

pub const LAMBDA_HASHING_VERSION: &str = "20201221";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Descriptor {
    pub service: String,
    pub provider: IndexMap<String, Value>,
    pub functions: IndexMap<String, FunctionSpec>,
    #[serde(serialize_with = "serialize_resources")]
    pub resources: IndexMap<String, Value>,
}

/// Per-function deployment settings.
///
/// Every field is optional so a spec can also describe a partial contribution.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handler: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<EventSpec>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub environment: IndexMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u32>,
}

/// Function trigger, serialized as a single-key map such as `sns: <topic>`.
#[derive(Debug, Clone, PartialEq)]
pub enum EventSpec {
    Schedule(ScheduleEvent),
    HttpApi(HttpApiEvent),
    /// SNS topic name.
    Sns(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScheduleEvent {
    pub rate: String,
    pub input: IndexMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HttpApiEvent {
    pub method: String,
    pub path: String,
}

impl FunctionSpec {
    fn merge(&mut self, other: FunctionSpec) {
        if other.handler.is_some() {
            self.handler = other.handler;
        }
        self.events.extend(other.events);
        self.environment.extend(other.environment);
        if other.role.is_some() {
            self.role = other.role;
        }
        if other.memory_size.is_some() {
            self.memory_size = other.memory_size;
        }
        if other.timeout.is_some() {
            self.timeout = other.timeout;
        }
    }
}

impl Descriptor {
    /// Create the initial descriptor for a run.
    pub fn new(config: &ProjectConfig) -> Self {
        let provider = IndexMap::from([
            ("name".to_string(), Value::from(config.provider.as_str())),
            ("runtime".to_string(), Value::from(config.runtime.as_str())),
            ("stage".to_string(), Value::from(config.stage.as_str())),
            ("region".to_string(), Value::from(config.region.as_str())),
            (
                "lambdaHashingVersion".to_string(),
                Value::from(LAMBDA_HASHING_VERSION),
            ),
        ]);

        Self {
            service: config.service.clone(),
            provider,
            functions: IndexMap::new(),
            resources: IndexMap::new(),
        }
    }

    /// Register a function or merge into an existing registration.
    pub fn add_function_spec(&mut self, name: &str, partial: FunctionSpec) {
        match self.functions.get_mut(name) {
            Some(existing) => existing.merge(partial),
            None => {
                self.functions.insert(name.to_string(), partial);
            }
        }
    }

    /// Merge environment variables into a registered function.
    pub fn add_environment(&mut self, name: &str, environment: IndexMap<String, String>) -> Result<()> {
        let Some(function) = self.functions.get_mut(name) else {
            bail!("function \"{}\" is not registered", name);
        };
        function.environment.extend(environment);
        Ok(())
    }

    pub fn add_resources(&mut self, resources: IndexMap<String, Value>) {
        self.resources.extend(resources);
    }

    pub fn add_provider_config(&mut self, config: IndexMap<String, Value>) {
        self.provider.extend(config);
    }

    pub fn has_function(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Provider setting as a string, e.g. `region` or `stage`.
    pub fn provider_str(&self, key: &str) -> Option<&str> {
        self.provider.get(key).and_then(Value::as_str)
    }
}

// YAML serializers render externally tagged enums as tags, so the map is
// written by hand.
impl Serialize for EventSpec {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        match self {
            EventSpec::Schedule(event) => map.serialize_entry("schedule", event)?,
            EventSpec::HttpApi(event) => map.serialize_entry("httpApi", event)?,
            EventSpec::Sns(topic) => map.serialize_entry("sns", topic)?,
        }
        map.end()
    }
}

// Resources are nested under `Resources` in the serverless schema.
fn serialize_resources<S: Serializer>(
    resources: &IndexMap<String, Value>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(1))?;
    map.serialize_entry("Resources", resources)?;
    map.end()
}
