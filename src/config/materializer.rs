//! Injects environment endpoints into the application config template.

use crate::config::ConfigError;
use serde_yaml::{Mapping, Value};
use std::path::Path;
use tracing::{debug, info};

pub const DATABASE_URL_KEY: &str = "database_url";
pub const BROKER_URL_KEY: &str = "broker_url";

/// Connection endpoints of the target environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub database_host: String,
    pub broker_host: String,
}

/// Materialized config shared read-only by every host of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct DeploymentConfig {
    document: Mapping,
}

impl DeploymentConfig {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.document.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    pub fn len(&self) -> usize {
        self.document.len()
    }

    pub fn is_empty(&self) -> bool {
        self.document.is_empty()
    }

    pub fn as_mapping(&self) -> &Mapping {
        &self.document
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(&self.document)?)
    }
}

#[derive(Debug, Clone)]
pub struct ConfigMaterializer {
    database_name: String,
    broker_index: u32,
}

impl Default for ConfigMaterializer {
    fn default() -> Self {
        Self {
            database_name: "cliche".to_string(),
            broker_index: 1,
        }
    }
}

impl ConfigMaterializer {
    pub fn new(database_name: impl Into<String>, broker_index: u32) -> Self {
        Self {
            database_name: database_name.into(),
            broker_index,
        }
    }

    /// Loads a template document. A missing file is reported as
    /// [`ConfigError::TemplateNotFound`].
    pub async fn load_template(path: &Path) -> Result<Mapping, ConfigError> {
        if !tokio::fs::metadata(path)
            .await
            .map(|meta| meta.is_file())
            .unwrap_or(false)
        {
            return Err(ConfigError::TemplateNotFound {
                path: path.to_path_buf(),
            });
        }

        let contents =
            tokio::fs::read_to_string(path)
                .await
                .map_err(|source| ConfigError::Unreadable {
                    path: path.to_path_buf(),
                    source,
                })?;

        parse_template(&contents).map_err(|reason| ConfigError::InvalidTemplate {
            path: path.to_path_buf(),
            reason,
        })
    }

    pub fn materialize(&self, template: Mapping, endpoints: &Endpoints) -> DeploymentConfig {
        let mut document = template;

        document.insert(
            Value::from(DATABASE_URL_KEY),
            Value::from(self.database_url(&endpoints.database_host)),
        );
        document.insert(
            Value::from(BROKER_URL_KEY),
            Value::from(self.broker_url(&endpoints.broker_host)),
        );

        debug!("Materialized config with {} keys", document.len());
        DeploymentConfig { document }
    }

    pub async fn materialize_file(
        &self,
        path: &Path,
        endpoints: &Endpoints,
    ) -> Result<DeploymentConfig, ConfigError> {
        let template = Self::load_template(path).await?;
        info!("Loaded config template {:?}", path);
        Ok(self.materialize(template, endpoints))
    }

    pub fn database_url(&self, host: &str) -> String {
        format!("postgres://{}/{}", host, self.database_name)
    }

    pub fn broker_url(&self, host: &str) -> String {
        format!("redis://{}/{}", host, self.broker_index)
    }
}

/// An empty document is an empty mapping; any other non-mapping is rejected.
fn parse_template(contents: &str) -> Result<Mapping, String> {
    match serde_yaml::from_str::<Value>(contents).map_err(|e| e.to_string())? {
        Value::Mapping(mapping) => Ok(mapping),
        Value::Null => Ok(Mapping::new()),
        other => Err(format!(
            "expected a mapping at the top level, found {}",
            value_kind(&other)
        )),
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a sequence",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}
