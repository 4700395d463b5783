use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const CONFIG_FILE_NAME: &str = "fusion.config.json";

/// Keys every project configuration must define.
pub const REQUIRED_KEYS: &[&str] = &["service", "provider", "runtime", "stage", "region"];

/// Project configuration read once before a run.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectConfig {
    pub service: String,
    pub provider: String,
    pub runtime: String,
    pub stage: String,
    pub region: String,
    /// Directory holding the transformed modules, used in generated handler references.
    #[serde(default = "default_out_dir")]
    pub out_dir: String,
}

fn default_out_dir() -> String {
    "out".to_string()
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            service: "my-service".to_string(),
            provider: "aws".to_string(),
            runtime: "nodejs18.x".to_string(),
            stage: "dev".to_string(),
            region: "us-east-1".to_string(),
            out_dir: default_out_dir(),
        }
    }
}

impl ProjectConfig {
    /// Parse configuration JSON, failing when any of [`REQUIRED_KEYS`] is missing.
    pub fn from_json(content: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(content).context("Invalid JSON")?;
        let Some(object) = value.as_object() else {
            bail!("configuration must be a JSON object");
        };

        let missing: Vec<&str> = REQUIRED_KEYS
            .iter()
            .copied()
            .filter(|key| !object.contains_key(*key))
            .collect();
        if !missing.is_empty() {
            bail!(
                "{} does not contain all required properties (Required: {}; missing: {})",
                CONFIG_FILE_NAME,
                REQUIRED_KEYS.join(", "),
                missing.join(", ")
            );
        }

        let config: ProjectConfig = serde_json::from_value(value)
            .with_context(|| format!("Invalid property types in {}", CONFIG_FILE_NAME))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject empty values for required keys.
    pub fn validate(&self) -> Result<()> {
        let values = [
            ("service", &self.service),
            ("provider", &self.provider),
            ("runtime", &self.runtime),
            ("stage", &self.stage),
            ("region", &self.region),
        ];
        for (key, value) in values {
            if value.trim().is_empty() {
                bail!("'{}' in {} must not be empty", key, CONFIG_FILE_NAME);
            }
        }
        Ok(())
    }
}

pub fn default_config_json() -> Result<String> {
    let config = ProjectConfig::default();
    serde_json::to_string_pretty(&config).context("Failed to generate default config.")
}

pub fn find_config_file(start_dir: &Path) -> Option<PathBuf> {
    let mut current = start_dir.to_path_buf();

    loop {
        let config_path = current.join(CONFIG_FILE_NAME);
        if config_path.exists() {
            return Some(config_path);
        }
        if current.join(".git").exists() {
            return None;
        }
        if !current.pop() {
            return None;
        }
    }
}

/// Load the project configuration. A missing file is fatal.
pub fn load_config(start_dir: &Path) -> Result<ProjectConfig> {
    let Some(path) = find_config_file(start_dir) else {
        bail!("{} not found", CONFIG_FILE_NAME);
    };
    let content = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;
    ProjectConfig::from_json(&content)
        .with_context(|| format!("Failed to load config file: {:?}", path))
}

#[cfg(test)]
mod tests {
    use crate::config::*;
    use std::fs::File;
    use tempfile::tempdir;

    const FULL: &str = r#"{
        "service": "shop",
        "provider": "aws",
        "runtime": "nodejs18.x",
        "stage": "prod",
        "region": "eu-central-1"
    }"#;

    #[test]
    fn test_parse_config() {
        let config = ProjectConfig::from_json(FULL).unwrap();
        assert_eq!(config.service, "shop");
        assert_eq!(config.stage, "prod");
        assert_eq!(config.out_dir, "out");
    }

    #[test]
    fn test_out_dir_override() {
        let json = r#"{ "service": "s", "provider": "aws", "runtime": "r", "stage": "d", "region": "x", "outDir": "dist" }"#;
        let config = ProjectConfig::from_json(json).unwrap();
        assert_eq!(config.out_dir, "dist");
    }

    #[test]
    fn test_missing_required_keys() {
        let json = r#"{ "service": "shop", "provider": "aws" }"#;
        let err = ProjectConfig::from_json(json).unwrap_err().to_string();
        assert!(err.contains("required properties"));
        assert!(err.contains("missing: runtime, stage, region"));
    }

    #[test]
    fn test_empty_required_value() {
        let json = r#"{ "service": " ", "provider": "aws", "runtime": "r", "stage": "d", "region": "x" }"#;
        let err = ProjectConfig::from_json(json).unwrap_err().to_string();
        assert!(err.contains("'service'"));
    }

    #[test]
    fn test_wrong_type() {
        let json = r#"{ "service": 1, "provider": "aws", "runtime": "r", "stage": "d", "region": "x" }"#;
        assert!(ProjectConfig::from_json(json).is_err());
    }

    #[test]
    fn test_not_an_object() {
        assert!(ProjectConfig::from_json("[]").is_err());
    }

    #[test]
    fn test_find_config_file() {
        let dir = tempdir().unwrap();
        let sub_dir = dir.path().join("src").join("handlers");
        fs::create_dir_all(&sub_dir).unwrap();

        let config_path = dir.path().join(CONFIG_FILE_NAME);
        File::create(&config_path).unwrap();

        let found = find_config_file(&sub_dir);
        assert_eq!(found, Some(config_path));
    }

    #[test]
    fn test_find_config_not_found() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join(".git")).unwrap();

        assert!(find_config_file(dir.path()).is_none());
    }

    #[test]
    fn test_load_config_from_file() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILE_NAME), FULL).unwrap();

        let config = load_config(dir.path()).unwrap();
        assert_eq!(config.region, "eu-central-1");
    }

    #[test]
    fn test_load_config_missing_file_is_fatal() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join(".git")).unwrap();

        let err = load_config(dir.path()).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_default_config_json_is_loadable() {
        let json = default_config_json().unwrap();
        assert!(json.contains("outDir"));
        assert_eq!(ProjectConfig::from_json(&json).unwrap(), ProjectConfig::default());
    }
}
