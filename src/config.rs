use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::services::uniqueness::UniquenessPolicy;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub numbering: NumberingConfig,
    pub pagination: PaginationConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    /// Allowed CORS origin; any origin when unset
    pub cors_origin: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            cors_origin: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite file path, or `:memory:`
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "ipphone.db".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NumberingConfig {
    /// Reject duplicate DNs among extensions without a partition
    pub enforce_global_unique: bool,
}

impl NumberingConfig {
    pub fn policy(&self) -> UniquenessPolicy {
        UniquenessPolicy::new(self.enforce_global_unique)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaginationConfig {
    pub default_limit: u64,
    pub max_limit: u64,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_limit: 50,
            max_limit: 1000,
        }
    }
}

impl AppConfig {
    /// Load from a `.toml`, `.yaml` or `.yml` file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_lowercase);
        let config: AppConfig = match extension.as_deref() {
            Some("toml") => toml::from_str(&content)
                .with_context(|| format!("Invalid TOML in {}", path.display()))?,
            Some("yaml") | Some("yml") => serde_yaml::from_str(&content)
                .with_context(|| format!("Invalid YAML in {}", path.display()))?,
            _ => bail!(
                "Unsupported config format for {}; use .toml or .yaml",
                path.display()
            ),
        };

        config.validate()?;
        Ok(config)
    }

    /// Defaults when no file is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        let pagination = &self.pagination;
        if pagination.default_limit == 0 || pagination.max_limit == 0 {
            bail!("pagination limits must be positive");
        }
        if pagination.default_limit > pagination.max_limit {
            bail!(
                "pagination.default_limit ({}) exceeds pagination.max_limit ({})",
                pagination.default_limit,
                pagination.max_limit
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    fn write(suffix: &str, content: &str) -> tempfile::NamedTempFile {
        let mut file = Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn defaults() {
        let config = AppConfig::load(None).unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.database.path, "ipphone.db");
        assert!(!config.numbering.enforce_global_unique);
        assert_eq!(config.pagination, PaginationConfig::default());
    }

    #[test]
    fn toml_sections_override_defaults() {
        let file = write(
            ".toml",
            r#"
[server]
port = 8080

[numbering]
enforce_global_unique = true
"#,
        );

        let config = AppConfig::from_file(file.path()).unwrap();
        assert_eq!(config.server.port, 8080);
        assert!(config.numbering.policy().enforce_global_unique);
        assert_eq!(config.database.path, "ipphone.db");
    }

    #[test]
    fn yaml_is_accepted() {
        let file = write(
            ".yaml",
            "database:\n  path: /var/lib/ipphone.db\npagination:\n  default_limit: 25\n",
        );

        let config = AppConfig::from_file(file.path()).unwrap();
        assert_eq!(config.database.path, "/var/lib/ipphone.db");
        assert_eq!(config.pagination.default_limit, 25);
        assert_eq!(config.pagination.max_limit, 1000);
    }

    #[test]
    fn rejects_unknown_format_and_bad_limits() {
        let file = write(".ini", "port=1");
        assert!(AppConfig::from_file(file.path()).is_err());

        let file = write(".toml", "[pagination]\ndefault_limit = 5000\n");
        assert!(AppConfig::from_file(file.path()).is_err());
    }
}
