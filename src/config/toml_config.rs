use crate::adapters::http::DEFAULT_BASE_URL;
use crate::core::pagination::DEFAULT_PAGE_SIZE;
use crate::domain::model::QueryParams;
use crate::utils::error::{Result, SyncError};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_CONFIG_FILE: &str = "owner-sync.toml";
pub const DEFAULT_TOKEN_FILE: &str = "API_TOKEN.json";

/// Pipedrive accepts at most 500 records per page.
pub const MAX_PAGE_SIZE: u32 = 500;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub api: ApiConfig,
    pub fetch: FetchConfig,
    pub source: SourceConfig,
    pub reconcile: ReconcileConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub token: Option<String>,
    pub token_file: String,
    pub timeout_seconds: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            token: None,
            token_file: DEFAULT_TOKEN_FILE.to_string(),
            timeout_seconds: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub page_size: u32,
    /// Extra query parameters for the deal listing (e.g. `filter_id`).
    pub deal_params: QueryParams,
    pub organization_params: QueryParams,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            deal_params: QueryParams::new(),
            organization_params: QueryParams::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    #[default]
    Live,
    Fixture,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub kind: SourceKind,
    pub fixture_dir: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: SourceKind::Live,
            fixture_dir: "fixtures".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileConfig {
    pub dry_run: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Compact,
        }
    }
}

impl SyncConfig {
    /// Load from `explicit` if given, else from `owner-sync.toml` when it
    /// exists, else defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::from_file(path),
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => Self::from_file(DEFAULT_CONFIG_FILE),
            None => {
                tracing::debug!("No {} found, using defaults", DEFAULT_CONFIG_FILE);
                Ok(Self::default())
            }
        }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(SyncError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| SyncError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replace `${VAR}` with the environment value. Unset variables are left
    /// as-is so the credential lookup can tell they were never filled in.
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| SyncError::ConfigValidationError {
            field: "environment".to_string(),
            message: e.to_string(),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }
}

impl Validate for SyncConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_url("api.base_url", &self.api.base_url)?;
        validation::validate_path("api.token_file", &self.api.token_file)?;
        validation::validate_range("api.timeout_seconds", self.api.timeout_seconds, 1, 600)?;
        validation::validate_range("fetch.page_size", self.fetch.page_size, 1, MAX_PAGE_SIZE)?;
        validation::validate_one_of("logging.level", &self.logging.level, &LOG_LEVELS)?;

        if self.source.kind == SourceKind::Fixture {
            validation::validate_path("source.fixture_dir", &self.source.fixture_dir)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_full_config() {
        let toml_content = r#"
[api]
base_url = "https://example.pipedrive.com/v1"
token = "abc"
timeout_seconds = 10

[fetch]
page_size = 100
deal_params = { filter_id = "42" }

[source]
kind = "fixture"
fixture_dir = "./recorded"

[reconcile]
dry_run = true

[logging]
level = "debug"
format = "json"
"#;

        let config = SyncConfig::from_toml_str(toml_content).unwrap();

        assert_eq!(config.api.base_url, "https://example.pipedrive.com/v1");
        assert_eq!(config.api.token.as_deref(), Some("abc"));
        assert_eq!(config.fetch.page_size, 100);
        assert_eq!(
            config.fetch.deal_params.get("filter_id").map(String::as_str),
            Some("42")
        );
        assert_eq!(config.source.kind, SourceKind::Fixture);
        assert!(config.reconcile.dry_run);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = SyncConfig::from_toml_str("").unwrap();

        assert_eq!(config.api.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.api.token_file, DEFAULT_TOKEN_FILE);
        assert_eq!(config.fetch.page_size, 500);
        assert_eq!(config.source.kind, SourceKind::Live);
        assert!(!config.reconcile.dry_run);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("OWNER_SYNC_TEST_BASE_URL", "https://test.api.com/v1");

        let config = SyncConfig::from_toml_str(
            r#"
[api]
base_url = "${OWNER_SYNC_TEST_BASE_URL}"
token = "${OWNER_SYNC_TEST_UNSET_TOKEN}"
"#,
        )
        .unwrap();

        assert_eq!(config.api.base_url, "https://test.api.com/v1");
        assert_eq!(
            config.api.token.as_deref(),
            Some("${OWNER_SYNC_TEST_UNSET_TOKEN}")
        );

        std::env::remove_var("OWNER_SYNC_TEST_BASE_URL");
    }

    #[test]
    fn test_config_validation() {
        let mut config = SyncConfig::default();
        config.fetch.page_size = 1000;
        assert!(config.validate().is_err());

        let mut config = SyncConfig::default();
        config.api.base_url = "invalid-url".to_string();
        assert!(config.validate().is_err());

        let mut config = SyncConfig::default();
        config.logging.level = "chatty".to_string();
        assert!(config.validate().is_err());

        let mut config = SyncConfig::default();
        config.source.kind = SourceKind::Fixture;
        config.source.fixture_dir = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let result = SyncConfig::from_toml_str("[fetch]\npage_size = \"many\"");
        assert!(matches!(
            result,
            Err(SyncError::ConfigValidationError { .. })
        ));
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[reconcile]\ndry_run = true\n")
            .unwrap();

        let config = SyncConfig::load(Some(temp_file.path())).unwrap();
        assert!(config.reconcile.dry_run);
    }

    #[test]
    fn test_explicit_missing_file_is_error() {
        let result = SyncConfig::load(Some(Path::new("/definitely/not/here.toml")));
        assert!(matches!(result, Err(SyncError::IoError(_))));
    }
}
