use anyhow::{Context, Result, anyhow};
use compiler::ClientConfig;
use compiler::client::{DEFAULT_ENDPOINT, parse_endpoint};
use resolver::{LibraryInfo, LibraryRegistry, RootPolicy};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure for Solidity Studio
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StudioConfig {
    /// Compiler service settings
    #[serde(default)]
    pub compiler: CompilerSettings,

    /// Import resolution settings
    #[serde(default)]
    pub resolution: ResolutionConfig,

    /// Output configuration
    #[serde(default)]
    pub output: OutputConfig,
}

/// Compiler service settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerSettings {
    /// URL the compile requests are POSTed to
    pub endpoint: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// User agent sent with every request
    pub user_agent: String,
}

impl Default for CompilerSettings {
    fn default() -> Self {
        let client = ClientConfig::default();
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout_secs: client.timeout.as_secs(),
            user_agent: client.user_agent,
        }
    }
}

/// Import resolution settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolutionConfig {
    /// Behaviour when `../` climbs above the project root
    pub root_policy: RootPolicy,

    /// Known libraries; replaces the built-in registry when present
    #[serde(skip_serializing_if = "Option::is_none")]
    pub libraries: Option<Vec<LibraryInfo>>,
}

/// Output configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Default output format
    pub format: OutputFormatSetting,

    /// Enable colors in console output
    pub colors: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormatSetting::Console,
            colors: true,
        }
    }
}

/// Output format setting for serialization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormatSetting {
    #[default]
    Console,
    Json,
}

impl std::str::FromStr for OutputFormatSetting {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "console" => Ok(OutputFormatSetting::Console),
            "json" => Ok(OutputFormatSetting::Json),
            other => Err(anyhow!("Unknown output format: {}", other)),
        }
    }
}

impl StudioConfig {
    /// Load configuration from file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: StudioConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let content = serde_yaml::to_string(self).context("Failed to serialize configuration")?;

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Load configuration with fallback chain
    ///
    /// An explicit file must load; the implicit locations are tried in order and
    /// a broken one is skipped with a warning.
    pub fn load_from_defaults_and_file(config_file: Option<&Path>) -> Result<Self> {
        if let Some(file) = config_file {
            let config = Self::load_from_file(file)?;
            tracing::info!("Loaded configuration from: {}", file.display());
            return Ok(config);
        }

        for path in Self::default_locations() {
            if !path.exists() {
                continue;
            }
            match Self::load_from_file(&path) {
                Ok(config) => {
                    tracing::info!("Loaded configuration from: {}", path.display());
                    return Ok(config);
                }
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {:#}", path.display(), e);
                }
            }
        }

        Ok(Self::default())
    }

    fn default_locations() -> Vec<PathBuf> {
        vec![
            PathBuf::from(".soliditystudio.yml"),
            PathBuf::from(".soliditystudio.yaml"),
            dirs::config_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("soliditystudio")
                .join("config.yml"),
        ]
    }

    /// Create a default configuration file
    pub fn create_default_config_file<P: AsRef<Path>>(path: P) -> Result<()> {
        Self::default().save_to_file(path)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.compiler.timeout_secs == 0 {
            return Err(anyhow!("Compiler timeout must be greater than 0"));
        }

        parse_endpoint(&self.compiler.endpoint).context("Invalid compiler endpoint")?;

        if let Some(libraries) = &self.resolution.libraries {
            for library in libraries {
                if library.prefix.trim().is_empty() {
                    return Err(anyhow!(
                        "Library '{}' has an empty import prefix",
                        library.name
                    ));
                }
                if library.prefix.starts_with("./") || library.prefix.starts_with("../") {
                    return Err(anyhow!(
                        "Library prefix '{}' is relative and would never match",
                        library.prefix
                    ));
                }
            }
        }

        Ok(())
    }

    /// Library registry injected into the resolver
    pub fn to_registry(&self) -> LibraryRegistry {
        match &self.resolution.libraries {
            Some(libraries) => LibraryRegistry::new(libraries.clone()),
            None => LibraryRegistry::builtin(),
        }
    }

    /// Convert to compiler client config
    pub fn to_client_config(&self) -> ClientConfig {
        ClientConfig {
            endpoint: self.compiler.endpoint.clone(),
            timeout: Duration::from_secs(self.compiler.timeout_secs),
            user_agent: self.compiler.user_agent.clone(),
            use_system_proxy: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = StudioConfig::default();
        assert_eq!(config.resolution.root_policy, RootPolicy::Lenient);
        assert!(config.output.colors);
        assert_eq!(config.output.format, OutputFormatSetting::Console);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let config = StudioConfig::default();
        let yaml = serde_yaml::to_string(&config).unwrap();
        assert!(yaml.contains("root_policy: lenient"));
        assert!(yaml.contains("timeout_secs"));

        let deserialized: StudioConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(deserialized, config);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let yaml = "resolution:\n  root_policy: strict\n";
        let config: StudioConfig = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.resolution.root_policy, RootPolicy::Strict);
        assert_eq!(config.compiler, CompilerSettings::default());
        assert_eq!(config.output, OutputConfig::default());
    }

    #[test]
    fn test_config_file_operations() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let config_path = temp_dir.path().join("nested").join("config.yml");

        let mut config = StudioConfig::default();
        config.compiler.endpoint = "https://compiler.example.org/compile".to_string();
        config.save_to_file(&config_path)?;

        assert!(config_path.exists());

        let loaded = StudioConfig::load_from_defaults_and_file(Some(&config_path))?;
        assert_eq!(loaded, config);

        Ok(())
    }

    #[test]
    fn test_explicit_missing_file_fails() {
        let result =
            StudioConfig::load_from_defaults_and_file(Some(Path::new("/no/such/config.yml")));
        assert!(result.is_err());
    }

    #[test]
    fn test_config_validation() {
        let mut config = StudioConfig::default();
        config.compiler.timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = StudioConfig::default();
        config.compiler.endpoint = "localhost".to_string();
        assert!(config.validate().is_err());

        let mut config = StudioConfig::default();
        config.resolution.libraries = Some(vec![LibraryInfo::new("", "Broken", "", "")]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_custom_libraries_replace_builtin() {
        let yaml = r#"
resolution:
  libraries:
    - prefix: "@acme/"
      name: Acme
      docs_url: https://acme.example.org
      description: In-house contracts
"#;
        let config: StudioConfig = serde_yaml::from_str(yaml).unwrap();
        assert!(config.validate().is_ok());

        let registry = config.to_registry();
        assert!(registry.is_known("@acme/Vault.sol"));
        assert!(!registry.is_known("@openzeppelin/contracts/access/Ownable.sol"));
    }

    #[test]
    fn test_conversion_to_client_config() {
        let mut config = StudioConfig::default();
        config.compiler.timeout_secs = 15;
        let client = config.to_client_config();
        assert_eq!(client.timeout, Duration::from_secs(15));
        assert_eq!(client.endpoint, DEFAULT_ENDPOINT);
    }
}
