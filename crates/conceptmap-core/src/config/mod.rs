//! Configuration management with file persistence

use anyhow::{Context, anyhow};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Conceptmap configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    pub llm: LlmConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub layout: LayoutConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(skip)]
    pub api_key: Option<String>,
    pub default_model: String,
    pub fallback_models: Vec<String>,
    pub temperature: f32,
    /// Upper bound on tokens for any single completion
    pub max_tokens: usize,
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            default_model: "anthropic/claude-3-5-haiku-latest".to_string(),
            fallback_models: vec!["openai/gpt-4o-mini".to_string()],
            temperature: 0.3,
            max_tokens: 1024,
            timeout_secs: 60,
        }
    }
}

/// Pipeline tuning for `ConceptMapBuilder`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Maximum number of definition requests in flight at once
    pub definition_concurrency: usize,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            definition_concurrency: 4,
        }
    }
}

/// Canvas and simulation settings for the force-directed layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutConfig {
    pub width: f64,
    pub height: f64,
    pub iterations: usize,
    /// Fixed RNG seed for reproducible layouts; entropy-seeded when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            width: 1000.0,
            height: 1000.0,
            iterations: 50,
            seed: None,
        }
    }
}

impl LlmConfig {
    pub fn resolved_api_key(&self) -> anyhow::Result<Option<String>> {
        self.enforce_env_only()?;

        Ok(env::var("CONCEPTMAP_API_KEY")
            .or_else(|_| env::var("OPENROUTER_API_KEY"))
            .ok())
    }

    pub fn redacted_api_key(&self) -> anyhow::Result<Option<String>> {
        self.resolved_api_key().map(|opt| opt.map(|key| redact(&key)))
    }

    pub fn enforce_env_only(&self) -> anyhow::Result<()> {
        if self.api_key.is_some() {
            return Err(anyhow!(
                "LLM API keys must be provided via environment variables, not stored in configuration"
            ));
        }
        Ok(())
    }
}

fn redact(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 4 {
        "***".to_string()
    } else {
        let suffix: String = chars[chars.len() - 4..].iter().collect();
        format!("***{}", suffix)
    }
}

fn is_canvas_extent(size: f64) -> bool {
    size.is_finite() && size > 0.0
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> anyhow::Result<PathBuf> {
        let dir = if let Ok(custom_dir) = env::var("CONCEPTMAP_CONFIG_DIR") {
            PathBuf::from(custom_dir)
        } else {
            dirs::config_dir()
                .ok_or_else(|| anyhow!("Could not determine config directory"))?
                .join("conceptmap")
        };
        Ok(dir)
    }

    /// Get the config file path
    pub fn config_path() -> anyhow::Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load configuration from file, or fall back to defaults if it doesn't exist
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from an explicit path
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to the default location
    pub fn save(&self) -> anyhow::Result<()> {
        let dir = Self::config_dir()?;
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create config directory: {}", dir.display()))?;
        self.save_to(&Self::config_path()?)
    }

    /// Save configuration to an explicit path
    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        self.validate()?;

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        self.llm.enforce_env_only()?;

        if self.llm.max_tokens == 0 {
            return Err(anyhow!("llm.max_tokens must be at least 1"));
        }
        if self.generation.definition_concurrency == 0 {
            return Err(anyhow!("generation.definition_concurrency must be at least 1"));
        }
        if !(is_canvas_extent(self.layout.width) && is_canvas_extent(self.layout.height)) {
            return Err(anyhow!("Layout width and height must be positive"));
        }
        Ok(())
    }

    /// Get a configuration value by key
    pub fn get(&self, key: &str) -> anyhow::Result<String> {
        match key {
            // LLM settings
            "llm.default_model" => Ok(self.llm.default_model.clone()),
            "llm.fallback_models" => Ok(self.llm.fallback_models.join(", ")),
            "llm.temperature" => Ok(self.llm.temperature.to_string()),
            "llm.max_tokens" => Ok(self.llm.max_tokens.to_string()),
            "llm.timeout_secs" => Ok(self.llm.timeout_secs.to_string()),

            // Generation settings
            "generation.definition_concurrency" => {
                Ok(self.generation.definition_concurrency.to_string())
            }

            // Layout settings
            "layout.width" => Ok(self.layout.width.to_string()),
            "layout.height" => Ok(self.layout.height.to_string()),
            "layout.iterations" => Ok(self.layout.iterations.to_string()),
            "layout.seed" => Ok(self
                .layout
                .seed
                .map(|s| s.to_string())
                .unwrap_or_else(|| "(random)".to_string())),

            // API key (special handling - show redacted)
            "llm.api_key" | "api_key" => match self.llm.redacted_api_key()? {
                Some(redacted) => Ok(redacted),
                None => Ok(
                    "(not set - use CONCEPTMAP_API_KEY or OPENROUTER_API_KEY env var)".to_string(),
                ),
            },

            _ => Err(anyhow!(
                "Unknown configuration key: {}. Use `conceptmap config list` to see available keys.",
                key
            )),
        }
    }

    /// Set a configuration value by key
    pub fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        match key {
            "llm.default_model" => {
                self.llm.default_model = value.to_string();
            }
            "llm.fallback_models" => {
                self.llm.fallback_models = value
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect();
            }
            "llm.temperature" => {
                let temp: f32 = value
                    .parse()
                    .with_context(|| format!("Invalid temperature value: {}", value))?;
                if !(0.0..=2.0).contains(&temp) {
                    return Err(anyhow!("Temperature must be between 0.0 and 2.0"));
                }
                self.llm.temperature = temp;
            }
            "llm.max_tokens" => {
                let max_tokens: usize = value
                    .parse()
                    .with_context(|| format!("Invalid max_tokens value: {}", value))?;
                if max_tokens == 0 {
                    return Err(anyhow!("max_tokens must be at least 1"));
                }
                self.llm.max_tokens = max_tokens;
            }
            "llm.timeout_secs" => {
                self.llm.timeout_secs = value
                    .parse()
                    .with_context(|| format!("Invalid timeout_secs value: {}", value))?;
            }

            "generation.definition_concurrency" => {
                let concurrency: usize = value
                    .parse()
                    .with_context(|| format!("Invalid definition_concurrency value: {}", value))?;
                if concurrency == 0 {
                    return Err(anyhow!("definition_concurrency must be at least 1"));
                }
                self.generation.definition_concurrency = concurrency;
            }

            "layout.width" | "layout.height" => {
                let size: f64 = value
                    .parse()
                    .with_context(|| format!("Invalid {} value: {}", key, value))?;
                if !is_canvas_extent(size) {
                    return Err(anyhow!("{} must be a positive, finite number", key));
                }
                if key == "layout.width" {
                    self.layout.width = size;
                } else {
                    self.layout.height = size;
                }
            }
            "layout.iterations" => {
                self.layout.iterations = value
                    .parse()
                    .with_context(|| format!("Invalid iterations value: {}", value))?;
            }
            "layout.seed" => {
                self.layout.seed = match value {
                    "" | "random" | "none" => None,
                    v => Some(
                        v.parse()
                            .with_context(|| format!("Invalid seed value: {}", v))?,
                    ),
                };
            }

            // API key cannot be set via config
            "llm.api_key" | "api_key" => {
                return Err(anyhow!(
                    "API keys cannot be stored in configuration for security. \
                     Set the CONCEPTMAP_API_KEY or OPENROUTER_API_KEY environment variable instead."
                ));
            }

            _ => {
                return Err(anyhow!(
                    "Unknown configuration key: {}. Use `conceptmap config list` to see available keys.",
                    key
                ));
            }
        }
        Ok(())
    }

    /// List all configuration keys and their values
    pub fn list(&self) -> anyhow::Result<Vec<(String, String)>> {
        let keys = [
            "llm.default_model",
            "llm.fallback_models",
            "llm.temperature",
            "llm.max_tokens",
            "llm.timeout_secs",
            "llm.api_key",
            "generation.definition_concurrency",
            "layout.width",
            "layout.height",
            "layout.iterations",
            "layout.seed",
        ];

        keys.into_iter()
            .map(|key| {
                let value = self.get(key)?;
                Ok((key.to_string(), value))
            })
            .collect()
    }

    /// Reset configuration to defaults
    pub fn reset() -> anyhow::Result<()> {
        let path = Self::config_path()?;
        if path.exists() {
            fs::remove_file(&path)
                .with_context(|| format!("Failed to remove config file: {}", path.display()))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();

        assert!(config.llm.api_key.is_none());
        assert_eq!(config.llm.fallback_models.len(), 1);
        assert_eq!(config.generation.definition_concurrency, 4);
        assert_eq!(config.layout.width, 1000.0);
        assert_eq!(config.layout.height, 1000.0);
        assert_eq!(config.layout.iterations, 50);
        assert_eq!(config.layout.seed, None);
    }

    #[test]
    fn test_set_and_get_layout_keys() {
        let mut config = Config::default();
        config.set("layout.width", "800").unwrap();
        config.set("layout.iterations", "120").unwrap();
        config.set("layout.seed", "42").unwrap();

        assert_eq!(config.get("layout.width").unwrap(), "800");
        assert_eq!(config.get("layout.iterations").unwrap(), "120");
        assert_eq!(config.get("layout.seed").unwrap(), "42");

        config.set("layout.seed", "random").unwrap();
        assert_eq!(config.layout.seed, None);
    }

    #[test]
    fn test_set_rejects_invalid_values() {
        let mut config = Config::default();
        assert!(config.set("llm.temperature", "3.5").is_err());
        assert!(config.set("layout.width", "-10").is_err());
        assert!(config.set("generation.definition_concurrency", "0").is_err());
        assert!(config.set("llm.max_tokens", "0").is_err());
        assert!(config.set("llm.api_key", "sk-secret").is_err());
        assert!(config.set("nonexistent.key", "1").is_err());
    }

    #[test]
    fn test_canvas_size_must_be_finite() {
        let mut config = Config::default();
        assert!(config.set("layout.width", "inf").is_err());
        assert!(config.set("layout.height", "NaN").is_err());
        assert_eq!(config.layout.width, 1000.0);
        assert_eq!(config.layout.height, 1000.0);

        config.layout.width = f64::INFINITY;
        assert!(config.validate().is_err());
        config.layout.width = 1000.0;
        config.layout.height = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_fallback_models_parsing() {
        let mut config = Config::default();
        config.set("llm.fallback_models", "a/one, b/two,, ").unwrap();
        assert_eq!(config.llm.fallback_models, vec!["a/one", "b/two"]);
    }

    #[test]
    fn test_validate_rejects_stored_api_key() {
        let mut config = Config::default();
        config.llm.api_key = Some("sk-test".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = Config::default();
        config.layout.seed = Some(7);
        config.generation.definition_concurrency = 2;
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.layout, config.layout);
        assert_eq!(loaded.generation.definition_concurrency, 2);
    }

    #[test]
    fn test_load_missing_file_returns_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.layout.iterations, 50);
    }

    #[test]
    fn test_load_file_without_optional_sections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
[llm]
default_model = "test/model"
fallback_models = []
temperature = 0.5
max_tokens = 512
timeout_secs = 10
"#,
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.llm.default_model, "test/model");
        assert_eq!(config.layout, LayoutConfig::default());
    }

    #[test]
    fn test_redact() {
        assert_eq!(redact("abc"), "***");
        assert_eq!(redact("sk-or-1234abcd"), "***abcd");
    }
}
