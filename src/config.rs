use std::path::PathBuf;

use eyre::Result;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::completion::{DEFAULT_MODEL, ProviderConfig};

pub const DEFAULT_BIND: &str = "127.0.0.1:3000";
pub const DEFAULT_LANG: &str = "en";

/// Optional settings read from the config file
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub model: Option<String>,
    pub api_base: Option<String>,
    pub bind: Option<String>,
    pub lang: Option<String>,
}

impl Config {
    /// Load config from ~/.config/ytbrief/config.toml if it exists
    pub fn load() -> Result<Self> {
        let path = config_path();
        if path.exists() {
            debug!("Loading config from {}", path.display());
            let content = std::fs::read_to_string(&path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            debug!("No config file found at {}", path.display());
            Ok(Config::default())
        }
    }
}

pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from(".config"))
        .join("ytbrief")
        .join("config.toml")
}

/// Everything the service needs, resolved once at startup from the config
/// file and the environment
#[derive(Debug, Clone)]
pub struct Settings {
    pub provider: ProviderConfig,
    pub youtube_api_key: Option<String>,
    pub bind: String,
    pub lang: String,
}

impl Settings {
    /// Resolve settings from `config`, letting variables from `env` win.
    ///
    /// `AI_API_KEY` is preferred; otherwise `ANTHROPIC_API_KEY` or
    /// `OPENAI_API_KEY` is used depending on the model.
    pub fn resolve<F>(config: &Config, env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| env(name).filter(|v| !v.trim().is_empty());

        let model = var("AI_MODEL")
            .or_else(|| config.model.clone())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let api_base = var("AI_API_BASE").or_else(|| config.api_base.clone());

        let vendor_key = if model.starts_with("claude") {
            "ANTHROPIC_API_KEY"
        } else {
            "OPENAI_API_KEY"
        };
        let api_key = var("AI_API_KEY").or_else(|| var(vendor_key));

        Self {
            provider: ProviderConfig {
                api_key,
                model,
                api_base,
            },
            youtube_api_key: var("YOUTUBE_API_KEY"),
            bind: config.bind.clone().unwrap_or_else(|| DEFAULT_BIND.to_string()),
            lang: config.lang.clone().unwrap_or_else(|| DEFAULT_LANG.to_string()),
        }
    }

    /// Resolve against the process environment
    pub fn from_env(config: &Config) -> Self {
        Self::resolve(config, |name| std::env::var(name).ok())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn test_parse_config() {
        let toml_str = r#"
model = "gpt-4o-mini"
api_base = "http://localhost:4000/v1"
bind = "0.0.0.0:8080"
lang = "de"
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.model.as_deref(), Some("gpt-4o-mini"));
        assert_eq!(config.api_base.as_deref(), Some("http://localhost:4000/v1"));
        assert_eq!(config.bind.as_deref(), Some("0.0.0.0:8080"));
        assert_eq!(config.lang.as_deref(), Some("de"));
    }

    #[test]
    fn test_parse_empty_config() {
        let config: Config = toml::from_str("").unwrap();
        assert!(config.model.is_none());
        assert!(config.bind.is_none());
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::resolve(&Config::default(), env_of(&[]));
        assert_eq!(settings.provider.model, DEFAULT_MODEL);
        assert!(settings.provider.api_key.is_none());
        assert!(settings.provider.api_base.is_none());
        assert!(settings.youtube_api_key.is_none());
        assert_eq!(settings.bind, DEFAULT_BIND);
        assert_eq!(settings.lang, DEFAULT_LANG);
    }

    #[test]
    fn test_env_overrides_file() {
        let config = Config {
            model: Some("gpt-4o".to_string()),
            ..Config::default()
        };
        let settings = Settings::resolve(
            &config,
            env_of(&[("AI_MODEL", "gpt-4o-mini"), ("AI_API_KEY", "sk-test"), ("YOUTUBE_API_KEY", "yt")]),
        );
        assert_eq!(settings.provider.model, "gpt-4o-mini");
        assert_eq!(settings.provider.api_key.as_deref(), Some("sk-test"));
        assert_eq!(settings.youtube_api_key.as_deref(), Some("yt"));
    }

    #[test]
    fn test_vendor_key_follows_model() {
        let env = env_of(&[("ANTHROPIC_API_KEY", "ant"), ("OPENAI_API_KEY", "oai")]);
        let settings = Settings::resolve(&Config::default(), &env);
        assert_eq!(settings.provider.api_key.as_deref(), Some("ant"));

        let config = Config {
            model: Some("gpt-4o".to_string()),
            ..Config::default()
        };
        let settings = Settings::resolve(&config, &env);
        assert_eq!(settings.provider.api_key.as_deref(), Some("oai"));
    }

    #[test]
    fn test_blank_env_ignored() {
        let settings = Settings::resolve(&Config::default(), env_of(&[("AI_MODEL", "  "), ("AI_API_KEY", "")]));
        assert_eq!(settings.provider.model, DEFAULT_MODEL);
        assert!(settings.provider.api_key.is_none());
    }
}
