use anyhow::{Context, Result};
use extract::GeminiConfig;
use serde::{Deserialize, Serialize};

const ENV_PREFIX: &str = "SEED_CATALOG_";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub bind_addr: String,
    /// Raises the default log filter to `debug`.
    pub debug: bool,
    pub log_json: bool,
    pub gemini: GeminiConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3000".to_string(),
            debug: false,
            log_json: false,
            gemini: GeminiConfig::default(),
        }
    }
}

impl AppConfig {
    /// Defaults overlaid with `SEED_CATALOG_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |name: &str| {
            lookup(&format!("{ENV_PREFIX}{name}"))
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let mut config = Self::default();
        let gemini = &mut config.gemini;

        if let Some(key) = var("API_KEY") {
            gemini.api_key = key;
        }
        gemini.alternate_token = var("ALTERNATE_TOKEN").or(gemini.alternate_token.take());
        if let Some(model) = var("MODEL") {
            gemini.model = model;
        }
        if let Some(fallback) = var("FALLBACK_MODEL") {
            // "none" turns the fallback retry off
            gemini.fallback_model = (!fallback.eq_ignore_ascii_case("none")).then_some(fallback);
        }
        if let Some(model) = var("VISION_MODEL") {
            gemini.vision_model = model;
        }
        if let Some(url) = var("BASE_URL") {
            gemini.base_url = url;
        }
        if let Some(secs) = var("TIMEOUT_SECS") {
            gemini.request_timeout_secs = secs
                .parse()
                .with_context(|| format!("{ENV_PREFIX}TIMEOUT_SECS must be a whole number, got {secs:?}"))?;
        }

        if let Some(addr) = var("BIND") {
            config.bind_addr = addr;
        }
        if let Some(flag) = var("DEBUG") {
            config.debug = parse_flag("DEBUG", &flag)?;
        }
        if let Some(flag) = var("LOG_JSON") {
            config.log_json = parse_flag("LOG_JSON", &flag)?;
        }

        Ok(config)
    }
}

fn parse_flag(name: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => anyhow::bail!("{ENV_PREFIX}{name} must be true or false, got {value:?}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_vars(vars: &[(&str, &str)]) -> Result<AppConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults_without_env() {
        let config = from_vars(&[]).unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:3000");
        assert!(!config.debug);
        assert!(config.gemini.api_key.is_empty());
        assert_eq!(config.gemini.fallback_model.as_deref(), Some("gemini-1.5-pro"));
    }

    #[test]
    fn test_env_overrides() {
        let config = from_vars(&[
            ("SEED_CATALOG_API_KEY", " key-123 "),
            ("SEED_CATALOG_MODEL", "gemini-1.5-flash"),
            ("SEED_CATALOG_FALLBACK_MODEL", "none"),
            ("SEED_CATALOG_TIMEOUT_SECS", "10"),
            ("SEED_CATALOG_BIND", "127.0.0.1:8080"),
            ("SEED_CATALOG_DEBUG", "yes"),
            ("SEED_CATALOG_LOG_JSON", "0"),
        ])
        .unwrap();

        assert_eq!(config.gemini.api_key, "key-123");
        assert_eq!(config.gemini.model, "gemini-1.5-flash");
        assert_eq!(config.gemini.fallback_model, None);
        assert_eq!(config.gemini.request_timeout_secs, 10);
        assert_eq!(config.bind_addr, "127.0.0.1:8080");
        assert!(config.debug);
        assert!(!config.log_json);
    }

    #[test]
    fn test_invalid_values_are_errors() {
        assert!(from_vars(&[("SEED_CATALOG_TIMEOUT_SECS", "soon")]).is_err());
        assert!(from_vars(&[("SEED_CATALOG_DEBUG", "maybe")]).is_err());
    }
}
