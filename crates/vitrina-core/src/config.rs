use crate::app_config::AppConfig;
use crate::ConfigError;

/// Default `User-Agent`: a realistic browser profile reduces anti-bot
/// blocking compared to a bare library identifier.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a set env var holds an invalid value.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the
/// process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files — useful for
/// testing or when the caller manages env setup.
///
/// # Errors
///
/// Returns `ConfigError` if a set env var holds an invalid value.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// This is the core parsing/validation logic, decoupled from the actual
/// environment so it can be tested with a pure `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::path::PathBuf;

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u32>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_f32 = |var: &str, default: &str| -> Result<f32, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<f32>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let log_level = or_default("VITRINA_LOG_LEVEL", "info");
    let results_dir = PathBuf::from(or_default("VITRINA_RESULTS_DIR", "./results"));
    let site_config_path = PathBuf::from(or_default(
        "VITRINA_SITE_CONFIG",
        "./config/site.yaml",
    ));
    let user_agent = or_default("VITRINA_USER_AGENT", BROWSER_USER_AGENT);

    let max_retries = parse_u32("VITRINA_MAX_RETRIES", "3")?;
    let retry_backoff_base_secs = parse_u64("VITRINA_RETRY_BACKOFF_BASE_SECS", "2")?;

    let llm_api_base = or_default("VITRINA_LLM_API_BASE", "https://api.openai.com/v1");
    let llm_api_key = lookup("VITRINA_LLM_API_KEY").ok();
    let llm_model = or_default("VITRINA_LLM_MODEL", "gpt-4o-mini");
    let llm_temperature = parse_f32("VITRINA_LLM_TEMPERATURE", "0.2")?;

    Ok(AppConfig {
        log_level,
        results_dir,
        site_config_path,
        user_agent,
        max_retries,
        retry_backoff_base_secs,
        llm_api_base,
        llm_api_key,
        llm_model,
        llm_temperature,
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::env::VarError;

    use super::*;

    fn lookup_from_map<'a>(
        map: &'a HashMap<&'a str, &'a str>,
    ) -> impl Fn(&str) -> Result<String, VarError> + 'a {
        move |key| {
            map.get(key)
                .map(|v| (*v).to_string())
                .ok_or(VarError::NotPresent)
        }
    }

    #[test]
    fn build_app_config_succeeds_with_empty_env() {
        let map: HashMap<&str, &str> = HashMap::new();
        let cfg = build_app_config(lookup_from_map(&map)).unwrap();
        assert_eq!(cfg.log_level, "info");
        assert_eq!(cfg.results_dir.to_string_lossy(), "./results");
        assert_eq!(cfg.max_retries, 3);
        assert_eq!(cfg.retry_backoff_base_secs, 2);
        assert_eq!(cfg.llm_api_base, "https://api.openai.com/v1");
        assert!(cfg.llm_api_key.is_none());
        assert_eq!(cfg.llm_model, "gpt-4o-mini");
        assert_eq!(cfg.user_agent, BROWSER_USER_AGENT);
    }

    #[test]
    fn build_app_config_reads_overrides() {
        let mut map: HashMap<&str, &str> = HashMap::new();
        map.insert("VITRINA_MAX_RETRIES", "5");
        map.insert("VITRINA_LLM_API_KEY", "sk-test");
        map.insert("VITRINA_USER_AGENT", "custom-agent/2.0");
        let cfg = build_app_config(lookup_from_map(&map)).unwrap();
        assert_eq!(cfg.max_retries, 5);
        assert_eq!(cfg.llm_api_key.as_deref(), Some("sk-test"));
        assert_eq!(cfg.user_agent, "custom-agent/2.0");
    }

    #[test]
    fn build_app_config_rejects_invalid_max_retries() {
        let mut map: HashMap<&str, &str> = HashMap::new();
        map.insert("VITRINA_MAX_RETRIES", "not-a-number");
        let result = build_app_config(lookup_from_map(&map));
        assert!(
            matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "VITRINA_MAX_RETRIES"),
            "expected InvalidEnvVar(VITRINA_MAX_RETRIES), got: {result:?}"
        );
    }

    #[test]
    fn build_app_config_rejects_invalid_temperature() {
        let mut map: HashMap<&str, &str> = HashMap::new();
        map.insert("VITRINA_LLM_TEMPERATURE", "warm");
        let result = build_app_config(lookup_from_map(&map));
        assert!(
            matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "VITRINA_LLM_TEMPERATURE"),
            "expected InvalidEnvVar(VITRINA_LLM_TEMPERATURE), got: {result:?}"
        );
    }

    #[test]
    fn debug_redacts_api_key() {
        let mut map: HashMap<&str, &str> = HashMap::new();
        map.insert("VITRINA_LLM_API_KEY", "sk-secret");
        let cfg = build_app_config(lookup_from_map(&map)).unwrap();
        let rendered = format!("{cfg:?}");
        assert!(!rendered.contains("sk-secret"));
        assert!(rendered.contains("[redacted]"));
    }
}
