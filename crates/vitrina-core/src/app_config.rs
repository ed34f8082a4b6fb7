use std::path::PathBuf;

/// Process-level configuration read from the environment.
///
/// Per-site behavior (selectors, scoping, budgets) lives in [`crate::SiteConfig`];
/// this struct carries only the ambient knobs shared by every crawl.
#[derive(Clone)]
pub struct AppConfig {
    pub log_level: String,
    pub results_dir: PathBuf,
    pub site_config_path: PathBuf,
    pub user_agent: String,
    pub max_retries: u32,
    pub retry_backoff_base_secs: u64,
    pub llm_api_base: String,
    pub llm_api_key: Option<String>,
    pub llm_model: String,
    pub llm_temperature: f32,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("log_level", &self.log_level)
            .field("results_dir", &self.results_dir)
            .field("site_config_path", &self.site_config_path)
            .field("user_agent", &self.user_agent)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_base_secs", &self.retry_backoff_base_secs)
            .field("llm_api_base", &self.llm_api_base)
            .field(
                "llm_api_key",
                &self.llm_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("llm_model", &self.llm_model)
            .field("llm_temperature", &self.llm_temperature)
            .finish()
    }
}
