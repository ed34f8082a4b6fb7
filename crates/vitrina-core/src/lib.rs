pub mod app_config;
pub mod config;
pub mod record;
pub mod site;

pub use app_config::AppConfig;
pub use config::{load_app_config, load_app_config_from_env};
pub use record::{ClassifiedPage, DiscardReason, DiscardedPage, ProductRecord, TitledUrl};
pub use site::{load_site_config, SelectorRule, SiteConfig};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read site config {path}: {source}")]
    SiteFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse site config: {0}")]
    SiteFileParse(#[from] serde_yaml::Error),

    #[error("invalid site config: {0}")]
    Validation(String),
}
