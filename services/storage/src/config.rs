use serde::Deserialize;
use std::path::PathBuf;

/// Main configuration for the image store
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StoreConfig {
    /// Service configuration
    #[serde(default)]
    pub service: ServiceConfig,
    /// Local (EPS) file storage configuration
    #[serde(default)]
    pub local: LocalStorageConfig,
    /// Remote object store configuration
    #[serde(default)]
    pub remote: RemoteStorageConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    /// Service name for logging/metrics
    #[serde(default = "default_service_name")]
    pub name: String,
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Local image file configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LocalStorageConfig {
    /// Root directory under which event images are written
    #[serde(default = "default_root_dir")]
    pub root_dir: PathBuf,
    /// Extension given to written image files
    #[serde(default = "default_file_extension")]
    pub file_extension: String,
    /// Keep written files when their handle is released.
    /// When false, handles are scratch files removed on release unless persisted.
    #[serde(default = "default_true")]
    pub keep_files: bool,
}

/// Remote object store configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteStorageConfig {
    /// Write a local file for references to unrecognized services
    /// instead of failing
    #[serde(default = "default_true")]
    pub fallback_to_local: bool,
}

// Default value functions
fn default_service_name() -> String {
    "lpr-image-store".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_root_dir() -> PathBuf {
    PathBuf::from("./data/images")
}

fn default_file_extension() -> String {
    "jpg".to_string()
}

fn default_true() -> bool {
    true
}

impl StoreConfig {
    /// Load configuration from environment and config files
    pub fn load() -> anyhow::Result<Self> {
        let config = config::Config::builder()
            .set_default("service.name", "lpr-image-store")?
            .set_default("service.log_level", "info")?
            // Add config file if present
            .add_source(config::File::with_name("config/image-store").required(false))
            .add_source(config::File::with_name("/etc/lpr/image-store").required(false))
            // Override with environment variables
            // IMAGE_STORE__LOCAL__ROOT_DIR -> local.root_dir
            .add_source(
                config::Environment::with_prefix("IMAGE_STORE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize().map_err(Into::into)
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            log_level: default_log_level(),
        }
    }
}

impl Default for LocalStorageConfig {
    fn default() -> Self {
        Self {
            root_dir: default_root_dir(),
            file_extension: default_file_extension(),
            keep_files: true,
        }
    }
}

impl Default for RemoteStorageConfig {
    fn default() -> Self {
        Self {
            fallback_to_local: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let config = StoreConfig::default();
        assert_eq!(config.service.name, "lpr-image-store");
        assert_eq!(config.local.root_dir, PathBuf::from("./data/images"));
        assert_eq!(config.local.file_extension, "jpg");
        assert!(config.local.keep_files);
        assert!(config.remote.fallback_to_local);
    }

    #[test]
    fn test_load_reads_environment_overrides() {
        std::env::set_var("IMAGE_STORE__LOCAL__ROOT_DIR", "/var/lib/lpr/eps");
        std::env::set_var("IMAGE_STORE__REMOTE__FALLBACK_TO_LOCAL", "false");

        let config = StoreConfig::load().unwrap();

        std::env::remove_var("IMAGE_STORE__LOCAL__ROOT_DIR");
        std::env::remove_var("IMAGE_STORE__REMOTE__FALLBACK_TO_LOCAL");

        assert_eq!(config.local.root_dir, PathBuf::from("/var/lib/lpr/eps"));
        assert!(!config.remote.fallback_to_local);
        assert_eq!(config.local.file_extension, "jpg");
        assert_eq!(config.service.name, "lpr-image-store");
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let json = r#"{ "local": { "root_dir": "/var/lib/lpr/eps" } }"#;
        let config: StoreConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.local.root_dir, PathBuf::from("/var/lib/lpr/eps"));
        assert_eq!(config.local.file_extension, "jpg");
        assert_eq!(config.service.log_level, "info");
        assert!(config.remote.fallback_to_local);
    }
}
