use crate::utils::crypto::generate_secret;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

pub const DEFAULT_ENDPOINT: &str = "https://petsnapchat-be-production-70d9.up.railway.app/graphql";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ClientSettings {
    pub api: ApiSettings,
    pub storage: StorageSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    pub endpoint: String,
    /// Per-request transport timeout
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    /// Credentials live only as long as the process
    Memory,
    /// Credentials are sealed into a single file at `storage.path`
    EncryptedFile,
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(StorageBackend::Memory),
            "encrypted_file" | "encrypted-file" | "file" => Ok(StorageBackend::EncryptedFile),
            other => Err(format!("Unknown storage backend: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub backend: StorageBackend,
    pub path: String,
    /// Key material for the encrypted file backend
    pub secret: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout_seconds: 30,
        }
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Memory,
            path: "credentials.enc".to_string(),
            secret: String::new(), // Will be generated if empty
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl ApiSettings {
    /// Parsed endpoint URL
    ///
    /// # Errors
    ///
    /// Returns an error if `endpoint` is not an absolute URL
    pub fn endpoint_url(&self) -> Result<Url, url::ParseError> {
        Url::parse(self.endpoint.trim())
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl StorageSettings {
    #[must_use]
    pub fn path_buf(&self) -> PathBuf {
        PathBuf::from(&self.path)
    }
}

impl ClientSettings {
    /// Load settings from configuration files and environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Logger initialization fails
    /// - A settings file cannot be read or parsed
    /// - The resulting settings are invalid
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        Self::load_env_file();

        // Load base settings from TOML or defaults
        let mut settings = Self::load_base_settings()?;

        // Apply environment variable overrides
        Self::apply_env_overrides(&mut settings);

        settings.validate()?;
        settings.init_logging()?;
        Ok(settings)
    }

    /// Install the logger with `logging.level` as the filter
    ///
    /// # Errors
    ///
    /// Returns an error if a logger is already installed
    fn init_logging(&self) -> Result<(), Box<dyn std::error::Error>> {
        env_logger::Builder::new()
            .parse_filters(&self.logging.level)
            .try_init()?;
        Ok(())
    }

    /// Load base settings from TOML file(s) or use defaults
    /// Settings are loaded with the following priority (highest to lowest):
    /// 1. Environment variables (applied separately after loading base settings)
    /// 2. Settings.toml in `PETSNAP_SECRETS_DIR` (if specified and exists)
    /// 3. Settings.toml in current directory (if exists)
    /// 4. Default settings
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Settings file cannot be read
    /// - TOML parsing fails
    fn load_base_settings() -> Result<Self, Box<dyn std::error::Error>> {
        let mut settings = Self::default();

        let default_config_path = PathBuf::from("Settings.toml");
        if default_config_path.exists() {
            settings = Self::from_toml(&fs::read_to_string(&default_config_path)?)?;
            println!(
                "✓ Loaded base settings from {}",
                default_config_path.display()
            );
        }

        if let Ok(secrets_dir) = std::env::var("PETSNAP_SECRETS_DIR") {
            let secrets_path = std::path::Path::new(&secrets_dir).join("Settings.toml");
            if secrets_path.exists() {
                settings = Self::from_toml(&fs::read_to_string(&secrets_path)?)?;
                println!("✓ Overriding settings from {}", secrets_path.display());
            } else {
                println!(
                    "ℹ PETSNAP_SECRETS_DIR set but no Settings.toml found at: {}",
                    secrets_path.display()
                );
            }
        }

        Ok(settings)
    }

    /// Parse settings from TOML; missing sections and keys take their defaults
    ///
    /// # Errors
    ///
    /// Returns an error if `content` is not valid TOML for these settings
    pub fn from_toml(content: &str) -> Result<Self, basic_toml::Error> {
        basic_toml::from_str(content)
    }

    /// Apply environment variable overrides to settings
    pub fn apply_env_overrides(settings: &mut Self) {
        Self::apply_api_env_overrides(&mut settings.api);
        Self::apply_storage_env_overrides(&mut settings.storage);
        Self::apply_logging_env_overrides(&mut settings.logging);
    }

    fn apply_api_env_overrides(api_settings: &mut ApiSettings) {
        if let Ok(endpoint) = std::env::var("PETSNAP_API_ENDPOINT") {
            api_settings.endpoint = endpoint;
        }
        if let Ok(value_str) = std::env::var("PETSNAP_API_TIMEOUT_SECONDS") {
            if let Ok(value) = value_str.parse::<u64>() {
                api_settings.timeout_seconds = value;
            }
        }
    }

    /// Apply environment overrides for storage settings
    pub fn apply_storage_env_overrides(storage_settings: &mut StorageSettings) {
        if let Ok(backend_str) = std::env::var("PETSNAP_STORAGE_BACKEND") {
            match backend_str.parse() {
                Ok(backend) => storage_settings.backend = backend,
                Err(e) => eprintln!("⚠️  Ignoring PETSNAP_STORAGE_BACKEND: {e}"),
            }
        }
        if let Ok(path) = std::env::var("PETSNAP_STORAGE_PATH") {
            storage_settings.path = path;
        }

        Self::handle_storage_secret_override(storage_settings);
    }

    /// Helper function to handle storage secret environment override and generation
    fn handle_storage_secret_override(storage_settings: &mut StorageSettings) {
        let env_secret_set = std::env::var("PETSNAP_STORAGE_SECRET").is_ok_and(|secret| {
            if secret.is_empty() {
                false
            } else {
                storage_settings.secret = secret;
                true
            }
        });

        if !env_secret_set
            && storage_settings.secret.is_empty()
            && storage_settings.backend == StorageBackend::EncryptedFile
        {
            storage_settings.secret = generate_secret();
            Self::warn_about_generated_secret();
        }
    }

    /// Display warnings about using a generated storage secret
    fn warn_about_generated_secret() {
        eprintln!("⚠️  WARNING: Using auto-generated storage secret");
        eprintln!("🔒 For persistent credentials, set the PETSNAP_STORAGE_SECRET environment variable");
        eprintln!("   or configure storage.secret in Settings.toml");
        eprintln!("💡 Credentials written now cannot be read after a restart");
    }

    /// Apply environment overrides for logging settings
    fn apply_logging_env_overrides(logging_settings: &mut LoggingSettings) {
        if let Ok(log_level) = std::env::var("RUST_LOG") {
            logging_settings.level = log_level;
        }
    }

    /// Load environment variables from .env file
    fn load_env_file() {
        if let Ok(contents) = std::fs::read_to_string(".env") {
            for line in contents.lines() {
                let line = line.trim();
                if line.is_empty() || line.starts_with('#') {
                    continue;
                }
                if let Some((key, value)) = line.split_once('=') {
                    std::env::set_var(key.trim(), value.trim());
                }
            }
        }
    }

    /// Check the settings are usable
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint is not an http(s) URL or the timeout is zero
    pub fn validate(&self) -> Result<(), Box<dyn std::error::Error>> {
        let endpoint = self.api.endpoint_url()?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(format!("Unsupported API endpoint scheme: {}", endpoint.scheme()).into());
        }
        if self.api.timeout_seconds == 0 {
            return Err("api.timeout_seconds must be greater than zero".into());
        }
        let needs_path = self.storage.backend == StorageBackend::EncryptedFile;
        if needs_path && self.storage.path.trim().is_empty() {
            return Err("storage.path is required for the encrypted_file backend".into());
        }
        Ok(())
    }
}
