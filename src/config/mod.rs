use std::path::PathBuf;

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::error::{Result, RolysError};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Page region settings
    #[serde(default)]
    pub page: PageConfig,

    /// Remote image packaging service
    #[serde(default)]
    pub packager: PackagerConfig,

    /// Exchange-rate service and currency widget
    #[serde(default)]
    pub rates: RatesConfig,

    /// Where downloaded files land
    #[serde(default)]
    pub downloads: DownloadsConfig,

    /// Popup presentation
    #[serde(default)]
    pub popup: PopupConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageConfig {
    /// CSS selector of the content region
    #[serde(default = "default_region_selector")]
    pub region_selector: String,
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            region_selector: default_region_selector(),
        }
    }
}

fn default_region_selector() -> String {
    crate::content::REGION_SELECTOR.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackagerConfig {
    /// Packaging service base URL
    #[serde(default = "default_packager_url")]
    pub base_url: String,

    /// HTTP timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for PackagerConfig {
    fn default() -> Self {
        Self {
            base_url: default_packager_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_packager_url() -> String {
    "https://rolyyung.top".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RatesConfig {
    /// Exchange-rate API base URL
    #[serde(default = "default_rates_url")]
    pub base_url: String,

    /// How long a fetched rate stays fresh
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    /// Quiet period before an amount input is converted
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

impl Default for RatesConfig {
    fn default() -> Self {
        Self {
            base_url: default_rates_url(),
            cache_ttl_secs: default_cache_ttl_secs(),
            debounce_ms: default_debounce_ms(),
        }
    }
}

fn default_rates_url() -> String {
    "https://api.frankfurter.app".to_string()
}

fn default_cache_ttl_secs() -> u64 {
    10 * 60
}

fn default_debounce_ms() -> u64 {
    300
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadsConfig {
    /// Download directory (defaults to the platform download dir)
    pub dir: Option<String>,

    /// Subdirectory for image files and archives
    #[serde(default = "default_subdir")]
    pub subdir: String,
}

impl Default for DownloadsConfig {
    fn default() -> Self {
        Self {
            dir: None,
            subdir: default_subdir(),
        }
    }
}

fn default_subdir() -> String {
    crate::content::dispatch::IMAGE_DIR.to_string()
}

impl DownloadsConfig {
    /// Resolve the effective download directory
    pub fn resolve_dir(&self) -> PathBuf {
        match self.dir.as_deref().map(str::trim) {
            Some(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => dirs::download_dir().unwrap_or_else(|| PathBuf::from("downloads")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PopupConfig {
    /// How long a transient notification stays visible
    #[serde(default = "default_notification_ms")]
    pub notification_ms: u64,
}

impl Default for PopupConfig {
    fn default() -> Self {
        Self {
            notification_ms: default_notification_ms(),
        }
    }
}

fn default_notification_ms() -> u64 {
    3000
}

impl Config {
    /// Load configuration from all sources (file, env, defaults)
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration with an explicit file path
    pub fn load_from(config_path: &std::path::Path) -> Result<Self> {
        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(config_path))
            // ROLYS_PACKAGER__BASE_URL -> packager.base_url
            .merge(Env::prefixed("ROLYS_").split("__"))
            .extract()
            .map_err(|e| RolysError::ConfigError(e.to_string()))
    }

    /// Get the configuration file path
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("rolys")
            .join("config.toml")
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content =
            toml::to_string_pretty(self).map_err(|e| RolysError::ConfigError(e.to_string()))?;

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Look up a dotted key, e.g. `rates.base_url`
    pub fn get_key(&self, key: &str) -> Result<Option<String>> {
        let value = match key {
            "page.region_selector" => Some(self.page.region_selector.clone()),
            "packager.base_url" => Some(self.packager.base_url.clone()),
            "packager.timeout_secs" => Some(self.packager.timeout_secs.to_string()),
            "rates.base_url" => Some(self.rates.base_url.clone()),
            "rates.cache_ttl_secs" => Some(self.rates.cache_ttl_secs.to_string()),
            "rates.debounce_ms" => Some(self.rates.debounce_ms.to_string()),
            "downloads.dir" => self.downloads.dir.clone(),
            "downloads.subdir" => Some(self.downloads.subdir.clone()),
            "popup.notification_ms" => Some(self.popup.notification_ms.to_string()),
            _ => return Err(unknown_key(key)),
        };
        Ok(value)
    }

    /// Set a dotted key from its string form
    pub fn set_key(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "page.region_selector" => self.page.region_selector = value.to_string(),
            "packager.base_url" => self.packager.base_url = value.to_string(),
            "packager.timeout_secs" => self.packager.timeout_secs = parse_number(key, value)?,
            "rates.base_url" => self.rates.base_url = value.to_string(),
            "rates.cache_ttl_secs" => self.rates.cache_ttl_secs = parse_number(key, value)?,
            "rates.debounce_ms" => self.rates.debounce_ms = parse_number(key, value)?,
            "downloads.dir" => self.downloads.dir = Some(value.to_string()),
            "downloads.subdir" => self.downloads.subdir = value.to_string(),
            "popup.notification_ms" => self.popup.notification_ms = parse_number(key, value)?,
            _ => return Err(unknown_key(key)),
        }
        Ok(())
    }
}

fn unknown_key(key: &str) -> RolysError {
    RolysError::ConfigError(format!("Unknown config key: {}", key))
}

fn parse_number(key: &str, value: &str) -> Result<u64> {
    value
        .trim()
        .parse()
        .map_err(|_| RolysError::ConfigError(format!("{} must be a non-negative integer", key)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_targets_known_region_and_services() {
        let config = Config::default();

        assert_eq!(config.page.region_selector, ".col.col-12.grid-col-9-lg.z1");
        assert_eq!(config.packager.base_url, "https://rolyyung.top");
        assert_eq!(config.rates.cache_ttl_secs, 600);
        assert_eq!(config.rates.debounce_ms, 300);
        assert_eq!(config.downloads.subdir, "rolys-images");
        assert_eq!(config.popup.notification_ms, 3000);
    }

    #[test]
    fn set_and_get_round_through_dotted_keys() {
        let mut config = Config::default();
        config.set_key("rates.debounce_ms", "150").unwrap();
        config.set_key("downloads.dir", "/tmp/rolys").unwrap();

        assert_eq!(config.get_key("rates.debounce_ms").unwrap().as_deref(), Some("150"));
        assert_eq!(config.get_key("downloads.dir").unwrap().as_deref(), Some("/tmp/rolys"));
    }

    #[test]
    fn set_rejects_unknown_key_and_bad_number() {
        let mut config = Config::default();

        assert!(matches!(
            config.set_key("browser.headless", "true"),
            Err(RolysError::ConfigError(_))
        ));
        assert!(matches!(
            config.set_key("packager.timeout_secs", "soon"),
            Err(RolysError::ConfigError(_))
        ));
    }

    #[test]
    fn blank_download_dir_falls_back_to_platform_default() {
        let downloads = DownloadsConfig {
            dir: Some("   ".to_string()),
            subdir: default_subdir(),
        };
        assert_ne!(downloads.resolve_dir(), PathBuf::from("   "));
    }

    #[test]
    fn save_then_load_reads_file_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = Config::default();
        config.packager.base_url = "http://127.0.0.1:9".to_string();
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.packager.base_url, "http://127.0.0.1:9");
        assert_eq!(loaded.rates.base_url, "https://api.frankfurter.app");
    }

    #[test]
    #[serial_test::serial]
    fn env_overrides_nested_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        Config::default().save_to(&path).unwrap();

        std::env::set_var("ROLYS_RATES__DEBOUNCE_MS", "50");
        let loaded = Config::load_from(&path);
        std::env::remove_var("ROLYS_RATES__DEBOUNCE_MS");

        assert_eq!(loaded.unwrap().rates.debounce_ms, 50);
    }
}
