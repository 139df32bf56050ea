use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[derive(Debug, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub whatsapp: WhatsAppConfig,

    #[serde(default)]
    pub http: HTTPConfig,

    #[cfg(feature = "sentry")]
    pub sentry: Option<SentryConfig>,
}
impl AppConfig {
    /// Loads the TOML config file (if any) and then applies environment overrides.
    /// An explicitly given path must exist, the default `config.toml` is optional.
    pub fn load(config_filepath: Option<PathBuf>) -> Result<Self> {
        let mut config = match config_filepath {
            Some(config_path) => Self::from_file(&config_path)?,
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_PATH);
                if default_path.is_file() {
                    Self::from_file(default_path)?
                } else {
                    Self::default()
                }
            }
        };

        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn from_file(config_path: &Path) -> Result<Self> {
        let config_content = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {config_path:?}"))?;

        let config: AppConfig = toml::from_str(&config_content)
            .with_context(|| format!("Failed to parse TOML config file: {config_path:?}"))?;

        Ok(config)
    }

    /// Environment variables take precedence over the config file.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(access_token) = lookup("ACCESS_TOKEN") {
            self.whatsapp.access_token = access_token;
        }
        if let Some(phone_number_id) = lookup("PHONE_NUMBER_ID") {
            self.whatsapp.phone_number_id = phone_number_id;
        }
        if let Some(api_version) = lookup("VERSION") {
            self.whatsapp.api_version = api_version;
        }
        if let Some(verify_token) = lookup("WEBHOOK_TOKEN") {
            self.whatsapp.verify_token = Some(verify_token);
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WhatsAppConfig {
    #[serde(default)]
    pub access_token: String,

    #[serde(default)]
    pub phone_number_id: String,

    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Base Graph API URL, without a trailing slash.
    #[serde(default = "default_graph_url")]
    pub graph_url: String,

    /// Shared secret the platform echoes back during webhook verification.
    #[serde(default)]
    pub verify_token: Option<String>,

    /// No timeout is applied to outbound requests unless set.
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}
impl Default for WhatsAppConfig {
    fn default() -> Self {
        Self {
            access_token: String::new(),
            phone_number_id: String::new(),
            api_version: default_api_version(),
            graph_url: default_graph_url(),
            verify_token: None,
            request_timeout_secs: None,
        }
    }
}

#[cfg(feature = "sentry")]
#[derive(Debug, Deserialize)]
pub struct SentryConfig {
    pub dsn: String,

    #[serde(default)]
    pub environment: Option<String>,

    #[serde(default)]
    pub server_name: Option<String>,

    #[serde(default)]
    pub debug: bool,

    #[serde(default = "default_true")]
    pub send_default_pii: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HTTPConfig {
    #[serde(default = "default_http_address")]
    pub address: SocketAddr,

    /// Only guards the outbound send routes, webhook routes stay open.
    #[serde(default)]
    pub require_authentication: bool,

    #[serde(default)]
    pub tls: Option<TLSConfig>,
}
impl Default for HTTPConfig {
    fn default() -> Self {
        Self {
            address: default_http_address(),
            require_authentication: false,
            tls: None,
        }
    }
}

#[cfg_attr(
    not(any(feature = "tls-rustls", feature = "tls-native")),
    allow(dead_code)
)]
#[derive(Debug, Clone, Deserialize)]
pub struct TLSConfig {
    #[serde(deserialize_with = "deserialize_existing_file")]
    pub certificate_path: PathBuf,

    #[serde(deserialize_with = "deserialize_existing_file")]
    pub key_path: PathBuf,
}

fn default_api_version() -> String {
    "v19.0".to_string()
}
fn default_graph_url() -> String {
    "https://graph.facebook.com".to_string()
}

#[cfg(feature = "sentry")]
fn default_true() -> bool {
    true
}

fn default_http_address() -> SocketAddr {
    SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 5000)
}

fn deserialize_existing_file<'de, D>(deserializer: D) -> Result<PathBuf, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let path = PathBuf::deserialize(deserializer)?;
    if !path.exists() {
        return Err(serde::de::Error::custom(format!(
            "File does not exist: {}",
            path.display()
        )));
    }
    if !path.is_file() {
        return Err(serde::de::Error::custom(format!(
            "Path is not a file: {}",
            path.display()
        )));
    }
    Ok(path)
}
