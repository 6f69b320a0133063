use crate::error::ShopError;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Deserializer, Serialize, de};
use std::path::PathBuf;
use std::sync::LazyLock;
use std::time::Duration;
use url::Url;

pub const CONFIG_FILE: &str = "sweetshop.toml";
pub const ENV_PREFIX: &str = "SWEETSHOP_";

/// Runtime configuration for the Sweet Shop client.
///
/// Sources, lowest precedence first: built-in defaults, `sweetshop.toml` in
/// the working directory, then `SWEETSHOP_*` environment variables.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// Base URL of the Sweet Shop API.
    pub api_url: Url,
    /// File holding the bearer credential between invocations.
    pub token_path: PathBuf,
    pub loglevel: String,
    /// Blank values (`SWEETSHOP_PROXY=`) mean no proxy.
    #[serde(default, deserialize_with = "blank_url_as_none")]
    pub proxy: Option<Url>,
    pub connect_timeout_secs: u64,
    pub timeout_secs: u64,
    /// Retries for idempotent reads. 0 disables retrying.
    pub retry_max_times: usize,
}

/// Configuration loaded once from the default provider chain.
pub static CONFIG: LazyLock<Result<Config, figment::Error>> =
    LazyLock::new(|| Config::figment().extract());

fn blank_url_as_none<'de, D>(deserializer: D) -> Result<Option<Url>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => Url::parse(s).map(Some).map_err(de::Error::custom),
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: Url::parse("http://127.0.0.1:8000").expect("static default api url"),
            token_path: PathBuf::from(".sweetshop_token"),
            loglevel: "info".to_string(),
            proxy: None,
            connect_timeout_secs: 5,
            timeout_secs: 15,
            retry_max_times: 2,
        }
    }
}

impl Config {
    /// Load configuration from the default provider chain.
    pub fn load() -> Result<Self, ShopError> {
        Self::from_figment(Self::figment())
    }

    /// The process-wide configuration from [`CONFIG`].
    pub fn global() -> Result<&'static Config, &'static figment::Error> {
        (*CONFIG).as_ref()
    }

    /// Default provider chain; exposed so callers can merge extra layers.
    pub fn figment() -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(CONFIG_FILE))
            .merge(Env::prefixed(ENV_PREFIX).ignore(&["password"]))
    }

    pub fn from_figment(figment: Figment) -> Result<Self, ShopError> {
        Ok(figment.extract()?)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
