use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 5001;
pub const DEFAULT_VOICES_DIR: &str = "./voices";
pub const DEFAULT_CHARACTER: &str = "mika";

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("HOST must be an IP address, got '{0}'")]
    InvalidHost(String),

    #[error("PORT must be a number, got '{0}'")]
    InvalidPort(String),

    #[error("DEFAULT_CHARACTER cannot be empty")]
    EmptyCharacter,
}

/// Process configuration, read once at startup and never mutated.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub host: IpAddr,
    pub port: u16,
    pub voices_dir: PathBuf,
    pub default_character: String,
}

impl GatewayConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let host = lookup("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string());
        let host: IpAddr = host.parse().map_err(|_| ConfigError::InvalidHost(host))?;

        let port = match lookup("PORT") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidPort(raw))?,
            None => DEFAULT_PORT,
        };

        let voices_dir = lookup("VOICES_DIR")
            .unwrap_or_else(|| DEFAULT_VOICES_DIR.to_string())
            .into();

        let default_character =
            lookup("DEFAULT_CHARACTER").unwrap_or_else(|| DEFAULT_CHARACTER.to_string());
        if default_character.trim().is_empty() {
            return Err(ConfigError::EmptyCharacter);
        }

        Ok(Self {
            host,
            port,
            voices_dir,
            default_character,
        })
    }

    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}
