use std::env;
use std::net::SocketAddr;

use crate::error::ConfigError;
use crate::net::framing::FrameCodec;

/// 100 MiB, the usual ceiling for a single WebSocket message.
pub const DEFAULT_MAX_PAYLOAD: u64 = 100 * 1024 * 1024;
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:9001";
pub const DEFAULT_READ_BUFFER: usize = 4096;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Cumulative payload ceiling per message, 0 disables the limit.
    pub max_payload: u64,
    /// Run the UTF-8 check on Binary messages too, not only Text.
    pub validate_binary_utf8: bool,
    pub bind_addr: SocketAddr,
    pub read_buffer: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_payload: DEFAULT_MAX_PAYLOAD,
            validate_binary_utf8: false,
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 9001)),
            read_buffer: DEFAULT_READ_BUFFER,
        }
    }
}

impl Config {
    /// Reads `WS_*` variables, loading a `.env` file first if one exists.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`Config::from_env`] but with an injectable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup("WS_MAX_PAYLOAD") {
            config.max_payload = parse(&raw, "WS_MAX_PAYLOAD")?;
        }
        if let Some(raw) = lookup("WS_VALIDATE_BINARY_UTF8") {
            config.validate_binary_utf8 = parse_bool(&raw, "WS_VALIDATE_BINARY_UTF8")?;
        }
        if let Some(raw) = lookup("WS_BIND_ADDR") {
            config.bind_addr = parse(&raw, "WS_BIND_ADDR")?;
        }
        if let Some(raw) = lookup("WS_READ_BUFFER") {
            config.read_buffer = parse(&raw, "WS_READ_BUFFER")?;
            if config.read_buffer == 0 {
                return Err(invalid("WS_READ_BUFFER", &raw));
            }
        }

        Ok(config)
    }

    pub fn codec(&self) -> FrameCodec {
        FrameCodec::with_config(self)
    }
}

fn parse<T: std::str::FromStr>(raw: &str, key: &'static str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| invalid(key, raw))
}

fn parse_bool(raw: &str, key: &'static str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(invalid(key, raw)),
    }
}

fn invalid(key: &'static str, raw: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key,
        value: raw.to_string(),
    }
}
