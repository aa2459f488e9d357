//! Runtime configuration, read from the environment.
//!
//! Secrets are only ever supplied externally; nothing here has a built-in
//! credential.

use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::common::error::ConfigError;
use crate::common::types::Credential;

pub const DEFAULT_TRADING_API_BASE: &str = "https://api.elections.kalshi.com/trade-api/v2";
pub const DEFAULT_CONVERSATION_API_BASE: &str = "https://api.elevenlabs.io";
pub const DEFAULT_CALL_DELAY_MS: u64 = 40_000;
pub const DEFAULT_NUMBERS_PATH: &str = "numbers.txt";
pub const DEFAULT_PAGE_SIZE: u32 = 3;
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:5051";

#[derive(Clone, Debug)]
pub struct ConversationSettings {
    pub api_base: String,
    pub api_key: String,
    pub agent_id: String,
    pub page_size: u32,
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub credential: Credential,
    pub trading_api_base: String,
    pub outbound_call_url: Option<String>,
    pub call_delay: Duration,
    pub numbers_path: PathBuf,
    pub conversations: Option<ConversationSettings>,
    pub bind_addr: SocketAddr,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the config from any name -> value source. Empty values count
    /// as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        // The inline PEM wins over the key file.
        let private_key_pem = match get("KALSHI_PRIVATE_KEY") {
            Some(pem) => Some(pem),
            None => match get("KALSHI_PRIVATE_KEY_PATH") {
                Some(path) => Some(
                    fs::read_to_string(&path).map_err(|source| ConfigError::Io { path, source })?,
                ),
                None => None,
            },
        };

        let call_delay_ms = match get("CALL_DELAY_MS") {
            Some(value) => value
                .trim()
                .parse::<u64>()
                .map_err(|_| ConfigError::Invalid { name: "CALL_DELAY_MS", value })?,
            None => DEFAULT_CALL_DELAY_MS,
        };

        let bind_addr = get("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_addr
            .parse::<SocketAddr>()
            .map_err(|_| ConfigError::Invalid { name: "BIND_ADDR", value: bind_addr.clone() })?;

        let conversations = match (get("ELEVENLABS_API_KEY"), get("ELEVENLABS_AGENT_ID")) {
            (Some(api_key), Some(agent_id)) => {
                let page_size = match get("CONVERSATION_PAGE_SIZE") {
                    Some(value) => value
                        .trim()
                        .parse::<u32>()
                        .map_err(|_| ConfigError::Invalid {
                            name: "CONVERSATION_PAGE_SIZE",
                            value,
                        })?,
                    None => DEFAULT_PAGE_SIZE,
                };
                Some(ConversationSettings {
                    api_base: get("ELEVENLABS_API_BASE")
                        .unwrap_or_else(|| DEFAULT_CONVERSATION_API_BASE.to_string()),
                    api_key,
                    agent_id,
                    page_size,
                })
            }
            _ => None,
        };

        Ok(Self {
            credential: Credential {
                key_id: get("KALSHI_API_KEY"),
                private_key_pem,
            },
            trading_api_base: get("TRADING_API_BASE")
                .unwrap_or_else(|| DEFAULT_TRADING_API_BASE.to_string()),
            outbound_call_url: get("OUTBOUND_CALL_URL"),
            call_delay: Duration::from_millis(call_delay_ms),
            numbers_path: get("NUMBERS_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_NUMBERS_PATH)),
            conversations,
            bind_addr,
        })
    }

    pub fn outbound_call_url(&self) -> Result<&str, ConfigError> {
        self.outbound_call_url
            .as_deref()
            .ok_or(ConfigError::Missing("OUTBOUND_CALL_URL"))
    }
}
