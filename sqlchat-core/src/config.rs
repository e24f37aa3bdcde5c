use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

pub const DEFAULT_GREETING: &str =
    "Hello! I'm your SQL Assistant. Ask me questions about students in natural language.";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct SqlChatConfig {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServiceConfig {
    pub base_url: String,
    pub query_path: String,
    pub timeout_seconds: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            query_path: "/query/".to_string(),
            timeout_seconds: 30,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ChatConfig {
    pub greeting: String,
    pub typing_speed_ms: u64,
    pub typing_dot_count: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            greeting: DEFAULT_GREETING.to_string(),
            typing_speed_ms: 500,
            typing_dot_count: 3,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

impl SqlChatConfig {
    /// Load from an optional TOML file, then `SQLCHAT__SECTION__KEY`
    /// environment overrides. A missing file yields the defaults.
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(Environment::with_prefix("SQLCHAT").separator("__"))
            .build()?;
        s.try_deserialize()
    }
}
