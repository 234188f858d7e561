//! Shared types used across the Saathi crates: preference records, chat
//! modes, and gateway configuration.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Per-user stored preferences used to personalize companion-mode prompts.
/// Exactly one record per `user_id`; an upsert replaces the whole document
/// (no field-level merge).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreferenceRecord {
    /// Opaque user identifier; the store key.
    pub user_id: String,
    /// Favorite categories ("color", "food", ...) to values. Keys are not
    /// predefined; the map may be empty.
    #[serde(default)]
    pub favorites: HashMap<String, String>,
    /// Current mood. `None` means unknown.
    #[serde(default)]
    pub mood: Option<String>,
}

impl PreferenceRecord {
    /// Synthesized default for a user with no stored record. Returned by
    /// reads for unknown users; never persisted by the read itself.
    pub fn empty(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            favorites: HashMap::new(),
            mood: None,
        }
    }
}

/// Chat persona selector. The wire `mode` field is an open string; anything
/// other than `"personal"` selects the tutoring persona.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatMode {
    /// Warm companion persona, personalized from the preference record.
    Personal,
    /// Fixed tutoring persona; ignores the preference record.
    Academy,
}

impl ChatMode {
    /// Maps the wire `mode` string: `"personal"` is Personal, every other
    /// value falls through to Academy.
    pub fn from_raw(raw: &str) -> Self {
        match raw {
            "personal" => ChatMode::Personal,
            _ => ChatMode::Academy,
        }
    }
}

/// Gateway configuration. Load from TOML or env.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Application identity used in startup logs.
    pub app_name: String,
    /// HTTP port for the gateway.
    pub port: u16,
    /// Base directory for the Sled preference database.
    pub storage_path: String,
    /// LLM mode: "mock" (deterministic canned replies) or "live" (calls the
    /// completion API).
    pub llm_mode: String,
    /// CORS allow-list of client origins. `["*"]` allows any origin.
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
}

fn default_allowed_origins() -> Vec<String> {
    vec!["*".to_string()]
}

impl CoreConfig {
    /// Load config from file and environment. Precedence: env `SAATHI_CONFIG`
    /// path > `config/gateway.toml` > defaults, with `SAATHI_`-prefixed
    /// environment variables overriding both (e.g. `SAATHI_PORT`,
    /// `SAATHI_ALLOWED_ORIGINS` as a comma-separated list).
    pub fn load() -> Result<Self, config::ConfigError> {
        let config_path =
            std::env::var("SAATHI_CONFIG").unwrap_or_else(|_| "config/gateway.toml".to_string());
        let builder = config::Config::builder()
            .set_default("app_name", "Saathi Backend")?
            .set_default("port", 8000_i64)?
            .set_default("storage_path", "./data")?
            .set_default("llm_mode", "mock")?;

        let path = Path::new(&config_path);
        let builder = if path.exists() {
            builder.add_source(config::File::from(path))
        } else {
            builder
        };

        let built = builder
            .add_source(
                config::Environment::with_prefix("SAATHI")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("allowed_origins"),
            )
            .build()?;

        built.try_deserialize()
    }
}
