use clap::Parser;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::audit::TagStorage;

/// LOREKEEP wiki moderation server
#[derive(Parser, Serialize, Deserialize, Clone, Debug)]
#[command(name = "lorekeep-server", version, about = "LOREKEEP wiki moderation server")]
pub struct Config {
    /// Port to listen on
    #[arg(long, env = "LOREKEEP_PORT", default_value = "5673")]
    pub port: u16,

    /// Bind address
    #[arg(long, env = "LOREKEEP_BIND_ADDRESS", default_value = "0.0.0.0")]
    pub bind_address: String,

    /// Path to TOML config file
    #[arg(long, default_value = "./lorekeep.toml")]
    pub config: String,

    /// Enable structured JSON logging (for Docker/production)
    #[arg(long, env = "LOREKEEP_JSON_LOGS")]
    pub json_logs: bool,

    /// Output a commented TOML config template and exit
    #[arg(long)]
    pub generate_config: bool,

    /// Data directory for persistent state (DB, keys)
    #[arg(long, env = "LOREKEEP_DATA_DIR", default_value = "./data")]
    pub data_dir: String,

    /// Registration mode: "open" or "closed"
    #[arg(long, env = "LOREKEEP_REGISTRATION_MODE", default_value = "open")]
    pub registration_mode: String,

    /// Audit log configuration (loaded from [audit] section in TOML)
    #[arg(skip)]
    #[serde(default)]
    pub audit: Option<AuditConfig>,
}

/// Configuration for the moderation audit log.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AuditConfig {
    /// How tag rows are written: "inline" (tag names on the rows),
    /// "normalized" (references into the tag registry), or "dual" (both,
    /// the transition default).
    #[serde(default)]
    pub tag_storage: TagStorage,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 5673,
            bind_address: "0.0.0.0".to_string(),
            config: "./lorekeep.toml".to_string(),
            json_logs: false,
            generate_config: false,
            data_dir: "./data".to_string(),
            registration_mode: "open".to_string(),
            audit: None,
        }
    }
}

impl Config {
    /// Load config with layered precedence:
    /// built-in defaults < TOML file < env vars (LOREKEEP_*) < CLI args
    pub fn load() -> Result<Self, figment::Error> {
        let cli = Config::parse();
        let config_path = cli.config.clone();

        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_path))
            .merge(Env::prefixed("LOREKEEP_"))
            .merge(Serialized::defaults(cli))
            .extract()
    }
}

/// Generate a commented TOML config template
pub fn generate_config_template() -> String {
    r#"# LOREKEEP Wiki Moderation Server Configuration
# Place this file at ./lorekeep.toml or specify with --config <path>
# All settings can be overridden via environment variables (LOREKEEP_PORT, etc.)
# or CLI flags (--port, etc.)

# Server port (default: 5673)
# port = 5673

# Bind address (default: 0.0.0.0 — all interfaces)
# bind_address = "0.0.0.0"

# Enable structured JSON logging for Docker/production
# json_logs = false

# Data directory for SQLite database and JWT signing key
# data_dir = "./data"

# Registration mode: "open" or "closed"
# Default: open (anyone can register)
# Admin can change at runtime via API
# registration_mode = "open"

# ---- Moderation Audit Log ----
# [audit]

# Tag storage mode for audit log entries:
#   "inline"     — tag names written directly on the tag rows
#   "normalized" — tag rows reference the tag registry by id
#   "dual"       — both forms written (transition default)
# tag_storage = "dual"
"#
    .to_string()
}
