use clap::Parser;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

/// Taskhub to-do application server
#[derive(Parser, Serialize, Deserialize, Clone, Debug)]
#[command(name = "taskhub-server", version, about = "Taskhub to-do application server")]
pub struct Config {
    /// Port to listen on
    #[arg(long, env = "TASKHUB_PORT", default_value = "8000")]
    pub port: u16,

    /// Bind address
    #[arg(long, env = "TASKHUB_BIND_ADDRESS", default_value = "0.0.0.0")]
    pub bind_address: String,

    /// Path to TOML config file
    #[arg(long, default_value = "./taskhub.toml")]
    pub config: String,

    /// Enable structured JSON logging (for Docker/production)
    #[arg(long, env = "TASKHUB_JSON_LOGS")]
    pub json_logs: bool,

    /// Output a commented TOML config template and exit
    #[arg(long)]
    pub generate_config: bool,

    /// Data directory for persistent state (signing key, uploads)
    #[arg(long, env = "TASKHUB_DATA_DIR", default_value = "./data")]
    pub data_dir: String,

    /// Maximum accepted upload size in megabytes
    #[arg(long, env = "TASKHUB_MAX_UPLOAD_SIZE_MB", default_value = "25")]
    pub max_upload_size_mb: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8000,
            bind_address: "0.0.0.0".to_string(),
            config: "./taskhub.toml".to_string(),
            json_logs: false,
            generate_config: false,
            data_dir: "./data".to_string(),
            max_upload_size_mb: 25,
        }
    }
}

impl Config {
    /// Load config with layered precedence:
    /// built-in defaults < TOML file < env vars (TASKHUB_*) < CLI args
    pub fn load() -> Result<Self, figment::Error> {
        let cli = Config::parse();
        let config_path = cli.config.clone();

        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_path))
            .merge(Env::prefixed("TASKHUB_"))
            .merge(Serialized::defaults(cli))
            .extract()
    }
}

/// Generate a commented TOML config template
pub fn generate_config_template() -> String {
    r#"# Taskhub Server Configuration
# Place this file at ./taskhub.toml or specify with --config <path>
# All settings can be overridden via environment variables (TASKHUB_PORT, etc.)
# or CLI flags (--port, etc.)

# Server port (default: 8000)
# port = 8000

# Bind address (default: 0.0.0.0 — all interfaces)
# bind_address = "0.0.0.0"

# Enable structured JSON logging for Docker/production
# json_logs = false

# Data directory for the JWT signing key and uploaded attachments
# data_dir = "./data"

# Maximum accepted upload size in megabytes (default: 25)
# max_upload_size_mb = 25
"#
    .to_string()
}
