use crate::paths;
use anyhow::{Context, Result};
use colored::Colorize;
use dialoguer::{Confirm, Input};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::PathBuf;
use teller_core::{ClientConfig, ServerConfig};

/// Keys `config set` accepts, with a short description for `config list`
pub const KNOWN_KEYS: [(&str, &str); 5] = [
    ("server.bind", "address the server listens on"),
    ("client.bind", "local address of the client socket"),
    ("client.server", "server address the client sends to"),
    ("client.response_timeout_ms", "wait before retransmitting"),
    ("client.failure_timeout_ms", "cumulative wait before giving up"),
];

#[derive(Deserialize, Serialize, Debug, Default, Clone, PartialEq, Eq)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub client: ClientConfig,
}

impl AppConfig {
    /// Apply CLI argument overrides to the configuration
    pub fn apply_cli_overrides(
        &mut self,
        server: Option<SocketAddr>,
        client_bind: Option<SocketAddr>,
        server_bind: Option<SocketAddr>,
    ) {
        if let Some(addr) = server {
            self.client.server = addr;
        }
        if let Some(addr) = client_bind {
            self.client.bind = addr;
        }
        if let Some(addr) = server_bind {
            self.server.bind = addr;
        }
    }
}

/// Configuration manager that handles XDG-compliant paths and layered configuration
pub struct ConfigManager {
    config_path: PathBuf,
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigManager {
    /// Create a new ConfigManager with default XDG-compliant paths
    pub fn new() -> Self {
        Self {
            config_path: paths::get_config_path(),
        }
    }

    /// Create a ConfigManager with a specific path (for testing)
    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    /// Get the configuration file path
    pub fn get_config_path(&self) -> PathBuf {
        self.config_path.clone()
    }

    /// Load configuration with layered priority: ENV > File > Defaults.
    /// CLI flags are applied on top by the caller.
    pub fn load(&self) -> Result<AppConfig> {
        let mut figment = Figment::new();

        // Layer 1: Defaults
        figment = figment.merge(Serialized::defaults(AppConfig::default()));

        // Layer 2: Config file (if exists)
        if self.config_path.exists() {
            figment = figment.merge(Toml::file(&self.config_path));
        }

        // Layer 3: Environment variables
        figment = figment.merge(Env::prefixed("TELLER_").split("__"));

        figment.extract().context("Failed to load configuration")
    }

    /// Get a configuration value by key (dot notation)
    pub fn get(&self, key: &str) -> Result<String> {
        let config = self.load()?;
        let toml_string = toml::to_string(&config)?;
        let value: toml::Value = toml::from_str(&toml_string)?;

        let mut current = &value;
        for part in key.split('.') {
            match current {
                toml::Value::Table(table) => {
                    current = table
                        .get(part)
                        .ok_or_else(|| anyhow::anyhow!("Key '{}' not found", key))?;
                }
                _ => anyhow::bail!("Invalid key path: {}", key),
            }
        }

        match current {
            toml::Value::String(s) => Ok(s.clone()),
            toml::Value::Integer(i) => Ok(i.to_string()),
            toml::Value::Boolean(b) => Ok(b.to_string()),
            _ => anyhow::bail!("Value at '{}' is not a simple type", key),
        }
    }

    /// Set a configuration value by key (dot notation)
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let parsed_value = parse_config_value(key, value)?;

        // Load existing config or create new
        let mut config = if self.config_path.exists() {
            let content = fs::read_to_string(&self.config_path)?;
            toml::from_str(&content)?
        } else {
            toml::Value::Table(toml::map::Map::new())
        };

        let Some((section, field)) = key.split_once('.') else {
            anyhow::bail!("Invalid key path: {}", key);
        };

        let toml::Value::Table(root) = &mut config else {
            anyhow::bail!("Config file is not a table");
        };
        let section = root
            .entry(section.to_string())
            .or_insert_with(|| toml::Value::Table(toml::map::Map::new()));
        let toml::Value::Table(section) = section else {
            anyhow::bail!("Invalid key path: expected table at '{}'", key);
        };
        section.insert(field.to_string(), parsed_value);

        // Refuse to write a file that would no longer load
        let toml_string = toml::to_string_pretty(&config)?;
        let candidate: AppConfig = toml::from_str(&toml_string)
            .with_context(|| format!("Invalid value for {key}"))?;
        log::debug!("Updated configuration: {candidate:?}");

        // Ensure directory exists
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        // Write the updated config
        fs::write(&self.config_path, toml_string)?;

        Ok(())
    }

    /// List all configuration values
    pub fn list(&self) -> Result<Vec<(String, String)>> {
        let config = self.load()?;
        let toml_string = toml::to_string(&config)?;
        let value: toml::Value = toml::from_str(&toml_string)?;

        let mut items = Vec::new();
        collect_values(&value, String::new(), &mut items);
        items.sort_by(|a, b| a.0.cmp(&b.0));

        Ok(items)
    }
}

/// Recursively collect all key-value pairs from TOML
fn collect_values(value: &toml::Value, prefix: String, items: &mut Vec<(String, String)>) {
    match value {
        toml::Value::Table(table) => {
            for (key, val) in table {
                let new_prefix = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                collect_values(val, new_prefix, items);
            }
        }
        toml::Value::String(s) => items.push((prefix, s.clone())),
        toml::Value::Integer(i) => items.push((prefix, i.to_string())),
        toml::Value::Boolean(b) => items.push((prefix, b.to_string())),
        _ => {} // Skip arrays and other complex types
    }
}

/// Validate a value for `key` and convert it to its TOML type
fn parse_config_value(key: &str, value: &str) -> Result<toml::Value> {
    match key {
        "server.bind" | "client.bind" | "client.server" => {
            let addr: SocketAddr = value
                .parse()
                .with_context(|| format!("{key} must be an address like 127.0.0.1:25565"))?;
            Ok(toml::Value::String(addr.to_string()))
        }
        "client.response_timeout_ms" | "client.failure_timeout_ms" => {
            let millis: u32 = value
                .parse()
                .with_context(|| format!("{key} must be a positive integer"))?;
            if millis == 0 {
                anyhow::bail!("{key} must be greater than 0");
            }
            Ok(toml::Value::Integer(i64::from(millis)))
        }
        _ => anyhow::bail!(
            "Unknown configuration key '{key}'. Known keys: {}",
            KNOWN_KEYS.map(|(k, _)| k).join(", ")
        ),
    }
}

/// Get the default configuration
pub fn get_config() -> Result<AppConfig> {
    ConfigManager::new().load()
}

/// Interactive setup wizard for the client's server address and timeouts
pub fn interactive_init(manager: &mut ConfigManager, force: bool) -> Result<()> {
    println!("{}", "teller Setup".bold());
    println!("{}", "============".bold());
    println!();

    if !force && manager.get_config_path().exists() {
        let reconfigure = Confirm::new()
            .with_prompt("Configuration already exists. Reconfigure?")
            .default(false)
            .interact()
            .context("Failed to read input")?;

        if !reconfigure {
            println!("Setup cancelled.");
            return Ok(());
        }
    }

    let current = manager.load().unwrap_or_default();

    let server: String = Input::new()
        .with_prompt("Server address")
        .default(current.client.server.to_string())
        .validate_with(|input: &String| -> Result<(), &str> {
            input
                .parse::<SocketAddr>()
                .map(|_| ())
                .map_err(|_| "Must be an address like 127.0.0.1:25565")
        })
        .interact_text()
        .context("Failed to read server address")?;

    let response_timeout: u32 = Input::new()
        .with_prompt("Response timeout (ms)")
        .default(current.client.response_timeout_ms.try_into().unwrap_or(u32::MAX))
        .validate_with(|input: &u32| -> Result<(), &str> {
            if *input == 0 {
                Err("Must be greater than 0")
            } else {
                Ok(())
            }
        })
        .interact_text()
        .context("Failed to read response timeout")?;

    let failure_timeout: u32 = Input::new()
        .with_prompt("Give up after (ms)")
        .default(response_timeout.saturating_mul(5))
        .interact_text()
        .context("Failed to read failure timeout")?;

    manager.set("client.server", &server)?;
    manager.set("client.response_timeout_ms", &response_timeout.to_string())?;
    manager.set("client.failure_timeout_ms", &failure_timeout.to_string())?;

    println!();
    println!("{}", "✓ Configuration saved".green());
    println!();
    println!("You can now use:");
    println!("  teller client          - Start a session (one per server run)");

    Ok(())
}
