//! Centralized path management for the teller CLI
//!
//! Only the configuration file lives on disk; server state is in memory and
//! does not survive a restart.

use std::path::PathBuf;

/// The name of the application directory used across all platforms
const APP_DIR: &str = "teller";

/// The name of the configuration file
const CONFIG_FILE: &str = "config.toml";

/// Returns the path to the configuration directory
///
/// `XDG_CONFIG_HOME` wins on Unix-like systems. Otherwise:
/// - Linux: `~/.config/teller`
/// - macOS: `~/Library/Application Support/teller`
/// - Windows: `%APPDATA%/teller`
///
/// If no standard directory can be determined, falls back to `.teller` in the
/// current directory.
pub fn get_config_dir() -> PathBuf {
    #[cfg(not(target_os = "windows"))]
    if let Some(xdg_config) = std::env::var_os("XDG_CONFIG_HOME").filter(|v| !v.is_empty()) {
        return PathBuf::from(xdg_config).join(APP_DIR);
    }

    dirs::config_dir()
        .map(|d| d.join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from(".teller"))
}

/// Returns the path to the configuration file
pub fn get_config_path() -> PathBuf {
    get_config_dir().join(CONFIG_FILE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_path_is_in_config_dir() {
        let config_path = get_config_path();
        let config_dir = get_config_dir();

        assert!(
            config_path.starts_with(&config_dir),
            "Config path {} should be under config dir {}",
            config_path.display(),
            config_dir.display()
        );
    }

    #[test]
    fn test_config_path_names() {
        let config_path = get_config_path();
        assert_eq!(
            config_path.file_name().and_then(|n| n.to_str()),
            Some(CONFIG_FILE)
        );
        assert!(config_path.to_string_lossy().contains(APP_DIR));
    }
}
