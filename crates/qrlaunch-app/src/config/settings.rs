//! Settings parser for .qrlaunch/config.toml

use std::path::Path;

use qrlaunch_core::prelude::*;

use super::types::Settings;

pub const CONFIG_FILENAME: &str = "config.toml";
pub const QRLAUNCH_DIR: &str = ".qrlaunch";

/// Load settings from .qrlaunch/config.toml
///
/// Returns default settings if the file doesn't exist, can't be parsed, or
/// fails validation.
pub fn load_settings(project_path: &Path) -> Settings {
    let config_path = project_path.join(QRLAUNCH_DIR).join(CONFIG_FILENAME);

    if !config_path.exists() {
        debug!("No config file at {:?}, using defaults", config_path);
        return Settings::default();
    }

    match std::fs::read_to_string(&config_path) {
        Ok(content) => match toml::from_str::<Settings>(&content) {
            Ok(settings) => match settings.validate() {
                Ok(()) => {
                    debug!("Loaded settings from {:?}", config_path);
                    settings
                }
                Err(e) => {
                    warn!("Ignoring {:?}: {}", config_path, e);
                    Settings::default()
                }
            },
            Err(e) => {
                warn!("Failed to parse {:?}: {}", config_path, e);
                Settings::default()
            }
        },
        Err(e) => {
            warn!("Failed to read {:?}: {}", config_path, e);
            Settings::default()
        }
    }
}

/// Create a commented default config file in .qrlaunch/
pub fn init_config_dir(project_path: &Path) -> Result<()> {
    let qrlaunch_dir = project_path.join(QRLAUNCH_DIR);

    if !qrlaunch_dir.exists() {
        std::fs::create_dir_all(&qrlaunch_dir)
            .map_err(|e| Error::config(format!("Failed to create .qrlaunch dir: {}", e)))?;
    }

    let config_path = qrlaunch_dir.join(CONFIG_FILENAME);
    if !config_path.exists() {
        let default_content = r#"# qrlaunch configuration

[page]
# url = "https://bank.example.se/login"

[channel]
# url = "wss://bank.example.se/qr"

[launch]
fallback_delay_ms = 3000      # Show the install fallback after this long
confirm_before_launch = true  # Ask before opening the app
cache_bust = false            # Append &t=<millis> to the launch URI

[expiry]
window_secs = 30              # QR token freshness window
tick_ms = 1000                # Countdown refresh interval
auto_renew = false            # Request a new QR automatically on expiry

[storage]
nonce_key = "bankid_nonce"
# dir = "/tmp/qrlaunch"
"#;
        std::fs::write(&config_path, default_content)
            .map_err(|e| Error::config(format!("Failed to write config.toml: {}", e)))?;
        info!("Created default config at {:?}", config_path);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_load_settings_defaults() {
        let temp = tempdir().unwrap();
        let settings = load_settings(temp.path());
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_load_settings_custom() {
        let temp = tempdir().unwrap();
        let dir = temp.path().join(QRLAUNCH_DIR);
        std::fs::create_dir_all(&dir).unwrap();

        let config = r#"
[page]
url = "https://bank.example.se/login"

[launch]
fallback_delay_ms = 10000
confirm_before_launch = false

[expiry]
auto_renew = true
"#;
        std::fs::write(dir.join(CONFIG_FILENAME), config).unwrap();

        let settings = load_settings(temp.path());
        assert_eq!(
            settings.page.url.as_deref(),
            Some("https://bank.example.se/login")
        );
        assert_eq!(settings.launch.fallback_delay_ms, 10000);
        assert!(!settings.launch.confirm_before_launch);
        assert!(settings.expiry.auto_renew);
        assert_eq!(settings.expiry.window_secs, 30);
    }

    #[test]
    fn test_load_settings_invalid_toml() {
        let temp = tempdir().unwrap();
        let dir = temp.path().join(QRLAUNCH_DIR);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(CONFIG_FILENAME), "this is not [valid toml").unwrap();

        assert_eq!(load_settings(temp.path()), Settings::default());
    }

    #[test]
    fn test_load_settings_failing_validation_uses_defaults() {
        let temp = tempdir().unwrap();
        let dir = temp.path().join(QRLAUNCH_DIR);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(CONFIG_FILENAME), "[expiry]\nwindow_secs = 0\n").unwrap();

        assert_eq!(load_settings(temp.path()).expiry.window_secs, 30);
    }

    #[test]
    fn test_init_config_dir_writes_loadable_file() {
        let temp = tempdir().unwrap();
        init_config_dir(temp.path()).unwrap();

        let path = temp.path().join(QRLAUNCH_DIR).join(CONFIG_FILENAME);
        assert!(path.exists());
        assert_eq!(load_settings(temp.path()), Settings::default());

        // Existing files are left alone
        std::fs::write(&path, "[launch]\ncache_bust = true\n").unwrap();
        init_config_dir(temp.path()).unwrap();
        assert!(load_settings(temp.path()).launch.cache_bust);
    }
}
