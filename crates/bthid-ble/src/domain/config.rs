//! YAML configuration for the BLE HID service.
//!
//! The file location comes from `JADEAI_HID_CONFIG` (default
//! `/app/config/hid.yml`). String scalars of the form `${NAME:default}`
//! are expanded from the environment, falling back to the default after
//! the colon; because any field may arrive as such a token, numeric and
//! boolean fields are read through typed getters rather than a serde
//! derive. Numbers accept a `0x` prefix (the appearance value is usually
//! written in hex).
//!
//! ```yaml
//! mode: bluetooth
//! device_name: ${HID_DEVICE_NAME:JadeAI HID}
//! ble_adapter: hci0
//! hid:
//!   manufacturer: JadeAI
//!   appearance: 0x03C1
//!   keyboard: { enabled: true }
//!   mouse: { enabled: true }
//! safety:
//!   keypress_delay_ms: 20
//!   mouse_move_delay_ms: 5
//!   mouse_step_limit: 50
//! http:
//!   bind: 0.0.0.0
//!   port: 8003
//! ```

use std::path::{Path, PathBuf};

use serde_yaml::Value;
use thiserror::Error;

/// Environment variable overriding the configuration path.
pub const CONFIG_ENV_VAR: &str = "JADEAI_HID_CONFIG";

/// Default configuration path inside the service container.
pub const DEFAULT_CONFIG_PATH: &str = "/app/config/hid.yml";

// ── Errors ────────────────────────────────────────────────────────────────────

/// Configuration failures; all fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("HID configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse configuration YAML: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("failed to parse numeric value for key '{key}': {reason}")]
    InvalidNumber { key: String, reason: String },

    #[error("failed to parse boolean for key '{key}'")]
    InvalidBool { key: String },

    #[error("unsupported HID mode '{0}'; only 'bluetooth' is implemented")]
    UnsupportedMode(String),
}

// ── Schema ────────────────────────────────────────────────────────────────────

/// Device identity advertised to hosts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdentity {
    pub mode: String,
    pub device_name: String,
    pub adapter: String,
    pub manufacturer: String,
    /// GATT appearance value (961 = keyboard).
    pub appearance: u16,
}

impl DeviceIdentity {
    /// BlueZ object path of the configured adapter.
    pub fn adapter_path(&self) -> String {
        format!("/org/bluez/{}", self.adapter)
    }
}

impl Default for DeviceIdentity {
    fn default() -> Self {
        Self {
            mode: "bluetooth".to_string(),
            device_name: "JadeAI HID".to_string(),
            adapter: "hci0".to_string(),
            manufacturer: "JadeAI".to_string(),
            appearance: 961,
        }
    }
}

/// Per-device enable flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputToggle {
    pub enabled: bool,
}

impl Default for InputToggle {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Safety pacing applied to every emitted report sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SafetyConfig {
    pub keypress_delay_ms: u32,
    pub mouse_move_delay_ms: u32,
    pub mouse_step_limit: u32,
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            keypress_delay_ms: 20,
            mouse_move_delay_ms: 5,
            mouse_step_limit: 50,
        }
    }
}

/// HTTP API bind settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: 8003,
        }
    }
}

/// Complete configuration of the BLE HID service.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HidConfig {
    pub device: DeviceIdentity,
    pub keyboard: InputToggle,
    pub mouse: InputToggle,
    pub safety: SafetyConfig,
    pub http: HttpConfig,
}

impl HidConfig {
    /// Parses a configuration from YAML text.
    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        let root: Value = serde_yaml::from_str(text)?;
        let mut config = Self::default();

        config.device.mode = get_string(&root, "mode", &config.device.mode);
        if config.device.mode != "bluetooth" {
            return Err(ConfigError::UnsupportedMode(config.device.mode));
        }
        config.device.device_name = get_string(&root, "device_name", &config.device.device_name);
        config.device.adapter = get_string(&root, "ble_adapter", &config.device.adapter);

        if let Some(hid) = root.get("hid") {
            config.device.manufacturer =
                get_string(hid, "manufacturer", &config.device.manufacturer);
            config.device.appearance =
                get_u16(hid, "appearance", config.device.appearance)?;
            if let Some(keyboard) = hid.get("keyboard") {
                config.keyboard.enabled = get_bool(keyboard, "enabled", config.keyboard.enabled)?;
            }
            if let Some(mouse) = hid.get("mouse") {
                config.mouse.enabled = get_bool(mouse, "enabled", config.mouse.enabled)?;
            }
        }

        if let Some(http) = root.get("http") {
            config.http.bind = get_string(http, "bind", &config.http.bind);
            config.http.port = get_u16(http, "port", config.http.port)?;
        }

        if let Some(safety) = root.get("safety") {
            config.safety.keypress_delay_ms =
                get_u32(safety, "keypress_delay_ms", config.safety.keypress_delay_ms)?;
            config.safety.mouse_move_delay_ms =
                get_u32(safety, "mouse_move_delay_ms", config.safety.mouse_move_delay_ms)?;
            config.safety.mouse_step_limit =
                get_u32(safety, "mouse_step_limit", config.safety.mouse_step_limit)?;
            if config.safety.mouse_step_limit == 0 {
                config.safety.mouse_step_limit = 1;
            }
        }

        Ok(config)
    }
}

/// Resolves the configuration path from the environment.
pub fn config_path() -> PathBuf {
    std::env::var_os(CONFIG_ENV_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

/// Loads the configuration from `path`.
pub fn load_config(path: &Path) -> Result<HidConfig, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound(path.to_path_buf()));
    }
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    HidConfig::from_yaml(&content)
}

// ── Typed getters ─────────────────────────────────────────────────────────────

/// Expands a whole-value `${NAME:default}` token from the environment.
fn expand_env(value: &str) -> String {
    let Some(inner) = value
        .strip_prefix("${")
        .and_then(|rest| rest.strip_suffix('}'))
    else {
        return value.to_string();
    };
    let (key, default) = match inner.split_once(':') {
        Some((key, default)) => (key, default),
        None => (inner, ""),
    };
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Reads a scalar as a string, expanding env tokens.
fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(expand_env(s)),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn get_string(node: &Value, key: &str, fallback: &str) -> String {
    node.get(key)
        .and_then(scalar_string)
        .unwrap_or_else(|| fallback.to_string())
}

fn get_u32(node: &Value, key: &str, fallback: u32) -> Result<u32, ConfigError> {
    let Some(raw) = node.get(key).and_then(scalar_string) else {
        return Ok(fallback);
    };
    parse_number(&raw).map_err(|reason| ConfigError::InvalidNumber {
        key: key.to_string(),
        reason,
    })
}

fn get_u16(node: &Value, key: &str, fallback: u16) -> Result<u16, ConfigError> {
    let value = get_u32(node, key, u32::from(fallback))?;
    u16::try_from(value).map_err(|_| ConfigError::InvalidNumber {
        key: key.to_string(),
        reason: format!("{value} is out of range"),
    })
}

/// Parses a decimal or `0x`-prefixed hexadecimal number.
fn parse_number(raw: &str) -> Result<u32, String> {
    let raw = raw.trim();
    let parsed = if let Some(hex) = raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16)
    } else {
        raw.parse()
    };
    parsed.map_err(|e| format!("'{raw}': {e}"))
}

fn get_bool(node: &Value, key: &str, fallback: bool) -> Result<bool, ConfigError> {
    let Some(raw) = node.get(key).and_then(scalar_string) else {
        return Ok(fallback);
    };
    match raw.as_str() {
        "1" | "true" | "True" | "yes" => Ok(true),
        "0" | "false" | "False" | "no" => Ok(false),
        _ => Err(ConfigError::InvalidBool {
            key: key.to_string(),
        }),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_yaml_yields_the_defaults() {
        let config = HidConfig::from_yaml("{}").unwrap();
        assert_eq!(config, HidConfig::default());
        assert_eq!(config.device.device_name, "JadeAI HID");
        assert_eq!(config.device.appearance, 961);
        assert_eq!(config.safety.keypress_delay_ms, 20);
        assert_eq!(config.safety.mouse_move_delay_ms, 5);
        assert_eq!(config.safety.mouse_step_limit, 50);
        assert_eq!(config.http.port, 8003);
        assert!(config.keyboard.enabled);
        assert!(config.mouse.enabled);
    }

    #[test]
    fn test_full_yaml_overrides_every_field() {
        let yaml = r#"
mode: bluetooth
device_name: Lab HID
ble_adapter: hci1
hid:
  manufacturer: Example Corp
  appearance: 962
  keyboard:
    enabled: false
  mouse:
    enabled: true
safety:
  keypress_delay_ms: 7
  mouse_move_delay_ms: 2
  mouse_step_limit: 30
http:
  bind: 127.0.0.1
  port: 9000
"#;
        let config = HidConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.device.device_name, "Lab HID");
        assert_eq!(config.device.adapter, "hci1");
        assert_eq!(config.device.adapter_path(), "/org/bluez/hci1");
        assert_eq!(config.device.manufacturer, "Example Corp");
        assert_eq!(config.device.appearance, 962);
        assert!(!config.keyboard.enabled);
        assert_eq!(config.safety.keypress_delay_ms, 7);
        assert_eq!(config.http.bind, "127.0.0.1");
        assert_eq!(config.http.port, 9000);
    }

    #[test]
    fn test_hex_appearance_is_accepted() {
        let config = HidConfig::from_yaml("hid:\n  appearance: \"0x03C1\"\n").unwrap();
        assert_eq!(config.device.appearance, 0x03C1);
    }

    #[test]
    fn test_env_token_with_default_expands() {
        // The variable is unset, so the default after the colon applies.
        let config =
            HidConfig::from_yaml("device_name: ${BTHID_TEST_UNSET_NAME:Fallback HID}\n").unwrap();
        assert_eq!(config.device.device_name, "Fallback HID");
    }

    #[test]
    fn test_env_token_prefers_the_environment() {
        std::env::set_var("BTHID_TEST_SET_NAME", "From Env");
        let config =
            HidConfig::from_yaml("device_name: ${BTHID_TEST_SET_NAME:Fallback}\n").unwrap();
        assert_eq!(config.device.device_name, "From Env");
        std::env::remove_var("BTHID_TEST_SET_NAME");
    }

    #[test]
    fn test_env_token_in_numeric_field() {
        std::env::set_var("BTHID_TEST_PORT", "9999");
        let config = HidConfig::from_yaml("http:\n  port: ${BTHID_TEST_PORT:8003}\n").unwrap();
        assert_eq!(config.http.port, 9999);
        std::env::remove_var("BTHID_TEST_PORT");
    }

    #[test]
    fn test_non_bluetooth_mode_is_rejected() {
        let result = HidConfig::from_yaml("mode: usb\n");
        assert!(matches!(result, Err(ConfigError::UnsupportedMode(m)) if m == "usb"));
    }

    #[test]
    fn test_unparseable_number_is_an_error() {
        let result = HidConfig::from_yaml("http:\n  port: \"not-a-number\"\n");
        assert!(matches!(result, Err(ConfigError::InvalidNumber { key, .. }) if key == "port"));
    }

    #[test]
    fn test_out_of_range_port_is_an_error() {
        let result = HidConfig::from_yaml("http:\n  port: 70000\n");
        assert!(matches!(result, Err(ConfigError::InvalidNumber { key, .. }) if key == "port"));
    }

    #[test]
    fn test_bool_accepts_yes_and_no_spellings() {
        let config = HidConfig::from_yaml("hid:\n  keyboard:\n    enabled: \"no\"\n").unwrap();
        assert!(!config.keyboard.enabled);
        let config = HidConfig::from_yaml("hid:\n  mouse:\n    enabled: \"yes\"\n").unwrap();
        assert!(config.mouse.enabled);
    }

    #[test]
    fn test_garbage_bool_is_an_error() {
        let result = HidConfig::from_yaml("hid:\n  keyboard:\n    enabled: \"maybe\"\n");
        assert!(matches!(result, Err(ConfigError::InvalidBool { key }) if key == "enabled"));
    }

    #[test]
    fn test_zero_step_limit_is_coerced_to_one() {
        let config = HidConfig::from_yaml("safety:\n  mouse_step_limit: 0\n").unwrap();
        assert_eq!(config.safety.mouse_step_limit, 1);
    }

    #[test]
    fn test_load_config_missing_file_is_not_found() {
        let result = load_config(Path::new("/nonexistent/bthid/hid.yml"));
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_malformed_yaml_is_a_parse_error() {
        let result = HidConfig::from_yaml(": : :");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }
}
