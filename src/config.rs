//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::ccsds::protocol::{APID_MASK, MAX_FRAMED_TELEMETRY_PAYLOAD};
use crate::ccsds::values::{serialize_text, FormatDescriptor};
use crate::error::{CcsdsError, Result};

/// Baud rates accepted for the UART link
const SUPPORTED_BAUD_RATES: [u32; 6] = [9600, 19200, 38400, 57600, 115200, 230400];

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub link: LinkConfig,
    pub telemetry: TelemetryConfig,
    pub logging: LoggingConfig,
}

/// Which side of the link this process runs
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LinkMode {
    /// Periodically transmit a telemetry beacon
    #[default]
    Downlink,
    /// Receive, verify, decode and log telemetry
    Ground,
}

/// Serial link configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LinkConfig {
    #[serde(default = "default_port")]
    pub port: String,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default)]
    pub mode: LinkMode,
}

/// Telemetry packet configuration
#[derive(Debug, Deserialize, Clone)]
pub struct TelemetryConfig {
    #[serde(default = "default_apid")]
    pub apid: u16,

    /// Payload layout used to extract received values
    #[serde(default = "default_format")]
    pub format: String,

    /// Comma-delimited values sent by the downlink beacon
    #[serde(default = "default_beacon_values")]
    pub beacon_values: String,

    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
}

/// Telemetry log file configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_enabled")]
    pub enabled: bool,

    #[serde(default = "default_log_dir")]
    pub log_dir: String,

    #[serde(default = "default_max_records_per_file")]
    pub max_records_per_file: usize,

    #[serde(default = "default_max_files_to_keep")]
    pub max_files_to_keep: usize,
}

// Default value functions
fn default_port() -> String { "/dev/ttyUSB0".to_string() }
fn default_baud_rate() -> u32 { 115200 }
fn default_timeout_ms() -> u64 { 100 }

fn default_apid() -> u16 { 100 }
fn default_format() -> String { "float,float,float".to_string() }
fn default_beacon_values() -> String { "0.0,0.0,0.0".to_string() }
fn default_interval_ms() -> u64 { 1000 }

fn default_logging_enabled() -> bool { true }
fn default_log_dir() -> String { "./logs".to_string() }
fn default_max_records_per_file() -> usize { 10000 }
fn default_max_files_to_keep() -> usize { 10 }

impl Default for Config {
    fn default() -> Self {
        Self {
            link: LinkConfig {
                port: default_port(),
                baud_rate: default_baud_rate(),
                timeout_ms: default_timeout_ms(),
                mode: LinkMode::default(),
            },
            telemetry: TelemetryConfig {
                apid: default_apid(),
                format: default_format(),
                beacon_values: default_beacon_values(),
                interval_ms: default_interval_ms(),
            },
            logging: LoggingConfig {
                enabled: default_logging_enabled(),
                log_dir: default_log_dir(),
                max_records_per_file: default_max_records_per_file(),
                max_files_to_keep: default_max_files_to_keep(),
            },
        }
    }
}

fn invalid(msg: impl std::fmt::Display) -> CcsdsError {
    CcsdsError::Config(toml::de::Error::custom(msg))
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// * `Result<Config>` - Loaded and validated configuration
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use ccsds_link::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Parsed telemetry payload layout
    pub fn format_descriptor(&self) -> Result<FormatDescriptor> {
        FormatDescriptor::parse(&self.telemetry.format)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        if self.link.port.is_empty() {
            return Err(invalid("serial port cannot be empty"));
        }

        if !SUPPORTED_BAUD_RATES.contains(&self.link.baud_rate) {
            return Err(invalid(
                "baud_rate must be one of: 9600, 19200, 38400, 57600, 115200, 230400",
            ));
        }

        if self.link.timeout_ms == 0 || self.link.timeout_ms > 10000 {
            return Err(invalid("timeout_ms must be between 1 and 10000"));
        }

        // The codec masks out-of-range APIDs silently; a config typo should not
        if self.telemetry.apid > APID_MASK {
            return Err(invalid("apid must be between 0 and 2047"));
        }

        self.format_descriptor()
            .map_err(|e| invalid(format!("telemetry format is invalid: {}", e)))?;

        // The beacon goes out with a checksum and must fit one transport frame
        let beacon_len = serialize_text(&self.telemetry.beacon_values).len();
        if beacon_len > MAX_FRAMED_TELEMETRY_PAYLOAD {
            return Err(invalid(format!(
                "beacon_values serialize to {} bytes (maximum {})",
                beacon_len, MAX_FRAMED_TELEMETRY_PAYLOAD
            )));
        }

        if self.telemetry.interval_ms == 0 || self.telemetry.interval_ms > 60000 {
            return Err(invalid("interval_ms must be between 1 and 60000"));
        }

        if self.logging.enabled && self.logging.log_dir.is_empty() {
            return Err(invalid("log_dir cannot be empty when logging is enabled"));
        }

        if self.logging.max_records_per_file == 0 {
            return Err(invalid("max_records_per_file must be greater than 0"));
        }

        if self.logging.max_files_to_keep == 0 {
            return Err(invalid("max_files_to_keep must be greater than 0"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ccsds::values::ValueType;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.link.mode, LinkMode::Downlink);
        assert_eq!(config.format_descriptor().unwrap().types(), &[ValueType::Float32; 3]);
    }

    #[test]
    fn test_load_config_from_file() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let toml_content = r#"
[link]
port = "/dev/ttyACM0"
mode = "ground"

[telemetry]
apid = 42
format = "float,uint8,uint16,uint32"

[logging]
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = Config::load(temp_file.path()).unwrap();
        assert_eq!(config.link.port, "/dev/ttyACM0");
        assert_eq!(config.link.mode, LinkMode::Ground);
        assert_eq!(config.link.baud_rate, 115200);
        assert_eq!(config.telemetry.apid, 42);
        assert_eq!(config.format_descriptor().unwrap().byte_len(), 11);
        assert_eq!(config.logging.max_files_to_keep, 10);
    }

    #[test]
    fn test_load_missing_file() {
        let result = Config::load("/nonexistent/ccsds-link.toml");
        assert!(matches!(result, Err(CcsdsError::Io(_))));
    }

    #[test]
    fn test_load_unknown_mode() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[link]\nmode = \"relay\"\n[telemetry]\n[logging]\n")
            .unwrap();
        temp_file.flush().unwrap();

        assert!(matches!(Config::load(temp_file.path()), Err(CcsdsError::Config(_))));
    }

    #[test]
    fn test_empty_serial_port() {
        let mut config = Config::default();
        config.link.port = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unsupported_baud_rate() {
        let mut config = Config::default();
        config.link.baud_rate = 420000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_timeout_ms_bounds() {
        let mut config = Config::default();
        config.link.timeout_ms = 0;
        assert!(config.validate().is_err());
        config.link.timeout_ms = 10001;
        assert!(config.validate().is_err());
        config.link.timeout_ms = 10000;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_apid_out_of_range() {
        let mut config = Config::default();
        config.telemetry.apid = 2048;
        assert!(config.validate().is_err());
        config.telemetry.apid = 2047;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_format() {
        let mut config = Config::default();
        config.telemetry.format = "float,double".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("double"));
    }

    #[test]
    fn test_beacon_values_too_large() {
        let mut config = Config::default();
        config.telemetry.beacon_values = vec!["1"; 62].join(",");
        assert!(config.validate().is_err());

        config.telemetry.beacon_values = vec!["1"; 60].join(",");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_beacon_values_must_fit_transport_frame() {
        let mut config = Config::default();
        // 61 integers: 244 bytes, a 258-byte packet
        config.telemetry.beacon_values = vec!["1"; 61].join(",");
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("244 bytes (maximum 242)"));

        // 60 integers and a one-character string: 240 + 2 = 242 bytes
        config.telemetry.beacon_values = format!("{},x", vec!["1"; 60].join(","));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_interval_ms_bounds() {
        let mut config = Config::default();
        config.telemetry.interval_ms = 0;
        assert!(config.validate().is_err());
        config.telemetry.interval_ms = 60001;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_log_dir_when_enabled() {
        let mut config = Config::default();
        config.logging.log_dir = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_log_dir_when_disabled() {
        let mut config = Config::default();
        config.logging.enabled = false;
        config.logging.log_dir = String::new();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_max_records_per_file_zero() {
        let mut config = Config::default();
        config.logging.max_records_per_file = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_max_files_to_keep_zero() {
        let mut config = Config::default();
        config.logging.max_files_to_keep = 0;
        assert!(config.validate().is_err());
    }
}
