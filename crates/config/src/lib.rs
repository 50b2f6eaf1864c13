//! PServ Configuration Management
//!
//! Loads codec settings from `codecoptions.txt`.

use pserv_compression::{CompressionType, DEFAULT_LEVEL};
use pserv_core::Result;
use std::fs;
use std::path::Path;

/// Default location of the options file, relative to the working directory
pub const DEFAULT_CONFIG_PATH: &str = "config/codecoptions.txt";

/// Codec configuration from codecoptions.txt
#[derive(Debug, Clone)]
pub struct CodecConfig {
    /// PRS literal-prefix search depth (from "prslevel" option)
    pub prs_level: usize,
    /// Largest accepted decompressed size, 0 = unbounded (from "maxoutputsize" option)
    pub max_output_size: usize,
    /// Default compression method (from "codec" option)
    pub codec: CompressionType,
    /// Log filter directive (from "loglevel" option)
    pub log_level: String,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            prs_level: DEFAULT_LEVEL,
            max_output_size: 0,
            codec: CompressionType::Prs,
            log_level: "info".into(),
        }
    }
}

impl CodecConfig {
    /// Load configuration from a file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(Self::parse(&content))
    }

    /// Load configuration from [`DEFAULT_CONFIG_PATH`]
    pub fn load_default() -> Result<Self> {
        Self::load_from_file(DEFAULT_CONFIG_PATH)
    }

    /// Parse codecoptions.txt content
    pub fn parse(content: &str) -> Self {
        let mut config = Self::default();

        for line in content.lines() {
            let line = line.trim();

            // Skip comments and empty lines
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            // Parse key=value
            if let Some(eq_pos) = line.find('=') {
                let key = line[..eq_pos].trim();
                let value = line[eq_pos + 1..].trim();

                config.parse_option(key, value);
            }
        }

        config
    }

    fn parse_option(&mut self, key: &str, value: &str) {
        match key {
            "prslevel" => {
                self.prs_level = value.parse().unwrap_or(DEFAULT_LEVEL);
            }
            "maxoutputsize" => {
                self.max_output_size = value.parse().unwrap_or(0);
            }
            "codec" => {
                self.codec = value.parse().unwrap_or(CompressionType::Prs);
            }
            "loglevel" => self.log_level = value.into(),
            _ => {
                tracing::debug!("Unknown config option: {} = {}", key, value);
            }
        }
    }

    /// Log the effective configuration
    pub fn display(&self) {
        tracing::info!("Codec configuration:");
        tracing::info!("    Default codec: {}", self.codec);
        tracing::info!("    PRS level: {}", self.prs_level);
        if self.max_output_size == 0 {
            tracing::info!("    Max output size: unbounded");
        } else {
            tracing::info!("    Max output size: {} bytes", self.max_output_size);
        }
        tracing::info!("    Log level: {}", self.log_level);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = CodecConfig::default();
        assert_eq!(config.prs_level, DEFAULT_LEVEL);
        assert_eq!(config.max_output_size, 0);
        assert_eq!(config.codec, CompressionType::Prs);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_parse_simple_config() {
        let config_text = r#"
# quest archives
prslevel = 8
maxoutputsize = 65536
codec = BC0
unknown = ignored
"#;
        let config = CodecConfig::parse(config_text);
        assert_eq!(config.prs_level, 8);
        assert_eq!(config.max_output_size, 65536);
        assert_eq!(config.codec, CompressionType::Bc0);
    }

    #[test]
    fn test_bad_values_fall_back() {
        let config = CodecConfig::parse("prslevel = lots\ncodec = lzma\nmaxoutputsize = -1");
        assert_eq!(config.prs_level, DEFAULT_LEVEL);
        assert_eq!(config.codec, CompressionType::Prs);
        assert_eq!(config.max_output_size, 0);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "prslevel = 3").unwrap();
        writeln!(file, "loglevel = debug").unwrap();

        let config = CodecConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.prs_level, 3);
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = CodecConfig::load_from_file(dir.path().join("absent.txt")).unwrap_err();
        assert!(matches!(err, pserv_core::ServerError::Io(_)));
    }
}
