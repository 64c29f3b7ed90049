use crate::environment::EnvironmentConfig;
use crate::sinks::PDF;
use crate::source::Source;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Name of the configuration file looked up in the program home.
pub const CONFIG_FILE: &str = "code2pdf.toml";

/// Complete configuration for a code2pdf run. Every section is optional.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Configuration {
    #[serde(default)]
    pub environment: EnvironmentConfig,
    #[serde(default)]
    pub source: Source,
    #[serde(default)]
    pub pdf: PDF,
}

impl Configuration {
    /// Load `explicit` if given (it must exist), otherwise `code2pdf.toml` in `home` if
    /// present, otherwise the defaults.
    pub fn load(home: &Path, explicit: Option<&Path>) -> Result<Configuration> {
        let path = match explicit {
            Some(path) => {
                if !path.is_file() {
                    return Err(anyhow!(
                        "Configuration file not found: {}",
                        path.display()
                    ));
                }
                path.to_path_buf()
            }
            None => {
                let path = home.join(CONFIG_FILE);
                if !path.is_file() {
                    log::debug!("no {} found, using defaults", path.display());
                    return Ok(Configuration::default());
                }
                path
            }
        };

        log::info!("loading configuration from {}", path.display());
        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to load {} contents", path.display()))?;
        let config = Configuration::parse(&contents)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(config)
    }

    pub fn parse(contents: &str) -> Result<Configuration> {
        let config: Configuration =
            toml::from_str(contents).with_context(|| "Failed to parse TOML")?;
        config.environment.validate()?;
        config.pdf.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn can_serialize_configuration() {
        let config = Configuration::default();
        let contents = toml::to_string(&config).expect("can serialize configuration to TOML");
        let parsed = Configuration::parse(&contents).expect("can parse serialized configuration");
        assert_eq!(parsed.pdf.lines_per_page, 50);
        assert_eq!(parsed.source.extensions.len(), 13);
    }

    #[test]
    fn empty_file_uses_defaults() {
        let config = Configuration::parse("").expect("can parse empty configuration");
        assert_eq!(config.environment.manifest, PathBuf::from("requirements.txt"));
        assert_eq!(config.environment.directory, PathBuf::from("venv"));
        assert_eq!(config.pdf.max_pages, 60);
        assert!(config.source.extensions.contains(&"properties".to_string()));
    }

    #[test]
    fn can_override_sections() {
        let config = Configuration::parse(
            r#"
            [environment]
            inspect = ["true"]

            [source]
            extensions = ["rs"]

            [pdf]
            font_file = "fonts/Custom.ttf"
            "#,
        )
        .expect("can parse configuration");
        assert_eq!(config.environment.inspect, vec!["true".to_string()]);
        assert_eq!(config.environment.install[1], "install");
        assert_eq!(config.source.extensions, vec!["rs".to_string()]);
        assert_eq!(config.pdf.font_file, PathBuf::from("fonts/Custom.ttf"));
        assert_eq!(config.pdf.font_size_pt, 10.0);
    }

    #[test]
    fn rejects_invalid_values() {
        assert!(Configuration::parse("[pdf]\nlines_per_page = 0\n").is_err());
        assert!(Configuration::parse("[environment]\ninstall = []\n").is_err());
        assert!(Configuration::parse("[pdf\n").is_err());
    }

    #[test]
    fn loads_from_home_when_present() {
        let home = tempfile::tempdir().expect("can create temp dir");
        let config = Configuration::load(home.path(), None).expect("defaults without a file");
        assert_eq!(config.pdf.font_name, "SimSun");

        std::fs::write(home.path().join(CONFIG_FILE), "[pdf]\nfont_name = \"Mono\"\n")
            .expect("can write configuration");
        let config = Configuration::load(home.path(), None).expect("can load configuration");
        assert_eq!(config.pdf.font_name, "Mono");
    }

    #[test]
    fn explicit_configuration_must_exist() {
        let home = tempfile::tempdir().expect("can create temp dir");
        let missing = home.path().join("missing.toml");
        assert!(Configuration::load(home.path(), Some(&missing)).is_err());
    }
}
