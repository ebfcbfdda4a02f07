//! Configuration management for gmsdeck.
//!
//! Program behavior can be customized through INI-format configuration files.
//! Files are read in the following order, each overriding the values of the
//! ones before it:
//!
//! 1. System configuration (`/etc/gmsdeck/gmsdeck.cfg`)
//! 2. User configuration (`~/.config/gmsdeck/gmsdeck.cfg`)
//! 3. Local configuration (`./gmsdeck.cfg`)
//!
//! Anything not set in a file keeps its built-in default.
//!
//! # Configuration File Format
//!
//! ```ini
//! [parser]
//! policy = strict
//! freeform_groups = DATA,ECP,MCP,VEC,HESS,GRAD,EFRAG,FMOXYZ,POINTS,STONE
//!
//! [logging]
//! level = info
//!
//! [template]
//! scftyp = RHF
//! runtyp = OPTIMIZE
//! gbasis = N31
//! ngauss = 6
//! ndfunc = 1
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use gmsdeck::settings::SettingsManager;
//!
//! let settings = SettingsManager::load()?;
//! println!("Parser policy: {}", settings.parser().policy);
//! # Ok::<(), gmsdeck::settings::ConfigError>(())
//! ```

use crate::parser::{EntryPolicy, ParserOptions};
use configparser::ini::Ini;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the configuration file in every lookup location.
pub const CONFIG_FILE_NAME: &str = "gmsdeck.cfg";

/// Errors that can occur during configuration loading and processing.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// I/O error when reading configuration files
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// INI parsing error
    #[error("INI parsing error: {0}")]
    IniParse(String),
    /// Invalid configuration value
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

/// Main configuration structure containing all program settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    /// Deck parser behavior
    pub parser: ParserSettings,
    /// Logging configuration
    pub logging: LoggingSettings,
    /// Defaults for generated deck templates
    pub template: TemplateSettings,
}

/// Deck parser settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParserSettings {
    /// Treatment of stray tokens in keyword groups (default: strict)
    pub policy: EntryPolicy,
    /// Groups whose bodies are kept verbatim
    pub freeform_groups: Vec<String>,
}

impl Default for ParserSettings {
    fn default() -> Self {
        let options = ParserOptions::default();
        Self {
            policy: options.policy,
            freeform_groups: options.freeform_groups,
        }
    }
}

/// Logging configuration settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level (default: "info")
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Keyword values written into generated templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateSettings {
    /// `$CONTRL SCFTYP` (default: "RHF")
    pub scftyp: String,
    /// `$CONTRL RUNTYP` (default: "OPTIMIZE")
    pub runtyp: String,
    /// `$BASIS GBASIS` (default: "N31")
    pub gbasis: String,
    /// `$BASIS NGAUSS` (default: 6)
    pub ngauss: u32,
    /// `$BASIS NDFUNC` (default: 1)
    pub ndfunc: u32,
}

impl Default for TemplateSettings {
    fn default() -> Self {
        Self {
            scftyp: "RHF".to_string(),
            runtyp: "OPTIMIZE".to_string(),
            gbasis: "N31".to_string(),
            ngauss: 6,
            ndfunc: 1,
        }
    }
}

type Section = HashMap<String, Option<String>>;

/// Configuration manager that handles loading and accessing program settings.
pub struct SettingsManager {
    settings: Settings,
    config_source: String,
}

impl SettingsManager {
    /// Loads configuration from the available configuration files.
    ///
    /// A file that exists but cannot be read or parsed is skipped with a
    /// warning.
    pub fn load() -> Result<Self, ConfigError> {
        let mut settings = Settings::default();
        let mut config_source = "built-in defaults".to_string();

        let candidates = [
            ("system", Self::get_system_config_path()),
            ("user", Self::get_user_config_path()),
            ("local", Some(PathBuf::from(CONFIG_FILE_NAME))),
        ];
        for (kind, path) in candidates {
            let Some(path) = path.filter(|p| p.exists()) else {
                continue;
            };
            match Self::load_config(&path, settings.clone()) {
                Ok(loaded) => {
                    settings = loaded;
                    config_source = format!("{} config ({})", kind, path.display());
                    debug!("Loaded {} configuration from: {}", kind, path.display());
                }
                Err(e) => warn!("Failed to load {} config from {}: {}", kind, path.display(), e),
            }
        }

        info!("Configuration loaded from: {}", config_source);
        Ok(Self {
            settings,
            config_source,
        })
    }

    /// Loads a single configuration file on top of the built-in defaults.
    ///
    /// Unlike [`SettingsManager::load`], any error in the file is returned.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let settings = Self::load_config(path, Settings::default())?;
        Ok(Self {
            settings,
            config_source: format!("{}", path.display()),
        })
    }

    /// Returns the source of the loaded configuration.
    pub fn config_source(&self) -> &str {
        &self.config_source
    }

    /// Gets a reference to the settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Gets the parser settings.
    pub fn parser(&self) -> &ParserSettings {
        &self.settings.parser
    }

    /// Gets the logging settings.
    pub fn logging(&self) -> &LoggingSettings {
        &self.settings.logging
    }

    /// Gets the template settings.
    pub fn template(&self) -> &TemplateSettings {
        &self.settings.template
    }

    /// Parser options built from the `[parser]` section.
    pub fn parser_options(&self) -> ParserOptions {
        ParserOptions {
            policy: self.settings.parser.policy,
            freeform_groups: self.settings.parser.freeform_groups.clone(),
        }
    }

    /// Reads one INI file, overriding the values present in it.
    fn load_config(path: &Path, mut settings: Settings) -> Result<Settings, ConfigError> {
        let content = fs::read_to_string(path)?;
        let mut ini = Ini::new();
        ini.read(content)
            .map_err(|e| ConfigError::IniParse(format!("Failed to parse INI: {}", e)))?;

        let map = ini.get_map_ref();
        if let Some(section) = map.get("parser") {
            Self::parse_parser(section, &mut settings.parser)?;
        }
        if let Some(section) = map.get("logging") {
            Self::parse_logging(section, &mut settings.logging)?;
        }
        if let Some(section) = map.get("template") {
            Self::parse_template(section, &mut settings.template)?;
        }

        Ok(settings)
    }

    /// Parses the parser section from INI configuration.
    fn parse_parser(section: &Section, parser: &mut ParserSettings) -> Result<(), ConfigError> {
        if let Some(Some(policy)) = section.get("policy") {
            parser.policy = policy.parse().map_err(ConfigError::InvalidValue)?;
        }
        if let Some(Some(groups)) = section.get("freeform_groups") {
            parser.freeform_groups = groups
                .split(',')
                .map(|s| s.trim().trim_start_matches('$').to_ascii_uppercase())
                .filter(|s| !s.is_empty())
                .collect();
        }
        Ok(())
    }

    /// Parses the logging section from INI configuration.
    fn parse_logging(section: &Section, logging: &mut LoggingSettings) -> Result<(), ConfigError> {
        if let Some(Some(level)) = section.get("level") {
            let level = level.trim().to_lowercase();
            if level.parse::<log::LevelFilter>().is_err() {
                return Err(ConfigError::InvalidValue(format!("Invalid log level: {}", level)));
            }
            logging.level = level;
        }
        Ok(())
    }

    /// Parses the template section from INI configuration.
    fn parse_template(section: &Section, template: &mut TemplateSettings) -> Result<(), ConfigError> {
        if let Some(Some(scftyp)) = section.get("scftyp") {
            template.scftyp = scftyp.trim().to_ascii_uppercase();
        }
        if let Some(Some(runtyp)) = section.get("runtyp") {
            template.runtyp = runtyp.trim().to_ascii_uppercase();
        }
        if let Some(Some(gbasis)) = section.get("gbasis") {
            template.gbasis = gbasis.trim().to_ascii_uppercase();
        }
        if let Some(Some(ngauss)) = section.get("ngauss") {
            template.ngauss = ngauss
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue(format!("Invalid ngauss: {}", ngauss)))?;
        }
        if let Some(Some(ndfunc)) = section.get("ndfunc") {
            template.ndfunc = ndfunc
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue(format!("Invalid ndfunc: {}", ndfunc)))?;
        }
        Ok(())
    }

    /// Gets the system configuration file path.
    fn get_system_config_path() -> Option<PathBuf> {
        #[cfg(unix)]
        {
            Some(PathBuf::from("/etc/gmsdeck").join(CONFIG_FILE_NAME))
        }
        #[cfg(windows)]
        {
            std::env::var("PROGRAMDATA")
                .ok()
                .map(|pd| PathBuf::from(pd).join("gmsdeck").join(CONFIG_FILE_NAME))
        }
    }

    /// Gets the user configuration file path.
    fn get_user_config_path() -> Option<PathBuf> {
        #[cfg(unix)]
        {
            std::env::var("HOME").ok().map(|home| {
                PathBuf::from(home)
                    .join(".config")
                    .join("gmsdeck")
                    .join(CONFIG_FILE_NAME)
            })
        }
        #[cfg(windows)]
        {
            std::env::var("APPDATA")
                .ok()
                .map(|appdata| PathBuf::from(appdata).join("gmsdeck").join(CONFIG_FILE_NAME))
        }
    }
}

impl SettingsManager {
    /// Creates a default gmsdeck.cfg file with all available configuration options.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use gmsdeck::settings::SettingsManager;
    /// use std::path::Path;
    ///
    /// SettingsManager::create_template(Path::new("gmsdeck.cfg"))?;
    /// # Ok::<(), gmsdeck::settings::ConfigError>(())
    /// ```
    pub fn create_template(path: &Path) -> Result<(), ConfigError> {
        fs::write(path, Self::generate_template_content())?;
        info!("Created settings template at: {}", path.display());
        Ok(())
    }

    /// Generates the content for a gmsdeck.cfg template file.
    fn generate_template_content() -> String {
        let parser = ParserSettings::default();
        let logging = LoggingSettings::default();
        let template = TemplateSettings::default();
        format!(
            r#"# gmsdeck configuration file
#
# Configuration files are loaded in this order, later files overriding earlier ones:
#
# 1. System config (/etc/gmsdeck/gmsdeck.cfg on Unix, %PROGRAMDATA%/gmsdeck/gmsdeck.cfg on Windows)
# 2. User config (~/.config/gmsdeck/gmsdeck.cfg on Unix, %APPDATA%/gmsdeck/gmsdeck.cfg on Windows)
# 3. Current working directory (./gmsdeck.cfg)
#
# Any missing sections or values use the built-in defaults shown below.

[parser]
# Treatment of tokens in keyword groups that are not KEY=VALUE entries
# - strict: stop with an error naming the token and line
# - permissive: keep the token, log a warning and carry on
policy = {}

# Groups whose bodies are positional text kept verbatim (comma-separated)
freeform_groups = {}

[logging]
# Log level: off, error, warn, info, debug, trace (default: info)
level = {}

[template]
# Keyword values used by `gmsdeck ci <geometry>`

# $CONTRL SCFTYP: RHF, UHF, ROHF, GVB, MCSCF
scftyp = {}

# $CONTRL RUNTYP: ENERGY, GRADIENT, HESSIAN, OPTIMIZE, SADPOINT, ...
runtyp = {}

# $BASIS GBASIS, NGAUSS and NDFUNC (N31 / 6 / 1 is 6-31G(d))
gbasis = {}
ngauss = {}
ndfunc = {}
"#,
            parser.policy,
            parser.freeform_groups.join(","),
            logging.level,
            template.scftyp,
            template.runtyp,
            template.gbasis,
            template.ngauss,
            template.ndfunc,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.parser.policy, EntryPolicy::Strict);
        assert!(settings.parser.freeform_groups.contains(&"DATA".to_string()));
        assert_eq!(settings.logging.level, "info");
        assert_eq!(settings.template.gbasis, "N31");
    }

    #[test]
    fn test_template_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        SettingsManager::create_template(&path).unwrap();

        let manager = SettingsManager::load_from(&path).unwrap();
        assert_eq!(manager.parser_options(), ParserOptions::default());
        assert_eq!(manager.template().ngauss, 6);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(
            &path,
            "[parser]\npolicy = Permissive\nfreeform_groups = data, $vec\n[template]\nscftyp = uhf\n",
        )
        .unwrap();

        let manager = SettingsManager::load_from(&path).unwrap();
        let options = manager.parser_options();
        assert_eq!(options.policy, EntryPolicy::Permissive);
        assert_eq!(options.freeform_groups, vec!["DATA", "VEC"]);
        assert_eq!(manager.template().scftyp, "UHF");
        assert_eq!(manager.template().runtyp, "OPTIMIZE");
        assert_eq!(manager.logging().level, "info");
    }

    #[test]
    fn test_invalid_values() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);

        fs::write(&path, "[parser]\npolicy = lenient\n").unwrap();
        assert!(matches!(
            SettingsManager::load_from(&path),
            Err(ConfigError::InvalidValue(_))
        ));

        fs::write(&path, "[template]\nngauss = six\n").unwrap();
        assert!(matches!(
            SettingsManager::load_from(&path),
            Err(ConfigError::InvalidValue(_))
        ));

        fs::write(&path, "[logging]\nlevel = loud\n").unwrap();
        assert!(matches!(
            SettingsManager::load_from(&path),
            Err(ConfigError::InvalidValue(_))
        ));
    }
}
