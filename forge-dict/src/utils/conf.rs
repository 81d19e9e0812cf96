use std::path::{Path, PathBuf};

use forge_numerics::numeral::FloatParams;
use log::debug;
use semver::Version;
use serde::{Deserialize, Serialize};

use crate::{
    magic::ENV_CONFIG_PATH,
    utils::error::{DictError, DictResult},
};

/// Where extension dictionaries are persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DictionaryConf {
    pub store_dir: PathBuf,
}

/// Source lists of the base vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VocabularyConf {
    pub version: Version,
    pub words: PathBuf,
    pub combos: PathBuf,
    pub mapping: PathBuf,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumeralsConf {
    #[serde(default)]
    pub float: FloatParams,
}

/// Configuration file of a ForgeNumerics deployment.
///
/// ```toml
/// [dictionary]
/// store_dir = "dicts"
///
/// [vocabulary]
/// version = "1.0.0"
/// words = "base/words.txt"
/// combos = "base/combos.txt"
/// mapping = "base/mapping.json"
///
/// [numerals.float]
/// exponent_width = 7
/// mantissa_width = 34
/// ```
///
/// Relative paths are resolved against the directory holding the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForgeConfig {
    pub dictionary: DictionaryConf,
    pub vocabulary: VocabularyConf,
    #[serde(default)]
    pub numerals: NumeralsConf,
}

impl ForgeConfig {
    /// Get the default path to the configuration file.
    pub fn default_path() -> PathBuf {
        if let Ok(config_path) = std::env::var(ENV_CONFIG_PATH) {
            return config_path.into();
        }

        let mut path = PathBuf::new();
        #[cfg(target_os = "windows")]
        {
            if let Ok(appdata) = std::env::var("APPDATA") {
                path.push(appdata);
            }
        }
        #[cfg(not(target_os = "windows"))]
        {
            if let Ok(xdg_config_home) = std::env::var("XDG_CONFIG_HOME") {
                path.push(xdg_config_home);
            } else if let Ok(home) = std::env::var("HOME") {
                path.push(home);
                path.push(".config");
            }
        }
        path.push("forge-numerics");
        path.push("forge.toml");
        path
    }

    /// Parse a configuration, resolving relative paths against `base_dir`.
    pub fn from_toml_str(content: &str, base_dir: &Path) -> DictResult<Self> {
        let mut conf: Self = toml::from_str(content).map_err(|e| DictError::Toml {
            source: e,
            file: base_dir.display().to_string(),
        })?;
        conf.resolve_paths(base_dir);
        conf.numerals
            .float
            .validate()
            .map_err(|e| DictError::Format(e.into()))?;
        Ok(conf)
    }

    /// Load a configuration file.
    pub fn load_from_toml(path: &Path) -> DictResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let base_dir = path.parent().unwrap_or(Path::new("."));
        let conf = Self::from_toml_str(&content, base_dir).map_err(|e| match e {
            DictError::Toml { source, .. } => DictError::Toml {
                source,
                file: path.display().to_string(),
            },
            other => other,
        })?;
        debug!("Loaded configuration from {}", path.display());
        Ok(conf)
    }

    /// Save the configuration to a TOML file, creating parent directories.
    pub fn save_to_toml(&self, path: &Path) -> DictResult<()> {
        let content = toml::to_string(self).map_err(|e| {
            DictError::Unknown(format!(
                "Failed during serialization of TOML to path `{}`: {}",
                path.display(),
                e
            ))
        })?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    fn resolve_paths(&mut self, base_dir: &Path) {
        for path in [
            &mut self.dictionary.store_dir,
            &mut self.vocabulary.words,
            &mut self.vocabulary.combos,
            &mut self.vocabulary.mapping,
        ] {
            if path.is_relative() {
                *path = base_dir.join(&*path);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[dictionary]
store_dir = "dicts"

[vocabulary]
version = "2.1.0"
words = "base/words.txt"
combos = "/abs/combos.txt"
mapping = "base/mapping.json"

[numerals.float]
exponent_width = 5
mantissa_width = 20
"#;

    #[test]
    fn parses_and_resolves() {
        let conf = ForgeConfig::from_toml_str(SAMPLE, Path::new("/etc/forge")).unwrap();
        assert_eq!(conf.dictionary.store_dir, Path::new("/etc/forge/dicts"));
        assert_eq!(conf.vocabulary.words, Path::new("/etc/forge/base/words.txt"));
        assert_eq!(conf.vocabulary.combos, Path::new("/abs/combos.txt"));
        assert_eq!(conf.vocabulary.version, Version::new(2, 1, 0));
        assert_eq!(conf.numerals.float, FloatParams::new(5, 20));
    }

    #[test]
    fn numerals_section_is_optional() {
        let content = SAMPLE.split("[numerals.float]").next().unwrap();
        let conf = ForgeConfig::from_toml_str(content, Path::new(".")).unwrap();
        assert_eq!(conf.numerals.float, FloatParams::default());
    }

    #[test]
    fn rejects_bad_documents() {
        let err = ForgeConfig::from_toml_str("[dictionary]\n", Path::new(".")).unwrap_err();
        assert!(err.is_toml());

        let bad_widths = SAMPLE.replace("exponent_width = 5", "exponent_width = 12");
        let err = ForgeConfig::from_toml_str(&bad_widths, Path::new(".")).unwrap_err();
        assert!(err.is_format());
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("forge.toml");
        let conf = ForgeConfig::from_toml_str(SAMPLE, dir.path()).unwrap();
        conf.save_to_toml(&path).unwrap();
        assert_eq!(ForgeConfig::load_from_toml(&path).unwrap(), conf);
    }
}
