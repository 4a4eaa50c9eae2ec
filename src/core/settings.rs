//! Thumbnail configuration.
//!
//! `ThumbnailSettings::default()` holds the process-wide defaults. A
//! `Thumbnailer` takes a copy at construction and applies per-instance
//! overrides on top, so nothing is looked up lazily afterwards.

use crate::alias::AliasConfig;
use crate::core::error::ConfigError;
use crate::core::options::OptionSet;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Placeholder substituted with the joined prepared options in templates.
pub const OPTS_PLACEHOLDER: &str = "{opts}";

/// Whether a source's own extension is kept for its thumbnails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PreserveExtensions {
    /// `true` keeps every source extension, `false` none.
    All(bool),
    /// Keep only these (lowercase) extensions.
    Only(Vec<String>),
}

impl PreserveExtensions {
    /// Whether `extension` (already lowercased) should be kept.
    pub fn preserves(&self, extension: &str) -> bool {
        match self {
            PreserveExtensions::All(all) => *all,
            PreserveExtensions::Only(list) => {
                list.iter().any(|e| e.trim_start_matches('.').eq_ignore_ascii_case(extension))
            }
        }
    }
}

impl Default for PreserveExtensions {
    fn default() -> Self {
        PreserveExtensions::All(false)
    }
}

/// Configuration for deriving and generating thumbnails.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThumbnailSettings {
    /// Base directory template; may reference `{opts}`.
    pub basedir: String,
    /// Sub-directory template; may reference `{opts}`.
    pub subdir: String,
    /// Prefix prepended to every generated filename.
    pub prefix: String,
    /// Encoder quality used when a request does not set one.
    pub quality: u8,
    /// Extension for opaque thumbnails.
    pub extension: String,
    pub preserve_extensions: PreserveExtensions,
    /// Extension for thumbnails that keep an alpha channel.
    pub transparency_extension: String,
    /// Registered naming strategy id.
    pub namer: String,
    /// Registered source generator ids, in priority order.
    pub source_generators: Vec<String>,
    /// Registered processor ids, in application order.
    pub processors: Vec<String>,
    /// Options merged under every request.
    pub default_options: OptionSet,
}

impl Default for ThumbnailSettings {
    fn default() -> Self {
        Self {
            basedir: String::new(),
            subdir: String::new(),
            prefix: String::new(),
            quality: 85,
            extension: "jpg".to_string(),
            preserve_extensions: PreserveExtensions::default(),
            transparency_extension: "png".to_string(),
            namer: "default".to_string(),
            source_generators: vec!["image".to_string(), "extension_hint".to_string()],
            processors: vec![
                "colorspace".to_string(),
                "autocrop".to_string(),
                "scale_and_crop".to_string(),
                "filters".to_string(),
                "background".to_string(),
            ],
            default_options: OptionSet::new(),
        }
    }
}

impl ThumbnailSettings {
    /// Whether either directory template embeds the prepared options.
    pub fn templates_use_opts(&self) -> bool {
        self.basedir.contains(OPTS_PLACEHOLDER) || self.subdir.contains(OPTS_PLACEHOLDER)
    }
}

/// Top-level configuration file.
///
/// ```toml
/// [thumbnails]
/// basedir = "thumbs"
/// quality = 90
///
/// [aliases.global.small]
/// size = [50, 50]
/// crop = true
///
/// [aliases.targets."blog.Entry.image".small]
/// size = [120, 0]
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub thumbnails: ThumbnailSettings,
    pub aliases: AliasConfig,
}

impl Config {
    /// Parse a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Load a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|error| ConfigError::Io {
            path: path.display().to_string(),
            error,
        })?;
        let config = Self::from_toml_str(&text)?;
        log::debug!("Loaded thumbnail configuration from {}", path.display());
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::OptionValue;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let settings = ThumbnailSettings::default();
        assert_eq!(settings.quality, 85);
        assert_eq!(settings.extension, "jpg");
        assert_eq!(settings.transparency_extension, "png");
        assert_eq!(settings.namer, "default");
        assert_eq!(settings.processors.len(), 5);
        assert!(!settings.templates_use_opts());
    }

    #[test]
    fn test_preserve_extensions() {
        assert!(PreserveExtensions::All(true).preserves("png"));
        assert!(!PreserveExtensions::All(false).preserves("png"));

        let only = PreserveExtensions::Only(vec!["PNG".to_string(), ".gif".to_string()]);
        assert!(only.preserves("png"));
        assert!(only.preserves("gif"));
        assert!(!only.preserves("jpg"));
    }

    #[test]
    fn test_parse_config() {
        let config = Config::from_toml_str(
            r#"
            [thumbnails]
            basedir = "thumbs/{opts}"
            quality = 70
            preserve_extensions = ["png"]

            [thumbnails.default_options]
            sharpen = true

            [aliases.global.small]
            size = [50, 50]
            crop = "smart"
            "#,
        )
        .unwrap();

        let settings = &config.thumbnails;
        assert_eq!(settings.quality, 70);
        assert_eq!(settings.extension, "jpg");
        assert!(settings.templates_use_opts());
        assert_eq!(
            settings.preserve_extensions,
            PreserveExtensions::Only(vec!["png".to_string()])
        );
        assert_eq!(
            settings.default_options.get("sharpen"),
            Some(&OptionValue::Boolean(true))
        );
        assert!(config.aliases.global.contains_key("small"));
    }

    #[test]
    fn test_parse_error() {
        let result = Config::from_toml_str("[thumbnails]\nquality = \"high\"");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[thumbnails]\nprefix = \"t_\"").unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.thumbnails.prefix, "t_");

        let missing = Config::load(file.path().with_extension("missing"));
        assert!(matches!(missing, Err(ConfigError::Io { .. })));
    }
}
