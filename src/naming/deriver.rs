//! Deterministic thumbnail paths.
//!
//! Everything here is a pure function of the source name, the option set and
//! the configuration. No I/O happens, so a caller can compute a thumbnail's
//! storage key and check its cache before decoding anything.

use crate::core::options::OptionSet;
use crate::core::settings::{ThumbnailSettings, OPTS_PLACEHOLDER};
use crate::naming::namers::{Namer, NamerContext};
use std::fmt;
use std::sync::Arc;

/// Extension used when neither the settings nor the source provide one.
pub const FALLBACK_EXTENSION: &str = "jpg";

/// Split a relative name into `(directory, filename)` at the last `/`.
pub fn split_name(name: &str) -> (&str, &str) {
    match name.rfind('/') {
        Some(index) => (name[..index].trim_end_matches('/'), &name[index + 1..]),
        None => ("", name),
    }
}

/// Lowercased extension of a filename, without the dot.
///
/// Leading dots do not start an extension, so `.profile` has none.
pub fn extension_of(filename: &str) -> String {
    let stem_start = filename.len() - filename.trim_start_matches('.').len();
    match filename[stem_start..].rfind('.') {
        Some(index) => filename[stem_start + index + 1..].to_lowercase(),
        None => String::new(),
    }
}

/// Join path components with `/`, skipping empty ones. A component starting
/// with `/` discards everything before it.
pub fn join_key(parts: &[&str]) -> String {
    let mut key = String::new();
    for part in parts.iter().filter(|p| !p.is_empty()) {
        if part.starts_with('/') {
            key.clear();
        } else if !key.is_empty() && !key.ends_with('/') {
            key.push('/');
        }
        key.push_str(part);
    }
    key
}

/// Computes thumbnail storage keys.
#[derive(Clone)]
pub struct KeyDeriver {
    settings: Arc<ThumbnailSettings>,
    namer: Arc<dyn Namer>,
}

impl fmt::Debug for KeyDeriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyDeriver")
            .field("settings", &self.settings)
            .field("namer", &self.namer.id())
            .finish()
    }
}

impl KeyDeriver {
    /// Create a deriver with an already-resolved namer.
    pub fn new(settings: Arc<ThumbnailSettings>, namer: Arc<dyn Namer>) -> Self {
        Self { settings, namer }
    }

    pub fn settings(&self) -> &ThumbnailSettings {
        &self.settings
    }

    /// Id of the naming strategy in use.
    pub fn namer_id(&self) -> &str {
        self.namer.id()
    }

    /// Pick the thumbnail extension.
    ///
    /// A preserved source extension wins; otherwise transparency selects the
    /// transparency extension, then the default extension, then `jpg`.
    pub fn select_extension(&self, source_extension: &str, transparent: bool) -> String {
        let settings = &self.settings;
        let extension = if settings.preserve_extensions.preserves(source_extension) {
            source_extension
        } else if transparent {
            settings.transparency_extension.as_str()
        } else {
            settings.extension.as_str()
        };

        if extension.is_empty() {
            FALLBACK_EXTENSION.to_string()
        } else {
            extension.to_string()
        }
    }

    /// Derive the storage key for a thumbnail of `source_name`.
    ///
    /// Returns `basedir / source directory / subdir / prefix + filename`.
    pub fn derive_name(&self, source_name: &str, options: &OptionSet, transparent: bool) -> String {
        let (directory, source_filename) = split_name(source_name);
        let extension = self.select_extension(&extension_of(source_filename), transparent);

        let prepared = options.prepared_options();
        let opts_text = prepared.join("_");
        let basedir = self.settings.basedir.replace(OPTS_PLACEHOLDER, &opts_text);
        let subdir = self.settings.subdir.replace(OPTS_PLACEHOLDER, &opts_text);

        let filename = self.namer.name(&NamerContext {
            settings: &self.settings,
            source_filename,
            extension: &extension,
            options,
            prepared_options: &prepared,
        });
        let filename = format!("{}{}", self.settings.prefix, filename);

        join_key(&[&basedir, directory, &subdir, &filename])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::settings::PreserveExtensions;
    use crate::naming::namers::{AliasNamer, DefaultNamer};

    fn deriver(settings: ThumbnailSettings) -> KeyDeriver {
        KeyDeriver::new(Arc::new(settings), Arc::new(DefaultNamer))
    }

    fn options() -> OptionSet {
        OptionSet::new()
            .with_size(Some(100), Some(100))
            .with("quality", 85)
            .with("crop", true)
    }

    #[test]
    fn test_split_and_extension() {
        assert_eq!(split_name("photos/2024/cat.PNG"), ("photos/2024", "cat.PNG"));
        assert_eq!(split_name("cat.png"), ("", "cat.png"));
        assert_eq!(extension_of("cat.PNG"), "png");
        assert_eq!(extension_of("archive.tar.gz"), "gz");
        assert_eq!(extension_of(".profile"), "");
        assert_eq!(extension_of("README"), "");
    }

    #[test]
    fn test_join_key() {
        assert_eq!(join_key(&["", "", "", "a.jpg"]), "a.jpg");
        assert_eq!(join_key(&["thumbs", "photos", "", "a.jpg"]), "thumbs/photos/a.jpg");
        assert_eq!(join_key(&["thumbs/", "photos", "x", "a.jpg"]), "thumbs/photos/x/a.jpg");
        assert_eq!(join_key(&["thumbs", "/abs", "a.jpg"]), "/abs/a.jpg");
    }

    #[test]
    fn test_preserve_extensions_wins() {
        let d = deriver(ThumbnailSettings {
            preserve_extensions: PreserveExtensions::All(true),
            ..ThumbnailSettings::default()
        });
        assert_eq!(d.select_extension("png", true), "png");
        assert_eq!(d.select_extension("png", false), "png");
    }

    #[test]
    fn test_preserve_extension_list() {
        let d = deriver(ThumbnailSettings {
            preserve_extensions: PreserveExtensions::Only(vec!["gif".to_string()]),
            ..ThumbnailSettings::default()
        });
        assert_eq!(d.select_extension("gif", false), "gif");
        assert_eq!(d.select_extension("png", false), "jpg");
    }

    #[test]
    fn test_transparency_extension() {
        let d = deriver(ThumbnailSettings::default());
        assert_eq!(d.select_extension("png", true), "png");
        assert_eq!(d.select_extension("png", false), "jpg");
    }

    #[test]
    fn test_empty_extension_falls_back() {
        let d = deriver(ThumbnailSettings {
            extension: String::new(),
            ..ThumbnailSettings::default()
        });
        assert_eq!(d.select_extension("png", false), "jpg");
    }

    #[test]
    fn test_derive_name_default_layout() {
        let d = deriver(ThumbnailSettings::default());
        assert_eq!(
            d.derive_name("photos/cat.png", &options(), false),
            "photos/cat.png.100x100_q85_crop.jpg"
        );
    }

    #[test]
    fn test_derive_name_with_templates_and_prefix() {
        let d = deriver(ThumbnailSettings {
            basedir: "thumbs".to_string(),
            subdir: "{opts}".to_string(),
            prefix: "t_".to_string(),
            ..ThumbnailSettings::default()
        });
        assert_eq!(
            d.derive_name("photos/cat.png", &options(), true),
            "thumbs/photos/100x100_q85_crop/t_cat.png"
        );
    }

    #[test]
    fn test_derive_name_is_order_independent() {
        let d = deriver(ThumbnailSettings::default());
        let reordered = OptionSet::new()
            .with("crop", true)
            .with("quality", 85)
            .with_size(Some(100), Some(100));
        assert_eq!(
            d.derive_name("a/b.jpg", &options(), false),
            d.derive_name("a/b.jpg", &reordered, false)
        );
    }

    #[test]
    fn test_derive_name_with_alias_namer() {
        let d = KeyDeriver::new(Arc::new(ThumbnailSettings::default()), Arc::new(AliasNamer));
        let tagged = options().with("ALIAS", "small");
        assert_eq!(d.derive_name("test.jpg", &tagged, false), "test.jpg.small.jpg");
        assert_eq!(d.namer_id(), "alias");
    }
}
