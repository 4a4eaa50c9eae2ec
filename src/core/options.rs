//! Option sets and their canonical form.
//!
//! Two option sets with the same key/value pairs must always produce the same
//! prepared tokens, whatever order they were built in. Derived thumbnail names
//! are built from those tokens, so this is what keeps external caches hitting.

use crate::core::error::{ThumbnailError, ThumbnailResult};
use crate::core::types::{OptionValue, Size};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Key holding the target size.
pub const SIZE: &str = "size";
/// Key holding the encoder quality.
pub const QUALITY: &str = "quality";
/// Key holding the JPEG subsampling mode.
pub const SUBSAMPLING: &str = "subsampling";
/// Reserved key carrying the alias name a request came from.
pub const ALIAS: &str = "ALIAS";

/// Subsampling applied when a request does not name one (4:2:0).
pub const DEFAULT_SUBSAMPLING: i64 = 2;

/// Ordered mapping of option name to value.
///
/// Equality ignores insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OptionSet {
    values: IndexMap<String, OptionValue>,
}

impl OptionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<OptionValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Builder-style size insert; `None` leaves an axis unconstrained.
    pub fn with_size(self, width: Option<u32>, height: Option<u32>) -> Self {
        let dim = |d: Option<u32>| d.map(OptionValue::from).unwrap_or(OptionValue::Integer(0));
        self.with(SIZE, OptionValue::List(vec![dim(width), dim(height)]))
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<OptionValue>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&OptionValue> {
        self.values.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<OptionValue> {
        self.values.shift_remove(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &OptionValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// True when the option is present and truthy.
    pub fn flag(&self, key: &str) -> bool {
        self.get(key).map(|v| !v.is_falsy()).unwrap_or(false)
    }

    /// String value of an option, if it holds one.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(OptionValue::as_str)
    }

    /// Integer value of an option, coercing numeric strings and whole floats.
    pub fn get_integer(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(OptionValue::as_integer)
    }

    /// Alias name this set was tagged with, if any.
    pub fn alias(&self) -> Option<&str> {
        self.get_str(ALIAS)
    }

    /// Validate and return the `size` option.
    ///
    /// Each dimension is coerced to a number and truncated; non-numeric
    /// dimensions count as absent. Rejected when no truncated dimension is
    /// positive or any is negative.
    pub fn size(&self) -> ThumbnailResult<Size> {
        let (width, height) = match self.get(SIZE) {
            Some(value) => raw_dimensions(value),
            None => (None, None),
        };

        let mut min_dim = 0.0_f64;
        let mut max_dim = 0.0_f64;
        for dim in [width, height].into_iter().flatten().map(f64::trunc) {
            min_dim = min_dim.min(dim);
            max_dim = max_dim.max(dim);
        }
        if max_dim == 0.0 || min_dim < 0.0 {
            return Err(ThumbnailError::InvalidSize { width, height });
        }

        let axis = |d: Option<f64>| d.map(|v| v as u32).unwrap_or(0);
        Ok(Size::new(axis(width), axis(height)))
    }

    /// Canonical token sequence for this option set.
    ///
    /// Order is fixed: the size token, then a combined quality/subsampling
    /// token, then every other lowercase key in sorted order. Uppercase keys
    /// (such as [`ALIAS`]) and falsy values never appear.
    pub fn prepared_options(&self) -> Vec<String> {
        let size = match self.size() {
            Ok(size) => size.token(),
            Err(_) => {
                let (w, h) = self.get(SIZE).map(raw_dimensions).unwrap_or((None, None));
                let axis =
                    |d: Option<f64>| d.map(|v| v.to_string()).unwrap_or_else(|| "0".to_string());
                format!("{}x{}", axis(w), axis(h))
            }
        };
        let mut tokens = vec![size];

        let mut quality_text = String::new();
        if let Some(quality) = self.get(QUALITY) {
            quality_text.push_str(&format!("q{}", quality));
        }
        if let Some(subsampling) = self.get(SUBSAMPLING) {
            if subsampling.as_integer() != Some(DEFAULT_SUBSAMPLING) {
                quality_text.push_str(&format!("ss{}", subsampling));
            }
        }
        if !quality_text.is_empty() {
            tokens.push(quality_text);
        }

        let mut keys: Vec<&String> = self.values.keys().collect();
        keys.sort();
        for key in keys {
            if is_reserved_key(key) || matches!(key.as_str(), SIZE | QUALITY | SUBSAMPLING) {
                continue;
            }
            let value = &self.values[key];
            if value.is_falsy() {
                continue;
            }
            match value {
                OptionValue::Boolean(true) => tokens.push(key.clone()),
                other => tokens.push(format!("{}-{}", key, other)),
            }
        }

        tokens
    }

    /// Prepared tokens joined with `_`, the `{opts}` template value.
    pub fn opts_text(&self) -> String {
        self.prepared_options().join("_")
    }
}

impl<K: Into<String>, V: Into<OptionValue>> FromIterator<(K, V)> for OptionSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut set = OptionSet::new();
        for (key, value) in iter {
            set.insert(key, value);
        }
        set
    }
}

/// Uppercase keys carry metadata for namers and processors, not semantics.
fn is_reserved_key(key: &str) -> bool {
    key.chars().any(|c| c.is_alphabetic()) && key == key.to_uppercase()
}

/// Raw numeric dimensions of a `size` value, before validation.
fn raw_dimensions(value: &OptionValue) -> (Option<f64>, Option<f64>) {
    match value {
        OptionValue::List(items) => (
            items.first().and_then(OptionValue::as_number),
            items.get(1).and_then(OptionValue::as_number),
        ),
        OptionValue::String(text) => {
            let mut parts = text.splitn(2, |c: char| c == 'x' || c == 'X');
            let mut next = || {
                parts
                    .next()
                    .and_then(|p| p.trim().parse::<f64>().ok())
                    .filter(|f| f.is_finite())
            };
            let width = next();
            (width, next())
        }
        _ => (None, None),
    }
}

/// Merge `raw` over `defaults` and canonicalise the result.
///
/// The merge is shallow: a list-valued raw option replaces the default list
/// outright. `size` is validated and rewritten as two non-negative integers;
/// `subsampling` defaults to 4:2:0 when neither side sets it.
pub fn normalize(raw: &OptionSet, defaults: &OptionSet) -> ThumbnailResult<OptionSet> {
    let mut merged = defaults.clone();
    for (key, value) in raw.iter() {
        merged.insert(key, value.clone());
    }
    if !merged.contains(SUBSAMPLING) {
        merged.insert(SUBSAMPLING, DEFAULT_SUBSAMPLING);
    }

    let size = merged.size()?;
    merged.insert(SIZE, vec![size.width, size.height]);

    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sized(width: impl Into<OptionValue>, height: impl Into<OptionValue>) -> OptionSet {
        OptionSet::new().with(SIZE, OptionValue::List(vec![width.into(), height.into()]))
    }

    #[test]
    fn test_size_validation() {
        assert!(matches!(
            sized(0, 0).size(),
            Err(ThumbnailError::InvalidSize { .. })
        ));
        assert!(matches!(
            sized(-10, 50).size(),
            Err(ThumbnailError::InvalidSize { .. })
        ));
        assert_eq!(sized(0, 50).size().unwrap(), Size::new(0, 50));

        let width_only = OptionSet::new().with(SIZE, OptionValue::List(vec![50.into()]));
        assert_eq!(width_only.size().unwrap(), Size::new(50, 0));

        let unparsable = sized(50, "tall");
        assert_eq!(unparsable.size().unwrap(), Size::new(50, 0));

        assert!(OptionSet::new().size().is_err());
    }

    #[test]
    fn test_size_from_string() {
        let set = OptionSet::new().with(SIZE, "120x80");
        assert_eq!(set.size().unwrap(), Size::new(120, 80));
    }

    #[test]
    fn test_normalize_merges_and_canonicalises() {
        let defaults = OptionSet::new().with(QUALITY, 85).with("crop", false);
        let raw = sized("100", 50.0).with("crop", true);

        let normalized = normalize(&raw, &defaults).unwrap();
        assert_eq!(normalized.get(QUALITY), Some(&OptionValue::Integer(85)));
        assert_eq!(normalized.get("crop"), Some(&OptionValue::Boolean(true)));
        assert_eq!(normalized.get(SUBSAMPLING), Some(&OptionValue::Integer(2)));
        assert_eq!(
            normalized.get(SIZE),
            Some(&OptionValue::from(vec![100u32, 50]))
        );
    }

    #[test]
    fn test_normalize_rejects_bad_size() {
        let raw = sized(0, 0);
        assert!(normalize(&raw, &OptionSet::new()).is_err());
    }

    #[test]
    fn test_fractional_size_validated_after_truncation() {
        let fractional = sized(0.5, 0);
        match fractional.size() {
            Err(ThumbnailError::InvalidSize { width, height }) => {
                assert_eq!((width, height), (Some(0.5), Some(0.0)));
            }
            other => panic!("expected InvalidSize, got {:?}", other),
        }
        assert!(normalize(&fractional, &OptionSet::new()).is_err());

        let stored = normalize(&sized(99.9, 0), &OptionSet::new()).unwrap();
        assert_eq!(stored.size().unwrap(), Size::new(99, 0));
    }

    #[test]
    fn test_normalize_is_shallow() {
        let defaults = OptionSet::new().with("target", vec![10, 20]);
        let raw = sized(10, 10).with("target", vec![30]);
        let normalized = normalize(&raw, &defaults).unwrap();
        assert_eq!(normalized.get("target"), Some(&OptionValue::from(vec![30])));
    }

    #[test]
    fn test_prepared_options() {
        let set = sized(100, 0)
            .with(QUALITY, 90)
            .with(SUBSAMPLING, 1)
            .with("sharpen", true)
            .with("crop", "smart")
            .with("bw", false)
            .with(ALIAS, "small");

        assert_eq!(
            set.prepared_options(),
            vec!["100x0", "q90ss1", "crop-smart", "sharpen"]
        );
    }

    #[test]
    fn test_default_subsampling_omitted() {
        let set = sized(10, 10).with(QUALITY, 85).with(SUBSAMPLING, 2);
        assert_eq!(set.prepared_options(), vec!["10x10", "q85"]);
        assert_eq!(set.opts_text(), "10x10_q85");
    }

    #[test]
    fn test_equality_ignores_order() {
        let a = sized(1, 2).with("crop", true).with(QUALITY, 80);
        let b = OptionSet::new()
            .with(QUALITY, 80)
            .with("crop", true)
            .with(SIZE, OptionValue::List(vec![1.into(), 2.into()]));
        assert_eq!(a, b);
    }

    fn option_entry() -> impl Strategy<Value = (String, OptionValue)> {
        let value = prop_oneof![
            any::<bool>().prop_map(OptionValue::Boolean),
            (-50i64..500).prop_map(OptionValue::Integer),
            "[a-z]{0,6}".prop_map(OptionValue::String),
        ];
        ("[a-z]{1,8}", value)
    }

    proptest! {
        #[test]
        fn prop_prepared_options_ignore_insertion_order(
            entries in proptest::collection::vec(option_entry(), 0..10),
            seed in any::<u64>(),
        ) {
            let mut unique: IndexMap<String, OptionValue> = IndexMap::new();
            for (k, v) in entries {
                unique.insert(k, v);
            }
            unique.shift_remove(SIZE);

            let forward: OptionSet = unique
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .chain([(SIZE.to_string(), OptionValue::from(vec![64, 48]))])
                .collect();

            let mut shuffled: Vec<_> = unique.into_iter().collect();
            let len = shuffled.len().max(1);
            shuffled.rotate_left((seed as usize) % len);
            shuffled.reverse();
            let mut permuted = OptionSet::new().with(SIZE, vec![64, 48]);
            for (k, v) in shuffled {
                permuted.insert(k, v);
            }

            prop_assert_eq!(forward.prepared_options(), permuted.prepared_options());
        }
    }
}
