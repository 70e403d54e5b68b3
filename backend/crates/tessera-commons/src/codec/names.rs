use std::collections::HashMap;

use crate::errors::CodecError;

/// Bidirectional long-name/short-name vocabulary.
#[derive(Debug, Clone)]
pub struct NameMap {
    pairs: &'static [(&'static str, &'static str)],
    long_to_short: HashMap<&'static str, &'static str>,
    short_to_long: HashMap<&'static str, &'static str>,
}

impl NameMap {
    /// Build a vocabulary from `(long, short)` pairs.
    pub fn new(pairs: &'static [(&'static str, &'static str)]) -> Self {
        let long_to_short = pairs.iter().map(|(long, short)| (*long, *short)).collect();
        let short_to_long = pairs.iter().map(|(long, short)| (*short, *long)).collect();
        Self {
            pairs,
            long_to_short,
            short_to_long,
        }
    }

    pub fn short_name_for(&self, long_name: &str) -> Option<&'static str> {
        self.long_to_short.get(long_name).copied()
    }

    pub fn long_name_for(&self, short_name: &str) -> Option<&'static str> {
        self.short_to_long.get(short_name).copied()
    }

    /// Short name for `long_name`, rejecting names outside the vocabulary.
    pub fn require_short(&self, long_name: &str) -> Result<&'static str, CodecError> {
        self.short_name_for(long_name)
            .ok_or_else(|| CodecError::UnknownField(long_name.to_string()))
    }

    /// True when no long or short name is repeated.
    pub fn is_bijective(&self) -> bool {
        self.long_to_short.len() == self.pairs.len() && self.short_to_long.len() == self.pairs.len()
    }

    pub fn pairs(&self) -> impl Iterator<Item = (&'static str, &'static str)> + '_ {
        self.pairs.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static PAIRS: &[(&str, &str)] = &[("shard_name", "SN"), ("entity_type", "ET")];
    static DUPLICATED: &[(&str, &str)] = &[("shard_name", "SN"), ("shard_label", "SN")];

    #[test]
    fn test_lookups_are_inverse() {
        let names = NameMap::new(PAIRS);
        for (long, short) in names.pairs() {
            assert_eq!(names.short_name_for(long), Some(short));
            assert_eq!(names.long_name_for(short), Some(long));
        }
        assert!(names.is_bijective());
    }

    #[test]
    fn test_duplicate_short_name_is_not_bijective() {
        assert!(!NameMap::new(DUPLICATED).is_bijective());
    }

    #[test]
    fn test_require_short_rejects_unknown() {
        let names = NameMap::new(PAIRS);
        assert_eq!(
            names.require_short("color"),
            Err(CodecError::UnknownField("color".to_string()))
        );
    }
}
