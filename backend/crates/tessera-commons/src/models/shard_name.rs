//! Type-safe wrapper for physical shard (table) names.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::CommonError;

/// Name of a physical backing table.
///
/// Follows the backing service's table naming rules: 3 to 255 characters from
/// `[A-Za-z0-9_.-]`. Names are case-sensitive, like the tables they name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ShardName(String);

impl ShardName {
    pub fn new(name: impl Into<String>) -> Result<Self, CommonError> {
        let name = name.into().trim().to_string();
        if name.len() < 3 || name.len() > 255 {
            return Err(CommonError::InvalidInput(format!(
                "shard name '{}' must be between 3 and 255 characters",
                name
            )));
        }
        if let Some(bad) = name
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.')))
        {
            return Err(CommonError::InvalidInput(format!(
                "shard name '{}' contains invalid character '{}'",
                name, bad
            )));
        }
        Ok(Self(name))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[inline]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for ShardName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ShardName {
    type Error = CommonError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        ShardName::new(value)
    }
}

impl TryFrom<&str> for ShardName {
    type Error = CommonError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        ShardName::new(value)
    }
}

impl From<ShardName> for String {
    fn from(value: ShardName) -> Self {
        value.0
    }
}

impl AsRef<str> for ShardName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_names() {
        assert_eq!(ShardName::new(" tl_shard_01 ").unwrap().as_str(), "tl_shard_01");
        assert!(ShardName::new("a.b-c_d").is_ok());
    }

    #[test]
    fn test_invalid_names() {
        assert!(ShardName::new("ab").is_err());
        assert!(ShardName::new("bad name").is_err());
        assert!(ShardName::new("x".repeat(256)).is_err());
    }
}
