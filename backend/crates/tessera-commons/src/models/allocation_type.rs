use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::CommonError;

/// Whether a shard serves traffic or is held in reserve.
///
/// Shards only ever move `Disabled -> Allocated`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AllocationType {
    Allocated,
    Disabled,
}

impl AllocationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AllocationType::Allocated => "allocated",
            AllocationType::Disabled => "disabled",
        }
    }

    /// Compact code persisted in the control tables.
    pub fn code(&self) -> &'static str {
        match self {
            AllocationType::Allocated => "1",
            AllocationType::Disabled => "0",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "1" => Some(AllocationType::Allocated),
            "0" => Some(AllocationType::Disabled),
            _ => None,
        }
    }
}

impl fmt::Display for AllocationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AllocationType {
    type Err = CommonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "allocated" => Ok(AllocationType::Allocated),
            "disabled" => Ok(AllocationType::Disabled),
            other => Err(CommonError::UnknownAllocationType(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        assert_eq!("disabled".parse::<AllocationType>().unwrap(), AllocationType::Disabled);
        assert!("test".parse::<AllocationType>().is_err());
    }

    #[test]
    fn test_codes() {
        assert_eq!(AllocationType::from_code(AllocationType::Allocated.code()), Some(AllocationType::Allocated));
        assert_eq!(AllocationType::from_code("2"), None);
    }
}
