use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::CommonError;

/// Category of logical record with its own shard pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EntityType {
    TokenBalance,
    TransactionLog,
}

impl EntityType {
    pub const ALL: [EntityType; 2] = [EntityType::TokenBalance, EntityType::TransactionLog];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::TokenBalance => "tokenBalance",
            EntityType::TransactionLog => "transactionLog",
        }
    }

    /// Compact code persisted in the control tables.
    pub fn code(&self) -> &'static str {
        match self {
            EntityType::TokenBalance => "tb",
            EntityType::TransactionLog => "tl",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "tb" => Some(EntityType::TokenBalance),
            "tl" => Some(EntityType::TransactionLog),
            _ => None,
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = CommonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "tokenBalance" | "token_balance" => Ok(EntityType::TokenBalance),
            "transactionLog" | "transaction_log" => Ok(EntityType::TransactionLog),
            other => Err(CommonError::UnknownEntityType(other.to_string())),
        }
    }
}
